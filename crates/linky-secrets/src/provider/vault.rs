//! `HashiCorp` Vault KV v2 secret vault.
//!
//! Supports `AppRole` and token authentication with automatic token renewal.
//! Each webhook secret is one KV entry holding `{"value": "<secret>"}`.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::config::{VaultAuthMethod, VaultConfig};
use crate::{validate_key, SecretError, SecretValue, SecretVault};

const PROVIDER: &str = "vault";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Vault token state.
#[derive(Debug, Clone)]
struct VaultToken {
    token: String,
    /// Token TTL in seconds, when the token is renewable.
    ttl_seconds: Option<u64>,
}

/// Secret vault backed by a `HashiCorp` Vault KV v2 mount.
pub struct VaultSecretVault {
    client: reqwest::Client,
    address: String,
    namespace: Option<String>,
    mount: String,
    key_prefix: String,
    token: Arc<RwLock<Option<VaultToken>>>,
    renewal_handle: Option<tokio::task::JoinHandle<()>>,
}

impl std::fmt::Debug for VaultSecretVault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultSecretVault")
            .field("address", &self.address)
            .field("namespace", &self.namespace)
            .field("mount", &self.mount)
            .field("key_prefix", &self.key_prefix)
            .finish()
    }
}

impl VaultSecretVault {
    /// Connect to Vault.
    ///
    /// Authenticates immediately and starts background token renewal when the
    /// login returned a lease.
    pub async fn new(config: &VaultConfig, key_prefix: &str) -> Result<Self, SecretError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| SecretError::ConfigError {
                detail: format!("Failed to create HTTP client: {e}"),
            })?;

        let address = config.address.trim_end_matches('/').to_string();
        let namespace = config.namespace.clone();
        let token_state: Arc<RwLock<Option<VaultToken>>> = Arc::new(RwLock::new(None));

        let initial_token = match &config.auth_method {
            VaultAuthMethod::AppRole { role_id, secret_id } => {
                Self::approle_login(&client, &address, namespace.as_deref(), role_id, secret_id)
                    .await?
            }
            VaultAuthMethod::Token { token } => {
                tracing::info!("Vault: Using direct token authentication");
                VaultToken {
                    token: token.clone(),
                    ttl_seconds: None,
                }
            }
        };

        *token_state.write().await = Some(initial_token.clone());

        let renewal_handle = match initial_token.ttl_seconds {
            Some(ttl) if ttl > 0 => Some(Self::spawn_renewal_task(
                client.clone(),
                address.clone(),
                namespace.clone(),
                token_state.clone(),
                ttl,
            )),
            _ => None,
        };

        Ok(Self {
            client,
            address,
            namespace,
            mount: config.mount.trim_matches('/').to_string(),
            key_prefix: key_prefix.trim_matches('/').to_string(),
            token: token_state,
            renewal_handle,
        })
    }

    /// Authenticate via `AppRole`.
    async fn approle_login(
        client: &reqwest::Client,
        address: &str,
        namespace: Option<&str>,
        role_id: &str,
        secret_id: &str,
    ) -> Result<VaultToken, SecretError> {
        let url = format!("{address}/v1/auth/approle/login");
        let body = serde_json::json!({
            "role_id": role_id,
            "secret_id": secret_id,
        });

        let mut req = client.post(&url).json(&body);
        if let Some(ns) = namespace {
            req = req.header("X-Vault-Namespace", ns);
        }

        let resp = req.send().await.map_err(|e| {
            SecretError::unavailable(PROVIDER, format!("Failed to connect to Vault at {address}: {e}"))
        })?;

        if !resp.status().is_success() {
            let status = resp.status();
            return Err(SecretError::unavailable(
                PROVIDER,
                format!("Vault AppRole login failed (HTTP {status})"),
            ));
        }

        let json: serde_json::Value = resp.json().await.map_err(|e| {
            SecretError::unavailable(PROVIDER, format!("Invalid Vault login response: {e}"))
        })?;

        let token = json["auth"]["client_token"]
            .as_str()
            .ok_or_else(|| {
                SecretError::unavailable(PROVIDER, "Missing client_token in Vault AppRole response")
            })?
            .to_string();

        let ttl_seconds = json["auth"]["lease_duration"].as_u64();

        tracing::info!(
            ttl_seconds = ?ttl_seconds,
            "Vault: AppRole authentication successful"
        );

        Ok(VaultToken { token, ttl_seconds })
    }

    /// Spawn a background task that renews the token at 75% of its TTL.
    fn spawn_renewal_task(
        client: reqwest::Client,
        address: String,
        namespace: Option<String>,
        token_state: Arc<RwLock<Option<VaultToken>>>,
        initial_ttl: u64,
    ) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut current_ttl = initial_ttl;
            let mut consecutive_failures: u32 = 0;
            loop {
                let wait_secs = (current_ttl.saturating_mul(3) / 4).max(1);
                tracing::debug!(
                    wait_secs = wait_secs,
                    ttl = current_ttl,
                    "Vault: Scheduling token renewal"
                );
                tokio::time::sleep(Duration::from_secs(wait_secs)).await;

                let current_token = {
                    let state = token_state.read().await;
                    state.as_ref().map(|t| t.token.clone())
                };

                let Some(token) = current_token else {
                    tracing::warn!("Vault: No token available for renewal, stopping renewal task");
                    break;
                };

                match Self::renew_token(&client, &address, namespace.as_deref(), &token).await {
                    Ok(new_ttl) => {
                        current_ttl = new_ttl;
                        consecutive_failures = 0;
                        if let Some(state) = token_state.write().await.as_mut() {
                            state.ttl_seconds = Some(new_ttl);
                        }
                        tracing::info!(new_ttl = new_ttl, "Vault: Token renewed successfully");
                    }
                    Err(e) => {
                        consecutive_failures += 1;
                        let backoff = std::cmp::min(5 * (1u64 << consecutive_failures.min(6)), 300);
                        tracing::error!(
                            error = %e,
                            consecutive_failures = consecutive_failures,
                            retry_in_secs = backoff,
                            "Vault: Token renewal failed, will retry with backoff"
                        );
                        tokio::time::sleep(Duration::from_secs(backoff)).await;
                    }
                }
            }
        })
    }

    /// Renew the current token, returning the new TTL.
    async fn renew_token(
        client: &reqwest::Client,
        address: &str,
        namespace: Option<&str>,
        token: &str,
    ) -> Result<u64, SecretError> {
        let url = format!("{address}/v1/auth/token/renew-self");
        let mut req = client.post(&url).header("X-Vault-Token", token);
        if let Some(ns) = namespace {
            req = req.header("X-Vault-Namespace", ns);
        }

        let resp = req.send().await.map_err(|e| {
            SecretError::unavailable(PROVIDER, format!("Token renewal request failed: {e}"))
        })?;

        if !resp.status().is_success() {
            return Err(SecretError::unavailable(
                PROVIDER,
                format!("Token renewal failed with HTTP {}", resp.status()),
            ));
        }

        let json: serde_json::Value = resp.json().await.map_err(|e| {
            SecretError::unavailable(PROVIDER, format!("Invalid renewal response: {e}"))
        })?;

        Ok(json["auth"]["lease_duration"].as_u64().unwrap_or(3600))
    }

    async fn current_token(&self) -> Result<String, SecretError> {
        let state = self.token.read().await;
        state
            .as_ref()
            .map(|t| t.token.clone())
            .ok_or_else(|| SecretError::unavailable(PROVIDER, "No Vault token available"))
    }

    fn reference_for(&self, key: &str) -> String {
        if self.key_prefix.is_empty() {
            key.to_string()
        } else {
            format!("{}/{}", self.key_prefix, key)
        }
    }

    fn data_url(&self, reference: &str) -> String {
        format!("{}/v1/{}/data/{}", self.address, self.mount, reference)
    }

    fn metadata_url(&self, reference: &str) -> String {
        format!("{}/v1/{}/metadata/{}", self.address, self.mount, reference)
    }

    /// Build an authenticated request.
    async fn request(
        &self,
        method: reqwest::Method,
        url: &str,
    ) -> Result<reqwest::RequestBuilder, SecretError> {
        let token = self.current_token().await?;
        let mut req = self
            .client
            .request(method, url)
            .header("X-Vault-Token", token);
        if let Some(ns) = &self.namespace {
            req = req.header("X-Vault-Namespace", ns);
        }
        Ok(req)
    }

    /// Map a non-success status to an error.
    fn status_error(status: reqwest::StatusCode, reference: &str, op: &str) -> SecretError {
        match status {
            reqwest::StatusCode::NOT_FOUND => SecretError::NotFound {
                name: reference.to_string(),
            },
            reqwest::StatusCode::FORBIDDEN => SecretError::PermissionDenied {
                detail: format!("Vault denied {op} on '{reference}'"),
            },
            _ => SecretError::unavailable(
                PROVIDER,
                format!("Vault returned HTTP {status} on {op} of '{reference}'"),
            ),
        }
    }
}

impl Drop for VaultSecretVault {
    fn drop(&mut self) {
        if let Some(handle) = self.renewal_handle.take() {
            handle.abort();
        }
    }
}

#[async_trait]
impl SecretVault for VaultSecretVault {
    async fn put_secret(&self, key: &str, value: &str) -> Result<String, SecretError> {
        validate_key(key)?;
        let reference = self.reference_for(key);
        let body = serde_json::json!({ "data": { "value": value } });

        let resp = self
            .request(reqwest::Method::POST, &self.data_url(&reference))
            .await?
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                SecretError::unavailable(PROVIDER, format!("Failed to write '{reference}': {e}"))
            })?;

        if !resp.status().is_success() {
            return Err(Self::status_error(resp.status(), &reference, "write"));
        }

        tracing::debug!(vault_path = %reference, "Secret written to Vault");
        Ok(reference)
    }

    async fn get_secret(&self, reference: &str) -> Result<SecretValue, SecretError> {
        validate_key(reference)?;

        let resp = self
            .request(reqwest::Method::GET, &self.data_url(reference))
            .await?
            .send()
            .await
            .map_err(|e| {
                SecretError::unavailable(PROVIDER, format!("Failed to fetch '{reference}': {e}"))
            })?;

        if !resp.status().is_success() {
            return Err(Self::status_error(resp.status(), reference, "read"));
        }

        let json: serde_json::Value = resp.json().await.map_err(|e| SecretError::InvalidValue {
            name: reference.to_string(),
            detail: format!("Invalid Vault response JSON: {e}"),
        })?;

        // KV v2: data is under data.data
        let value = json
            .get("data")
            .and_then(|d| d.get("data"))
            .and_then(|d| d.get("value"))
            .and_then(serde_json::Value::as_str)
            .ok_or_else(|| SecretError::InvalidValue {
                name: reference.to_string(),
                detail: "Missing data.data.value in Vault KV v2 response".to_string(),
            })?;

        let version = json
            .get("data")
            .and_then(|d| d.get("metadata"))
            .and_then(|m| m.get("version"))
            .and_then(serde_json::Value::as_u64)
            .map(|v| v.to_string());

        let mut sv = SecretValue::new(reference, value.as_bytes().to_vec());
        sv.version = version;
        Ok(sv)
    }

    async fn delete_secret(&self, reference: &str) -> Result<(), SecretError> {
        validate_key(reference)?;

        let resp = self
            .request(reqwest::Method::DELETE, &self.metadata_url(reference))
            .await?
            .send()
            .await
            .map_err(|e| {
                SecretError::unavailable(PROVIDER, format!("Failed to delete '{reference}': {e}"))
            })?;

        let status = resp.status();
        if status.is_success() || status == reqwest::StatusCode::NOT_FOUND {
            tracing::debug!(vault_path = %reference, "Secret deleted from Vault");
            return Ok(());
        }

        Err(Self::status_error(status, reference, "delete"))
    }

    async fn health_check(&self) -> Result<bool, SecretError> {
        let url = format!("{}/v1/sys/health", self.address);
        let resp = self.client.get(&url).send().await.map_err(|e| {
            SecretError::unavailable(PROVIDER, format!("Vault health check failed: {e}"))
        })?;

        // 200 active, 429 standby, 472 DR secondary, 473 performance standby.
        Ok(matches!(resp.status().as_u16(), 200 | 429 | 472 | 473))
    }

    fn provider_type(&self) -> &'static str {
        PROVIDER
    }
}
