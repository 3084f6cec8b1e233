//! Secret vault adapter for webhook signing secrets.
//!
//! Webhook endpoints never store their HMAC secret in the primary datastore.
//! The secret is written to a [`SecretVault`] and only the returned reference
//! is persisted. Two backends exist: `HashiCorp` Vault KV v2 and an in-memory
//! map for development and tests.
//!
//! # Usage
//!
//! ```rust,ignore
//! use linky_secrets::{SecretVaultConfig, build_vault};
//!
//! let config = SecretVaultConfig::from_env()?;
//! let vault = build_vault(&config).await?;
//! let reference = vault.put_secret("owner/endpoint", "s3cr3t").await?;
//! let secret = vault.get_secret(&reference).await?;
//! ```

pub mod config;
pub mod provider;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

pub use config::{SecretVaultConfig, VaultAuthMethod, VaultBackend, VaultConfig};
pub use provider::memory::MemorySecretVault;
pub use provider::vault::VaultSecretVault;

// ── SecretError ──────────────────────────────────────────────────────────

/// Errors returned by secret vault operations.
#[derive(Debug, thiserror::Error)]
pub enum SecretError {
    /// Secret not found in the vault.
    #[error("Secret not found: '{name}'")]
    NotFound { name: String },

    /// Vault is unreachable (network error, auth failure, sealed).
    #[error("Secret vault '{provider}' unavailable: {detail}")]
    ProviderUnavailable { provider: String, detail: String },

    /// Secret value or key is malformed.
    #[error("Invalid secret value for '{name}': {detail}")]
    InvalidValue { name: String, detail: String },

    /// Configuration error (missing required config, unknown backend).
    #[error("Secret vault configuration error: {detail}")]
    ConfigError { detail: String },

    /// The vault refused the operation.
    #[error("Permission denied: {detail}")]
    PermissionDenied { detail: String },
}

impl SecretError {
    pub(crate) fn unavailable(provider: &str, detail: impl Into<String>) -> Self {
        Self::ProviderUnavailable {
            provider: provider.to_string(),
            detail: detail.into(),
        }
    }

    /// Whether the failure is transient (vault unreachable) rather than a
    /// problem with the request.
    #[must_use]
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::ProviderUnavailable { .. })
    }
}

// ── SecretValue ──────────────────────────────────────────────────────────

/// A resolved secret value.
#[derive(Clone)]
pub struct SecretValue {
    /// Vault reference the value was read from.
    pub name: String,

    /// Raw secret bytes.
    pub value: Vec<u8>,

    /// Backend version identifier (KV v2 metadata version).
    pub version: Option<String>,

    /// When this value was fetched.
    pub loaded_at: DateTime<Utc>,
}

impl std::fmt::Debug for SecretValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretValue")
            .field("name", &self.name)
            .field("value", &"[REDACTED]")
            .field("version", &self.version)
            .field("loaded_at", &self.loaded_at)
            .finish()
    }
}

impl SecretValue {
    /// Create a new `SecretValue`.
    pub fn new(name: impl Into<String>, value: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            value,
            version: None,
            loaded_at: Utc::now(),
        }
    }

    /// Raw bytes, e.g. for use as an HMAC key.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.value
    }

    /// Interpret the secret value as a UTF-8 string.
    pub fn as_str(&self) -> Result<&str, SecretError> {
        std::str::from_utf8(&self.value).map_err(|e| SecretError::InvalidValue {
            name: self.name.clone(),
            detail: format!("Not valid UTF-8: {e}"),
        })
    }
}

// ── SecretVault Trait ────────────────────────────────────────────────────

/// Storage for webhook signing secrets.
///
/// `put_secret` takes a logical key and returns an opaque reference; all
/// other operations take that reference. Callers must not assume any
/// relationship between the two beyond what the backend returns.
#[async_trait]
pub trait SecretVault: Send + Sync {
    /// Store `value` under `key`, overwriting any previous value, and return
    /// the reference to persist.
    async fn put_secret(&self, key: &str, value: &str) -> Result<String, SecretError>;

    /// Read a secret by reference.
    ///
    /// Returns `SecretError::NotFound` if nothing is stored there.
    async fn get_secret(&self, reference: &str) -> Result<SecretValue, SecretError>;

    /// Delete a secret and all of its versions. Deleting a missing secret
    /// succeeds.
    async fn delete_secret(&self, reference: &str) -> Result<(), SecretError>;

    /// Check if the vault is reachable and operational.
    async fn health_check(&self) -> Result<bool, SecretError>;

    /// Backend type name for logging/diagnostics.
    fn provider_type(&self) -> &'static str;
}

/// Reject keys that would escape the configured prefix or address nothing.
pub(crate) fn validate_key(key: &str) -> Result<(), SecretError> {
    let invalid = |detail: &str| SecretError::InvalidValue {
        name: key.to_string(),
        detail: detail.to_string(),
    };

    if key.trim().is_empty() {
        return Err(invalid("key must not be empty"));
    }
    if key.starts_with('/') || key.ends_with('/') {
        return Err(invalid("key must not start or end with '/'"));
    }
    if key.split('/').any(|seg| seg.is_empty() || seg == "." || seg == "..") {
        return Err(invalid("key contains an empty or relative path segment"));
    }
    Ok(())
}

// ── Factory ──────────────────────────────────────────────────────────────

/// Build the configured secret vault.
pub async fn build_vault(config: &SecretVaultConfig) -> Result<Arc<dyn SecretVault>, SecretError> {
    let vault: Arc<dyn SecretVault> = match config.backend {
        VaultBackend::Memory => {
            tracing::warn!("Using in-memory secret vault; secrets are lost on restart");
            Arc::new(MemorySecretVault::new(config.key_prefix.clone()))
        }
        VaultBackend::Vault => {
            let vault_config = config.vault.as_ref().ok_or(SecretError::ConfigError {
                detail: "Vault configuration is required when SECRET_VAULT=vault".to_string(),
            })?;
            Arc::new(VaultSecretVault::new(vault_config, &config.key_prefix).await?)
        }
    };

    tracing::info!(provider = vault.provider_type(), "Secret vault initialized");
    Ok(vault)
}
