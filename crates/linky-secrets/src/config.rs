//! Secret vault configuration parsed from environment variables.

use crate::SecretError;

/// Default KV v2 mount.
pub const DEFAULT_MOUNT: &str = "secret";

/// Default prefix for every webhook secret key.
pub const DEFAULT_KEY_PREFIX: &str = "linky/webhooks";

/// Which vault backend to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VaultBackend {
    /// Process-local map. Development and tests only.
    Memory,
    /// `HashiCorp` Vault KV v2.
    Vault,
}

impl VaultBackend {
    /// Parse from string value (case-insensitive).
    pub fn from_str_value(s: &str) -> Result<Self, SecretError> {
        match s.to_lowercase().as_str() {
            "memory" | "inmemory" => Ok(Self::Memory),
            "vault" | "hashicorp" => Ok(Self::Vault),
            other => Err(SecretError::ConfigError {
                detail: format!("Unknown SECRET_VAULT value '{other}'. Valid options: memory, vault"),
            }),
        }
    }
}

/// `HashiCorp` Vault authentication method.
#[derive(Clone)]
pub enum VaultAuthMethod {
    /// Machine-to-machine auth with `role_id` + `secret_id`.
    AppRole { role_id: String, secret_id: String },
    /// Direct token auth.
    Token { token: String },
}

impl std::fmt::Debug for VaultAuthMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AppRole { role_id, .. } => f
                .debug_struct("AppRole")
                .field("role_id", role_id)
                .field("secret_id", &"[REDACTED]")
                .finish(),
            Self::Token { .. } => f
                .debug_struct("Token")
                .field("token", &"[REDACTED]")
                .finish(),
        }
    }
}

/// Connection settings for `HashiCorp` Vault.
#[derive(Debug, Clone)]
pub struct VaultConfig {
    /// Vault server URL.
    pub address: String,
    /// Authentication method.
    pub auth_method: VaultAuthMethod,
    /// Vault namespace (Enterprise).
    pub namespace: Option<String>,
    /// KV v2 mount point.
    pub mount: String,
}

/// Complete secret vault configuration.
#[derive(Debug, Clone)]
pub struct SecretVaultConfig {
    pub backend: VaultBackend,
    /// Prefix prepended to every key passed to `put_secret`.
    pub key_prefix: String,
    /// Present when `backend` is `Vault`.
    pub vault: Option<VaultConfig>,
}

impl SecretVaultConfig {
    /// In-memory configuration with the given key prefix.
    pub fn memory(key_prefix: impl Into<String>) -> Self {
        Self {
            backend: VaultBackend::Memory,
            key_prefix: key_prefix.into(),
            vault: None,
        }
    }

    /// Parse configuration from process environment variables.
    ///
    /// Reads:
    /// - `SECRET_VAULT`: backend (default: "memory")
    /// - `VAULT_KEY_PREFIX`: key prefix (default: "linky/webhooks")
    /// - `VAULT_ADDR`, `VAULT_TOKEN` or `VAULT_ROLE_ID` + `VAULT_SECRET_ID`,
    ///   `VAULT_NAMESPACE`, `VAULT_MOUNT` when the backend is `vault`
    pub fn from_env() -> Result<Self, SecretError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Parse configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, SecretError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let backend = match get("SECRET_VAULT") {
            Some(s) => VaultBackend::from_str_value(&s)?,
            None => VaultBackend::Memory,
        };

        let key_prefix = get("VAULT_KEY_PREFIX")
            .map(|p| p.trim_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_KEY_PREFIX.to_string());

        let vault = if backend == VaultBackend::Vault {
            Some(Self::parse_vault_config(&get)?)
        } else {
            None
        };

        Ok(Self {
            backend,
            key_prefix,
            vault,
        })
    }

    fn parse_vault_config<F>(get: &F) -> Result<VaultConfig, SecretError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let address = get("VAULT_ADDR").ok_or(SecretError::ConfigError {
            detail: "VAULT_ADDR is required when SECRET_VAULT=vault".to_string(),
        })?;

        // AppRole wins when both credential sets are present.
        let auth_method = match (get("VAULT_ROLE_ID"), get("VAULT_SECRET_ID"), get("VAULT_TOKEN")) {
            (Some(role_id), Some(secret_id), _) => VaultAuthMethod::AppRole { role_id, secret_id },
            (Some(_), None, _) | (None, Some(_), _) => {
                return Err(SecretError::ConfigError {
                    detail: "VAULT_ROLE_ID and VAULT_SECRET_ID must be set together".to_string(),
                });
            }
            (None, None, Some(token)) => VaultAuthMethod::Token { token },
            (None, None, None) => {
                return Err(SecretError::ConfigError {
                    detail: "VAULT_TOKEN or VAULT_ROLE_ID/VAULT_SECRET_ID is required when SECRET_VAULT=vault"
                        .to_string(),
                });
            }
        };

        let mount = get("VAULT_MOUNT")
            .map(|m| m.trim_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_MOUNT.to_string());

        Ok(VaultConfig {
            address,
            auth_method,
            namespace: get("VAULT_NAMESPACE"),
            mount,
        })
    }
}
