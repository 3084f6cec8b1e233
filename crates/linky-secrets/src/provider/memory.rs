//! In-memory secret vault.
//!
//! Secrets live only as long as the process. Suitable for development and
//! tests; production configuration refuses it.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{validate_key, SecretError, SecretValue, SecretVault};

/// Vault backed by a process-local map.
#[derive(Debug, Default)]
pub struct MemorySecretVault {
    key_prefix: String,
    entries: RwLock<HashMap<String, String>>,
}

impl MemorySecretVault {
    /// Create an empty vault that prefixes every key with `key_prefix`.
    pub fn new(key_prefix: impl Into<String>) -> Self {
        Self {
            key_prefix: key_prefix.into().trim_matches('/').to_string(),
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Number of stored secrets.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Whether no secret is stored.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Whether a secret exists under `reference`.
    pub async fn contains(&self, reference: &str) -> bool {
        self.entries.read().await.contains_key(reference)
    }

    fn reference_for(&self, key: &str) -> String {
        if self.key_prefix.is_empty() {
            key.to_string()
        } else {
            format!("{}/{}", self.key_prefix, key)
        }
    }
}

#[async_trait]
impl SecretVault for MemorySecretVault {
    async fn put_secret(&self, key: &str, value: &str) -> Result<String, SecretError> {
        validate_key(key)?;
        let reference = self.reference_for(key);
        self.entries
            .write()
            .await
            .insert(reference.clone(), value.to_string());
        Ok(reference)
    }

    async fn get_secret(&self, reference: &str) -> Result<SecretValue, SecretError> {
        let entries = self.entries.read().await;
        entries
            .get(reference)
            .map(|v| SecretValue::new(reference, v.as_bytes().to_vec()))
            .ok_or_else(|| SecretError::NotFound {
                name: reference.to_string(),
            })
    }

    async fn delete_secret(&self, reference: &str) -> Result<(), SecretError> {
        self.entries.write().await.remove(reference);
        Ok(())
    }

    async fn health_check(&self) -> Result<bool, SecretError> {
        Ok(true)
    }

    fn provider_type(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_get_delete() {
        let vault = MemorySecretVault::new("linky/webhooks");

        let reference = vault.put_secret("owner-1/endpoint-1", "abc").await.unwrap();
        assert_eq!(reference, "linky/webhooks/owner-1/endpoint-1");

        let secret = vault.get_secret(&reference).await.unwrap();
        assert_eq!(secret.as_str().unwrap(), "abc");
        assert_eq!(secret.name, reference);

        vault.delete_secret(&reference).await.unwrap();
        assert!(matches!(
            vault.get_secret(&reference).await,
            Err(SecretError::NotFound { .. })
        ));
        assert!(vault.is_empty().await);
    }

    #[tokio::test]
    async fn test_put_overwrites() {
        let vault = MemorySecretVault::new("");
        let r1 = vault.put_secret("k", "one").await.unwrap();
        let r2 = vault.put_secret("k", "two").await.unwrap();
        assert_eq!(r1, r2);
        assert_eq!(vault.len().await, 1);
        assert_eq!(vault.get_secret(&r1).await.unwrap().as_str().unwrap(), "two");
    }

    #[tokio::test]
    async fn test_delete_missing_is_ok() {
        let vault = MemorySecretVault::new("p");
        assert!(vault.delete_secret("p/nothing").await.is_ok());
    }

    #[tokio::test]
    async fn test_rejects_relative_keys() {
        let vault = MemorySecretVault::new("p");
        let err = vault.put_secret("../escape", "x").await.unwrap_err();
        assert!(matches!(err, SecretError::InvalidValue { .. }));
    }
}
