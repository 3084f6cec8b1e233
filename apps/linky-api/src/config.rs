//! Application configuration loaded from environment variables.
//!
//! Loading is fail-fast: a missing required variable or an unparsable value
//! stops startup with a message naming the variable.

use std::time::Duration;

use linky_secrets::{SecretVaultConfig, VaultBackend};
use linky_webhooks::validation::UrlPolicy;
use linky_webhooks::WebhookConfig;
use thiserror::Error;

use crate::logging::LogFormat;

/// Application environment mode.
///
/// Production refuses the development-only relaxations: the in-memory vault
/// and the permissive endpoint URL policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Production,
}

impl AppEnvironment {
    /// Parse from the `APP_ENV` value. Defaults to `Development`.
    pub fn from_env_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            "development" | "dev" => Self::Development,
            other => {
                tracing::warn!(
                    value = other,
                    "Unrecognized APP_ENV value, defaulting to Development"
                );
                Self::Development
            }
        }
    }

    #[must_use]
    pub fn is_production(&self) -> bool {
        *self == Self::Production
    }
}

impl std::fmt::Display for AppEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Development => write!(f, "development"),
            Self::Production => write!(f, "production"),
        }
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(String),

    #[error("Invalid value for {var}: {message}")]
    InvalidValue { var: String, message: String },
}

impl ConfigError {
    fn invalid(var: &str, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            var: var.to_string(),
            message: message.into(),
        }
    }
}

/// Full application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub app_env: AppEnvironment,
    pub database_url: String,
    pub database_max_connections: u32,
    pub host: String,
    pub port: u16,
    pub log_filter: String,
    pub log_format: LogFormat,
    pub webhooks: WebhookConfig,
    pub secrets: SecretVaultConfig,
}

impl Config {
    /// Load configuration from the process environment.
    ///
    /// A `.env` file in the working directory (or an ancestor) is loaded
    /// first. Variables already set in the environment take precedence.
    ///
    /// # Errors
    ///
    /// See [`Config::from_lookup`].
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - `DATABASE_URL` is missing
    /// - a numeric or boolean variable does not parse
    /// - the vault backend is unknown or lacks credentials
    /// - production is combined with the memory vault or a relaxed URL policy
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let app_env = get("APP_ENV")
            .map(|v| AppEnvironment::from_env_str(&v))
            .unwrap_or(AppEnvironment::Development);

        let database_url =
            get("DATABASE_URL").ok_or_else(|| ConfigError::MissingVar("DATABASE_URL".into()))?;

        let defaults = WebhookConfig::default();
        let url_policy = UrlPolicy {
            allow_http: parse_bool(&get, "WEBHOOK_ALLOW_HTTP", false)?,
            allow_internal_hosts: parse_bool(&get, "WEBHOOK_ALLOW_INTERNAL_HOSTS", false)?,
        };

        let webhooks = WebhookConfig {
            delivery_timeout: parse_secs(
                &get,
                "WEBHOOK_DELIVERY_TIMEOUT_SECS",
                defaults.delivery_timeout,
            )?,
            vault_timeout: parse_secs(&get, "WEBHOOK_VAULT_TIMEOUT_SECS", defaults.vault_timeout)?,
            response_body_limit: parse_num(
                &get,
                "WEBHOOK_RESPONSE_BODY_LIMIT",
                defaults.response_body_limit,
            )?,
            worker_count: parse_positive(&get, "WEBHOOK_WORKER_COUNT", defaults.worker_count)?,
            queue_capacity: parse_positive(&get, "WEBHOOK_QUEUE_CAPACITY", defaults.queue_capacity)?,
            event_queue_capacity: parse_positive(
                &get,
                "WEBHOOK_EVENT_QUEUE_CAPACITY",
                defaults.event_queue_capacity,
            )?,
            url_policy,
            ..defaults
        };

        let secrets = SecretVaultConfig::from_lookup(&get)
            .map_err(|e| ConfigError::invalid("SECRET_VAULT", e.to_string()))?;

        if app_env.is_production() {
            if secrets.backend == VaultBackend::Memory {
                return Err(ConfigError::invalid(
                    "SECRET_VAULT",
                    "production requires SECRET_VAULT=vault",
                ));
            }
            if url_policy.allow_http {
                return Err(ConfigError::invalid(
                    "WEBHOOK_ALLOW_HTTP",
                    "must not be enabled in production",
                ));
            }
            if url_policy.allow_internal_hosts {
                return Err(ConfigError::invalid(
                    "WEBHOOK_ALLOW_INTERNAL_HOSTS",
                    "must not be enabled in production",
                ));
            }
        }

        Ok(Self {
            app_env,
            database_url,
            database_max_connections: parse_positive(&get, "DATABASE_MAX_CONNECTIONS", 10)?,
            host: get("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_num(&get, "PORT", 8080)?,
            log_filter: get("RUST_LOG").unwrap_or_else(|| "info,linky=debug".to_string()),
            log_format: get("LOG_FORMAT")
                .map(|v| LogFormat::from_env_str(&v))
                .unwrap_or(LogFormat::Json),
            webhooks,
            secrets,
        })
    }

    /// `host:port` for the listener.
    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_num<F, T>(get: &F, var: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match get(var) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e: T::Err| ConfigError::invalid(var, e.to_string())),
        None => Ok(default),
    }
}

fn parse_positive<F, T>(get: &F, var: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr + PartialOrd + Default,
    T::Err: std::fmt::Display,
{
    let value = parse_num(get, var, default)?;
    if value <= T::default() {
        return Err(ConfigError::invalid(var, "must be greater than zero"));
    }
    Ok(value)
}

fn parse_secs<F>(get: &F, var: &str, default: Duration) -> Result<Duration, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let secs = parse_positive(get, var, default.as_secs())?;
    Ok(Duration::from_secs(secs))
}

fn parse_bool<F>(get: &F, var: &str, default: bool) -> Result<bool, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match get(var).map(|v| v.trim().to_lowercase()) {
        None => Ok(default),
        Some(v) => match v.as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::invalid(var, format!("'{v}' is not a boolean"))),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    const DB: (&str, &str) = ("DATABASE_URL", "postgres://localhost/linky");

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&[DB])).unwrap();
        assert_eq!(config.app_env, AppEnvironment::Development);
        assert_eq!(config.port, 8080);
        assert_eq!(config.bind_address(), "0.0.0.0:8080");
        assert_eq!(config.database_max_connections, 10);
        assert_eq!(config.log_filter, "info,linky=debug");
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.webhooks.delivery_timeout, Duration::from_secs(10));
        assert_eq!(config.webhooks.vault_timeout, Duration::from_secs(5));
        assert_eq!(config.webhooks.response_body_limit, 2048);
        assert_eq!(config.webhooks.worker_count, 4);
        assert_eq!(config.webhooks.queue_capacity, 1024);
        assert_eq!(config.webhooks.url_policy, UrlPolicy::strict());
        assert_eq!(config.secrets.backend, VaultBackend::Memory);
    }

    #[test]
    fn test_missing_database_url() {
        let err = Config::from_lookup(lookup(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingVar(ref v) if v == "DATABASE_URL"));
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup(&[
            DB,
            ("PORT", "9000"),
            ("WEBHOOK_DELIVERY_TIMEOUT_SECS", "3"),
            ("WEBHOOK_WORKER_COUNT", "8"),
            ("WEBHOOK_ALLOW_HTTP", "true"),
            ("LOG_FORMAT", "pretty"),
        ]))
        .unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.webhooks.delivery_timeout, Duration::from_secs(3));
        assert_eq!(config.webhooks.worker_count, 8);
        assert!(config.webhooks.url_policy.allow_http);
        assert!(!config.webhooks.url_policy.allow_internal_hosts);
        assert_eq!(config.log_format, LogFormat::Pretty);
    }

    #[test]
    fn test_invalid_numbers_are_rejected() {
        for (var, value) in [
            ("PORT", "eighty"),
            ("WEBHOOK_WORKER_COUNT", "0"),
            ("WEBHOOK_DELIVERY_TIMEOUT_SECS", "-1"),
            ("WEBHOOK_ALLOW_HTTP", "maybe"),
        ] {
            let err = Config::from_lookup(lookup(&[DB, (var, value)])).unwrap_err();
            assert!(
                matches!(err, ConfigError::InvalidValue { var: ref v, .. } if v == var),
                "{var}={value} should be rejected"
            );
        }
    }

    #[test]
    fn test_from_env_loads_dotenv_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(".env"),
            "DATABASE_URL=postgres://localhost/linky_dotenv\nWEBHOOK_WORKER_COUNT=7\n",
        )
        .unwrap();

        let previous = std::env::current_dir().unwrap();
        std::env::set_current_dir(dir.path()).unwrap();
        let result = Config::from_env();
        std::env::set_current_dir(previous).unwrap();

        // The file fills in whatever the environment leaves unset.
        let config = result.unwrap();
        assert_eq!(std::env::var("DATABASE_URL").unwrap(), config.database_url);
        assert_eq!(
            std::env::var("WEBHOOK_WORKER_COUNT").unwrap(),
            config.webhooks.worker_count.to_string()
        );
    }

    #[test]
    fn test_unknown_vault_backend() {
        let err = Config::from_lookup(lookup(&[DB, ("SECRET_VAULT", "aws")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn test_production_requires_vault_backend() {
        let err = Config::from_lookup(lookup(&[DB, ("APP_ENV", "production")])).unwrap_err();
        assert!(err.to_string().contains("SECRET_VAULT"));
    }

    #[test]
    fn test_production_forbids_relaxed_url_policy() {
        let vault = [
            DB,
            ("APP_ENV", "production"),
            ("SECRET_VAULT", "vault"),
            ("VAULT_ADDR", "https://vault.internal:8200"),
            ("VAULT_TOKEN", "s.token"),
        ];
        assert!(Config::from_lookup(lookup(&vault)).is_ok());

        let mut with_http = vault.to_vec();
        with_http.push(("WEBHOOK_ALLOW_HTTP", "true"));
        assert!(Config::from_lookup(lookup(&with_http)).is_err());

        let mut with_internal = vault.to_vec();
        with_internal.push(("WEBHOOK_ALLOW_INTERNAL_HOSTS", "1"));
        assert!(Config::from_lookup(lookup(&with_internal)).is_err());
    }
}
