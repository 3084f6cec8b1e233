//! Health check endpoint aggregating database and vault status.

use std::sync::Arc;
use std::time::Duration;

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use linky_db::DbPool;
use linky_secrets::SecretVault;
use serde::Serialize;
use tokio::time::timeout;
use utoipa::ToSchema;

const CHECK_TIMEOUT: Duration = Duration::from_secs(2);

/// Dependencies probed by `/health`.
#[derive(Clone)]
pub struct HealthState {
    /// `None` when running without a database, as in tests.
    pub pool: Option<DbPool>,
    pub vault: Arc<dyn SecretVault>,
}

/// Overall health status.
#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
}

/// Status of one dependency.
#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DependencyStatus {
    Up,
    Down,
    NotConfigured,
}

/// Health check response.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub version: String,
    pub database: DependencyStatus,
    pub vault: DependencyStatus,
}

/// Create health check routes.
pub fn health_routes(state: HealthState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .with_state(state)
}

/// Report service health. Degraded dependencies answer 503.
#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses(
        (status = 200, description = "All dependencies are up", body = HealthResponse),
        (status = 503, description = "A dependency is down", body = HealthResponse),
    )
)]
pub async fn health_handler(State(state): State<HealthState>) -> impl IntoResponse {
    let database = match &state.pool {
        Some(pool) => match timeout(CHECK_TIMEOUT, pool.ping()).await {
            Ok(true) => DependencyStatus::Up,
            Ok(false) | Err(_) => {
                tracing::warn!("Database health check failed");
                DependencyStatus::Down
            }
        },
        None => DependencyStatus::NotConfigured,
    };

    let vault = match timeout(CHECK_TIMEOUT, state.vault.health_check()).await {
        Ok(Ok(true)) => DependencyStatus::Up,
        Ok(Ok(false)) => {
            tracing::warn!(provider = state.vault.provider_type(), "Vault reports unhealthy");
            DependencyStatus::Down
        }
        Ok(Err(e)) => {
            tracing::warn!(provider = state.vault.provider_type(), error = %e, "Vault health check failed");
            DependencyStatus::Down
        }
        Err(_) => {
            tracing::warn!(provider = state.vault.provider_type(), "Vault health check timed out");
            DependencyStatus::Down
        }
    };

    let status = if database == DependencyStatus::Down || vault == DependencyStatus::Down {
        HealthStatus::Degraded
    } else {
        HealthStatus::Healthy
    };

    let status_code = match status {
        HealthStatus::Healthy => StatusCode::OK,
        HealthStatus::Degraded => StatusCode::SERVICE_UNAVAILABLE,
    };

    (
        status_code,
        Json(HealthResponse {
            status,
            version: env!("CARGO_PKG_VERSION").to_string(),
            database,
            vault,
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use linky_secrets::{MemorySecretVault, SecretError, SecretValue};
    use tower::ServiceExt;

    struct SealedVault;

    #[async_trait]
    impl SecretVault for SealedVault {
        async fn put_secret(&self, _key: &str, _value: &str) -> Result<String, SecretError> {
            Err(sealed())
        }

        async fn get_secret(&self, _reference: &str) -> Result<SecretValue, SecretError> {
            Err(sealed())
        }

        async fn delete_secret(&self, _reference: &str) -> Result<(), SecretError> {
            Err(sealed())
        }

        async fn health_check(&self) -> Result<bool, SecretError> {
            Err(sealed())
        }

        fn provider_type(&self) -> &'static str {
            "sealed"
        }
    }

    fn sealed() -> SecretError {
        SecretError::ProviderUnavailable {
            provider: "sealed".to_string(),
            detail: "vault is sealed".to_string(),
        }
    }

    async fn get_health(vault: Arc<dyn SecretVault>) -> (StatusCode, serde_json::Value) {
        let app = health_routes(HealthState { pool: None, vault });
        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_healthy_vault() {
        let (status, body) = get_health(Arc::new(MemorySecretVault::new("test"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["vault"], "up");
        assert_eq!(body["database"], "not_configured");
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn test_sealed_vault_is_degraded() {
        let (status, body) = get_health(Arc::new(SealedVault)).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["status"], "degraded");
        assert_eq!(body["vault"], "down");
    }
}
