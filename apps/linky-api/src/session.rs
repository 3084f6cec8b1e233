//! Postgres-backed session verification.

use async_trait::async_trait;
use linky_db::models::session::Session;
use linky_db::DbPool;
use linky_webhooks::{SessionVerifier, WebhookError};
use uuid::Uuid;

/// Resolves session tokens against the `sessions` table.
#[derive(Debug, Clone)]
pub struct PgSessionVerifier {
    pool: DbPool,
}

impl PgSessionVerifier {
    #[must_use]
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionVerifier for PgSessionVerifier {
    async fn verify(&self, token: &str) -> Result<Option<Uuid>, WebhookError> {
        Session::find_user_by_token(self.pool.inner(), token)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Session lookup failed");
                WebhookError::from(e)
            })
    }
}
