//! Read-only view of login sessions.
//!
//! Sessions are issued by the authentication service; this crate only
//! resolves a presented token to the user it belongs to.

use sqlx::PgPool;
use uuid::Uuid;

/// Session lookups.
pub struct Session;

impl Session {
    /// Resolve an unexpired session token to its user id.
    pub async fn find_user_by_token(
        pool: &PgPool,
        session_token: &str,
    ) -> Result<Option<Uuid>, sqlx::Error> {
        sqlx::query_scalar(
            r#"
            SELECT user_id FROM sessions
            WHERE session_token = $1 AND expires > NOW()
            "#,
        )
        .bind(session_token)
        .fetch_optional(pool)
        .await
    }
}
