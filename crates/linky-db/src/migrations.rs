//! Database migration management.
//!
//! Provides functions to run the versioned SQL migrations embedded from the
//! `migrations/` directory.

use crate::error::DbError;
use crate::pool::DbPool;

/// Run all pending database migrations.
///
/// Migrations are embedded at compile time and applied in filename order.
///
/// ```rust,ignore
/// use linky_db::{DbPool, run_migrations};
///
/// let pool = DbPool::connect("postgres://localhost/linky", 10).await?;
/// run_migrations(&pool).await?;
/// ```
///
/// # Errors
///
/// Returns `DbError::MigrationFailed` if any migration fails to apply.
pub async fn run_migrations(pool: &DbPool) -> Result<(), DbError> {
    tracing::info!("Running database migrations...");

    sqlx::migrate!("./migrations")
        .run(pool.inner())
        .await
        .map_err(DbError::MigrationFailed)?;

    tracing::info!("Migrations completed successfully");
    Ok(())
}
