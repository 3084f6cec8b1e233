//! Postgres persistence for Linky webhooks.
//!
//! Holds the `webhook_endpoints` and `webhook_deliveries` row models, the
//! read-only session lookup used for request authentication, and the embedded
//! migrations.

pub mod error;
pub mod migrations;
pub mod models;
pub mod pool;

pub use error::DbError;
pub use migrations::run_migrations;
pub use pool::DbPool;
