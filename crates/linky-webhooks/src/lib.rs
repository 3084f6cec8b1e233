//! Outbound webhooks for Linky.
//!
//! Owner-scoped endpoint registration with vault-held signing secrets,
//! fire-and-forget event fan-out, HMAC-SHA256 signed delivery through a
//! bounded worker pool, manual retry, and a polling feed for pull-based
//! integrations.

pub mod auth;
pub mod config;
pub mod crypto;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod models;
pub mod router;
pub mod runtime;
pub mod services;
pub mod store;
pub mod transport;
pub mod validation;
pub mod worker;

pub use auth::{OwnerId, SessionVerifier};
pub use config::WebhookConfig;
pub use error::{DeliveryFailure, WebhookError};
pub use metrics::{DeliveryMetrics, DeliveryOutcome};
pub use models::{WebhookEvent, WebhookEventType};
pub use router::{webhooks_router, WebhooksState};
pub use runtime::WebhookRuntime;
pub use services::event_publisher::EventPublisher;
pub use store::{InMemoryWebhookStore, PgWebhookStore, WebhookStore};
pub use transport::{ReqwestTransport, WebhookTransport};
pub use worker::{DeliveryJob, DeliveryQueue, WebhookWorker};
