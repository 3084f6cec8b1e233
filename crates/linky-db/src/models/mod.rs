//! Row models and their queries.

pub mod session;
pub mod webhook_delivery;
pub mod webhook_endpoint;

pub use session::Session;
pub use webhook_delivery::{
    AttemptResult, CreateWebhookDelivery, RecentDeliveriesFilter, WebhookDelivery,
};
pub use webhook_endpoint::{CreateWebhookEndpoint, UpdateWebhookEndpoint, WebhookEndpoint};
