//! Persistence seam for endpoints and deliveries.
//!
//! Every endpoint operation is scoped by owner; a delivery is visible only
//! through an endpoint its caller owns.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use linky_db::models::{
    AttemptResult, CreateWebhookDelivery, CreateWebhookEndpoint, RecentDeliveriesFilter,
    UpdateWebhookEndpoint, WebhookDelivery, WebhookEndpoint,
};
use linky_db::DbError;
use uuid::Uuid;

pub use memory::InMemoryWebhookStore;
pub use postgres::PgWebhookStore;

#[async_trait]
pub trait WebhookStore: Send + Sync {
    async fn create_endpoint(&self, input: CreateWebhookEndpoint)
        -> Result<WebhookEndpoint, DbError>;

    async fn find_endpoint(
        &self,
        owner_id: Uuid,
        id: Uuid,
    ) -> Result<Option<WebhookEndpoint>, DbError>;

    /// Newest first.
    async fn list_endpoints(&self, owner_id: Uuid) -> Result<Vec<WebhookEndpoint>, DbError>;

    async fn find_active_endpoints_for_event(
        &self,
        owner_id: Uuid,
        event_type: &str,
    ) -> Result<Vec<WebhookEndpoint>, DbError>;

    async fn update_endpoint(
        &self,
        owner_id: Uuid,
        id: Uuid,
        input: UpdateWebhookEndpoint,
    ) -> Result<Option<WebhookEndpoint>, DbError>;

    /// Removes the endpoint and all of its deliveries.
    async fn delete_endpoint(&self, owner_id: Uuid, id: Uuid) -> Result<bool, DbError>;

    async fn create_delivery(&self, input: CreateWebhookDelivery)
        -> Result<WebhookDelivery, DbError>;

    async fn find_delivery(
        &self,
        owner_id: Uuid,
        id: Uuid,
    ) -> Result<Option<WebhookDelivery>, DbError>;

    /// Newest first, at most `limit`.
    async fn list_deliveries_for_endpoint(
        &self,
        owner_id: Uuid,
        endpoint_id: Uuid,
        limit: i64,
    ) -> Result<Vec<WebhookDelivery>, DbError>;

    /// One atomic write: `attempts + 1` and the outcome columns together.
    async fn record_attempt(
        &self,
        id: Uuid,
        result: &AttemptResult,
    ) -> Result<Option<WebhookDelivery>, DbError>;

    /// Clear outcome columns and set `attempts` to zero.
    async fn reset_delivery(&self, id: Uuid) -> Result<Option<WebhookDelivery>, DbError>;

    /// Across all of an owner's endpoints, newest first.
    async fn list_recent_deliveries(
        &self,
        owner_id: Uuid,
        filter: &RecentDeliveriesFilter,
    ) -> Result<Vec<WebhookDelivery>, DbError>;
}
