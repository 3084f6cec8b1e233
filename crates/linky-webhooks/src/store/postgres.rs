//! Postgres-backed store.

use async_trait::async_trait;
use linky_db::models::{
    AttemptResult, CreateWebhookDelivery, CreateWebhookEndpoint, RecentDeliveriesFilter,
    UpdateWebhookEndpoint, WebhookDelivery, WebhookEndpoint,
};
use linky_db::{DbError, DbPool};
use sqlx::PgPool;
use uuid::Uuid;

use super::WebhookStore;

#[derive(Clone)]
pub struct PgWebhookStore {
    pool: PgPool,
}

impl PgWebhookStore {
    #[must_use]
    pub fn new(pool: &DbPool) -> Self {
        Self {
            pool: pool.inner().clone(),
        }
    }
}

#[async_trait]
impl WebhookStore for PgWebhookStore {
    async fn create_endpoint(
        &self,
        input: CreateWebhookEndpoint,
    ) -> Result<WebhookEndpoint, DbError> {
        Ok(WebhookEndpoint::create(&self.pool, input).await?)
    }

    async fn find_endpoint(
        &self,
        owner_id: Uuid,
        id: Uuid,
    ) -> Result<Option<WebhookEndpoint>, DbError> {
        Ok(WebhookEndpoint::find_by_id(&self.pool, owner_id, id).await?)
    }

    async fn list_endpoints(&self, owner_id: Uuid) -> Result<Vec<WebhookEndpoint>, DbError> {
        Ok(WebhookEndpoint::list_by_owner(&self.pool, owner_id).await?)
    }

    async fn find_active_endpoints_for_event(
        &self,
        owner_id: Uuid,
        event_type: &str,
    ) -> Result<Vec<WebhookEndpoint>, DbError> {
        Ok(WebhookEndpoint::find_active_by_event_type(&self.pool, owner_id, event_type).await?)
    }

    async fn update_endpoint(
        &self,
        owner_id: Uuid,
        id: Uuid,
        input: UpdateWebhookEndpoint,
    ) -> Result<Option<WebhookEndpoint>, DbError> {
        Ok(WebhookEndpoint::update(&self.pool, owner_id, id, input).await?)
    }

    async fn delete_endpoint(&self, owner_id: Uuid, id: Uuid) -> Result<bool, DbError> {
        Ok(WebhookEndpoint::delete(&self.pool, owner_id, id).await?)
    }

    async fn create_delivery(
        &self,
        input: CreateWebhookDelivery,
    ) -> Result<WebhookDelivery, DbError> {
        Ok(WebhookDelivery::create(&self.pool, input).await?)
    }

    async fn find_delivery(
        &self,
        owner_id: Uuid,
        id: Uuid,
    ) -> Result<Option<WebhookDelivery>, DbError> {
        Ok(WebhookDelivery::find_for_owner(&self.pool, owner_id, id).await?)
    }

    async fn list_deliveries_for_endpoint(
        &self,
        owner_id: Uuid,
        endpoint_id: Uuid,
        limit: i64,
    ) -> Result<Vec<WebhookDelivery>, DbError> {
        Ok(WebhookDelivery::list_by_endpoint(&self.pool, owner_id, endpoint_id, limit).await?)
    }

    async fn record_attempt(
        &self,
        id: Uuid,
        result: &AttemptResult,
    ) -> Result<Option<WebhookDelivery>, DbError> {
        Ok(WebhookDelivery::record_attempt(&self.pool, id, result).await?)
    }

    async fn reset_delivery(&self, id: Uuid) -> Result<Option<WebhookDelivery>, DbError> {
        Ok(WebhookDelivery::reset(&self.pool, id).await?)
    }

    async fn list_recent_deliveries(
        &self,
        owner_id: Uuid,
        filter: &RecentDeliveriesFilter,
    ) -> Result<Vec<WebhookDelivery>, DbError> {
        Ok(WebhookDelivery::list_recent_for_owner(&self.pool, owner_id, filter).await?)
    }
}
