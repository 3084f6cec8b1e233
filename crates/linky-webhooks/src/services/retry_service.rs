//! Manual retry of a delivery.
//!
//! Two retries racing on the same delivery both reset the row and both
//! queue an attempt. Nothing serializes them.

use std::sync::Arc;

use uuid::Uuid;

use crate::error::WebhookError;
use crate::models::RetryResponse;
use crate::store::WebhookStore;
use crate::worker::{DeliveryJob, DeliveryQueue};

#[derive(Clone)]
pub struct RetryService {
    store: Arc<dyn WebhookStore>,
    queue: DeliveryQueue,
}

impl RetryService {
    #[must_use]
    pub fn new(store: Arc<dyn WebhookStore>, queue: DeliveryQueue) -> Self {
        Self { store, queue }
    }

    /// Reset the delivery and queue a fresh attempt. The caller gets an
    /// acknowledgement, not the outcome.
    ///
    /// # Errors
    ///
    /// `DeliveryNotFound` when the delivery is missing or belongs to another
    /// owner, `QueueFull` when the delivery queue is saturated. In the latter
    /// case the row stays reset and pending.
    pub async fn retry(
        &self,
        owner_id: Uuid,
        delivery_id: Uuid,
    ) -> Result<RetryResponse, WebhookError> {
        self.store
            .find_delivery(owner_id, delivery_id)
            .await?
            .ok_or(WebhookError::DeliveryNotFound)?;

        self.store
            .reset_delivery(delivery_id)
            .await?
            .ok_or(WebhookError::DeliveryNotFound)?;

        self.queue.enqueue(DeliveryJob {
            owner_id,
            delivery_id,
        })?;

        tracing::info!(
            target: "webhook_delivery",
            owner_id = %owner_id,
            delivery_id = %delivery_id,
            "Delivery reset and queued for retry"
        );

        Ok(RetryResponse {
            delivery_id,
            status: "queued".to_string(),
            message: "Delivery has been reset and queued for another attempt".to_string(),
        })
    }
}
