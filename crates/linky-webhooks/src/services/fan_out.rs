//! Event fan-out: one pending delivery per matching active endpoint.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use linky_db::models::CreateWebhookDelivery;
use uuid::Uuid;

use crate::error::WebhookError;
use crate::models::WebhookEvent;
use crate::store::WebhookStore;
use crate::worker::{DeliveryJob, DeliveryQueue};

#[derive(Clone)]
pub struct FanOutService {
    store: Arc<dyn WebhookStore>,
    queue: DeliveryQueue,
}

impl FanOutService {
    #[must_use]
    pub fn new(store: Arc<dyn WebhookStore>, queue: DeliveryQueue) -> Self {
        Self { store, queue }
    }

    /// Create deliveries for every active endpoint of `owner_id` subscribed
    /// to the event's type and queue them. Returns the created delivery ids.
    ///
    /// A delivery that cannot be queued stays pending and can be retried by
    /// its owner; a delivery that cannot be created is logged and skipped.
    ///
    /// # Errors
    ///
    /// Fails only if the endpoint lookup or payload serialization fails.
    pub async fn emit(
        &self,
        owner_id: Uuid,
        event: &WebhookEvent,
        occurred_at: DateTime<Utc>,
    ) -> Result<Vec<Uuid>, WebhookError> {
        let event_type = event.event_type().as_str();

        let endpoints = self
            .store
            .find_active_endpoints_for_event(owner_id, event_type)
            .await?;

        if endpoints.is_empty() {
            tracing::debug!(
                target: "webhook_delivery",
                owner_id = %owner_id,
                event_type,
                "No matching webhook endpoints for event"
            );
            return Ok(Vec::new());
        }

        let payload = event
            .to_payload(occurred_at)
            .map_err(|e| WebhookError::Internal(format!("Failed to serialize event: {e}")))?;

        let mut created = Vec::with_capacity(endpoints.len());
        for endpoint in endpoints {
            let delivery = match self
                .store
                .create_delivery(CreateWebhookDelivery {
                    endpoint_id: endpoint.id,
                    event_type: event_type.to_string(),
                    payload: payload.clone(),
                })
                .await
            {
                Ok(d) => d,
                Err(e) => {
                    tracing::error!(
                        target: "webhook_delivery",
                        owner_id = %owner_id,
                        endpoint_id = %endpoint.id,
                        event_type,
                        error = %e,
                        "Failed to create delivery record"
                    );
                    continue;
                }
            };

            if let Err(e) = self.queue.enqueue(DeliveryJob {
                owner_id,
                delivery_id: delivery.id,
            }) {
                tracing::warn!(
                    target: "webhook_delivery",
                    delivery_id = %delivery.id,
                    endpoint_id = %endpoint.id,
                    event_type,
                    error = %e,
                    "Could not queue delivery, left pending"
                );
            }

            created.push(delivery.id);
        }

        tracing::debug!(
            target: "webhook_delivery",
            owner_id = %owner_id,
            event_type,
            deliveries = created.len(),
            "Event fanned out"
        );

        Ok(created)
    }
}
