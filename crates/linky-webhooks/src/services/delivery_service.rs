//! Webhook delivery execution service.
//!
//! One call performs exactly one attempt: read the endpoint secret from the
//! vault, sign the stored payload, POST it, and record the outcome with a
//! single row update. Failures end up in the delivery row and never reach
//! the code that emitted the event.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use linky_db::models::{AttemptResult, WebhookDelivery, WebhookEndpoint};
use linky_secrets::SecretVault;

use crate::config::WebhookConfig;
use crate::crypto;
use crate::error::{DeliveryFailure, WebhookError};
use crate::metrics::{DeliveryMetrics, DeliveryOutcome};
use crate::store::WebhookStore;
use crate::transport::{OutboundRequest, TransportResponse, WebhookTransport};
use crate::worker::DeliveryJob;

pub const HEADER_SIGNATURE: &str = "X-Webhook-Signature";
pub const HEADER_EVENT: &str = "X-Webhook-Event";
pub const HEADER_DELIVERY: &str = "X-Webhook-Delivery";

/// Service for webhook delivery attempts.
#[derive(Clone)]
pub struct DeliveryService {
    store: Arc<dyn WebhookStore>,
    vault: Arc<dyn SecretVault>,
    transport: Arc<dyn WebhookTransport>,
    metrics: Arc<DeliveryMetrics>,
    vault_timeout: Duration,
}

impl DeliveryService {
    #[must_use]
    pub fn new(
        store: Arc<dyn WebhookStore>,
        vault: Arc<dyn SecretVault>,
        transport: Arc<dyn WebhookTransport>,
        config: &WebhookConfig,
    ) -> Self {
        Self {
            store,
            vault,
            transport,
            metrics: Arc::new(DeliveryMetrics::new()),
            vault_timeout: config.vault_timeout,
        }
    }

    /// Count attempt outcomes into shared counters.
    #[must_use]
    pub fn with_metrics(mut self, metrics: Arc<DeliveryMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Run a queued job. Looks the delivery and its endpoint up again, so a
    /// job for a deleted endpoint is dropped quietly.
    pub async fn run_job(&self, job: DeliveryJob) {
        let delivery = match self.store.find_delivery(job.owner_id, job.delivery_id).await {
            Ok(Some(d)) => d,
            Ok(None) => {
                tracing::debug!(
                    target: "webhook_delivery",
                    delivery_id = %job.delivery_id,
                    "Delivery no longer exists, skipping"
                );
                return;
            }
            Err(e) => {
                tracing::error!(
                    target: "webhook_delivery",
                    delivery_id = %job.delivery_id,
                    error = %e,
                    "Failed to load delivery"
                );
                return;
            }
        };

        let endpoint = match self
            .store
            .find_endpoint(job.owner_id, delivery.endpoint_id)
            .await
        {
            Ok(Some(ep)) => ep,
            Ok(None) => {
                tracing::debug!(
                    target: "webhook_delivery",
                    delivery_id = %delivery.id,
                    endpoint_id = %delivery.endpoint_id,
                    "Endpoint no longer exists, skipping delivery"
                );
                return;
            }
            Err(e) => {
                tracing::error!(
                    target: "webhook_delivery",
                    delivery_id = %delivery.id,
                    error = %e,
                    "Failed to load endpoint for delivery"
                );
                return;
            }
        };

        if let Err(e) = self.deliver(&delivery, &endpoint).await {
            tracing::error!(
                target: "webhook_delivery",
                delivery_id = %delivery.id,
                error = %e,
                "Failed to record delivery attempt"
            );
        }
    }

    /// Perform one attempt and persist it.
    ///
    /// # Errors
    ///
    /// Only a failure to write the outcome is returned. Vault, network and
    /// receiver failures are recorded on the row.
    pub async fn deliver(
        &self,
        delivery: &WebhookDelivery,
        endpoint: &WebhookEndpoint,
    ) -> Result<WebhookDelivery, WebhookError> {
        let started = Instant::now();
        let result = match self.attempt(delivery, endpoint).await {
            Ok(response) => {
                tracing::info!(
                    target: "webhook_delivery",
                    delivery_id = %delivery.id,
                    endpoint_id = %endpoint.id,
                    event_type = %delivery.event_type,
                    status_code = response.status,
                    latency_ms = started.elapsed().as_millis() as u64,
                    "Webhook delivered"
                );
                self.metrics.record(DeliveryOutcome::Completed);
                AttemptResult::Completed {
                    status_code: i16::try_from(response.status).unwrap_or(i16::MAX),
                    response: response.body,
                    delivered_at: Utc::now(),
                }
            }
            Err(failure) => {
                tracing::warn!(
                    target: "webhook_delivery",
                    delivery_id = %delivery.id,
                    endpoint_id = %endpoint.id,
                    event_type = %delivery.event_type,
                    error = %failure,
                    "Webhook delivery attempt failed"
                );
                self.metrics.record(DeliveryOutcome::from_failure(&failure));
                AttemptResult::Failed {
                    error: failure.to_string(),
                }
            }
        };

        let updated = self
            .store
            .record_attempt(delivery.id, &result)
            .await?
            .ok_or(WebhookError::DeliveryNotFound)?;

        tracing::debug!(
            target: "webhook_delivery",
            delivery_id = %updated.id,
            attempts = updated.attempts,
            "Delivery attempt recorded"
        );

        Ok(updated)
    }

    async fn attempt(
        &self,
        delivery: &WebhookDelivery,
        endpoint: &WebhookEndpoint,
    ) -> Result<TransportResponse, DeliveryFailure> {
        let secret = match tokio::time::timeout(
            self.vault_timeout,
            self.vault.get_secret(&endpoint.secret_ref),
        )
        .await
        {
            Ok(Ok(secret)) => secret,
            Ok(Err(e)) => return Err(DeliveryFailure::VaultUnavailable(e.to_string())),
            Err(_) => {
                return Err(DeliveryFailure::VaultUnavailable(format!(
                    "secret read timed out after {}ms",
                    self.vault_timeout.as_millis()
                )))
            }
        };

        let body = serde_json::to_vec(&delivery.payload)
            .map_err(|e| DeliveryFailure::Serialization(e.to_string()))?;
        let signature = crypto::signature_header(secret.as_bytes(), &body);

        let request = OutboundRequest {
            url: endpoint.url.clone(),
            headers: vec![
                ("Content-Type", "application/json".to_string()),
                (HEADER_SIGNATURE, signature),
                (HEADER_EVENT, delivery.event_type.clone()),
                (HEADER_DELIVERY, delivery.id.to_string()),
            ],
            body,
        };

        self.transport.post(request).await
    }
}
