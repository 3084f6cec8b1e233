//! Wiring of the dispatch pipeline.
//!
//! ```text
//! EventPublisher -> fan-out task -> DeliveryQueue -> WebhookWorker x N
//! ```
//!
//! The runtime owns the background tasks; the router state it hands out only
//! holds the queue's sending side.

use std::sync::Arc;

use linky_secrets::SecretVault;
use tokio::task::JoinHandle;

use crate::config::WebhookConfig;
use crate::metrics::DeliveryMetrics;
use crate::router::WebhooksState;
use crate::services::delivery_service::DeliveryService;
use crate::services::endpoint_service::EndpointService;
use crate::services::event_publisher::{spawn_fan_out, EventPublisher};
use crate::services::fan_out::FanOutService;
use crate::services::polling_service::PollingService;
use crate::services::retry_service::RetryService;
use crate::store::WebhookStore;
use crate::transport::WebhookTransport;
use crate::worker::{DeliveryQueue, WebhookWorker};

pub struct WebhookRuntime {
    publisher: EventPublisher,
    state: WebhooksState,
    worker: WebhookWorker,
    fan_out_task: JoinHandle<()>,
    metrics: Arc<DeliveryMetrics>,
    config: WebhookConfig,
}

impl WebhookRuntime {
    /// Start the fan-out task and the delivery workers.
    #[must_use]
    pub fn start(
        store: Arc<dyn WebhookStore>,
        vault: Arc<dyn SecretVault>,
        transport: Arc<dyn WebhookTransport>,
        config: WebhookConfig,
    ) -> Self {
        let (queue, job_rx) = DeliveryQueue::new(config.queue_capacity);
        let (publisher, event_rx) = EventPublisher::new(config.event_queue_capacity);

        let metrics = Arc::new(DeliveryMetrics::new());
        let delivery_service = Arc::new(
            DeliveryService::new(store.clone(), vault.clone(), transport, &config)
                .with_metrics(metrics.clone()),
        );
        let worker = WebhookWorker::start(delivery_service, job_rx, config.worker_count);

        let fan_out_task = spawn_fan_out(event_rx, FanOutService::new(store.clone(), queue.clone()));

        let state = WebhooksState {
            endpoint_service: Arc::new(EndpointService::new(store.clone(), vault, &config)),
            retry_service: Arc::new(RetryService::new(store.clone(), queue)),
            polling_service: Arc::new(PollingService::new(store, &config)),
        };

        Self {
            publisher,
            state,
            worker,
            fan_out_task,
            metrics,
            config,
        }
    }

    /// Handle for domain code to publish events.
    #[must_use]
    pub fn publisher(&self) -> EventPublisher {
        self.publisher.clone()
    }

    /// Attempt counters, for registration with the process registry.
    #[must_use]
    pub fn metrics(&self) -> Arc<DeliveryMetrics> {
        self.metrics.clone()
    }

    #[must_use]
    pub fn state(&self) -> WebhooksState {
        self.state.clone()
    }

    /// Stop fan-out, then let the workers finish in-flight attempts.
    ///
    /// Events still waiting for fan-out are dropped. Deliveries already
    /// created but not yet attempted stay pending.
    pub async fn shutdown(self) {
        self.fan_out_task.abort();
        self.worker.shutdown(self.config.shutdown_grace).await;
    }
}
