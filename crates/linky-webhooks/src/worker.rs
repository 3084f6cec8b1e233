//! Bounded delivery queue and the worker pool that drains it.
//!
//! Producers (fan-out, retry) enqueue without blocking; a full queue is
//! reported back to them. Workers share one receiver and run the delivery
//! executor for each job.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::error::WebhookError;
use crate::services::delivery_service::DeliveryService;

/// One pending delivery attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryJob {
    pub owner_id: Uuid,
    pub delivery_id: Uuid,
}

/// Sending side of the delivery queue.
#[derive(Clone)]
pub struct DeliveryQueue {
    sender: mpsc::Sender<DeliveryJob>,
}

impl DeliveryQueue {
    /// Create a queue holding at most `capacity` jobs.
    #[must_use]
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<DeliveryJob>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (Self { sender }, receiver)
    }

    /// Enqueue without waiting.
    ///
    /// # Errors
    ///
    /// `QueueFull` when saturated, `Internal` once the workers are gone.
    pub fn enqueue(&self, job: DeliveryJob) -> Result<(), WebhookError> {
        self.sender.try_send(job).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => WebhookError::QueueFull,
            mpsc::error::TrySendError::Closed(_) => {
                WebhookError::Internal("delivery queue is closed".to_string())
            }
        })
    }
}

/// Pool of delivery workers.
pub struct WebhookWorker {
    shutdown_tx: watch::Sender<bool>,
    handles: Vec<JoinHandle<()>>,
}

impl WebhookWorker {
    /// Spawn `worker_count` workers draining `receiver`.
    #[must_use]
    pub fn start(
        service: Arc<DeliveryService>,
        receiver: mpsc::Receiver<DeliveryJob>,
        worker_count: usize,
    ) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let receiver = Arc::new(Mutex::new(receiver));

        let handles = (0..worker_count.max(1))
            .map(|worker_id| {
                tokio::spawn(worker_loop(
                    worker_id,
                    receiver.clone(),
                    service.clone(),
                    shutdown_rx.clone(),
                ))
            })
            .collect();

        tracing::info!(
            target: "webhook_delivery",
            worker_count = worker_count.max(1),
            "Webhook delivery workers started"
        );

        Self {
            shutdown_tx,
            handles,
        }
    }

    /// Stop taking new jobs and wait up to `grace` for in-flight attempts.
    pub async fn shutdown(self, grace: Duration) {
        let _ = self.shutdown_tx.send(true);

        let join_all = async {
            for handle in self.handles {
                if let Err(e) = handle.await {
                    tracing::error!(
                        target: "webhook_delivery",
                        error = %e,
                        "Webhook worker task panicked"
                    );
                }
            }
        };

        if tokio::time::timeout(grace, join_all).await.is_err() {
            tracing::warn!(
                target: "webhook_delivery",
                grace_secs = grace.as_secs(),
                "Webhook workers did not finish within the shutdown grace period"
            );
        } else {
            tracing::info!(target: "webhook_delivery", "Webhook delivery workers stopped");
        }
    }
}

async fn worker_loop(
    worker_id: usize,
    receiver: Arc<Mutex<mpsc::Receiver<DeliveryJob>>>,
    service: Arc<DeliveryService>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        if *shutdown.borrow() {
            break;
        }

        let job = tokio::select! {
            biased;
            _ = shutdown.changed() => break,
            job = async { receiver.lock().await.recv().await } => job,
        };

        let Some(job) = job else { break };

        tracing::debug!(
            target: "webhook_delivery",
            worker_id,
            delivery_id = %job.delivery_id,
            "Worker picked up delivery job"
        );

        service.run_job(job).await;
    }

    tracing::debug!(target: "webhook_delivery", worker_id, "Webhook worker exiting");
}
