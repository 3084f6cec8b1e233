//! Fire-and-forget entry point for domain code.
//!
//! `publish` never blocks and never fails from the caller's point of view.
//! A background task drains the channel into [`FanOutService::emit`].

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::models::WebhookEvent;
use crate::services::fan_out::FanOutService;

/// An event waiting for fan-out.
#[derive(Debug, Clone)]
pub struct PublishedEvent {
    pub owner_id: Uuid,
    pub event: WebhookEvent,
    pub occurred_at: DateTime<Utc>,
}

/// Publisher that hands events to the fan-out task.
#[derive(Clone)]
pub struct EventPublisher {
    sender: mpsc::Sender<PublishedEvent>,
}

impl EventPublisher {
    /// Create a new event publisher with the given channel capacity.
    #[must_use]
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<PublishedEvent>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (Self { sender }, receiver)
    }

    /// Publish an event. Errors are logged but not propagated.
    pub fn publish(&self, owner_id: Uuid, event: WebhookEvent) {
        let event_type = event.event_type();
        let published = PublishedEvent {
            owner_id,
            event,
            occurred_at: Utc::now(),
        };

        if let Err(e) = self.sender.try_send(published) {
            let reason = match e {
                mpsc::error::TrySendError::Full(_) => "event queue full",
                mpsc::error::TrySendError::Closed(_) => "event queue closed",
            };
            tracing::warn!(
                target: "webhook_delivery",
                owner_id = %owner_id,
                event_type = %event_type,
                reason,
                "Dropped webhook event"
            );
        }
    }
}

/// Drain published events into the fan-out service until every publisher
/// is dropped.
pub fn spawn_fan_out(
    mut receiver: mpsc::Receiver<PublishedEvent>,
    fan_out: FanOutService,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(published) = receiver.recv().await {
            if let Err(e) = fan_out
                .emit(published.owner_id, &published.event, published.occurred_at)
                .await
            {
                tracing::error!(
                    target: "webhook_delivery",
                    owner_id = %published.owner_id,
                    event_type = %published.event.event_type(),
                    error = %e,
                    "Webhook fan-out failed"
                );
            }
        }
        tracing::debug!(target: "webhook_delivery", "Event fan-out task stopped");
    })
}
