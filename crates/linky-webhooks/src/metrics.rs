//! Delivery outcome counters.
//!
//! Counted once per attempt, labeled by outcome. The counters live in a
//! family owned here and are registered into the process registry by the
//! binary.

use prometheus_client::{
    encoding::EncodeLabelSet,
    metrics::{counter::Counter, family::Family},
    registry::Registry,
};

use crate::error::DeliveryFailure;

/// Outcome of a single delivery attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Completed,
    Failed,
    VaultUnavailable,
}

impl DeliveryOutcome {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::VaultUnavailable => "vault_unavailable",
        }
    }

    /// Classify a failed attempt.
    #[must_use]
    pub fn from_failure(failure: &DeliveryFailure) -> Self {
        match failure {
            DeliveryFailure::VaultUnavailable(_) => Self::VaultUnavailable,
            _ => Self::Failed,
        }
    }
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct DeliveryOutcomeLabels {
    pub outcome: String,
}

/// Delivery attempt counters.
#[derive(Debug, Default)]
pub struct DeliveryMetrics {
    attempts_total: Family<DeliveryOutcomeLabels, Counter>,
}

impl DeliveryMetrics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the counters under `webhook_delivery_attempts`.
    pub fn register(&self, registry: &mut Registry) {
        registry.register(
            "webhook_delivery_attempts",
            "Webhook delivery attempts by outcome",
            self.attempts_total.clone(),
        );
    }

    pub fn record(&self, outcome: DeliveryOutcome) {
        self.attempts_total
            .get_or_create(&DeliveryOutcomeLabels {
                outcome: outcome.as_str().to_string(),
            })
            .inc();
    }

    /// Current count for one outcome.
    #[must_use]
    pub fn count(&self, outcome: DeliveryOutcome) -> u64 {
        self.attempts_total
            .get_or_create(&DeliveryOutcomeLabels {
                outcome: outcome.as_str().to_string(),
            })
            .get()
    }
}
