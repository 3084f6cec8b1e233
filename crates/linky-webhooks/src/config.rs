//! Runtime settings for the webhook pipeline.

use std::time::Duration;

use crate::validation::UrlPolicy;

/// Tunables for delivery, queueing and the read APIs.
#[derive(Debug, Clone)]
pub struct WebhookConfig {
    /// Upper bound on one outbound POST, connect through body.
    pub delivery_timeout: Duration,
    /// Upper bound on the vault secret read during delivery.
    pub vault_timeout: Duration,
    /// Stored response bodies are truncated to this many bytes.
    pub response_body_limit: usize,
    /// Number of delivery worker tasks.
    pub worker_count: usize,
    /// Capacity of the delivery job queue.
    pub queue_capacity: usize,
    /// Capacity of the published-event queue feeding fan-out.
    pub event_queue_capacity: usize,
    /// Which endpoint URLs are accepted at registration and update.
    pub url_policy: UrlPolicy,
    /// Deliveries shown on the endpoint detail view.
    pub recent_deliveries_limit: i64,
    /// Maximum items in one polling feed response.
    pub polling_page_size: i64,
    /// Polling feed window when no `since` is given.
    pub polling_default_window: Duration,
    /// How long shutdown waits for in-flight deliveries.
    pub shutdown_grace: Duration,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            delivery_timeout: Duration::from_secs(10),
            vault_timeout: Duration::from_secs(5),
            response_body_limit: 2048,
            worker_count: 4,
            queue_capacity: 1024,
            event_queue_capacity: 1024,
            url_policy: UrlPolicy::strict(),
            recent_deliveries_limit: 20,
            polling_page_size: 100,
            polling_default_window: Duration::from_secs(7 * 24 * 60 * 60),
            shutdown_grace: Duration::from_secs(15),
        }
    }
}

impl WebhookConfig {
    #[must_use]
    pub fn with_url_policy(mut self, policy: UrlPolicy) -> Self {
        self.url_policy = policy;
        self
    }

    #[must_use]
    pub fn with_delivery_timeout(mut self, timeout: Duration) -> Self {
        self.delivery_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_vault_timeout(mut self, timeout: Duration) -> Self {
        self.vault_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    #[must_use]
    pub fn with_worker_count(mut self, count: usize) -> Self {
        self.worker_count = count;
        self
    }
}
