//! Read-only delivery feed for pull-based integrations.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use linky_db::models::RecentDeliveriesFilter;
use uuid::Uuid;

use crate::config::WebhookConfig;
use crate::error::WebhookError;
use crate::models::{PollingFeedResponse, PollingItem, PollingQuery, WebhookEventType};
use crate::store::WebhookStore;

#[derive(Clone)]
pub struct PollingService {
    store: Arc<dyn WebhookStore>,
    page_size: i64,
    default_window: Duration,
}

impl PollingService {
    #[must_use]
    pub fn new(store: Arc<dyn WebhookStore>, config: &WebhookConfig) -> Self {
        Self {
            store,
            page_size: config.polling_page_size,
            default_window: config.polling_default_window,
        }
    }

    /// Deliveries across all of the owner's endpoints created at or after
    /// `since`, newest first, at most one page.
    ///
    /// # Errors
    ///
    /// `Validation` for an unknown `event_type`.
    pub async fn list_recent(
        &self,
        owner_id: Uuid,
        query: PollingQuery,
    ) -> Result<PollingFeedResponse, WebhookError> {
        let event_type = query
            .event_type
            .map(|raw| {
                WebhookEventType::parse(&raw)
                    .map(|et| et.as_str().to_string())
                    .ok_or_else(|| WebhookError::Validation(format!("Unknown event type: {raw}")))
            })
            .transpose()?;

        let filter = RecentDeliveriesFilter {
            since: query.since.unwrap_or_else(|| self.default_since(Utc::now())),
            event_type,
            limit: self.page_size,
        };

        let items: Vec<PollingItem> = self
            .store
            .list_recent_deliveries(owner_id, &filter)
            .await?
            .into_iter()
            .map(PollingItem::from)
            .collect();

        Ok(PollingFeedResponse {
            count: items.len(),
            items,
        })
    }

    fn default_since(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let window =
            chrono::Duration::from_std(self.default_window).unwrap_or(chrono::Duration::days(7));
        now - window
    }
}
