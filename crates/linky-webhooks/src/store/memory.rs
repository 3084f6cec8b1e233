//! In-memory store for tests and local development.
//!
//! Mirrors the Postgres semantics: owner scoping, cascade delete and
//! single-step attempt recording.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use linky_db::models::{
    AttemptResult, CreateWebhookDelivery, CreateWebhookEndpoint, RecentDeliveriesFilter,
    UpdateWebhookEndpoint, WebhookDelivery, WebhookEndpoint,
};
use linky_db::DbError;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::WebhookStore;

#[derive(Default)]
struct Tables {
    /// Insertion sequence breaks `created_at` ties.
    next_seq: u64,
    endpoints: HashMap<Uuid, (u64, WebhookEndpoint)>,
    deliveries: HashMap<Uuid, (u64, WebhookDelivery)>,
}

impl Tables {
    fn seq(&mut self) -> u64 {
        self.next_seq += 1;
        self.next_seq
    }

    fn owns_endpoint(&self, owner_id: Uuid, endpoint_id: Uuid) -> bool {
        self.endpoints
            .get(&endpoint_id)
            .is_some_and(|(_, ep)| ep.owner_id == owner_id)
    }
}

#[derive(Default)]
pub struct InMemoryWebhookStore {
    tables: RwLock<Tables>,
}

impl InMemoryWebhookStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Total deliveries across all owners.
    pub async fn delivery_count(&self) -> usize {
        self.tables.read().await.deliveries.len()
    }

    /// Unscoped lookup for assertions.
    pub async fn get_delivery(&self, id: Uuid) -> Option<WebhookDelivery> {
        self.tables
            .read()
            .await
            .deliveries
            .get(&id)
            .map(|(_, d)| d.clone())
    }
}

/// Newest first, ties broken by insertion order.
fn newest_first<T>(mut rows: Vec<(u64, T)>, created_at: impl Fn(&T) -> chrono::DateTime<Utc>) -> Vec<T> {
    rows.sort_by(|(sa, a), (sb, b)| created_at(b).cmp(&created_at(a)).then(sb.cmp(sa)));
    rows.into_iter().map(|(_, row)| row).collect()
}

#[async_trait]
impl WebhookStore for InMemoryWebhookStore {
    async fn create_endpoint(
        &self,
        input: CreateWebhookEndpoint,
    ) -> Result<WebhookEndpoint, DbError> {
        let mut tables = self.tables.write().await;
        if tables.endpoints.contains_key(&input.id) {
            return Err(DbError::Unavailable(format!(
                "duplicate endpoint id {}",
                input.id
            )));
        }
        let now = Utc::now();
        let endpoint = WebhookEndpoint {
            id: input.id,
            owner_id: input.owner_id,
            url: input.url,
            events: input.events,
            is_active: true,
            secret_ref: input.secret_ref,
            created_at: now,
            updated_at: now,
        };
        let seq = tables.seq();
        tables.endpoints.insert(endpoint.id, (seq, endpoint.clone()));
        Ok(endpoint)
    }

    async fn find_endpoint(
        &self,
        owner_id: Uuid,
        id: Uuid,
    ) -> Result<Option<WebhookEndpoint>, DbError> {
        let tables = self.tables.read().await;
        Ok(tables
            .endpoints
            .get(&id)
            .filter(|(_, ep)| ep.owner_id == owner_id)
            .map(|(_, ep)| ep.clone()))
    }

    async fn list_endpoints(&self, owner_id: Uuid) -> Result<Vec<WebhookEndpoint>, DbError> {
        let tables = self.tables.read().await;
        let rows = tables
            .endpoints
            .values()
            .filter(|(_, ep)| ep.owner_id == owner_id)
            .cloned()
            .collect();
        Ok(newest_first(rows, |ep| ep.created_at))
    }

    async fn find_active_endpoints_for_event(
        &self,
        owner_id: Uuid,
        event_type: &str,
    ) -> Result<Vec<WebhookEndpoint>, DbError> {
        let tables = self.tables.read().await;
        let rows = tables
            .endpoints
            .values()
            .filter(|(_, ep)| {
                ep.owner_id == owner_id && ep.is_active && ep.subscribes_to(event_type)
            })
            .cloned()
            .collect();
        let mut oldest_first = newest_first(rows, |ep| ep.created_at);
        oldest_first.reverse();
        Ok(oldest_first)
    }

    async fn update_endpoint(
        &self,
        owner_id: Uuid,
        id: Uuid,
        input: UpdateWebhookEndpoint,
    ) -> Result<Option<WebhookEndpoint>, DbError> {
        let mut tables = self.tables.write().await;
        let Some((_, ep)) = tables
            .endpoints
            .get_mut(&id)
            .filter(|(_, ep)| ep.owner_id == owner_id)
        else {
            return Ok(None);
        };

        if let Some(url) = input.url {
            ep.url = url;
        }
        if let Some(events) = input.events {
            ep.events = events;
        }
        if let Some(is_active) = input.is_active {
            ep.is_active = is_active;
        }
        ep.updated_at = Utc::now();
        Ok(Some(ep.clone()))
    }

    async fn delete_endpoint(&self, owner_id: Uuid, id: Uuid) -> Result<bool, DbError> {
        let mut tables = self.tables.write().await;
        if !tables.owns_endpoint(owner_id, id) {
            return Ok(false);
        }
        tables.endpoints.remove(&id);
        tables.deliveries.retain(|_, (_, d)| d.endpoint_id != id);
        Ok(true)
    }

    async fn create_delivery(
        &self,
        input: CreateWebhookDelivery,
    ) -> Result<WebhookDelivery, DbError> {
        let mut tables = self.tables.write().await;
        if !tables.endpoints.contains_key(&input.endpoint_id) {
            return Err(DbError::Unavailable(format!(
                "endpoint {} does not exist",
                input.endpoint_id
            )));
        }
        let delivery = WebhookDelivery {
            id: Uuid::new_v4(),
            endpoint_id: input.endpoint_id,
            event_type: input.event_type,
            payload: input.payload,
            status_code: None,
            response: None,
            attempts: 0,
            created_at: Utc::now(),
            delivered_at: None,
        };
        let seq = tables.seq();
        tables.deliveries.insert(delivery.id, (seq, delivery.clone()));
        Ok(delivery)
    }

    async fn find_delivery(
        &self,
        owner_id: Uuid,
        id: Uuid,
    ) -> Result<Option<WebhookDelivery>, DbError> {
        let tables = self.tables.read().await;
        Ok(tables
            .deliveries
            .get(&id)
            .filter(|(_, d)| tables.owns_endpoint(owner_id, d.endpoint_id))
            .map(|(_, d)| d.clone()))
    }

    async fn list_deliveries_for_endpoint(
        &self,
        owner_id: Uuid,
        endpoint_id: Uuid,
        limit: i64,
    ) -> Result<Vec<WebhookDelivery>, DbError> {
        let tables = self.tables.read().await;
        if !tables.owns_endpoint(owner_id, endpoint_id) {
            return Ok(Vec::new());
        }
        let rows = tables
            .deliveries
            .values()
            .filter(|(_, d)| d.endpoint_id == endpoint_id)
            .cloned()
            .collect();
        let mut out = newest_first(rows, |d| d.created_at);
        out.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(out)
    }

    async fn record_attempt(
        &self,
        id: Uuid,
        result: &AttemptResult,
    ) -> Result<Option<WebhookDelivery>, DbError> {
        let mut tables = self.tables.write().await;
        let Some((_, d)) = tables.deliveries.get_mut(&id) else {
            return Ok(None);
        };
        let (status_code, response, delivered_at) = result.columns();
        d.attempts += 1;
        d.status_code = status_code;
        d.response = response.map(str::to_string);
        d.delivered_at = delivered_at;
        Ok(Some(d.clone()))
    }

    async fn reset_delivery(&self, id: Uuid) -> Result<Option<WebhookDelivery>, DbError> {
        let mut tables = self.tables.write().await;
        let Some((_, d)) = tables.deliveries.get_mut(&id) else {
            return Ok(None);
        };
        d.attempts = 0;
        d.status_code = None;
        d.response = None;
        d.delivered_at = None;
        Ok(Some(d.clone()))
    }

    async fn list_recent_deliveries(
        &self,
        owner_id: Uuid,
        filter: &RecentDeliveriesFilter,
    ) -> Result<Vec<WebhookDelivery>, DbError> {
        let tables = self.tables.read().await;
        let rows = tables
            .deliveries
            .values()
            .filter(|(_, d)| {
                tables.owns_endpoint(owner_id, d.endpoint_id)
                    && d.created_at >= filter.since
                    && filter
                        .event_type
                        .as_deref()
                        .map_or(true, |et| d.event_type == et)
            })
            .cloned()
            .collect();
        let mut out = newest_first(rows, |d| d.created_at);
        out.truncate(usize::try_from(filter.limit).unwrap_or(0));
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OWNER: Uuid = Uuid::from_u128(1);
    const OTHER: Uuid = Uuid::from_u128(2);

    async fn endpoint(store: &InMemoryWebhookStore, owner: Uuid, events: &[&str]) -> WebhookEndpoint {
        let id = Uuid::new_v4();
        store
            .create_endpoint(CreateWebhookEndpoint {
                id,
                owner_id: owner,
                url: "https://hooks.example.com/in".into(),
                events: events.iter().map(|e| (*e).to_string()).collect(),
                secret_ref: format!("linky/webhooks/{owner}/{id}"),
            })
            .await
            .unwrap()
    }

    async fn delivery(store: &InMemoryWebhookStore, endpoint_id: Uuid) -> WebhookDelivery {
        store
            .create_delivery(CreateWebhookDelivery {
                endpoint_id,
                event_type: "page.viewed".into(),
                payload: serde_json::json!({"event": "page.viewed"}),
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_list_endpoints_newest_first_and_scoped() {
        let store = InMemoryWebhookStore::new();
        let first = endpoint(&store, OWNER, &["page.viewed"]).await;
        let second = endpoint(&store, OWNER, &["page.viewed"]).await;
        endpoint(&store, OTHER, &["page.viewed"]).await;

        let listed = store.list_endpoints(OWNER).await.unwrap();
        assert_eq!(
            listed.iter().map(|e| e.id).collect::<Vec<_>>(),
            vec![second.id, first.id]
        );
    }

    #[tokio::test]
    async fn test_find_endpoint_hides_other_owners() {
        let store = InMemoryWebhookStore::new();
        let ep = endpoint(&store, OWNER, &["page.viewed"]).await;
        assert!(store.find_endpoint(OWNER, ep.id).await.unwrap().is_some());
        assert!(store.find_endpoint(OTHER, ep.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_active_filter() {
        let store = InMemoryWebhookStore::new();
        let active = endpoint(&store, OWNER, &["page.viewed"]).await;
        let inactive = endpoint(&store, OWNER, &["page.viewed"]).await;
        endpoint(&store, OWNER, &["link.clicked"]).await;
        store
            .update_endpoint(
                OWNER,
                inactive.id,
                UpdateWebhookEndpoint {
                    is_active: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let matches = store
            .find_active_endpoints_for_event(OWNER, "page.viewed")
            .await
            .unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].id, active.id);
    }

    #[tokio::test]
    async fn test_delete_cascades_deliveries() {
        let store = InMemoryWebhookStore::new();
        let ep = endpoint(&store, OWNER, &["page.viewed"]).await;
        let keep = endpoint(&store, OWNER, &["page.viewed"]).await;
        delivery(&store, ep.id).await;
        delivery(&store, ep.id).await;
        let kept = delivery(&store, keep.id).await;

        assert!(!store.delete_endpoint(OTHER, ep.id).await.unwrap());
        assert!(store.delete_endpoint(OWNER, ep.id).await.unwrap());
        assert_eq!(store.delivery_count().await, 1);
        assert!(store.get_delivery(kept.id).await.is_some());
    }

    #[tokio::test]
    async fn test_record_attempt_and_reset() {
        let store = InMemoryWebhookStore::new();
        let ep = endpoint(&store, OWNER, &["page.viewed"]).await;
        let d = delivery(&store, ep.id).await;

        let failed = store
            .record_attempt(
                d.id,
                &AttemptResult::Failed {
                    error: "Connection failed".into(),
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(failed.attempts, 1);
        assert!(failed.status_code.is_none());
        assert!(failed.delivered_at.is_none());

        let done = store
            .record_attempt(
                d.id,
                &AttemptResult::Completed {
                    status_code: 200,
                    response: "ok".into(),
                    delivered_at: Utc::now(),
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(done.attempts, 2);
        assert_eq!(done.status_code, Some(200));
        assert!(done.delivered_at.is_some());

        let reset = store.reset_delivery(d.id).await.unwrap().unwrap();
        assert_eq!(reset.attempts, 0);
        assert!(reset.status_code.is_none());
        assert!(reset.response.is_none());
        assert!(reset.delivered_at.is_none());
    }

    #[tokio::test]
    async fn test_create_delivery_requires_endpoint() {
        let store = InMemoryWebhookStore::new();
        let result = store
            .create_delivery(CreateWebhookDelivery {
                endpoint_id: Uuid::new_v4(),
                event_type: "page.viewed".into(),
                payload: serde_json::json!({}),
            })
            .await;
        assert!(result.is_err());
    }
}
