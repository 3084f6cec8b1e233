//! Webhook delivery model.
//!
//! A delivery is one event payload bound for one endpoint. It is created with
//! no status, rewritten in a single statement after every attempt, and reset
//! when the owner asks for a retry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

/// A recorded (or pending) webhook delivery.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct WebhookDelivery {
    pub id: Uuid,
    pub endpoint_id: Uuid,
    pub event_type: String,
    pub payload: serde_json::Value,
    /// `None` until an attempt completes with an HTTP response.
    pub status_code: Option<i16>,
    /// Truncated response body, or an error description for failed attempts.
    pub response: Option<String>,
    pub attempts: i32,
    pub created_at: DateTime<Utc>,
    /// Set together with `status_code`.
    pub delivered_at: Option<DateTime<Utc>>,
}

impl WebhookDelivery {
    /// Whether an attempt has completed with an HTTP response.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.status_code.is_some()
    }

    /// Whether the last completed attempt got a 2xx back.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self.status_code, Some(code) if (200..300).contains(&code))
    }
}

/// Input for inserting a new delivery.
#[derive(Debug, Clone)]
pub struct CreateWebhookDelivery {
    pub endpoint_id: Uuid,
    pub event_type: String,
    pub payload: serde_json::Value,
}

/// Outcome of one delivery attempt, written with a single `UPDATE`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptResult {
    /// The receiver answered; any status code counts.
    Completed {
        status_code: i16,
        response: String,
        delivered_at: DateTime<Utc>,
    },
    /// No HTTP response was obtained.
    Failed { error: String },
}

impl AttemptResult {
    /// Column values `(status_code, response, delivered_at)` for this outcome.
    #[must_use]
    pub fn columns(&self) -> (Option<i16>, Option<&str>, Option<DateTime<Utc>>) {
        match self {
            AttemptResult::Completed {
                status_code,
                response,
                delivered_at,
            } => (Some(*status_code), Some(response.as_str()), Some(*delivered_at)),
            AttemptResult::Failed { error } => (None, Some(error.as_str()), None),
        }
    }
}

/// Filter for the owner-wide recent deliveries query.
#[derive(Debug, Clone)]
pub struct RecentDeliveriesFilter {
    pub since: DateTime<Utc>,
    pub event_type: Option<String>,
    pub limit: i64,
}

impl WebhookDelivery {
    /// Insert a new delivery with no status and zero attempts.
    pub async fn create(pool: &PgPool, input: CreateWebhookDelivery) -> Result<Self, sqlx::Error> {
        sqlx::query_as(
            r#"
            INSERT INTO webhook_deliveries (id, endpoint_id, event_type, payload, attempts)
            VALUES ($1, $2, $3, $4, 0)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(input.endpoint_id)
        .bind(&input.event_type)
        .bind(&input.payload)
        .fetch_one(pool)
        .await
    }

    /// Find a delivery by id, visible only if its endpoint belongs to `owner_id`.
    pub async fn find_for_owner(
        pool: &PgPool,
        owner_id: Uuid,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as(
            r#"
            SELECT d.* FROM webhook_deliveries d
            JOIN webhook_endpoints e ON e.id = d.endpoint_id
            WHERE d.id = $1 AND e.owner_id = $2
            "#,
        )
        .bind(id)
        .bind(owner_id)
        .fetch_optional(pool)
        .await
    }

    /// Most recent deliveries of one endpoint, scoped to its owner.
    pub async fn list_by_endpoint(
        pool: &PgPool,
        owner_id: Uuid,
        endpoint_id: Uuid,
        limit: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as(
            r#"
            SELECT d.* FROM webhook_deliveries d
            JOIN webhook_endpoints e ON e.id = d.endpoint_id
            WHERE d.endpoint_id = $1 AND e.owner_id = $2
            ORDER BY d.created_at DESC, d.id DESC
            LIMIT $3
            "#,
        )
        .bind(endpoint_id)
        .bind(owner_id)
        .bind(limit)
        .fetch_all(pool)
        .await
    }

    /// Deliveries across all endpoints of an owner, newest first.
    pub async fn list_recent_for_owner(
        pool: &PgPool,
        owner_id: Uuid,
        filter: &RecentDeliveriesFilter,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as(
            r#"
            SELECT d.* FROM webhook_deliveries d
            JOIN webhook_endpoints e ON e.id = d.endpoint_id
            WHERE e.owner_id = $1
              AND d.created_at >= $2
              AND ($3::TEXT IS NULL OR d.event_type = $3)
            ORDER BY d.created_at DESC, d.id DESC
            LIMIT $4
            "#,
        )
        .bind(owner_id)
        .bind(filter.since)
        .bind(filter.event_type.as_deref())
        .bind(filter.limit)
        .fetch_all(pool)
        .await
    }

    /// Record one attempt: bump the counter and write the outcome columns in
    /// the same statement.
    pub async fn record_attempt(
        pool: &PgPool,
        id: Uuid,
        result: &AttemptResult,
    ) -> Result<Option<Self>, sqlx::Error> {
        let (status_code, response, delivered_at) = result.columns();

        sqlx::query_as(
            r#"
            UPDATE webhook_deliveries
            SET attempts = attempts + 1,
                status_code = $2,
                response = $3,
                delivered_at = $4
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(status_code)
        .bind(response)
        .bind(delivered_at)
        .fetch_optional(pool)
        .await
    }

    /// Clear the outcome and counter so the delivery can be attempted afresh.
    pub async fn reset(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as(
            r#"
            UPDATE webhook_deliveries
            SET attempts = 0,
                status_code = NULL,
                response = NULL,
                delivered_at = NULL
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }
}
