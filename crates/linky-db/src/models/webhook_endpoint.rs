//! Webhook endpoint model.
//!
//! One row per receiver URL registered by a user. The signing secret lives in
//! the vault; only its reference is stored here and it never changes after
//! insert.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

/// A registered webhook endpoint.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct WebhookEndpoint {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub url: String,
    /// Subscribed event-type tags. Never empty.
    pub events: Vec<String>,
    pub is_active: bool,
    /// Opaque vault reference for the HMAC secret.
    pub secret_ref: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WebhookEndpoint {
    /// Whether this endpoint should receive the given event type.
    #[must_use]
    pub fn subscribes_to(&self, event_type: &str) -> bool {
        self.events.iter().any(|e| e == event_type)
    }
}

/// Input for inserting a new endpoint.
///
/// The id is chosen by the caller so the vault key can be derived from it
/// before the row exists.
#[derive(Debug, Clone)]
pub struct CreateWebhookEndpoint {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub url: String,
    pub events: Vec<String>,
    pub secret_ref: String,
}

/// Partial update of an endpoint. `secret_ref` cannot change.
#[derive(Debug, Clone, Default)]
pub struct UpdateWebhookEndpoint {
    pub url: Option<String>,
    pub events: Option<Vec<String>>,
    pub is_active: Option<bool>,
}

impl UpdateWebhookEndpoint {
    /// True when no field would change.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.url.is_none() && self.events.is_none() && self.is_active.is_none()
    }
}

impl WebhookEndpoint {
    /// Insert a new endpoint row.
    pub async fn create(pool: &PgPool, input: CreateWebhookEndpoint) -> Result<Self, sqlx::Error> {
        sqlx::query_as(
            r#"
            INSERT INTO webhook_endpoints (id, owner_id, url, events, is_active, secret_ref)
            VALUES ($1, $2, $3, $4, TRUE, $5)
            RETURNING *
            "#,
        )
        .bind(input.id)
        .bind(input.owner_id)
        .bind(&input.url)
        .bind(&input.events)
        .bind(&input.secret_ref)
        .fetch_one(pool)
        .await
    }

    /// Find an endpoint by id, scoped to its owner.
    pub async fn find_by_id(
        pool: &PgPool,
        owner_id: Uuid,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as(
            r#"
            SELECT * FROM webhook_endpoints
            WHERE id = $1 AND owner_id = $2
            "#,
        )
        .bind(id)
        .bind(owner_id)
        .fetch_optional(pool)
        .await
    }

    /// List all endpoints of an owner, newest first.
    pub async fn list_by_owner(pool: &PgPool, owner_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as(
            r#"
            SELECT * FROM webhook_endpoints
            WHERE owner_id = $1
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(owner_id)
        .fetch_all(pool)
        .await
    }

    /// Active endpoints of an owner subscribed to `event_type`.
    pub async fn find_active_by_event_type(
        pool: &PgPool,
        owner_id: Uuid,
        event_type: &str,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as(
            r#"
            SELECT * FROM webhook_endpoints
            WHERE owner_id = $1
              AND is_active = TRUE
              AND $2 = ANY(events)
            ORDER BY created_at ASC
            "#,
        )
        .bind(owner_id)
        .bind(event_type)
        .fetch_all(pool)
        .await
    }

    /// Apply a partial update. Returns `None` when the endpoint does not
    /// exist for this owner.
    pub async fn update(
        pool: &PgPool,
        owner_id: Uuid,
        id: Uuid,
        input: UpdateWebhookEndpoint,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut updates = vec!["updated_at = NOW()".to_string()];
        let mut param_idx = 3; // $1=id, $2=owner_id

        if input.url.is_some() {
            updates.push(format!("url = ${param_idx}"));
            param_idx += 1;
        }
        if input.events.is_some() {
            updates.push(format!("events = ${param_idx}"));
            param_idx += 1;
        }
        if input.is_active.is_some() {
            updates.push(format!("is_active = ${param_idx}"));
        }

        let query = format!(
            "UPDATE webhook_endpoints SET {} WHERE id = $1 AND owner_id = $2 RETURNING *",
            updates.join(", ")
        );

        let mut q = sqlx::query_as::<_, WebhookEndpoint>(&query)
            .bind(id)
            .bind(owner_id);

        if let Some(ref url) = input.url {
            q = q.bind(url);
        }
        if let Some(ref events) = input.events {
            q = q.bind(events);
        }
        if let Some(is_active) = input.is_active {
            q = q.bind(is_active);
        }

        q.fetch_optional(pool).await
    }

    /// Delete an endpoint. Deliveries go with it via `ON DELETE CASCADE`.
    pub async fn delete(pool: &PgPool, owner_id: Uuid, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            DELETE FROM webhook_endpoints
            WHERE id = $1 AND owner_id = $2
            "#,
        )
        .bind(id)
        .bind(owner_id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
