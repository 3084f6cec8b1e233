//! Event types, event payloads and API request/response shapes.

use chrono::{DateTime, Utc};
use linky_db::models::{WebhookDelivery, WebhookEndpoint};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

/// Maximum accepted endpoint URL length.
pub const MAX_URL_LENGTH: usize = 2048;

// ---------------------------------------------------------------------------
// Event types
// ---------------------------------------------------------------------------

/// The closed set of events an endpoint can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum WebhookEventType {
    #[serde(rename = "page.viewed")]
    PageViewed,
    #[serde(rename = "link.clicked")]
    LinkClicked,
    #[serde(rename = "page.updated")]
    PageUpdated,
    #[serde(rename = "block.created")]
    BlockCreated,
    #[serde(rename = "block.deleted")]
    BlockDeleted,
}

impl WebhookEventType {
    /// Wire tag, e.g. `"page.viewed"`.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PageViewed => "page.viewed",
            Self::LinkClicked => "link.clicked",
            Self::PageUpdated => "page.updated",
            Self::BlockCreated => "block.created",
            Self::BlockDeleted => "block.deleted",
        }
    }

    /// Parse a wire tag. Unknown tags yield `None`.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        Self::all().iter().copied().find(|et| et.as_str() == s)
    }

    /// Every known event type, in display order.
    #[must_use]
    pub fn all() -> &'static [WebhookEventType] {
        &[
            Self::PageViewed,
            Self::LinkClicked,
            Self::PageUpdated,
            Self::BlockCreated,
            Self::BlockDeleted,
        ]
    }

    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::PageViewed => "A visitor viewed a page",
            Self::LinkClicked => "A visitor clicked a link block",
            Self::PageUpdated => "Page settings or content changed",
            Self::BlockCreated => "A block was added to a page",
            Self::BlockDeleted => "A block was removed from a page",
        }
    }
}

impl std::fmt::Display for WebhookEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// A domain event that can trigger webhook fan-out.
///
/// Serialized as `{"event": "<type>", "data": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum WebhookEvent {
    #[serde(rename = "page.viewed")]
    PageViewed {
        page_id: Uuid,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        referrer: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        country: Option<String>,
    },
    #[serde(rename = "link.clicked")]
    LinkClicked {
        page_id: Uuid,
        block_id: Uuid,
        url: String,
    },
    #[serde(rename = "page.updated")]
    PageUpdated {
        page_id: Uuid,
        changed_fields: Vec<String>,
    },
    #[serde(rename = "block.created")]
    BlockCreated {
        page_id: Uuid,
        block_id: Uuid,
        block_type: String,
    },
    #[serde(rename = "block.deleted")]
    BlockDeleted { page_id: Uuid, block_id: Uuid },
}

impl WebhookEvent {
    #[must_use]
    pub fn event_type(&self) -> WebhookEventType {
        match self {
            Self::PageViewed { .. } => WebhookEventType::PageViewed,
            Self::LinkClicked { .. } => WebhookEventType::LinkClicked,
            Self::PageUpdated { .. } => WebhookEventType::PageUpdated,
            Self::BlockCreated { .. } => WebhookEventType::BlockCreated,
            Self::BlockDeleted { .. } => WebhookEventType::BlockDeleted,
        }
    }

    /// The JSON body stored on a delivery and POSTed to receivers: the tagged
    /// event plus an `occurred_at` timestamp.
    pub fn to_payload(&self, occurred_at: DateTime<Utc>) -> serde_json::Result<serde_json::Value> {
        let mut value = serde_json::to_value(self)?;
        if let Some(obj) = value.as_object_mut() {
            obj.insert(
                "occurred_at".to_string(),
                serde_json::to_value(occurred_at)?,
            );
        }
        Ok(value)
    }
}

// ---------------------------------------------------------------------------
// Endpoint requests / responses
// ---------------------------------------------------------------------------

/// Request body for registering an endpoint.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateEndpointRequest {
    #[validate(length(min = 1, max = 2048, message = "url must be 1-2048 characters"))]
    pub url: String,

    #[validate(length(min = 1, message = "events must not be empty"))]
    pub events: Vec<String>,
}

/// Request body for a partial endpoint update.
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateEndpointRequest {
    #[validate(length(min = 1, max = 2048, message = "url must be 1-2048 characters"))]
    pub url: Option<String>,

    #[validate(length(min = 1, message = "events must not be empty"))]
    pub events: Option<Vec<String>>,

    #[serde(default, alias = "isActive")]
    pub is_active: Option<bool>,
}

/// Endpoint as shown to its owner. Carries neither the secret nor its
/// vault reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct EndpointResponse {
    pub id: Uuid,
    pub url: String,
    pub events: Vec<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<WebhookEndpoint> for EndpointResponse {
    fn from(ep: WebhookEndpoint) -> Self {
        Self {
            id: ep.id,
            url: ep.url,
            events: ep.events,
            is_active: ep.is_active,
            created_at: ep.created_at,
            updated_at: ep.updated_at,
        }
    }
}

/// Registration result: the only place the plaintext secret ever appears.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateEndpointResponse {
    pub endpoint: EndpointResponse,
    pub secret: String,
    pub warning: String,
}

/// Endpoint with its most recent deliveries.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EndpointDetailResponse {
    pub endpoint: EndpointResponse,
    pub recent_deliveries: Vec<DeliveryResponse>,
}

/// Owner's endpoints plus the event types they may subscribe to.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EndpointListResponse {
    pub endpoints: Vec<EndpointResponse>,
    pub event_types: Vec<EventTypeInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct EventTypeInfo {
    pub event_type: String,
    pub description: String,
}

impl From<WebhookEventType> for EventTypeInfo {
    fn from(et: WebhookEventType) -> Self {
        Self {
            event_type: et.as_str().to_string(),
            description: et.description().to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EventTypeListResponse {
    pub event_types: Vec<EventTypeInfo>,
}

impl EventTypeListResponse {
    #[must_use]
    pub fn all() -> Self {
        Self {
            event_types: WebhookEventType::all()
                .iter()
                .copied()
                .map(EventTypeInfo::from)
                .collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Deliveries
// ---------------------------------------------------------------------------

/// Derived state of a delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    /// Never attempted, or reset for retry.
    Pending,
    /// Last attempt got a 2xx.
    Succeeded,
    /// Last attempt got a non-2xx or no response at all.
    Failed,
}

impl DeliveryStatus {
    #[must_use]
    pub fn of(delivery: &WebhookDelivery) -> Self {
        match delivery.status_code {
            Some(_) if delivery.is_success() => Self::Succeeded,
            Some(_) => Self::Failed,
            None if delivery.attempts == 0 => Self::Pending,
            None => Self::Failed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DeliveryResponse {
    pub id: Uuid,
    pub endpoint_id: Uuid,
    pub event_type: String,
    pub payload: serde_json::Value,
    pub status: DeliveryStatus,
    pub status_code: Option<i16>,
    pub response: Option<String>,
    pub attempts: i32,
    pub created_at: DateTime<Utc>,
    pub delivered_at: Option<DateTime<Utc>>,
}

impl From<WebhookDelivery> for DeliveryResponse {
    fn from(d: WebhookDelivery) -> Self {
        Self {
            status: DeliveryStatus::of(&d),
            id: d.id,
            endpoint_id: d.endpoint_id,
            event_type: d.event_type,
            payload: d.payload,
            status_code: d.status_code,
            response: d.response,
            attempts: d.attempts,
            created_at: d.created_at,
            delivered_at: d.delivered_at,
        }
    }
}

/// Acknowledgement that a retry was queued. Carries no outcome.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RetryResponse {
    pub delivery_id: Uuid,
    pub status: String,
    pub message: String,
}

// ---------------------------------------------------------------------------
// Polling feed
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PollingQuery {
    /// Only return deliveries of this event type.
    pub event_type: Option<String>,
    /// RFC 3339 lower bound on creation time. Defaults to seven days ago.
    pub since: Option<DateTime<Utc>>,
}

/// One delivery in the polling feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PollingItem {
    pub id: Uuid,
    pub event_type: String,
    pub payload: serde_json::Value,
    pub status: DeliveryStatus,
    pub status_code: Option<i16>,
    pub created_at: DateTime<Utc>,
    pub delivered_at: Option<DateTime<Utc>>,
}

impl From<WebhookDelivery> for PollingItem {
    fn from(d: WebhookDelivery) -> Self {
        Self {
            status: DeliveryStatus::of(&d),
            id: d.id,
            event_type: d.event_type,
            payload: d.payload,
            status_code: d.status_code,
            created_at: d.created_at,
            delivered_at: d.delivered_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PollingFeedResponse {
    pub items: Vec<PollingItem>,
    pub count: usize,
}
