//! `OpenAPI` document for the Linky webhook API.
//!
//! Served as JSON at `/api-docs/openapi.json`.

use axum::{routing::get, Json, Router};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::health::{DependencyStatus, HealthResponse, HealthStatus};
use linky_webhooks::error::ErrorResponse;
use linky_webhooks::handlers::{deliveries, endpoints, polling};
use linky_webhooks::models::{
    CreateEndpointRequest, CreateEndpointResponse, DeliveryResponse, DeliveryStatus,
    EndpointDetailResponse, EndpointListResponse, EndpointResponse, EventTypeInfo,
    EventTypeListResponse, PollingFeedResponse, PollingItem, RetryResponse,
    UpdateEndpointRequest, WebhookEventType,
};

/// Security scheme modifier for session bearer tokens.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .description(Some(
                        "Session token. Browser clients may send the linky_session cookie instead.",
                    ))
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Linky Webhooks API",
        version = "0.1.0",
        description = "Outbound webhook registration, delivery retry and polling feed"
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Service health and status"),
        (name = "Webhooks", description = "Webhook endpoint management and delivery retry"),
        (name = "Polling", description = "Pull-based delivery feed"),
    ),
    paths(
        crate::health::health_handler,
        endpoints::create_endpoint_handler,
        endpoints::list_endpoints_handler,
        endpoints::get_endpoint_handler,
        endpoints::update_endpoint_handler,
        endpoints::delete_endpoint_handler,
        endpoints::list_event_types_handler,
        deliveries::retry_delivery_handler,
        polling::polling_feed_handler,
    ),
    components(schemas(
        HealthResponse,
        HealthStatus,
        DependencyStatus,
        ErrorResponse,
        WebhookEventType,
        CreateEndpointRequest,
        CreateEndpointResponse,
        UpdateEndpointRequest,
        EndpointResponse,
        EndpointDetailResponse,
        EndpointListResponse,
        EventTypeInfo,
        EventTypeListResponse,
        DeliveryStatus,
        DeliveryResponse,
        RetryResponse,
        PollingItem,
        PollingFeedResponse,
    ))
)]
pub struct ApiDoc;

/// Route serving the generated document.
pub fn openapi_routes() -> Router {
    Router::new().route(
        "/api-docs/openapi.json",
        get(|| async { Json(ApiDoc::openapi()) }),
    )
}
