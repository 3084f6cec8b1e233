//! Axum router setup for webhook endpoints.

use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::auth::{session_auth_middleware, SessionVerifier};
use crate::handlers::{deliveries, endpoints, polling};
use crate::services::endpoint_service::EndpointService;
use crate::services::polling_service::PollingService;
use crate::services::retry_service::RetryService;

/// Shared state for webhook handlers.
#[derive(Clone)]
pub struct WebhooksState {
    pub endpoint_service: Arc<EndpointService>,
    pub retry_service: Arc<RetryService>,
    pub polling_service: Arc<PollingService>,
}

/// Creates the webhook router with all routes. Every route requires a session.
pub fn webhooks_router(state: WebhooksState, verifier: Arc<dyn SessionVerifier>) -> Router {
    Router::new()
        // Endpoint CRUD
        .route(
            "/webhooks/endpoints",
            post(endpoints::create_endpoint_handler).get(endpoints::list_endpoints_handler),
        )
        .route(
            "/webhooks/endpoints/:id",
            get(endpoints::get_endpoint_handler)
                .patch(endpoints::update_endpoint_handler)
                .delete(endpoints::delete_endpoint_handler),
        )
        // Event types
        .route(
            "/webhooks/event-types",
            get(endpoints::list_event_types_handler),
        )
        // Retry
        .route(
            "/webhooks/deliveries/:id/retry",
            post(deliveries::retry_delivery_handler),
        )
        // Pull-based feed
        .route("/polling-feed", get(polling::polling_feed_handler))
        .route_layer(middleware::from_fn_with_state(
            verifier,
            session_auth_middleware,
        ))
        .with_state(state)
}
