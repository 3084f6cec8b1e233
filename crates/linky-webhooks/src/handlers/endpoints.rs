//! CRUD handlers for webhook endpoints.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use uuid::Uuid;

use crate::auth::OwnerId;
use crate::error::ApiResult;
// Referenced by name in `#[utoipa::path]` responses so the schema `$ref` resolves.
#[allow(unused_imports)]
use crate::error::ErrorResponse;
use crate::models::{
    CreateEndpointRequest, CreateEndpointResponse, EndpointDetailResponse, EndpointListResponse,
    EndpointResponse, EventTypeListResponse, UpdateEndpointRequest,
};
use crate::router::WebhooksState;

// ---------------------------------------------------------------------------
// Endpoint CRUD handlers
// ---------------------------------------------------------------------------

/// Register a new webhook endpoint.
///
/// The response carries the signing secret. It is shown only here.
#[utoipa::path(
    post,
    path = "/webhooks/endpoints",
    tag = "Webhooks",
    request_body = CreateEndpointRequest,
    responses(
        (status = 201, description = "Endpoint registered", body = CreateEndpointResponse),
        (status = 400, description = "Validation error", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 503, description = "Secret vault unavailable", body = ErrorResponse),
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_endpoint_handler(
    State(state): State<WebhooksState>,
    Extension(OwnerId(owner_id)): Extension<OwnerId>,
    Json(request): Json<CreateEndpointRequest>,
) -> ApiResult<(StatusCode, Json<CreateEndpointResponse>)> {
    let response = state.endpoint_service.register(owner_id, request).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// List the caller's endpoints and the subscribable event types.
#[utoipa::path(
    get,
    path = "/webhooks/endpoints",
    tag = "Webhooks",
    responses(
        (status = 200, description = "Endpoints, newest first", body = EndpointListResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_endpoints_handler(
    State(state): State<WebhooksState>,
    Extension(OwnerId(owner_id)): Extension<OwnerId>,
) -> ApiResult<Json<EndpointListResponse>> {
    Ok(Json(state.endpoint_service.list(owner_id).await?))
}

/// Get an endpoint with its recent deliveries.
#[utoipa::path(
    get,
    path = "/webhooks/endpoints/{id}",
    tag = "Webhooks",
    params(("id" = Uuid, Path, description = "Endpoint ID")),
    responses(
        (status = 200, description = "Endpoint details", body = EndpointDetailResponse),
        (status = 404, description = "Endpoint not found", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_endpoint_handler(
    State(state): State<WebhooksState>,
    Extension(OwnerId(owner_id)): Extension<OwnerId>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<EndpointDetailResponse>> {
    Ok(Json(state.endpoint_service.get(owner_id, id).await?))
}

/// Update url, events or active flag.
#[utoipa::path(
    patch,
    path = "/webhooks/endpoints/{id}",
    tag = "Webhooks",
    params(("id" = Uuid, Path, description = "Endpoint ID")),
    request_body = UpdateEndpointRequest,
    responses(
        (status = 200, description = "Endpoint updated", body = EndpointResponse),
        (status = 400, description = "Validation error", body = ErrorResponse),
        (status = 404, description = "Endpoint not found", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_endpoint_handler(
    State(state): State<WebhooksState>,
    Extension(OwnerId(owner_id)): Extension<OwnerId>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateEndpointRequest>,
) -> ApiResult<Json<EndpointResponse>> {
    Ok(Json(
        state.endpoint_service.update(owner_id, id, request).await?,
    ))
}

/// Delete an endpoint and its delivery history.
#[utoipa::path(
    delete,
    path = "/webhooks/endpoints/{id}",
    tag = "Webhooks",
    params(("id" = Uuid, Path, description = "Endpoint ID")),
    responses(
        (status = 204, description = "Endpoint deleted"),
        (status = 404, description = "Endpoint not found", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_endpoint_handler(
    State(state): State<WebhooksState>,
    Extension(OwnerId(owner_id)): Extension<OwnerId>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.endpoint_service.remove(owner_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Event types
// ---------------------------------------------------------------------------

/// List all event types an endpoint can subscribe to.
#[utoipa::path(
    get,
    path = "/webhooks/event-types",
    tag = "Webhooks",
    responses(
        (status = 200, description = "Event types", body = EventTypeListResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_event_types_handler() -> Json<EventTypeListResponse> {
    Json(EventTypeListResponse::all())
}
