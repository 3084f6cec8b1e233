//! Delivery retry handler.

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
use crate::models::RetryResponse;
use crate::router::WebhooksState;

/// Reset a delivery and queue it for another attempt.
#[utoipa::path(
    post,
    path = "/webhooks/deliveries/{id}/retry",
    tag = "Webhooks",
    params(("id" = Uuid, Path, description = "Delivery ID")),
    responses(
        (status = 202, description = "Retry queued", body = RetryResponse),
        (status = 404, description = "Delivery not found", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 503, description = "Delivery queue full", body = ErrorResponse),
    ),
    security(("bearer_auth" = []))
)]
pub async fn retry_delivery_handler(
    State(state): State<WebhooksState>,
    Extension(OwnerId(owner_id)): Extension<OwnerId>,
    Path(id): Path<Uuid>,
) -> ApiResult<(StatusCode, Json<RetryResponse>)> {
    let response = state.retry_service.retry(owner_id, id).await?;
    Ok((StatusCode::ACCEPTED, Json(response)))
}
