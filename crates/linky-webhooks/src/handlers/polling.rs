//! Polling feed for automation platforms without inbound webhook support.

use axum::{
    extract::{Query, State},
    Extension, Json,
};

use crate::auth::OwnerId;
use crate::error::ApiResult;
// Referenced by name in `#[utoipa::path]` responses so the schema `$ref` resolves.
#[allow(unused_imports)]
use crate::error::ErrorResponse;
use crate::models::{PollingFeedResponse, PollingQuery};
use crate::router::WebhooksState;

/// Recent deliveries across all of the caller's endpoints.
#[utoipa::path(
    get,
    path = "/polling-feed",
    tag = "Polling",
    params(PollingQuery),
    responses(
        (status = 200, description = "Recent deliveries, newest first", body = PollingFeedResponse),
        (status = 400, description = "Unknown event type", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
    ),
    security(("bearer_auth" = []))
)]
pub async fn polling_feed_handler(
    State(state): State<WebhooksState>,
    Extension(OwnerId(owner_id)): Extension<OwnerId>,
    Query(query): Query<PollingQuery>,
) -> ApiResult<Json<PollingFeedResponse>> {
    Ok(Json(
        state.polling_service.list_recent(owner_id, query).await?,
    ))
}
