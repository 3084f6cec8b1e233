//! Prometheus metrics collection and exposition.
//!
//! HTTP request counters and latency histograms labeled by method, route
//! pattern and status, the webhook delivery outcome counters, and a
//! `/metrics` endpoint in the Prometheus text format. Database pool gauges
//! are read when the endpoint is scraped.

use std::fmt::Write;
use std::sync::{Arc, Mutex, PoisonError};

use axum::{
    body::Body,
    extract::{MatchedPath, State},
    http::{header, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use linky_db::DbPool;
use linky_webhooks::DeliveryMetrics;
use prometheus_client::{
    encoding::EncodeLabelSet,
    metrics::{counter::Counter, family::Family, histogram::Histogram},
    registry::Registry,
};

/// Labels for HTTP request metrics.
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct HttpRequestLabels {
    pub method: String,
    pub route: String,
    pub status: u16,
}

pub struct HttpMetrics {
    pub requests_total: Family<HttpRequestLabels, Counter>,
    pub request_duration_seconds: Family<HttpRequestLabels, Histogram>,
}

impl HttpMetrics {
    fn new() -> Self {
        Self {
            requests_total: Family::default(),
            request_duration_seconds: Family::new_with_constructor(|| {
                Histogram::new(
                    [
                        0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
                    ]
                    .into_iter(),
                )
            }),
        }
    }
}

/// Owns the process registry. Shared by the middleware and the handler.
pub struct MetricsRegistry {
    pub registry: Mutex<Registry>,
    pub http: Arc<HttpMetrics>,
}

impl MetricsRegistry {
    /// Create the registry with HTTP metrics and the given delivery counters.
    #[must_use]
    pub fn new(delivery: &DeliveryMetrics) -> Self {
        let mut registry = Registry::default();
        let http = Arc::new(HttpMetrics::new());

        registry.register(
            "http_requests",
            "Total number of HTTP requests",
            http.requests_total.clone(),
        );
        registry.register(
            "http_request_duration_seconds",
            "HTTP request duration in seconds",
            http.request_duration_seconds.clone(),
        );
        delivery.register(&mut registry);

        Self {
            registry: Mutex::new(registry),
            http,
        }
    }

    fn encode(&self) -> Result<String, std::fmt::Error> {
        let mut buf = String::new();
        let registry = self
            .registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        prometheus_client::encoding::text::encode(&mut buf, &registry)?;
        Ok(buf)
    }
}

#[derive(Clone)]
pub struct MetricsState {
    pub registry: Arc<MetricsRegistry>,
    /// `None` when running without a database, as in tests.
    pub pool: Option<DbPool>,
}

/// Route serving `GET /metrics`.
pub fn metrics_routes(state: MetricsState) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(state)
}

/// Records request count and duration.
///
/// Uses the matched route pattern as the `route` label so path parameters
/// do not inflate cardinality. Requests that match no route use `unmatched`.
pub async fn metrics_middleware(
    State(metrics): State<Arc<MetricsRegistry>>,
    matched_path: Option<MatchedPath>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let method = request.method().to_string();
    let route = matched_path
        .as_ref()
        .map_or_else(|| "unmatched".to_string(), |m| m.as_str().to_string());

    let start = std::time::Instant::now();
    let response = next.run(request).await;
    let duration = start.elapsed().as_secs_f64();

    let labels = HttpRequestLabels {
        method,
        route,
        status: response.status().as_u16(),
    };

    metrics.http.requests_total.get_or_create(&labels).inc();
    metrics
        .http
        .request_duration_seconds
        .get_or_create(&labels)
        .observe(duration);

    response
}

async fn metrics_handler(State(state): State<MetricsState>) -> impl IntoResponse {
    let mut buf = match state.registry.encode() {
        Ok(buf) => buf,
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode metrics");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to encode metrics",
            )
                .into_response();
        }
    };

    if let Some(pool) = &state.pool {
        let pool_size = i64::from(pool.inner().size());
        let pool_idle = i64::try_from(pool.inner().num_idle()).unwrap_or(i64::MAX);
        let pool_active = pool_size - pool_idle;

        let _ = writeln!(
            buf,
            "# HELP db_pool_connections_active Number of active database connections"
        );
        let _ = writeln!(buf, "# TYPE db_pool_connections_active gauge");
        let _ = writeln!(buf, "db_pool_connections_active {pool_active}");
        let _ = writeln!(
            buf,
            "# HELP db_pool_connections_idle Number of idle database connections"
        );
        let _ = writeln!(buf, "# TYPE db_pool_connections_idle gauge");
        let _ = writeln!(buf, "db_pool_connections_idle {pool_idle}");
    }

    (
        StatusCode::OK,
        [(
            header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        buf,
    )
        .into_response()
}
