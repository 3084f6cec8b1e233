//! Linky webhook API server.
//!
//! Serves endpoint management, manual retry and the polling feed, and runs
//! the delivery pipeline in the same process.

mod config;
mod health;
mod logging;
mod metrics;
mod openapi;
mod session;

use std::net::SocketAddr;
use std::sync::Arc;

use linky_db::{run_migrations, DbPool};
use linky_webhooks::{
    webhooks_router, PgWebhookStore, ReqwestTransport, SessionVerifier, WebhookRuntime,
};
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::Config;
use crate::health::{health_routes, HealthState};
use crate::logging::init_logging;
use crate::metrics::{metrics_middleware, metrics_routes, MetricsRegistry, MetricsState};
use crate::openapi::openapi_routes;
use crate::session::PgSessionVerifier;

#[tokio::main]
async fn main() {
    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    init_logging(&config.log_filter, config.log_format);
    info!(environment = %config.app_env, "Starting linky-api");

    let pool = match DbPool::connect(&config.database_url, config.database_max_connections).await
    {
        Ok(p) => p,
        Err(e) => {
            tracing::error!("Failed to connect to database: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = run_migrations(&pool).await {
        tracing::error!("Failed to run migrations: {e}");
        std::process::exit(1);
    }

    let vault = match linky_secrets::build_vault(&config.secrets).await {
        Ok(v) => v,
        Err(e) => {
            tracing::error!("Failed to initialize secret vault: {e}");
            std::process::exit(1);
        }
    };

    let transport = match ReqwestTransport::new(
        config.webhooks.delivery_timeout,
        config.webhooks.response_body_limit,
    ) {
        Ok(t) => Arc::new(t),
        Err(e) => {
            tracing::error!("Failed to build webhook HTTP client: {e}");
            std::process::exit(1);
        }
    };

    let store = Arc::new(PgWebhookStore::new(&pool));
    let runtime = WebhookRuntime::start(store, vault.clone(), transport, config.webhooks.clone());

    let metrics_registry = Arc::new(MetricsRegistry::new(&runtime.metrics()));

    let verifier: Arc<dyn SessionVerifier> = Arc::new(PgSessionVerifier::new(pool.clone()));

    let app = webhooks_router(runtime.state(), verifier)
        .merge(health_routes(HealthState {
            pool: Some(pool.clone()),
            vault,
        }))
        .merge(metrics_routes(MetricsState {
            registry: metrics_registry.clone(),
            pool: Some(pool.clone()),
        }))
        .merge(openapi_routes())
        .layer(axum::middleware::from_fn_with_state(
            metrics_registry,
            metrics_middleware,
        ))
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = match config.bind_address().parse() {
        Ok(a) => a,
        Err(e) => {
            tracing::error!("Invalid bind address {}: {e}", config.bind_address());
            std::process::exit(1);
        }
    };

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!("Failed to bind to address {addr}: {e}");
            std::process::exit(1);
        }
    };
    info!(%addr, "Server listening");

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!("Server error: {e}");
    }

    info!("HTTP server stopped, draining webhook deliveries");
    runtime.shutdown().await;
    info!("Shutdown complete");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {e}");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received Ctrl+C, initiating graceful shutdown"),
        () = terminate => info!("Received SIGTERM, initiating graceful shutdown"),
    }
}
