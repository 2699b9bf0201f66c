//! REST API for the monitor engine
//!
//! ## Endpoints
//!
//! - `GET /api/v1/health` - Health check
//! - `GET /api/v1/monitoring/status` - Engine status
//! - `POST /api/v1/monitoring/check` - Run a check cycle now
//! - `POST /api/v1/monitoring/pause` / `resume` - Toggle scheduled checks
//! - `GET|PUT /api/v1/monitoring/config` - Monitor configuration
//! - `GET /api/v1/metrics` - Fleet metrics, filterable by server or pool
//! - `GET|POST /api/v1/servers`, `GET|PUT|DELETE /api/v1/servers/{id}` - Server registry
//! - `POST /api/v1/servers/{id}/test` - Probe one server now
//! - `GET /api/v1/servers/{id}/stats` / `samples` - Rolling stats and history
//! - `GET|POST /api/v1/pools`, `GET|PUT|DELETE /api/v1/pools/{id}` - Pool registry
//! - `POST /api/v1/pools/{id}/test`, `GET /api/v1/pools/{id}/stats`
//! - `GET /api/v1/alerts`, `GET /api/v1/alerts/{id}` - Alert listing
//! - `POST /api/v1/alerts/{id}/acknowledge` / `resolve` / `dismiss` - Lifecycle
//! - `GET|PUT /api/v1/alerts/config` - Alert rule configuration

#[cfg(feature = "api")]
pub mod error;
#[cfg(feature = "api")]
pub mod routes;
#[cfg(feature = "api")]
pub mod state;

#[cfg(feature = "api")]
pub use error::{ApiError, ApiResult};
#[cfg(feature = "api")]
pub use state::ApiState;

#[cfg(feature = "api")]
use axum::{
    Router,
    routing::{get, post},
};
use std::net::SocketAddr;
use tracing::info;

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Bind address (e.g., "0.0.0.0:8080")
    pub bind_addr: SocketAddr,

    /// Enable CORS for dashboards
    pub enable_cors: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".parse().unwrap(),
            enable_cors: true,
        }
    }
}

/// Spawn the API server
///
/// Starts an Axum HTTP server in a background task and returns the
/// server's local address.
#[cfg(feature = "api")]
pub async fn spawn_api_server(config: ApiConfig, state: ApiState) -> anyhow::Result<SocketAddr> {
    use tower_http::cors::{Any, CorsLayer};
    use tower_http::trace::TraceLayer;

    info!("starting API server on {}", config.bind_addr);

    let mut app = Router::new()
        .route("/api/v1/health", get(routes::monitoring::health_check))
        .route("/api/v1/monitoring/status", get(routes::monitoring::status))
        .route("/api/v1/monitoring/check", post(routes::monitoring::check_now))
        .route("/api/v1/monitoring/pause", post(routes::monitoring::pause))
        .route("/api/v1/monitoring/resume", post(routes::monitoring::resume))
        .route("/api/v1/metrics", get(routes::monitoring::metrics))
        .route(
            "/api/v1/monitoring/config",
            get(routes::monitoring::get_config).put(routes::monitoring::update_config),
        )
        .route(
            "/api/v1/servers",
            get(routes::servers::list_servers).post(routes::servers::create_server),
        )
        .route(
            "/api/v1/servers/:id",
            get(routes::servers::get_server)
                .put(routes::servers::update_server)
                .delete(routes::servers::delete_server),
        )
        .route("/api/v1/servers/:id/test", post(routes::servers::test_server))
        .route("/api/v1/servers/:id/stats", get(routes::servers::server_stats))
        .route(
            "/api/v1/servers/:id/samples",
            get(routes::servers::server_samples),
        )
        .route(
            "/api/v1/pools",
            get(routes::pools::list_pools).post(routes::pools::create_pool),
        )
        .route(
            "/api/v1/pools/:id",
            get(routes::pools::get_pool)
                .put(routes::pools::update_pool)
                .delete(routes::pools::delete_pool),
        )
        .route("/api/v1/pools/:id/test", post(routes::pools::test_pool))
        .route("/api/v1/pools/:id/stats", get(routes::pools::pool_stats))
        .route("/api/v1/alerts", get(routes::alerts::list_alerts))
        .route(
            "/api/v1/alerts/config",
            get(routes::alerts::get_config).put(routes::alerts::update_config),
        )
        .route("/api/v1/alerts/:id", get(routes::alerts::get_alert))
        .route(
            "/api/v1/alerts/:id/acknowledge",
            post(routes::alerts::acknowledge),
        )
        .route("/api/v1/alerts/:id/resolve", post(routes::alerts::resolve))
        .route("/api/v1/alerts/:id/dismiss", post(routes::alerts::dismiss))
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    if config.enable_cors {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
        app = app.layer(cors);
    }

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    let addr = listener.local_addr()?;

    info!("API server listening on {}", addr);

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!("API server error: {}", e);
        }
    });

    Ok(addr)
}
