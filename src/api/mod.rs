//! HTTP surface built on axum.
//!
//! Serves the follow-up sweep for an external scheduler and an
//! unauthenticated health probe:
//! - `GET /api/cron/seguimientos` (bearer auth)
//! - `GET /health`

pub mod auth;
pub mod handlers;

use crate::{
    config::settings::ServerConfig,
    errors::{Error, Result},
    notify::Dispatcher,
};
use axum::{Router, middleware as axum_middleware, routing::get};
use sea_orm::DatabaseConnection;
use tracing::info;

pub use auth::AuthConfig;

/// Path of the sweep endpoint.
pub const SWEEP_PATH: &str = "/api/cron/seguimientos";

/// Shared state for axum request handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: DatabaseConnection,
    /// Outbound gateways used by the sweep
    pub dispatcher: Dispatcher,
    /// Bearer token expected on cron routes
    pub auth: AuthConfig,
}

/// Builds the application router.
pub fn router(state: AppState) -> Router {
    let cron_routes = Router::new()
        .route(SWEEP_PATH, get(handlers::run_follow_up_sweep))
        .route_layer(axum_middleware::from_fn_with_state(
            state.auth.clone(),
            auth::require_bearer,
        ))
        .with_state(state);

    Router::new()
        .route("/health", get(handlers::health))
        .merge(cron_routes)
}

/// Binds the listener and serves until the process is stopped.
pub async fn serve(config: &ServerConfig, state: AppState) -> Result<()> {
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on {addr}");

    axum::serve(listener, router(state))
        .await
        .map_err(Error::from)
}
