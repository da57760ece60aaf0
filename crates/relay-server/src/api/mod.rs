//! HTTP API for the relay.

mod handlers;
mod middleware;
mod types;

pub use handlers::*;
pub use middleware::{cors_layer, logging_middleware, rate_limit_middleware, RateLimitState};
pub use types::*;

use crate::coordinator::RelayCoordinator;
use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Request coordinator
    pub relay: RelayCoordinator,
}

impl AppState {
    /// Create new application state.
    pub fn new(relay: RelayCoordinator) -> Self {
        Self { relay }
    }
}

/// Create the API router with default rate limiting and permissive CORS.
pub fn create_router(state: AppState) -> Router {
    create_router_with_layers(state, RateLimitState::new(60), CorsLayer::permissive())
}

/// Create the API router with a custom rate limit and CORS policy.
pub fn create_router_with_layers(
    state: AppState,
    rate_limit: RateLimitState,
    cors: CorsLayer,
) -> Router {
    Router::new()
        .route("/query-ai", post(handlers::query_ai))
        .route("/v1/balance/:address", get(handlers::get_balance))
        .layer(axum_middleware::from_fn_with_state(
            rate_limit,
            rate_limit_middleware,
        ))
        // Health check (no rate limiting)
        .route("/health", get(handlers::health))
        .layer(axum_middleware::from_fn(logging_middleware))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
