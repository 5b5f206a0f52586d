//! API Routes
//!
//! Configures the Axum router with all admin endpoints.

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    cache_stats_handler, health_handler, list_caches_handler, purge_handler,
    reset_transaction_stats_handler, shed_handler, AppState,
};
use crate::cache::CacheRegistry;

/// Creates the admin router over `registry`.
///
/// # Endpoints
/// - `GET /health` - Health check endpoint
/// - `GET /caches` - Statistics of every cache, worst miss ratio first
/// - `GET /caches/:name` - Statistics of the caches with that name
/// - `POST /caches/purge` - Clear every cache
/// - `POST /caches/shed` - Reclaim a fraction of soft values
/// - `POST /caches/transaction-stats/reset` - Restart scoped counters
///
/// # Middleware
/// - CORS: Allows any origin
/// - Tracing: Logs all requests for debugging
pub fn create_router(registry: Arc<CacheRegistry>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/caches", get(list_caches_handler))
        .route("/caches/purge", post(purge_handler))
        .route("/caches/shed", post(shed_handler))
        .route(
            "/caches/transaction-stats/reset",
            post(reset_transaction_stats_handler),
        )
        .route("/caches/:name", get(cache_stats_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(AppState::new(registry))
}
