//! API Handlers
//!
//! HTTP request handlers for each admin endpoint.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use tracing::info;

use crate::cache::CacheRegistry;
use crate::error::{CacheError, Result};
use crate::models::{
    CacheListResponse, CacheStatsResponse, HealthResponse, PurgeResponse, ResetResponse,
    ShedRequest, ShedResponse,
};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Registry of every cache the process created
    pub registry: Arc<CacheRegistry>,
}

impl AppState {
    pub fn new(registry: Arc<CacheRegistry>) -> Self {
        Self { registry }
    }
}

/// Handler for GET /caches
///
/// Lists every live cache, worst miss ratio first.
pub async fn list_caches_handler(State(state): State<AppState>) -> Json<CacheListResponse> {
    Json(CacheListResponse::new(state.registry.cache_stats()))
}

/// Handler for GET /caches/:name
///
/// Caches sharing a name are all returned.
pub async fn cache_stats_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<Vec<CacheStatsResponse>>> {
    let found = state.registry.find(&name);
    if found.is_empty() {
        return Err(CacheError::NotFound(format!("No cache named '{}'", name)));
    }

    let stats = found
        .iter()
        .map(|cache| CacheStatsResponse::from(cache.cache_stats()))
        .collect();
    Ok(Json(stats))
}

/// Handler for POST /caches/purge
pub async fn purge_handler(State(state): State<AppState>) -> Json<PurgeResponse> {
    let cleared = state.registry.purge_all_caches();
    Json(PurgeResponse::new(cleared))
}

/// Handler for POST /caches/shed
///
/// Reclaims a fraction of soft values, oldest first, then drains each
/// cache's notification queue so the dead entries are unlinked right away.
pub async fn shed_handler(
    State(state): State<AppState>,
    Json(req): Json<ShedRequest>,
) -> Result<Json<ShedResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidArgument(error_msg));
    }

    let reclaimed = state.registry.memory_pressure().shed(req.fraction)?;
    let purged: usize = state
        .registry
        .list_known_caches()
        .iter()
        .map(|cache| cache.purge())
        .sum();
    info!(
        "Shed {} soft values on request, {} entries purged",
        reclaimed, purged
    );

    Ok(Json(ShedResponse::new(req.fraction, reclaimed, purged)))
}

/// Handler for POST /caches/transaction-stats/reset
pub async fn reset_transaction_stats_handler(
    State(state): State<AppState>,
) -> Json<ResetResponse> {
    let reset = state.registry.reset_transaction_stats();
    Json(ResetResponse::new(reset))
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
