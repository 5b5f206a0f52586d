//! Response DTOs for the admin API
//!
//! Defines the structure of outgoing HTTP response bodies.

use serde::Serialize;

use crate::cache::CacheStats;

/// Statistics of one registered cache (GET /caches/:name)
#[derive(Debug, Clone, Serialize)]
pub struct CacheStatsResponse {
    #[serde(flatten)]
    pub stats: CacheStats,
    /// Hit rate (hits / (hits + misses))
    pub hit_rate: f64,
    pub miss_ratio: f64,
}

impl From<CacheStats> for CacheStatsResponse {
    fn from(stats: CacheStats) -> Self {
        Self {
            hit_rate: stats.hit_rate(),
            miss_ratio: stats.miss_ratio(),
            stats,
        }
    }
}

/// Response body for the cache listing (GET /caches)
#[derive(Debug, Clone, Serialize)]
pub struct CacheListResponse {
    /// Number of live registered caches
    pub count: usize,
    /// Worst miss ratio first
    pub caches: Vec<CacheStatsResponse>,
}

impl CacheListResponse {
    pub fn new(stats: Vec<CacheStats>) -> Self {
        let caches: Vec<CacheStatsResponse> = stats.into_iter().map(Into::into).collect();
        Self {
            count: caches.len(),
            caches,
        }
    }
}

/// Response body for POST /caches/purge
#[derive(Debug, Clone, Serialize)]
pub struct PurgeResponse {
    pub message: String,
    pub cleared: usize,
}

impl PurgeResponse {
    pub fn new(cleared: usize) -> Self {
        Self {
            message: format!("Cleared {} caches", cleared),
            cleared,
        }
    }
}

/// Response body for POST /caches/shed
#[derive(Debug, Clone, Serialize)]
pub struct ShedResponse {
    pub fraction: f64,
    /// Soft values reclaimed by this request
    pub reclaimed: usize,
    /// Entries dropped from caches after draining their queues
    pub purged: usize,
}

impl ShedResponse {
    pub fn new(fraction: f64, reclaimed: usize, purged: usize) -> Self {
        Self {
            fraction,
            reclaimed,
            purged,
        }
    }
}

/// Response body for POST /caches/transaction-stats/reset
#[derive(Debug, Clone, Serialize)]
pub struct ResetResponse {
    pub message: String,
    pub reset: usize,
}

impl ResetResponse {
    pub fn new(reset: usize) -> Self {
        Self {
            message: format!("Reset transaction stats of {} caches", reset),
            reset,
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Error response body for all error conditions
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error message describing what went wrong
    pub error: String,
}

impl ErrorResponse {
    /// Creates a new ErrorResponse
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
