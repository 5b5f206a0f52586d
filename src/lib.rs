//! Cachemap - bounded, time-aware, LRU-ordered in-process caches
//!
//! Provides thread-safe cache maps with TTL expiration, pluggable eviction,
//! memory-pressure reclamation and per-instance statistics, plus an admin
//! HTTP surface over the cache registry.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod tasks;

pub use api::AppState;
pub use cache::{CacheMap, CacheRegistry, CacheStats, ReadOnlyCacheMap};
pub use config::Config;
pub use error::CacheError;
pub use tasks::spawn_pressure_monitor;
