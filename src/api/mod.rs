//! API Module
//!
//! HTTP handlers and routing for the cache admin API.
//!
//! # Endpoints
//! - `GET /health` - Health check endpoint
//! - `GET /caches` - List cache statistics
//! - `GET /caches/:name` - Statistics for one cache name
//! - `POST /caches/purge` - Clear every registered cache
//! - `POST /caches/shed` - Simulate memory pressure
//! - `POST /caches/transaction-stats/reset` - Reset scoped counters

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
