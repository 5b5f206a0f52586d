//! Cache Registry Module
//!
//! Explicit registry of live cache instances, handed to every cache at
//! construction. Also carries the clock and memory manager those caches share.

use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::info;

use crate::cache::{CacheStats, Clock, MemoryPressure, SystemClock};

// == Known Cache ==
/// Type-erased view of a registered cache.
pub trait KnownCache: Send + Sync {
    fn debug_name(&self) -> &str;
    fn size(&self) -> usize;
    fn clear(&self);
    /// Drains pending reclamation notifications.
    fn purge(&self) -> usize;
    fn cache_stats(&self) -> CacheStats;
    fn transaction_cache_stats(&self) -> CacheStats;
    fn reset_transaction_stats(&self);
}

// == Cache Registry ==
/// Registry of every cache created against it.
///
/// Registrations are append-only. Dropped caches leave a dead handle behind,
/// which enumeration skips; the cached values themselves are freed.
pub struct CacheRegistry {
    caches: Mutex<Vec<Weak<dyn KnownCache>>>,
    pressure: Arc<MemoryPressure>,
    clock: Arc<dyn Clock>,
}

impl CacheRegistry {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Creates a registry whose caches read time from `clock`.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            caches: Mutex::new(Vec::new()),
            pressure: Arc::new(MemoryPressure::new()),
            clock,
        }
    }

    pub(crate) fn register(&self, cache: Weak<dyn KnownCache>) {
        self.caches.lock().push(cache);
    }

    // == Purge All ==
    /// Clears every live registered cache. Returns how many were cleared.
    pub fn purge_all_caches(&self) -> usize {
        let caches = self.list_known_caches();
        for cache in &caches {
            cache.clear();
        }
        info!("Purged all caches: {} cleared", caches.len());
        caches.len()
    }

    // == List ==
    /// Snapshot of the live registered caches, in registration order.
    pub fn list_known_caches(&self) -> Vec<Arc<dyn KnownCache>> {
        self.caches
            .lock()
            .iter()
            .filter_map(Weak::upgrade)
            .collect()
    }

    /// Live caches registered under `name`.
    pub fn find(&self, name: &str) -> Vec<Arc<dyn KnownCache>> {
        self.list_known_caches()
            .into_iter()
            .filter(|cache| cache.debug_name() == name)
            .collect()
    }

    /// Statistics of every live cache, worst miss ratio first.
    pub fn cache_stats(&self) -> Vec<CacheStats> {
        let mut stats: Vec<CacheStats> = self
            .list_known_caches()
            .iter()
            .map(|cache| cache.cache_stats())
            .collect();
        stats.sort();
        stats
    }

    /// Restarts the scoped counters of every live cache.
    pub fn reset_transaction_stats(&self) -> usize {
        let caches = self.list_known_caches();
        for cache in &caches {
            cache.reset_transaction_stats();
        }
        caches.len()
    }

    pub fn memory_pressure(&self) -> &Arc<MemoryPressure> {
        &self.pressure
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }
}

impl Default for CacheRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CacheRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheRegistry")
            .field("registered", &self.caches.lock().len())
            .field("pressure", &self.pressure)
            .finish()
    }
}
