//! Cache Statistics Module
//!
//! Per-instance usage counters and the immutable snapshots built from them.

use std::cmp::Ordering as CmpOrdering;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

// == Stats Counter ==
/// One set of monotonically increasing usage counters.
#[derive(Debug, Default)]
pub struct StatsCounter {
    gets: AtomicU64,
    misses: AtomicU64,
    puts: AtomicU64,
    expirations: AtomicU64,
    removes: AtomicU64,
    clears: AtomicU64,
    /// High-water mark of the entry count
    max_size: AtomicU64,
}

impl StatsCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_get(&self) {
        self.gets.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    /// Counts a put and raises the high-water mark to `size` if needed.
    pub fn record_put(&self, size: usize) {
        self.puts.fetch_add(1, Ordering::Relaxed);
        self.max_size.fetch_max(size as u64, Ordering::Relaxed);
    }

    pub fn record_expiration(&self) {
        self.expirations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_remove(&self) {
        self.removes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_clear(&self) {
        self.clears.fetch_add(1, Ordering::Relaxed);
    }

    /// Zeroes every counter.
    pub fn reset(&self) {
        for counter in [
            &self.gets,
            &self.misses,
            &self.puts,
            &self.expirations,
            &self.removes,
            &self.clears,
            &self.max_size,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }

    /// Point-in-time snapshot of the counters.
    pub fn snapshot(
        &self,
        description: impl Into<String>,
        size: usize,
        limit: Option<usize>,
    ) -> CacheStats {
        let gets = self.gets.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        CacheStats {
            description: description.into(),
            hits: gets.saturating_sub(misses),
            misses,
            puts: self.puts.load(Ordering::Relaxed),
            expirations: self.expirations.load(Ordering::Relaxed),
            removes: self.removes.load(Ordering::Relaxed),
            clears: self.clears.load(Ordering::Relaxed),
            size,
            max_size: self.max_size.load(Ordering::Relaxed) as usize,
            limit,
        }
    }
}

// == Stats Tracker ==
/// Live counters plus an independently resettable scoped set.
///
/// Every recorded event lands in both sets.
#[derive(Debug, Default)]
pub struct StatsTracker {
    live: StatsCounter,
    transaction: StatsCounter,
}

impl StatsTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_get(&self) {
        self.live.record_get();
        self.transaction.record_get();
    }

    pub fn record_miss(&self) {
        self.live.record_miss();
        self.transaction.record_miss();
    }

    pub fn record_put(&self, size: usize) {
        self.live.record_put(size);
        self.transaction.record_put(size);
    }

    pub fn record_expiration(&self) {
        self.live.record_expiration();
        self.transaction.record_expiration();
    }

    pub fn record_remove(&self) {
        self.live.record_remove();
        self.transaction.record_remove();
    }

    pub fn record_clear(&self) {
        self.live.record_clear();
        self.transaction.record_clear();
    }

    pub fn live(&self) -> &StatsCounter {
        &self.live
    }

    pub fn transaction(&self) -> &StatsCounter {
        &self.transaction
    }

    /// Restarts the scoped counter set.
    pub fn reset_transaction(&self) {
        self.transaction.reset();
    }
}

// == Cache Stats ==
/// Immutable snapshot of one cache's counters.
///
/// Snapshots order by miss ratio, highest first, so sorting a list of them
/// puts the worst-performing cache at the front. Ties fall back to the
/// description.
#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub description: String,
    pub hits: u64,
    /// Gets that found nothing live
    pub misses: u64,
    pub puts: u64,
    /// Entries evicted by policy, found expired, or reclaimed
    pub expirations: u64,
    pub removes: u64,
    pub clears: u64,
    /// Entry count when the snapshot was taken
    pub size: usize,
    /// Largest entry count observed
    pub max_size: usize,
    /// Configured size bound (None = unlimited)
    pub limit: Option<usize>,
}

impl CacheStats {
    pub fn gets(&self) -> u64 {
        self.hits + self.misses
    }

    /// Misses over total gets, or 0.0 if nothing was read.
    pub fn miss_ratio(&self) -> f64 {
        let total = self.gets();
        if total == 0 {
            0.0
        } else {
            self.misses as f64 / total as f64
        }
    }

    /// Hits over total gets, or 0.0 if nothing was read.
    pub fn hit_rate(&self) -> f64 {
        let total = self.gets();
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

impl Ord for CacheStats {
    fn cmp(&self, other: &Self) -> CmpOrdering {
        other
            .miss_ratio()
            .total_cmp(&self.miss_ratio())
            .then_with(|| self.description.cmp(&other.description))
    }
}

impl PartialOrd for CacheStats {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for CacheStats {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == CmpOrdering::Equal
    }
}

impl Eq for CacheStats {}
