//! Cache Module
//!
//! Bounded, time-aware, LRU-ordered cache maps with usage statistics.
//!
//! Layering, leaf first: [`EntryStore`] (hash buckets + recency list),
//! [`EvictionPolicy`] (post-insertion hook), [`TtlStore`] (deadlines,
//! reclaimable values, counters) and [`CacheMap`] (locking facade that
//! registers with a [`CacheRegistry`]).

use std::time::Duration;

mod clock;
mod entry;
mod map;
mod policy;
mod reclaim;
mod registry;
mod stats;
mod store;
mod ttl;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use clock::{Clock, MockClock, SystemClock};
pub use entry::{Entry, EntryId, Held, Liveness, Timed, Ttl};
pub use map::{CacheMap, ReadOnlyCacheMap};
pub use policy::{EvictionContext, EvictionPolicy, NeverEvict, SizeBound, SizeOrExpired};
pub use reclaim::{MemoryPressure, ReclaimQueue, Reclaimable, SoftValue};
pub use registry::{CacheRegistry, KnownCache};
pub use stats::{CacheStats, StatsCounter, StatsTracker};
pub use store::{EntryStore, Insertion, Iter};
pub use ttl::{validate_ttl, TtlStore};

// == Public Constants ==
pub const SECOND: Duration = Duration::from_secs(1);
pub const MINUTE: Duration = Duration::from_secs(60);
pub const HOUR: Duration = Duration::from_secs(60 * 60);
pub const DAY: Duration = Duration::from_secs(24 * 60 * 60);

/// Longest TTL accepted; anything above is treated as a caller error.
pub const MAX_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Max size meaning "no size bound".
pub const UNLIMITED: usize = usize::MAX;
