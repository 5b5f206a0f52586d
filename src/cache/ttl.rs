//! Time-Aware Store Module
//!
//! Adds expiration deadlines, reclaimable values and usage statistics on top
//! of the entry store. Not synchronized; [`CacheMap`](crate::cache::CacheMap)
//! wraps it in a lock.

use std::borrow::Borrow;
use std::hash::Hash;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::cache::{
    CacheStats, Clock, EntryId, EntryStore, EvictionPolicy, Held, Liveness, MemoryPressure, ReclaimQueue,
    StatsTracker, Timed, Ttl, MAX_TTL,
};
use crate::error::{CacheError, Result};

// == Ttl Store ==
/// Entry store whose values carry deadlines and may be reclaimed.
#[derive(Debug)]
pub struct TtlStore<K, V> {
    store: EntryStore<K, Timed<V>>,
    default_ttl: Ttl,
    /// Present when values are held softly
    reclaim: Option<ReclaimQueue>,
    clock: Arc<dyn Clock>,
    stats: StatsTracker,
}

impl<K, V> TtlStore<K, V>
where
    K: Hash + Eq,
    V: Clone + Send + 'static,
{
    // == Constructor ==
    /// Creates a store.
    ///
    /// With `pressure` set, every value is held through a soft indirection
    /// tracked by that memory manager; otherwise values are held strongly.
    pub fn new(
        capacity_hint: usize,
        default_ttl: Ttl,
        policy: Box<dyn EvictionPolicy<K, Timed<V>>>,
        clock: Arc<dyn Clock>,
        pressure: Option<Arc<MemoryPressure>>,
    ) -> Result<Self> {
        validate_ttl(default_ttl)?;
        Ok(Self {
            store: EntryStore::new(capacity_hint, policy, clock.clone()),
            default_ttl,
            reclaim: pressure.map(ReclaimQueue::new),
            clock,
            stats: StatsTracker::new(),
        })
    }

    // == Get ==
    /// Returns the live value for `key`.
    ///
    /// An entry found expired or reclaimed is removed on the spot, counted
    /// as an expiration and reported as a miss.
    pub fn get<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.purge();
        self.stats.record_get();

        let Some(id) = self.store.find(key) else {
            self.stats.record_miss();
            return None;
        };

        let now = self.clock.now();
        let live = self
            .store
            .get(id)
            .filter(|entry| entry.value().is_live(now))
            .and_then(|entry| entry.value().value());

        if live.is_none() {
            self.store.remove_entry(id);
            self.stats.record_expiration();
            if self.store.evict_check().is_some() {
                self.stats.record_expiration();
            }
            self.stats.record_miss();
        }
        live
    }

    /// Returns the live value for `key` without touching recency or counters.
    pub fn peek<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let now = self.clock.now();
        self.store
            .peek(key)
            .and_then(|id| self.store.get(id))
            .filter(|entry| entry.value().is_live(now))
            .and_then(|entry| entry.value().value())
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let now = self.clock.now();
        self.store
            .peek(key)
            .and_then(|id| self.store.get(id))
            .is_some_and(|entry| entry.value().is_live(now))
    }

    // == Put ==
    /// Stores `value` under the default TTL, returning the previous live value.
    pub fn put(&mut self, key: K, value: V) -> Option<V> {
        self.insert(key, value, self.default_ttl)
    }

    /// Stores `value` with an explicit TTL.
    ///
    /// TTLs above [`MAX_TTL`] are rejected as a likely caller error.
    pub fn put_with_ttl(&mut self, key: K, value: V, ttl: Ttl) -> Result<Option<V>> {
        validate_ttl(ttl)?;
        Ok(self.insert(key, value, ttl))
    }

    fn insert(&mut self, key: K, value: V, ttl: Ttl) -> Option<V> {
        self.purge();
        let expires_at = ttl.deadline(self.clock.now());

        // The value moves into whichever branch builds the payload.
        let mut pending = Some(value);
        let reclaim = self.reclaim.as_ref();
        let insertion = self.store.find_or_add(key, |id| {
            let value = pending.take().unwrap_or_else(|| unreachable!("value consumed twice"));
            Timed::new(hold(reclaim, value, id), expires_at)
        });

        let previous = match pending {
            Some(value) => {
                let now = self.clock.now();
                let held = hold(self.reclaim.as_ref(), value, insertion.id);
                self.store.get_mut(insertion.id).and_then(|entry| {
                    let old = std::mem::replace(&mut entry.value, Timed::new(held, expires_at));
                    if old.is_live(now) {
                        old.into_value()
                    } else {
                        None
                    }
                })
            }
            None => None,
        };

        if insertion.evicted.is_some() {
            self.stats.record_expiration();
        }
        self.stats.record_put(self.store.len());
        previous
    }

    // == Remove ==
    /// Removes `key`, returning its value if it was still live.
    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.purge();
        self.stats.record_remove();
        let now = self.clock.now();
        let (_, timed) = self.store.remove(key)?.into_parts();
        if timed.is_live(now) {
            timed.into_value()
        } else {
            None
        }
    }

    // == Remove Using Prefix ==
    /// Removes every entry whose key starts with `prefix`.
    ///
    /// Walks the whole recency list once; entries found dead along the way
    /// are dropped too. Returns how many entries matched the prefix.
    pub fn remove_using_prefix(&mut self, prefix: &str) -> usize
    where
        K: AsRef<str>,
    {
        let now = self.clock.now();
        let mut matched = 0;
        let mut expired = 0;

        for id in self.store.ids() {
            let Some(entry) = self.store.get(id) else {
                continue;
            };
            if !entry.value().is_live(now) {
                self.store.remove_entry(id);
                self.stats.record_expiration();
                expired += 1;
            } else if entry.key().as_ref().starts_with(prefix) {
                self.store.remove_entry(id);
                self.stats.record_remove();
                matched += 1;
            }
        }

        debug!(
            "Prefix removal '{}': {} removed, {} expired",
            prefix, matched, expired
        );
        matched
    }

    // == Clear ==
    /// Releases every held value, then drops all entries.
    pub fn clear(&mut self) {
        for (_, entry) in self.store.iter() {
            entry.value().release();
        }
        self.store.clear();
        if let Some(reclaim) = &self.reclaim {
            // Notifications for released slots are stale now.
            reclaim.drain();
        }
        self.stats.record_clear();
    }

    // == Purge ==
    /// Unlinks entries whose values the memory manager reclaimed.
    ///
    /// Returns the number of entries removed.
    pub fn purge(&mut self) -> usize {
        let Some(reclaim) = &self.reclaim else {
            return 0;
        };

        let mut purged = 0;
        for id in reclaim.drain() {
            let reclaimed = self
                .store
                .get(id)
                .is_some_and(|entry| entry.value().is_reclaimed());
            if reclaimed && self.store.remove_entry(id).is_some() {
                self.stats.record_expiration();
                purged += 1;
            }
        }
        if purged > 0 {
            debug!("Purged {} reclaimed entries", purged);
        }
        purged
    }

    // == Accessors ==
    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Live keys, least recently used first.
    pub fn keys(&self) -> Vec<K>
    where
        K: Clone,
    {
        let now = self.clock.now();
        self.store
            .iter()
            .filter(|(_, entry)| entry.value().is_live(now))
            .map(|(_, entry)| entry.key().clone())
            .collect()
    }

    pub fn default_ttl(&self) -> Ttl {
        self.default_ttl
    }

    pub fn stats(&self) -> &StatsTracker {
        &self.stats
    }

    /// Snapshot of the live counters.
    pub fn cache_stats(&self, description: &str) -> CacheStats {
        self.stats
            .live()
            .snapshot(description, self.store.len(), self.store.limit())
    }

    /// Snapshot of the scoped counters.
    pub fn transaction_cache_stats(&self, description: &str) -> CacheStats {
        self.stats
            .transaction()
            .snapshot(description, self.store.len(), self.store.limit())
    }

    #[cfg(test)]
    pub(crate) fn is_consistent(&self) -> bool {
        self.store.is_consistent()
    }
}

fn hold<V: Send + 'static>(
    reclaim: Option<&ReclaimQueue>,
    value: V,
    id: EntryId,
) -> Held<V> {
    match reclaim {
        Some(queue) => Held::Soft(queue.soft(value, id)),
        None => Held::Strong(value),
    }
}

/// Rejects TTLs longer than [`MAX_TTL`].
pub fn validate_ttl(ttl: Ttl) -> Result<()> {
    match ttl {
        Ttl::After(duration) if duration > MAX_TTL => {
            warn!("Rejected TTL of {:?}, above the {:?} limit", duration, MAX_TTL);
            Err(CacheError::InvalidArgument(format!(
                "TTL of {:?} exceeds the maximum of {:?}",
                duration, MAX_TTL
            )))
        }
        _ => Ok(()),
    }
}
