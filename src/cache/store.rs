//! Entry Store Module
//!
//! Hash table with chained buckets plus an intrusive recency list.
//!
//! Entries live in an arena of slots addressed by index. Each occupied slot
//! sits in exactly one bucket chain (singly linked through
//! [`Entry::overflow`]) and at exactly one position in a circular, doubly
//! linked recency list anchored at the sentinel slot `0`. The list runs from
//! least recently used (just after the sentinel) to most recently used (just
//! before it).

use std::borrow::Borrow;
use std::collections::hash_map::RandomState;
use std::fmt;
use std::hash::{BuildHasher, Hash};
use std::sync::Arc;

use tracing::debug;

use crate::cache::{Clock, Entry, EntryId, EvictionContext, EvictionPolicy, UNLIMITED};

/// Slot index of the recency-list anchor.
const SENTINEL: usize = 0;

/// Bucket count for unlimited capacity hints.
const UNBOUNDED_BUCKETS: usize = 1 << 16;

struct Slot<K, T> {
    generation: u32,
    entry: Option<Entry<K, T>>,
    prev: usize,
    next: usize,
}

impl<K, T> Slot<K, T> {
    fn vacant(index: usize) -> Self {
        Self {
            generation: 0,
            entry: None,
            prev: index,
            next: index,
        }
    }
}

/// Result of [`EntryStore::find_or_add`].
#[derive(Debug)]
pub struct Insertion<K, T> {
    pub id: EntryId,
    /// True when a new entry was created
    pub added: bool,
    /// Entry discarded by the eviction hook after the insertion
    pub evicted: Option<Entry<K, T>>,
}

// == Entry Store ==
/// Chained hash table threaded with an LRU list.
pub struct EntryStore<K, T> {
    slots: Vec<Slot<K, T>>,
    /// Recycled slot indices
    free: Vec<usize>,
    /// Head slot of each bucket chain
    buckets: Vec<Option<usize>>,
    size: usize,
    hasher: RandomState,
    policy: Box<dyn EvictionPolicy<K, T>>,
    clock: Arc<dyn Clock>,
}

impl<K, T> EntryStore<K, T>
where
    K: Hash + Eq,
{
    // == Constructor ==
    /// Creates a store with `1.5 × capacity_hint` buckets.
    ///
    /// An [`UNLIMITED`] hint gets a fixed 65536 buckets. The bucket array
    /// never grows afterwards.
    pub fn new(
        capacity_hint: usize,
        policy: Box<dyn EvictionPolicy<K, T>>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let bucket_count = if capacity_hint == UNLIMITED {
            UNBOUNDED_BUCKETS
        } else {
            capacity_hint
                .checked_add(capacity_hint / 2)
                .unwrap_or(UNBOUNDED_BUCKETS)
                .max(1)
        };

        Self {
            slots: vec![Slot::vacant(SENTINEL)],
            free: Vec::new(),
            buckets: vec![None; bucket_count],
            size: 0,
            hasher: RandomState::new(),
            policy,
            clock,
        }
    }

    // == Find Or Add ==
    /// Returns the entry for `key`, creating it if absent.
    ///
    /// A hit is moved to the most-recently-used end. On a miss `init` builds
    /// the payload from the new entry's id, the entry is pushed at the head of
    /// its bucket chain and the tail of the recency list, and the eviction
    /// hook is consulted once.
    pub fn find_or_add<F>(&mut self, key: K, init: F) -> Insertion<K, T>
    where
        F: FnOnce(EntryId) -> T,
    {
        let hash = self.hasher.hash_one(&key);
        if let Some(index) = self.locate(&key, hash) {
            self.promote(index);
            return Insertion {
                id: self.id_of(index),
                added: false,
                evicted: None,
            };
        }

        let index = self.alloc();
        let id = self.id_of(index);
        let bucket = self.bucket_of(hash);
        self.slots[index].entry = Some(Entry {
            key,
            value: init(id),
            hash,
            overflow: self.buckets[bucket],
        });
        self.buckets[bucket] = Some(index);
        self.link_tail(index);
        self.size += 1;

        let evicted = self.evict_check();
        Insertion {
            id,
            added: true,
            evicted,
        }
    }

    // == Find ==
    /// Looks up `key` and marks it most recently used.
    pub fn find<Q>(&mut self, key: &Q) -> Option<EntryId>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let hash = self.hasher.hash_one(key);
        let index = self.locate(key, hash)?;
        self.promote(index);
        Some(self.id_of(index))
    }

    /// Looks up `key` without touching recency.
    pub fn peek<Q>(&self, key: &Q) -> Option<EntryId>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let hash = self.hasher.hash_one(key);
        self.locate(key, hash).map(|index| self.id_of(index))
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.peek(key).is_some()
    }

    // == Remove ==
    /// Unlinks and returns the entry for `key`.
    pub fn remove<Q>(&mut self, key: &Q) -> Option<Entry<K, T>>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let hash = self.hasher.hash_one(key);
        let index = self.locate(key, hash)?;
        Some(self.unlink(index))
    }

    /// Unlinks the entry behind `id` without rehashing its key.
    ///
    /// Returns `None` if the handle is stale.
    pub fn remove_entry(&mut self, id: EntryId) -> Option<Entry<K, T>> {
        self.resolve(id)?;
        Some(self.unlink(id.index))
    }

    // == Eviction Check ==
    /// Offers the least-recently-used entry to the eviction hook.
    ///
    /// Evicts at most that one entry, even if the store stays over its bound.
    pub fn evict_check(&mut self) -> Option<Entry<K, T>> {
        let oldest = self.slots[SENTINEL].next;
        if oldest == SENTINEL {
            return None;
        }
        let ctx = EvictionContext {
            size: self.size,
            now: self.clock.now(),
        };
        let Some(candidate) = self.slots[oldest].entry.as_ref() else {
            unreachable!("vacant slot {oldest} linked into the recency list");
        };
        if !self.policy.should_evict(candidate, &ctx) {
            return None;
        }
        debug!(size = self.size, "Evicting least recently used entry");
        Some(self.unlink(oldest))
    }

    // == Accessors ==
    pub fn get(&self, id: EntryId) -> Option<&Entry<K, T>> {
        self.resolve(id)?;
        self.slots[id.index].entry.as_ref()
    }

    pub fn get_mut(&mut self, id: EntryId) -> Option<&mut Entry<K, T>> {
        self.resolve(id)?;
        self.slots[id.index].entry.as_mut()
    }

    /// Least recently used entry.
    pub fn oldest(&self) -> Option<EntryId> {
        let oldest = self.slots[SENTINEL].next;
        (oldest != SENTINEL).then(|| self.id_of(oldest))
    }

    /// Live entries in recency order, oldest first.
    pub fn iter(&self) -> Iter<'_, K, T> {
        Iter {
            slots: &self.slots,
            cursor: self.slots[SENTINEL].next,
        }
    }

    /// Handles of all live entries, oldest first.
    pub fn ids(&self) -> Vec<EntryId> {
        self.iter().map(|(id, _)| id).collect()
    }

    pub fn len(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// Size bound of the installed policy.
    pub fn limit(&self) -> Option<usize> {
        self.policy.limit()
    }

    // == Clear ==
    /// Drops every entry, keeping the allocated bucket array and slots.
    pub fn clear(&mut self) {
        self.buckets.fill(None);
        self.free.clear();
        for index in 1..self.slots.len() {
            let slot = &mut self.slots[index];
            if slot.entry.take().is_some() {
                slot.generation = slot.generation.wrapping_add(1);
            }
            slot.prev = index;
            slot.next = index;
            self.free.push(index);
        }
        self.slots[SENTINEL].prev = SENTINEL;
        self.slots[SENTINEL].next = SENTINEL;
        self.size = 0;
    }

    // == Internal: Lookup ==
    fn bucket_of(&self, hash: u64) -> usize {
        (hash % self.buckets.len() as u64) as usize
    }

    fn locate<Q>(&self, key: &Q, hash: u64) -> Option<usize>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let mut cursor = self.buckets[self.bucket_of(hash)];
        while let Some(index) = cursor {
            let Some(entry) = self.slots[index].entry.as_ref() else {
                unreachable!("vacant slot {index} linked into bucket chain");
            };
            if entry.hash == hash && entry.key.borrow() == key {
                return Some(index);
            }
            cursor = entry.overflow;
        }
        None
    }

    fn id_of(&self, index: usize) -> EntryId {
        EntryId {
            index,
            generation: self.slots[index].generation,
        }
    }

    fn resolve(&self, id: EntryId) -> Option<()> {
        let slot = self.slots.get(id.index)?;
        (id.index != SENTINEL && slot.generation == id.generation && slot.entry.is_some())
            .then_some(())
    }

    // == Internal: Slot Management ==
    fn alloc(&mut self) -> usize {
        if let Some(index) = self.free.pop() {
            index
        } else {
            let index = self.slots.len();
            self.slots.push(Slot::vacant(index));
            index
        }
    }

    /// Removes an occupied slot from its chain and the recency list.
    fn unlink(&mut self, index: usize) -> Entry<K, T> {
        let (hash, overflow) = match self.slots[index].entry.as_ref() {
            Some(entry) => (entry.hash, entry.overflow),
            None => unreachable!("unlinking vacant slot {index}"),
        };

        let bucket = self.bucket_of(hash);
        if self.buckets[bucket] == Some(index) {
            self.buckets[bucket] = overflow;
        } else {
            let mut cursor = self.buckets[bucket];
            loop {
                let Some(current) = cursor else {
                    unreachable!("slot {index} missing from bucket {bucket}");
                };
                let entry = self.slots[current]
                    .entry
                    .as_mut()
                    .unwrap_or_else(|| unreachable!("vacant slot {current} in bucket {bucket}"));
                if entry.overflow == Some(index) {
                    entry.overflow = overflow;
                    break;
                }
                cursor = entry.overflow;
            }
        }

        self.detach(index);
        let slot = &mut self.slots[index];
        slot.generation = slot.generation.wrapping_add(1);
        let mut entry = slot
            .entry
            .take()
            .unwrap_or_else(|| unreachable!("slot {index} emptied during unlink"));
        entry.overflow = None;
        self.free.push(index);
        self.size -= 1;
        entry
    }

    // == Internal: Recency List ==
    fn detach(&mut self, index: usize) {
        let prev = self.slots[index].prev;
        let next = self.slots[index].next;
        self.slots[prev].next = next;
        self.slots[next].prev = prev;
        self.slots[index].prev = index;
        self.slots[index].next = index;
    }

    fn link_tail(&mut self, index: usize) {
        let tail = self.slots[SENTINEL].prev;
        self.slots[index].prev = tail;
        self.slots[index].next = SENTINEL;
        self.slots[tail].next = index;
        self.slots[SENTINEL].prev = index;
    }

    fn promote(&mut self, index: usize) {
        if self.slots[SENTINEL].prev != index {
            self.detach(index);
            self.link_tail(index);
        }
    }

    /// Checks that bucket chains and the recency list agree with `size`.
    #[cfg(test)]
    pub(crate) fn is_consistent(&self) -> bool {
        let mut chained = 0;
        for head in &self.buckets {
            let mut cursor = *head;
            while let Some(index) = cursor {
                match self.slots[index].entry.as_ref() {
                    Some(entry) => {
                        if entry.hash != self.hasher.hash_one(&entry.key) {
                            return false;
                        }
                        chained += 1;
                        cursor = entry.overflow;
                    }
                    None => return false,
                }
            }
        }

        let mut listed = 0;
        let mut cursor = self.slots[SENTINEL].next;
        while cursor != SENTINEL {
            let next = self.slots[cursor].next;
            if self.slots[next].prev != cursor || self.slots[cursor].entry.is_none() {
                return false;
            }
            listed += 1;
            cursor = next;
        }

        chained == self.size && listed == self.size
    }
}

impl<K, T> fmt::Debug for EntryStore<K, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntryStore")
            .field("size", &self.size)
            .field("buckets", &self.buckets.len())
            .field("slots", &self.slots.len())
            .finish()
    }
}

// == Iterator ==
/// Iterator over live entries, least recently used first.
pub struct Iter<'a, K, T> {
    slots: &'a [Slot<K, T>],
    cursor: usize,
}

impl<'a, K, T> Iterator for Iter<'a, K, T> {
    type Item = (EntryId, &'a Entry<K, T>);

    fn next(&mut self) -> Option<Self::Item> {
        if self.cursor == SENTINEL {
            return None;
        }
        let index = self.cursor;
        let slot = &self.slots[index];
        self.cursor = slot.next;
        let id = EntryId {
            index,
            generation: slot.generation,
        };
        match slot.entry.as_ref() {
            Some(entry) => Some((id, entry)),
            None => unreachable!("vacant slot {index} linked into the recency list"),
        }
    }
}
