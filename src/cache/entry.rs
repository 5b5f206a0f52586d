//! Cache Entry Module
//!
//! Defines the record stored in each arena slot, the stable handle used to
//! address it, and the time-aware payload held by TTL maps.

use std::time::{Duration, Instant};

use crate::cache::reclaim::SoftValue;

// == Entry Id ==
/// Stable handle to an entry slot.
///
/// The generation changes every time a slot is freed, so a handle kept past
/// the entry's removal never resolves to a newer entry reusing the slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntryId {
    pub(crate) index: usize,
    pub(crate) generation: u32,
}

// == Entry ==
/// One cached key/value record plus its bucket chain link.
///
/// Recency links live in the owning slot, alongside the sentinel's links.
#[derive(Debug)]
pub struct Entry<K, T> {
    pub(crate) key: K,
    pub(crate) value: T,
    /// Hash of `key`, computed once on insertion
    pub(crate) hash: u64,
    /// Next entry in the same bucket chain
    pub(crate) overflow: Option<usize>,
}

impl<K, T> Entry<K, T> {
    /// Returns the entry's key.
    pub fn key(&self) -> &K {
        &self.key
    }

    /// Returns the stored payload.
    pub fn value(&self) -> &T {
        &self.value
    }

    /// Returns the cached hash of the key.
    pub fn hash(&self) -> u64 {
        self.hash
    }

    /// Consumes the entry, returning key and payload.
    pub fn into_parts(self) -> (K, T) {
        (self.key, self.value)
    }
}

// == Ttl ==
/// Time-to-live requested for a stored value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ttl {
    /// The value never expires on its own
    Never,
    /// The value expires this long after it was stored
    After(Duration),
}

impl Ttl {
    /// Absolute deadline for a value stored at `now`, `None` for [`Ttl::Never`].
    ///
    /// A duration too large to represent as an instant is treated as never.
    pub fn deadline(self, now: Instant) -> Option<Instant> {
        match self {
            Ttl::Never => None,
            Ttl::After(ttl) => now.checked_add(ttl),
        }
    }
}

impl From<Duration> for Ttl {
    fn from(ttl: Duration) -> Self {
        Ttl::After(ttl)
    }
}

// == Liveness ==
/// Payloads that can stop being live without being removed.
pub trait Liveness {
    /// Returns true if the payload may still be handed to readers at `now`.
    fn is_live(&self, now: Instant) -> bool;
}

// == Held ==
/// How a [`Timed`] payload keeps its value.
#[derive(Debug)]
pub enum Held<V> {
    /// Owned directly; only explicit cache operations drop it
    Strong(V),
    /// Behind a reclaimable indirection the memory manager may clear
    Soft(SoftValue<V>),
}

// == Timed ==
/// Value plus expiration deadline, as stored by time-aware maps.
#[derive(Debug)]
pub struct Timed<V> {
    held: Held<V>,
    /// Expiration instant, `None` = never
    expires_at: Option<Instant>,
}

impl<V: Clone> Timed<V> {
    pub fn new(held: Held<V>, expires_at: Option<Instant>) -> Self {
        Self { held, expires_at }
    }

    /// Returns a copy of the value, or `None` once it has been reclaimed.
    pub fn value(&self) -> Option<V> {
        match &self.held {
            Held::Strong(value) => Some(value.clone()),
            Held::Soft(soft) => soft.get(),
        }
    }

    /// Consumes the payload, returning the value if still held.
    pub fn into_value(self) -> Option<V> {
        match self.held {
            Held::Strong(value) => Some(value),
            Held::Soft(soft) => soft.take(),
        }
    }

    /// True when the memory manager cleared the value behind this payload.
    pub fn is_reclaimed(&self) -> bool {
        match &self.held {
            Held::Strong(_) => false,
            Held::Soft(soft) => soft.is_reclaimed(),
        }
    }

    /// Returns true if the deadline has passed at `now`.
    ///
    /// An entry is expired once `now >= expires_at`.
    pub fn is_expired(&self, now: Instant) -> bool {
        match self.expires_at {
            Some(expires) => now >= expires,
            None => false,
        }
    }

    /// Drops the held value without notifying anyone.
    pub fn release(&self) {
        if let Held::Soft(soft) = &self.held {
            soft.release();
        }
    }

    pub fn expires_at(&self) -> Option<Instant> {
        self.expires_at
    }

    /// Remaining time before expiry, `None` if the value never expires.
    ///
    /// Returns `Some(Duration::ZERO)` once the deadline has passed.
    pub fn ttl_remaining(&self, now: Instant) -> Option<Duration> {
        self.expires_at
            .map(|expires| expires.saturating_duration_since(now))
    }
}

impl<V: Clone> Liveness for Timed<V> {
    fn is_live(&self, now: Instant) -> bool {
        !self.is_reclaimed() && !self.is_expired(now)
    }
}
