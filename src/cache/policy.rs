//! Eviction Policy Module
//!
//! The single decision hook consulted after every insertion.

use std::time::Instant;

use crate::cache::{Entry, Liveness, UNLIMITED};
use crate::error::{CacheError, Result};

// == Eviction Context ==
/// State of the store at the moment the hook runs.
#[derive(Debug, Clone, Copy)]
pub struct EvictionContext {
    /// Live entries, including the one just inserted
    pub size: usize,
    pub now: Instant,
}

// == Eviction Policy ==
/// Decides whether the least-recently-used entry must be discarded.
///
/// Invoked with the oldest entry immediately after each insertion. At most
/// one entry is evicted per insertion.
pub trait EvictionPolicy<K, T>: Send {
    fn should_evict(&self, candidate: &Entry<K, T>, ctx: &EvictionContext) -> bool;

    /// Size bound reported in statistics, if the policy has one.
    fn limit(&self) -> Option<usize> {
        None
    }
}

impl<K, T, F> EvictionPolicy<K, T> for F
where
    F: Fn(&Entry<K, T>, &EvictionContext) -> bool + Send,
{
    fn should_evict(&self, candidate: &Entry<K, T>, ctx: &EvictionContext) -> bool {
        self(candidate, ctx)
    }
}

/// Unbounded: never evicts.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverEvict;

impl<K, T> EvictionPolicy<K, T> for NeverEvict {
    fn should_evict(&self, _candidate: &Entry<K, T>, _ctx: &EvictionContext) -> bool {
        false
    }
}

/// Evicts once the store holds more than `max_size` entries.
#[derive(Debug, Clone, Copy)]
pub struct SizeBound {
    max_size: usize,
}

impl SizeBound {
    pub fn new(max_size: usize) -> Result<Self> {
        if max_size == 0 {
            return Err(CacheError::InvalidArgument(
                "Size-bounded cache needs a max size of at least 1".to_string(),
            ));
        }
        Ok(Self { max_size })
    }
}

impl<K, T> EvictionPolicy<K, T> for SizeBound {
    fn should_evict(&self, _candidate: &Entry<K, T>, ctx: &EvictionContext) -> bool {
        ctx.size > self.max_size
    }

    fn limit(&self) -> Option<usize> {
        Some(self.max_size)
    }
}

/// Evicts when over `max_size`, or when the candidate is no longer live.
#[derive(Debug, Clone, Copy)]
pub struct SizeOrExpired {
    max_size: Option<usize>,
}

impl SizeOrExpired {
    /// `UNLIMITED` disables the size bound and keeps only the liveness rule.
    pub fn new(max_size: usize) -> Result<Self> {
        if max_size == 0 {
            return Err(CacheError::InvalidArgument(
                "Time-aware cache needs a max size of at least 1".to_string(),
            ));
        }
        let max_size = (max_size != UNLIMITED).then_some(max_size);
        Ok(Self { max_size })
    }
}

impl<K, T: Liveness> EvictionPolicy<K, T> for SizeOrExpired {
    fn should_evict(&self, candidate: &Entry<K, T>, ctx: &EvictionContext) -> bool {
        let over = self.max_size.is_some_and(|max| ctx.size > max);
        over || !candidate.value().is_live(ctx.now)
    }

    fn limit(&self) -> Option<usize> {
        self.max_size
    }
}
