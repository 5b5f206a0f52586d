//! Cache Map Module
//!
//! Synchronized facade over the time-aware store. One lock per instance
//! guards every operation end to end.

use std::borrow::Borrow;
use std::fmt;
use std::hash::Hash;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::debug;

use crate::cache::{
    CacheRegistry, CacheStats, EvictionPolicy, KnownCache, NeverEvict, SizeBound, SizeOrExpired,
    Timed, Ttl, TtlStore,
};
use crate::error::{CacheError, Result};

struct Shared<K, V> {
    name: String,
    core: Mutex<TtlStore<K, V>>,
}

impl<K, V> KnownCache for Shared<K, V>
where
    K: Hash + Eq + Send + 'static,
    V: Clone + Send + 'static,
{
    fn debug_name(&self) -> &str {
        &self.name
    }

    fn size(&self) -> usize {
        self.core.lock().len()
    }

    fn clear(&self) {
        self.core.lock().clear();
    }

    fn purge(&self) -> usize {
        self.core.lock().purge()
    }

    fn cache_stats(&self) -> CacheStats {
        self.core.lock().cache_stats(&self.name)
    }

    fn transaction_cache_stats(&self) -> CacheStats {
        self.core.lock().transaction_cache_stats(&self.name)
    }

    fn reset_transaction_stats(&self) {
        self.core.lock().stats().reset_transaction();
    }
}

// == Cache Map ==
/// Thread-safe, LRU-ordered cache map.
///
/// Cloning is cheap and yields another handle to the same cache. Every
/// instance registers itself with the [`CacheRegistry`] it was built from.
pub struct CacheMap<K, V> {
    inner: Arc<Shared<K, V>>,
}

impl<K, V> Clone for CacheMap<K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K, V> CacheMap<K, V>
where
    K: Hash + Eq + Send + 'static,
    V: Clone + Send + 'static,
{
    // == Constructors ==
    /// Unbounded map that never evicts. `capacity_hint` only sizes the
    /// bucket array.
    pub fn new(registry: &CacheRegistry, capacity_hint: usize, debug_name: impl Into<String>) -> Self {
        let core = TtlStore::new(
            capacity_hint,
            Ttl::Never,
            Box::new(NeverEvict),
            registry.clock().clone(),
            None,
        );
        let core = core.unwrap_or_else(|_| unreachable!("Ttl::Never is always accepted"));
        Self::register(registry, debug_name.into(), core)
    }

    /// LRU map holding at most `max_size` entries.
    pub fn lru(
        registry: &CacheRegistry,
        max_size: usize,
        debug_name: impl Into<String>,
    ) -> Result<Self> {
        let core = TtlStore::new(
            max_size,
            Ttl::Never,
            Box::new(SizeBound::new(max_size)?),
            registry.clock().clone(),
            None,
        )?;
        Ok(Self::register(registry, debug_name.into(), core))
    }

    /// Time-aware map: values expire after `default_ttl` unless put with
    /// their own TTL, and may be reclaimed under memory pressure.
    ///
    /// `max_size` may be [`UNLIMITED`](crate::cache::UNLIMITED).
    pub fn with_ttl(
        registry: &CacheRegistry,
        max_size: usize,
        default_ttl: impl Into<Ttl>,
        debug_name: impl Into<String>,
    ) -> Result<Self> {
        let policy = SizeOrExpired::new(max_size)?;
        Self::with_policy(registry, max_size, default_ttl, policy, debug_name)
    }

    /// Time-aware map with a caller-supplied eviction policy.
    pub fn with_policy<P>(
        registry: &CacheRegistry,
        capacity_hint: usize,
        default_ttl: impl Into<Ttl>,
        policy: P,
        debug_name: impl Into<String>,
    ) -> Result<Self>
    where
        P: EvictionPolicy<K, Timed<V>> + 'static,
    {
        let core = TtlStore::new(
            capacity_hint,
            default_ttl.into(),
            Box::new(policy),
            registry.clock().clone(),
            Some(registry.memory_pressure().clone()),
        )?;
        Ok(Self::register(registry, debug_name.into(), core))
    }

    fn register(registry: &CacheRegistry, name: String, core: TtlStore<K, V>) -> Self {
        debug!("Registering cache '{}'", name);
        let inner = Arc::new(Shared {
            name,
            core: Mutex::new(core),
        });
        let known: Arc<dyn KnownCache> = inner.clone();
        let known: Weak<dyn KnownCache> = Arc::downgrade(&known);
        registry.register(known);
        Self { inner }
    }

    // == Get ==
    /// Returns the live value for `key`, marking it most recently used.
    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.inner.core.lock().get(key)
    }

    /// Returns the cached value or stores what `load` produces.
    ///
    /// The loader runs without the lock held. If another thread stored the
    /// key meanwhile, its value wins and the loaded one is dropped.
    pub fn get_or_load<F>(&self, key: K, load: F) -> V
    where
        F: FnOnce(&K) -> V,
    {
        if let Some(value) = self.get(&key) {
            return value;
        }
        let loaded = load(&key);

        let mut core = self.inner.core.lock();
        if let Some(existing) = core.peek(&key) {
            return existing;
        }
        core.put(key, loaded.clone());
        loaded
    }

    // == Put ==
    /// Stores `value` under the default TTL, returning the previous value.
    pub fn put(&self, key: K, value: V) -> Option<V> {
        self.inner.core.lock().put(key, value)
    }

    /// Stores `value` with its own TTL.
    pub fn put_with_ttl(&self, key: K, value: V, ttl: impl Into<Ttl>) -> Result<Option<V>> {
        self.inner.core.lock().put_with_ttl(key, value, ttl.into())
    }

    // == Remove ==
    pub fn remove<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.inner.core.lock().remove(key)
    }

    /// Removes every entry whose key starts with `prefix`. Linear in size.
    pub fn remove_using_prefix(&self, prefix: &str) -> usize
    where
        K: AsRef<str>,
    {
        self.inner.core.lock().remove_using_prefix(prefix)
    }

    pub fn clear(&self) {
        self.inner.core.lock().clear();
    }

    /// Drains pending reclamation notifications.
    pub fn purge(&self) -> usize {
        self.inner.core.lock().purge()
    }

    // == Accessors ==
    /// True if `key` holds a live value. Does not affect recency.
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.inner.core.lock().contains_key(key)
    }

    pub fn size(&self) -> usize {
        self.inner.core.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Live keys, least recently used first.
    pub fn keys(&self) -> Vec<K>
    where
        K: Clone,
    {
        self.inner.core.lock().keys()
    }

    pub fn debug_name(&self) -> &str {
        &self.inner.name
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.inner.cache_stats()
    }

    pub fn transaction_cache_stats(&self) -> CacheStats {
        self.inner.transaction_cache_stats()
    }

    pub fn reset_transaction_stats(&self) {
        self.inner.reset_transaction_stats();
    }

    /// Read-only view over this cache.
    pub fn read_only(&self) -> ReadOnlyCacheMap<K, V> {
        ReadOnlyCacheMap {
            inner: self.clone(),
        }
    }
}

impl<K, V> fmt::Debug for CacheMap<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheMap")
            .field("name", &self.inner.name)
            .finish()
    }
}

// == Read-Only View ==
/// View that serves reads and refuses every mutation.
///
/// Refused calls leave the cache untouched.
#[derive(Clone)]
pub struct ReadOnlyCacheMap<K, V> {
    inner: CacheMap<K, V>,
}

impl<K, V> ReadOnlyCacheMap<K, V>
where
    K: Hash + Eq + Send + 'static,
    V: Clone + Send + 'static,
{
    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.inner.get(key)
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.inner.contains_key(key)
    }

    pub fn size(&self) -> usize {
        self.inner.size()
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.inner.cache_stats()
    }

    pub fn put(&self, _key: K, _value: V) -> Result<Option<V>> {
        Err(self.refuse("put"))
    }

    pub fn put_with_ttl(&self, _key: K, _value: V, _ttl: impl Into<Ttl>) -> Result<Option<V>> {
        Err(self.refuse("put"))
    }

    pub fn remove<Q>(&self, _key: &Q) -> Result<Option<V>>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        Err(self.refuse("remove"))
    }

    pub fn remove_using_prefix(&self, _prefix: &str) -> Result<usize> {
        Err(self.refuse("remove_using_prefix"))
    }

    pub fn clear(&self) -> Result<()> {
        Err(self.refuse("clear"))
    }

    fn refuse(&self, operation: &str) -> CacheError {
        CacheError::Unsupported(format!(
            "Cache '{}' is read-only: {} not allowed",
            self.inner.debug_name(),
            operation
        ))
    }
}

impl<K, V> fmt::Debug for ReadOnlyCacheMap<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadOnlyCacheMap")
            .field("name", &self.inner.inner.name)
            .finish()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{Entry, EvictionContext, MockClock, MINUTE, SECOND, UNLIMITED};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn registry_with_clock() -> (CacheRegistry, MockClock) {
        let clock = MockClock::new();
        (CacheRegistry::with_clock(Arc::new(clock.clone())), clock)
    }

    #[test]
    fn test_lru_example() {
        let registry = CacheRegistry::new();
        let cache: CacheMap<&str, u32> = CacheMap::lru(&registry, 2, "lru").unwrap();

        cache.put("A", 1);
        cache.put("B", 2);
        cache.put("C", 3);
        assert!(!cache.contains_key("A"));
        assert!(cache.contains_key("B"));
        assert!(cache.contains_key("C"));

        cache.get("B");
        cache.put("D", 4);
        assert!(!cache.contains_key("C"));
        assert_eq!(cache.get("B"), Some(2));
        assert_eq!(cache.get("D"), Some(4));
        assert_eq!(cache.cache_stats().expirations, 2);
    }

    #[test]
    fn test_lru_rejects_zero() {
        let registry = CacheRegistry::new();
        let result: Result<CacheMap<String, u32>> = CacheMap::lru(&registry, 0, "zero");
        assert!(matches!(result, Err(CacheError::InvalidArgument(_))));
        assert!(registry.list_known_caches().is_empty());
    }

    #[test]
    fn test_ttl_map_expires() {
        let (registry, clock) = registry_with_clock();
        let cache: CacheMap<String, String> =
            CacheMap::with_ttl(&registry, UNLIMITED, MINUTE, "ttl").unwrap();

        cache.put("k".to_string(), "v".to_string());
        clock.advance(MINUTE);

        assert!(cache.get("k").is_none());
        assert_eq!(cache.size(), 0);
    }

    #[test]
    fn test_put_with_ttl_never() {
        let (registry, clock) = registry_with_clock();
        let cache: CacheMap<String, String> =
            CacheMap::with_ttl(&registry, UNLIMITED, SECOND, "ttl").unwrap();

        cache
            .put_with_ttl("k".to_string(), "v".to_string(), Ttl::Never)
            .unwrap();
        clock.advance(MINUTE);

        assert_eq!(cache.get("k"), Some("v".to_string()));
    }

    #[test]
    fn test_transaction_stats_reset() {
        let registry = CacheRegistry::new();
        let cache: CacheMap<String, u32> = CacheMap::new(&registry, 4, "tx");

        cache.get("missing");
        cache.reset_transaction_stats();
        cache.put("k".to_string(), 1);
        cache.get("k");

        assert_eq!(cache.cache_stats().gets(), 2);
        assert_eq!(cache.cache_stats().misses, 1);
        assert_eq!(cache.transaction_cache_stats().gets(), 1);
        assert_eq!(cache.transaction_cache_stats().misses, 0);
    }

    #[test]
    fn test_get_or_load() {
        let registry = CacheRegistry::new();
        let cache: CacheMap<String, usize> = CacheMap::new(&registry, 4, "loader");
        let calls = AtomicUsize::new(0);

        let load = |key: &String| {
            calls.fetch_add(1, Ordering::SeqCst);
            key.len()
        };
        assert_eq!(cache.get_or_load("abc".to_string(), load), 3);
        assert_eq!(cache.get_or_load("abc".to_string(), load), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_read_only_refuses_mutation() {
        let registry = CacheRegistry::new();
        let cache: CacheMap<String, u32> = CacheMap::new(&registry, 4, "ro");
        cache.put("k".to_string(), 1);
        let view = cache.read_only();

        assert_eq!(view.get("k"), Some(1));
        assert!(view.contains_key("k"));
        assert!(matches!(
            view.put("x".to_string(), 2),
            Err(CacheError::Unsupported(_))
        ));
        assert!(matches!(view.remove("k"), Err(CacheError::Unsupported(_))));
        assert!(matches!(view.clear(), Err(CacheError::Unsupported(_))));
        assert!(matches!(
            view.remove_using_prefix("k"),
            Err(CacheError::Unsupported(_))
        ));
        assert_eq!(view.size(), 1);
        assert_eq!(cache.cache_stats().removes, 0);
    }

    #[test]
    fn test_custom_policy() {
        let registry = CacheRegistry::new();
        // Keep only even values once more than one entry is present
        let policy = |candidate: &Entry<String, Timed<u32>>, ctx: &EvictionContext| {
            ctx.size > 1 && candidate.value().value().is_some_and(|v| v % 2 == 1)
        };
        let cache: CacheMap<String, u32> =
            CacheMap::with_policy(&registry, 8, Ttl::Never, policy, "custom").unwrap();

        cache.put("odd".to_string(), 1);
        cache.put("even".to_string(), 2);

        assert!(!cache.contains_key("odd"));
        assert!(cache.contains_key("even"));
    }

    #[test]
    fn test_memory_pressure_purges_on_next_operation() {
        let (registry, _clock) = registry_with_clock();
        let cache: CacheMap<String, u32> =
            CacheMap::with_ttl(&registry, UNLIMITED, MINUTE, "soft").unwrap();
        let plain: CacheMap<String, u32> = CacheMap::new(&registry, 4, "plain");
        cache.put("a".to_string(), 1);
        plain.put("a".to_string(), 1);

        assert_eq!(registry.memory_pressure().shed_all(), 1);

        // Strong values are untouched
        assert_eq!(plain.get("a"), Some(1));
        assert_eq!(cache.size(), 1);
        assert_eq!(cache.purge(), 1);
        assert_eq!(cache.size(), 0);
    }

    #[test]
    fn test_keys_oldest_first() {
        let registry = CacheRegistry::new();
        let cache: CacheMap<String, u32> = CacheMap::new(&registry, 4, "keys");
        cache.put("a".to_string(), 1);
        cache.put("b".to_string(), 2);
        cache.get("a");

        assert_eq!(cache.keys(), vec!["b".to_string(), "a".to_string()]);
    }
}
