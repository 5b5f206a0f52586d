//! Property-Based Tests for Cache Module
//!
//! Uses proptest to check the cache layers against simple reference models.

use proptest::prelude::*;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use crate::cache::{CacheMap, CacheRegistry, MockClock, SizeOrExpired, Ttl, TtlStore};

// == Strategies ==
/// Keys drawn from a small alphabet so operations collide often
fn key_strategy() -> impl Strategy<Value = String> {
    "[a-d]{1,3}"
}

#[derive(Debug, Clone)]
enum CacheOp {
    Put { key: String, value: u32 },
    Get { key: String },
    Remove { key: String },
}

fn cache_op_strategy() -> impl Strategy<Value = CacheOp> {
    prop_oneof![
        (key_strategy(), any::<u32>()).prop_map(|(key, value)| CacheOp::Put { key, value }),
        key_strategy().prop_map(|key| CacheOp::Get { key }),
        key_strategy().prop_map(|key| CacheOp::Remove { key }),
    ]
}

#[derive(Debug, Clone)]
enum TimedOp {
    Put { key: String, ttl_secs: u64 },
    Get { key: String },
    Remove { key: String },
    Advance { secs: u64 },
}

fn timed_op_strategy() -> impl Strategy<Value = TimedOp> {
    prop_oneof![
        (key_strategy(), 1u64..10).prop_map(|(key, ttl_secs)| TimedOp::Put { key, ttl_secs }),
        key_strategy().prop_map(|key| TimedOp::Get { key }),
        key_strategy().prop_map(|key| TimedOp::Remove { key }),
        (0u64..5).prop_map(|secs| TimedOp::Advance { secs }),
    ]
}

/// Recency-ordered reference model of a bounded LRU map.
#[derive(Default)]
struct LruModel {
    order: Vec<String>,
    values: HashMap<String, u32>,
}

impl LruModel {
    fn touch(&mut self, key: &str) {
        if let Some(pos) = self.order.iter().position(|k| k == key) {
            let key = self.order.remove(pos);
            self.order.push(key);
        }
    }

    fn put(&mut self, key: String, value: u32, max: usize) -> Option<u32> {
        let previous = self.values.insert(key.clone(), value);
        if previous.is_some() {
            self.touch(&key);
        } else {
            self.order.push(key);
            if self.order.len() > max {
                let oldest = self.order.remove(0);
                self.values.remove(&oldest);
            }
        }
        previous
    }

    fn get(&mut self, key: &str) -> Option<u32> {
        let value = self.values.get(key).copied();
        if value.is_some() {
            self.touch(key);
        }
        value
    }

    fn remove(&mut self, key: &str) -> Option<u32> {
        self.order.retain(|k| k != key);
        self.values.remove(key)
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // A bounded map keeps the same entries, in the same recency order, as the model.
    #[test]
    fn prop_lru_matches_model(
        max in 1usize..6,
        ops in prop::collection::vec(cache_op_strategy(), 1..80)
    ) {
        let registry = CacheRegistry::new();
        let cache: CacheMap<String, u32> = CacheMap::lru(&registry, max, "model").unwrap();
        let mut model = LruModel::default();

        for op in ops {
            match op {
                CacheOp::Put { key, value } => {
                    prop_assert_eq!(cache.put(key.clone(), value), model.put(key, value, max));
                }
                CacheOp::Get { key } => {
                    prop_assert_eq!(cache.get(&key), model.get(&key));
                }
                CacheOp::Remove { key } => {
                    prop_assert_eq!(cache.remove(&key), model.remove(&key));
                }
            }
            prop_assert!(cache.size() <= max);
            prop_assert_eq!(cache.keys(), model.order.clone());
        }
    }

    // Hits plus misses always equals the number of gets.
    #[test]
    fn prop_statistics_accuracy(ops in prop::collection::vec(cache_op_strategy(), 1..60)) {
        let registry = CacheRegistry::new();
        let cache: CacheMap<String, u32> = CacheMap::new(&registry, 16, "stats");
        let mut expected_hits: u64 = 0;
        let mut expected_misses: u64 = 0;
        let mut expected_puts: u64 = 0;
        let mut expected_removes: u64 = 0;

        for op in ops {
            match op {
                CacheOp::Put { key, value } => {
                    cache.put(key, value);
                    expected_puts += 1;
                }
                CacheOp::Get { key } => match cache.get(&key) {
                    Some(_) => expected_hits += 1,
                    None => expected_misses += 1,
                },
                CacheOp::Remove { key } => {
                    cache.remove(&key);
                    expected_removes += 1;
                }
            }
        }

        let stats = cache.cache_stats();
        prop_assert_eq!(stats.hits, expected_hits, "Hits mismatch");
        prop_assert_eq!(stats.misses, expected_misses, "Misses mismatch");
        prop_assert_eq!(stats.puts, expected_puts, "Puts mismatch");
        prop_assert_eq!(stats.removes, expected_removes, "Removes mismatch");
        prop_assert_eq!(stats.size, cache.size());
        prop_assert!(stats.max_size >= stats.size);
    }

    // Whatever was last put under a key is what a get returns.
    #[test]
    fn prop_roundtrip_storage(
        entries in prop::collection::vec((key_strategy(), any::<u32>()), 1..40)
    ) {
        let registry = CacheRegistry::new();
        let cache: CacheMap<String, u32> = CacheMap::new(&registry, 8, "roundtrip");
        let mut expected = HashMap::new();

        for (key, value) in entries {
            cache.put(key.clone(), value);
            expected.insert(key, value);
        }

        prop_assert_eq!(cache.size(), expected.len());
        for (key, value) in &expected {
            prop_assert_eq!(cache.get(key), Some(*value));
        }
    }

    // Prefix removal drops exactly the matching keys and reports their count.
    #[test]
    fn prop_remove_using_prefix(
        keys in prop::collection::hash_set(key_strategy(), 0..30),
        prefix in "[a-d]{1,2}"
    ) {
        let registry = CacheRegistry::new();
        let cache: CacheMap<String, u32> = CacheMap::new(&registry, 8, "prefix");
        for key in &keys {
            cache.put(key.clone(), 0);
        }

        let matching = keys.iter().filter(|k| k.starts_with(&prefix)).count();
        prop_assert_eq!(cache.remove_using_prefix(&prefix), matching);

        let remaining: HashSet<String> = cache.keys().into_iter().collect();
        let expected: HashSet<String> = keys
            .into_iter()
            .filter(|k| !k.starts_with(&prefix))
            .collect();
        prop_assert_eq!(remaining, expected);
    }

    // The hash chains and the recency list stay in agreement under expiry.
    #[test]
    fn prop_timed_store_stays_consistent(
        max in 1usize..6,
        ops in prop::collection::vec(timed_op_strategy(), 1..80)
    ) {
        let clock = MockClock::new();
        let mut store: TtlStore<String, u32> = TtlStore::new(
            max,
            Ttl::After(Duration::from_secs(5)),
            Box::new(SizeOrExpired::new(max).unwrap()),
            Arc::new(clock.clone()),
            None,
        )
        .unwrap();

        for op in ops {
            match op {
                TimedOp::Put { key, ttl_secs } => {
                    store
                        .put_with_ttl(key, 1, Ttl::After(Duration::from_secs(ttl_secs)))
                        .unwrap();
                }
                TimedOp::Get { key } => {
                    store.get(&key);
                }
                TimedOp::Remove { key } => {
                    store.remove(&key);
                }
                TimedOp::Advance { secs } => clock.advance(Duration::from_secs(secs)),
            }
            prop_assert!(store.is_consistent());
            prop_assert!(store.len() <= max);
        }
    }
}
