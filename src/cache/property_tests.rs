//! Property-Based Tests for Cache Module
//!
//! Uses proptest to check the capacity, callback, group and transaction
//! invariants over generated operation sequences.

use proptest::prelude::*;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use parking_lot::Mutex;

use crate::cache::store::Store;
use crate::cache::{Cache, CacheConfig, Capacity, EvictionCallback, TransCache, UNLIMITED};

// == Test Configuration ==
const TEST_MAX_ENTRIES: usize = 8;

// == Strategies ==
/// Small key space so that operations collide often
fn key_strategy() -> impl Strategy<Value = String> {
    "[a-j]".prop_map(|s| s)
}

fn group_strategy() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec("g[0-3]".prop_map(|s| s), 0..3)
}

#[derive(Debug, Clone)]
enum CacheOp {
    Set { key: String, value: u32, groups: Vec<String> },
    Get { key: String },
    Remove { key: String },
    RemoveGroup { group: String },
}

fn cache_op_strategy() -> impl Strategy<Value = CacheOp> {
    prop_oneof![
        3 => (key_strategy(), any::<u32>(), group_strategy())
            .prop_map(|(key, value, groups)| CacheOp::Set { key, value, groups }),
        2 => key_strategy().prop_map(|key| CacheOp::Get { key }),
        1 => key_strategy().prop_map(|key| CacheOp::Remove { key }),
        1 => "g[0-3]".prop_map(|group| CacheOp::RemoveGroup { group }),
    ]
}

fn recording_cache(max: i64) -> (Cache<u32>, Arc<Mutex<Vec<(String, u32)>>>) {
    let log = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&log);
    let callback: EvictionCallback<u32> =
        Arc::new(move |k: &str, v: &u32| sink.lock().push((k.to_string(), *v)));
    (Cache::new(max, Duration::ZERO, false, vec![callback]), log)
}

/// Reference model: map of live keys plus recency order (front = newest).
#[derive(Default)]
struct Model {
    values: HashMap<String, (u32, HashSet<String>)>,
    recency: Vec<String>,
}

impl Model {
    fn touch(&mut self, key: &str) {
        self.recency.retain(|k| k != key);
        self.recency.insert(0, key.to_string());
    }

    fn remove(&mut self, key: &str) -> Option<(String, u32)> {
        self.recency.retain(|k| k != key);
        self.values.remove(key).map(|(v, _)| (key.to_string(), v))
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    // For any sequence of operations on a bounded partition, the cache never
    // exceeds its capacity and agrees with a reference LRU model.
    #[test]
    fn prop_capacity_and_lru_order(ops in prop::collection::vec(cache_op_strategy(), 1..80)) {
        let (cache, log) = recording_cache(TEST_MAX_ENTRIES as i64);
        let mut model = Model::default();
        let mut expected_evicted = Vec::new();

        for op in ops {
            match op {
                CacheOp::Set { key, value, groups } => {
                    cache.set(&key, value, &groups);
                    model.values.insert(key.clone(), (value, groups.into_iter().collect()));
                    model.touch(&key);
                    if model.recency.len() > TEST_MAX_ENTRIES {
                        let oldest = model.recency.last().cloned().unwrap();
                        expected_evicted.extend(model.remove(&oldest));
                    }
                }
                CacheOp::Get { key } => {
                    let got = cache.get(&key);
                    let want = model.values.get(&key).map(|(v, _)| *v);
                    prop_assert_eq!(got, want);
                    if want.is_some() {
                        model.touch(&key);
                    }
                }
                CacheOp::Remove { key } => {
                    let removed = cache.remove(&key);
                    prop_assert_eq!(removed, model.values.contains_key(&key));
                    expected_evicted.extend(model.remove(&key));
                }
                CacheOp::RemoveGroup { group } => {
                    cache.remove_group(&group);
                    let mut members: Vec<String> = model
                        .values
                        .iter()
                        .filter(|(_, (_, g))| g.contains(&group))
                        .map(|(k, _)| k.clone())
                        .collect();
                    members.sort();
                    let mut removed: Vec<(String, u32)> =
                        members.iter().filter_map(|k| model.remove(k)).collect();
                    // Group removal order is unspecified; compared as a multiset below
                    removed.sort();
                    expected_evicted.extend(removed);
                }
            }
            prop_assert!(cache.len() <= TEST_MAX_ENTRIES);
            prop_assert_eq!(cache.len(), model.values.len());
        }

        let mut seen = log.lock().clone();
        seen.sort();
        expected_evicted.sort();
        prop_assert_eq!(seen, expected_evicted);
    }

    // For any set sequence, group membership reflects exactly the last set.
    #[test]
    fn prop_group_consistency(
        sets in prop::collection::vec((key_strategy(), group_strategy()), 1..40)
    ) {
        let cache: Cache<u32> = Cache::new(UNLIMITED, Duration::ZERO, false, vec![]);
        let mut last: HashMap<String, HashSet<String>> = HashMap::new();

        for (key, groups) in sets {
            cache.set(&key, 0, &groups);
            last.insert(key, groups.into_iter().collect());
        }

        for group in ["g0", "g1", "g2", "g3"] {
            let mut expected: Vec<String> = last
                .iter()
                .filter(|(_, g)| g.contains(group))
                .map(|(k, _)| k.clone())
                .collect();
            expected.sort();
            let mut actual = cache.group_item_ids(group);
            actual.sort();
            prop_assert_eq!(&actual, &expected);
            prop_assert_eq!(cache.has_group(group), !expected.is_empty());
        }
    }

    // For any set/get interleaving, the TTL ordering stays sorted by expiry.
    #[test]
    fn prop_ttl_order_sorted(
        ops in prop::collection::vec((key_strategy(), any::<bool>(), 0i64..50), 1..60)
    ) {
        let mut store: Store<u32> = Store::new(Capacity::Unlimited, Duration::from_millis(100), false);
        let mut now = Utc::now();

        for (key, is_set, advance_ms) in ops {
            now += chrono::TimeDelta::milliseconds(advance_ms);
            if is_set {
                store.set(&key, 1, &[], now);
            } else {
                store.touch(&key, now);
            }
        }

        let expiries: Vec<_> = store
            .ttl_keys()
            .iter()
            .filter_map(|k| store.item_expiry_time(k).and_then(|e| e.instant()))
            .collect();
        prop_assert_eq!(expiries.len(), store.len());
        prop_assert!(expiries.windows(2).all(|w| w[0] >= w[1]));
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // Committing a transaction equals applying its operations directly, and
    // rolling one back leaves the cache untouched.
    #[test]
    fn prop_commit_equals_direct_apply(
        ops in prop::collection::vec(cache_op_strategy(), 1..40),
        commit in any::<bool>()
    ) {
        let mut cfg = HashMap::new();
        cfg.insert("*p".to_string(), CacheConfig::new(TEST_MAX_ENTRIES as i64, Duration::ZERO, false));
        let transactional: TransCache<u32> = TransCache::new(cfg);
        let direct: Cache<u32> = Cache::new(TEST_MAX_ENTRIES as i64, Duration::ZERO, false, vec![]);

        let id = transactional.begin_transaction();
        for op in &ops {
            match op {
                CacheOp::Set { key, value, groups } => {
                    transactional.set_deferred(&id, "*p", key, *value, groups).unwrap();
                    direct.set(key, *value, groups);
                }
                CacheOp::Get { .. } => {}
                CacheOp::Remove { key } => {
                    transactional.remove_deferred(&id, "*p", key).unwrap();
                    direct.remove(key);
                }
                CacheOp::RemoveGroup { group } => {
                    transactional.remove_group_deferred(&id, "*p", group).unwrap();
                    direct.remove_group(group);
                }
            }
        }
        prop_assert!(transactional.item_ids("*p", "").is_empty());

        if commit {
            transactional.commit_transaction(&id).unwrap();
            let mut got = transactional.item_ids("*p", "");
            let mut want = direct.keys();
            got.sort();
            want.sort();
            prop_assert_eq!(&got, &want);
            for key in &want {
                prop_assert_eq!(transactional.get("*p", key), direct.get(key));
            }
        } else {
            transactional.rollback_transaction(&id).unwrap();
            prop_assert!(transactional.item_ids("*p", "").is_empty());
        }
    }
}

// == Concurrent Access ==

proptest! {
    #![proptest_config(ProptestConfig::with_cases(20))]

    // Concurrent writers on one bounded partition never break the capacity
    // invariant or the index consistency.
    #[test]
    fn prop_concurrent_operation_correctness(
        batches in prop::collection::vec(prop::collection::vec(cache_op_strategy(), 10..40), 2..6)
    ) {
        let tc: Arc<TransCache<u32>> = {
            let mut cfg = HashMap::new();
            cfg.insert("*p".to_string(), CacheConfig::new(TEST_MAX_ENTRIES as i64, Duration::ZERO, false));
            Arc::new(TransCache::new(cfg))
        };

        tokio_test::block_on(async {
            let handles: Vec<_> = batches
                .into_iter()
                .map(|batch| {
                    let tc = Arc::clone(&tc);
                    tokio::task::spawn_blocking(move || {
                        for op in batch {
                            match op {
                                CacheOp::Set { key, value, groups } => tc.set("*p", &key, value, &groups),
                                CacheOp::Get { key } => { let _ = tc.get("*p", &key); }
                                CacheOp::Remove { key } => { tc.remove("*p", &key); }
                                CacheOp::RemoveGroup { group } => tc.remove_group("*p", &group),
                            }
                        }
                    })
                })
                .collect();
            for handle in handles {
                handle.await.expect("Task should not panic");
            }
        });

        let stats = tc.cache_stats(&["*p".to_string()])["*p"];
        prop_assert!(stats.items <= TEST_MAX_ENTRIES);
        for key in tc.item_ids("*p", "") {
            prop_assert!(tc.get("*p", &key).is_some());
        }
    }
}
