//! Transactional Cache Module
//!
//! Named partitions behind one cross-partition lock, with deferred batches of
//! writes that become visible atomically on commit.

use std::collections::HashMap;
use std::time::Duration;

use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::cache::config::CacheConfig;
use crate::cache::entry::{DeepClone, Expiry};
use crate::cache::store::Cache;
use crate::cache::transaction::{TransactionBuffer, TransactionOp};
use crate::cache::{CacheStats, DEFAULT_CACHE_ID};
use crate::error::Result;

// == Trans Cache ==
/// A set of named cache partitions with transactional batch writes.
///
/// Partition names that were not configured resolve to the default partition
/// ([`DEFAULT_CACHE_ID`]), which always exists.
pub struct TransCache<V> {
    default: Cache<V>,
    caches: HashMap<String, Cache<V>>,
    /// Readers share it; immediate writes, commits and clears hold it exclusively
    trans_lock: RwLock<()>,
    transactions: Mutex<TransactionBuffer<V>>,
}

impl<V> TransCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    // == Constructor ==
    /// Builds every configured partition. A missing default partition gets an
    /// unlimited, non-expiring configuration.
    pub fn new(mut config: HashMap<String, CacheConfig<V>>) -> Self {
        let default_config = config.remove(DEFAULT_CACHE_ID).unwrap_or_default();
        let default = Cache::from_config(DEFAULT_CACHE_ID, default_config);
        let caches: HashMap<String, Cache<V>> = config
            .into_iter()
            .map(|(name, cfg)| {
                debug!(cache = %name, config = ?cfg, "creating partition");
                let cache = Cache::from_config(&name, cfg);
                (name, cache)
            })
            .collect();
        info!(partitions = caches.len() + 1, "transactional cache initialized");

        Self {
            default,
            caches,
            trans_lock: RwLock::new(()),
            transactions: Mutex::new(TransactionBuffer::new()),
        }
    }

    // Unknown names fall back to the default partition.
    fn cache(&self, cache_id: &str) -> &Cache<V> {
        self.caches.get(cache_id).unwrap_or(&self.default)
    }

    /// Configured partition names, default included.
    pub fn cache_ids(&self) -> Vec<String> {
        std::iter::once(DEFAULT_CACHE_ID.to_string())
            .chain(self.caches.keys().cloned())
            .collect()
    }

    // == Reads ==

    pub fn get(&self, cache_id: &str, item_id: &str) -> Option<V> {
        let _guard = self.trans_lock.read();
        self.cache(cache_id).get(item_id)
    }

    pub fn has_item(&self, cache_id: &str, item_id: &str) -> bool {
        let _guard = self.trans_lock.read();
        self.cache(cache_id).has_item(item_id)
    }

    pub fn has_group(&self, cache_id: &str, group_id: &str) -> bool {
        let _guard = self.trans_lock.read();
        self.cache(cache_id).has_group(group_id)
    }

    pub fn group_item_ids(&self, cache_id: &str, group_id: &str) -> Vec<String> {
        let _guard = self.trans_lock.read();
        self.cache(cache_id).group_item_ids(group_id)
    }

    pub fn group_items(&self, cache_id: &str, group_id: &str) -> Vec<V> {
        let _guard = self.trans_lock.read();
        self.cache(cache_id).group_items(group_id)
    }

    pub fn item_ids(&self, cache_id: &str, prefix: &str) -> Vec<String> {
        let _guard = self.trans_lock.read();
        self.cache(cache_id).item_ids(prefix)
    }

    pub fn item_expiry_time(&self, cache_id: &str, item_id: &str) -> Option<Expiry> {
        let _guard = self.trans_lock.read();
        self.cache(cache_id).item_expiry_time(item_id)
    }

    /// Stats per requested partition, or for every partition when `cache_ids`
    /// is empty. Unknown names report the default partition.
    pub fn cache_stats(&self, cache_ids: &[String]) -> HashMap<String, CacheStats> {
        let _guard = self.trans_lock.read();
        let ids = if cache_ids.is_empty() {
            self.cache_ids()
        } else {
            cache_ids.to_vec()
        };
        ids.into_iter()
            .map(|id| {
                let stats = self.cache(&id).stats();
                (id, stats)
            })
            .collect()
    }

    // == Immediate Writes ==

    /// Stores an item right away.
    pub fn set(&self, cache_id: &str, item_id: &str, value: V, group_ids: &[String]) {
        let _guard = self.trans_lock.write();
        self.cache(cache_id).set(item_id, value, group_ids);
    }

    /// Removes an item right away; false when it was not there.
    pub fn remove(&self, cache_id: &str, item_id: &str) -> bool {
        let _guard = self.trans_lock.write();
        self.cache(cache_id).remove(item_id)
    }

    /// Removes several items across partitions under one write lock.
    ///
    /// Returns how many were actually present.
    pub fn remove_items(&self, items: &HashMap<String, Vec<String>>) -> usize {
        let _guard = self.trans_lock.write();
        items
            .iter()
            .map(|(cache_id, item_ids)| {
                let cache = self.cache(cache_id);
                item_ids.iter().filter(|id| cache.remove(id)).count()
            })
            .sum()
    }

    pub fn remove_group(&self, cache_id: &str, group_id: &str) {
        let _guard = self.trans_lock.write();
        self.cache(cache_id).remove_group(group_id);
    }

    /// Clears the named partitions, or all of them when `cache_ids` is empty.
    pub fn clear(&self, cache_ids: &[String]) {
        let _guard = self.trans_lock.write();
        if cache_ids.is_empty() {
            self.default.clear();
            self.caches.values().for_each(Cache::clear);
        } else {
            for id in cache_ids {
                self.cache(id).clear();
            }
        }
        info!(caches = ?cache_ids, "caches cleared");
    }

    // == Deferred Writes ==

    /// Buffers a set under an open transaction.
    pub fn set_deferred(
        &self,
        trans_id: &str,
        cache_id: &str,
        item_id: &str,
        value: V,
        group_ids: &[String],
    ) -> Result<()> {
        self.defer(
            trans_id,
            TransactionOp::Set {
                cache_id: cache_id.to_owned(),
                item_id: item_id.to_owned(),
                value,
                group_ids: group_ids.to_vec(),
            },
        )
    }

    pub fn remove_deferred(&self, trans_id: &str, cache_id: &str, item_id: &str) -> Result<()> {
        self.defer(
            trans_id,
            TransactionOp::Remove {
                cache_id: cache_id.to_owned(),
                item_id: item_id.to_owned(),
            },
        )
    }

    pub fn remove_group_deferred(
        &self,
        trans_id: &str,
        cache_id: &str,
        group_id: &str,
    ) -> Result<()> {
        self.defer(
            trans_id,
            TransactionOp::RemoveGroup {
                cache_id: cache_id.to_owned(),
                group_id: group_id.to_owned(),
            },
        )
    }

    fn defer(&self, trans_id: &str, op: TransactionOp<V>) -> Result<()> {
        self.transactions.lock().push(trans_id, op).inspect_err(|err| {
            warn!(transaction = %trans_id, error = %err, "rejected deferred operation");
        })
    }

    // == Transactions ==

    /// Opens a transaction and returns its ID.
    pub fn begin_transaction(&self) -> String {
        let id = self.transactions.lock().begin(Utc::now());
        debug!(transaction = %id, "transaction started");
        id
    }

    /// Applies every buffered operation in order, atomically with respect to
    /// readers of any partition.
    pub fn commit_transaction(&self, trans_id: &str) -> Result<()> {
        let ops = self
            .transactions
            .lock()
            .close(trans_id, Utc::now())
            .inspect_err(|err| warn!(transaction = %trans_id, error = %err, "commit rejected"))?;
        let count = ops.len();

        let _guard = self.trans_lock.write();
        for op in ops {
            self.apply(op);
        }
        debug!(transaction = %trans_id, operations = count, "transaction committed");
        Ok(())
    }

    /// Discards every buffered operation.
    pub fn rollback_transaction(&self, trans_id: &str) -> Result<()> {
        let ops = self
            .transactions
            .lock()
            .close(trans_id, Utc::now())
            .inspect_err(|err| warn!(transaction = %trans_id, error = %err, "rollback rejected"))?;
        debug!(transaction = %trans_id, discarded = ops.len(), "transaction rolled back");
        Ok(())
    }

    /// Drops transactions older than `max_age` (open ones without applying
    /// them) and returns how many records were released.
    pub fn purge_abandoned_transactions(&self, max_age: Duration) -> usize {
        self.transactions.lock().purge(max_age, Utc::now())
    }

    pub fn open_transactions(&self) -> usize {
        self.transactions.lock().open_count()
    }

    // Caller holds the cross-partition write lock.
    fn apply(&self, op: TransactionOp<V>) {
        match op {
            TransactionOp::Set {
                cache_id,
                item_id,
                value,
                group_ids,
            } => self.cache(&cache_id).set(&item_id, value, &group_ids),
            TransactionOp::Remove { cache_id, item_id } => {
                self.cache(&cache_id).remove(&item_id);
            }
            TransactionOp::RemoveGroup { cache_id, group_id } => {
                self.cache(&cache_id).remove_group(&group_id)
            }
        }
    }
}

impl<V> TransCache<V>
where
    V: Clone + DeepClone + Send + Sync + 'static,
{
    /// Retrieves an isolated copy of an item.
    pub fn get_cloned(&self, cache_id: &str, item_id: &str) -> Result<V> {
        let _guard = self.trans_lock.read();
        self.cache(cache_id).get_cloned(item_id)
    }
}
