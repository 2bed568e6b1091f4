//! Cache Store Module
//!
//! Single cache partition: HashMap storage with LRU tracking, TTL ordering and
//! group-tag indexing, all guarded by one lock.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use parking_lot::RwLock;
use tracing::{debug, error};

use crate::cache::config::{Capacity, CacheConfig, EvictionCallback};
use crate::cache::entry::{DeepClone, Entry, Expiry};
use crate::cache::list::IndexList;
use crate::cache::CacheStats;
use crate::error::{CacheError, Result};
use crate::tasks::Expirer;

/// Items removed by one operation, handed to the eviction callbacks.
pub(crate) type Evicted<V> = Vec<(String, V)>;

// == Sweep Step ==
/// Outcome of one expiry check on the TTL ordering.
pub(crate) enum SweepStep<V> {
    /// Nothing tracked for expiry
    Idle,
    /// Next item expires at this instant
    WaitUntil(DateTime<Utc>),
    /// The next item was due and has been removed
    Expired(String, V),
}

// == Store ==
/// Unlocked partition state. Every mutating method keeps the map, both orderings
/// and the group index consistent before returning.
#[derive(Debug)]
pub(crate) struct Store<V> {
    entries: HashMap<String, Entry<V>>,
    /// Front = most recently used; populated only for bounded capacity
    lru: IndexList,
    /// Back = soonest to expire; populated only when a TTL is set
    ttl_order: IndexList,
    groups: HashMap<String, HashSet<String>>,
    capacity: Capacity,
    ttl: Option<TimeDelta>,
    static_ttl: bool,
}

impl<V> Store<V> {
    // == Constructor ==
    pub fn new(capacity: Capacity, ttl: Duration, static_ttl: bool) -> Self {
        let ttl = (!ttl.is_zero()).then(|| TimeDelta::from_std(ttl).unwrap_or(TimeDelta::MAX));
        Self {
            entries: HashMap::new(),
            lru: IndexList::new(),
            ttl_order: IndexList::new(),
            groups: HashMap::new(),
            capacity,
            ttl,
            static_ttl,
        }
    }

    /// Whether a read has bookkeeping to do and therefore needs exclusive access.
    pub fn touches_on_get(&self) -> bool {
        self.capacity.is_bounded() || (self.ttl.is_some() && !self.static_ttl)
    }

    fn expiry_from(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.ttl
            .map(|ttl| now.checked_add_signed(ttl).unwrap_or(DateTime::<Utc>::MAX_UTC))
    }

    // == Touch ==
    /// Looks up a key and records the access: LRU front and, for sliding TTL,
    /// a renewed expiry at the TTL front.
    pub fn touch(&mut self, key: &str, now: DateTime<Utc>) -> Option<&V> {
        let renewed = if self.static_ttl { None } else { self.expiry_from(now) };
        let entry = self.entries.get_mut(key)?;
        if let Some(slot) = entry.lru_slot {
            self.lru.move_to_front(slot);
        }
        if let Some(at) = renewed {
            entry.expires_at = Some(at);
            if let Some(slot) = entry.ttl_slot {
                self.ttl_order.move_to_front(slot);
            }
        }
        Some(&entry.value)
    }

    /// Looks up a key without recording the access.
    pub fn peek(&self, key: &str) -> Option<&V> {
        self.entries.get(key).map(|e| &e.value)
    }

    // == Set ==
    /// Stores a value, replacing group membership wholesale.
    ///
    /// Returns the entry evicted to make room, if any.
    pub fn set(
        &mut self,
        key: &str,
        value: V,
        group_ids: &[String],
        now: DateTime<Utc>,
    ) -> Option<(String, V)> {
        if self.capacity == Capacity::Disabled {
            return None;
        }
        let groups: HashSet<String> = group_ids.iter().cloned().collect();

        // Overwrite case
        let renewed = if self.static_ttl { None } else { self.expiry_from(now) };
        if let Some(entry) = self.entries.get_mut(key) {
            entry.value = value;
            let previous = std::mem::replace(&mut entry.group_ids, groups);
            for group_id in previous.difference(&entry.group_ids) {
                unindex_group(&mut self.groups, group_id, key);
            }
            for group_id in entry.group_ids.difference(&previous) {
                index_group(&mut self.groups, group_id, key);
            }
            if let Some(slot) = entry.lru_slot {
                self.lru.move_to_front(slot);
            }
            if let Some(at) = renewed {
                entry.expires_at = Some(at);
                if let Some(slot) = entry.ttl_slot {
                    self.ttl_order.move_to_front(slot);
                }
            }
            return None;
        }

        // New key
        let mut entry = Entry::new(value, self.expiry_from(now), groups);
        if self.capacity.is_bounded() {
            entry.lru_slot = Some(self.lru.push_front(key.to_owned()));
        }
        if self.ttl.is_some() {
            entry.ttl_slot = Some(self.ttl_order.push_front(key.to_owned()));
        }
        for group_id in &entry.group_ids {
            index_group(&mut self.groups, group_id, key);
        }
        self.entries.insert(key.to_owned(), entry);

        // Growing by one can exceed the cap by at most one
        if let Capacity::Bounded(max) = self.capacity {
            if self.lru.len() > max.get() {
                let oldest = self.lru.back().map(|(_, k)| k.to_owned())?;
                return self.remove(&oldest);
            }
        }
        None
    }

    // == Remove ==
    /// Removes a key from the map and every index.
    pub fn remove(&mut self, key: &str) -> Option<(String, V)> {
        let (key, entry) = self.entries.remove_entry(key)?;
        if let Some(slot) = entry.lru_slot {
            self.lru.remove(slot);
        }
        if let Some(slot) = entry.ttl_slot {
            self.ttl_order.remove(slot);
        }
        for group_id in &entry.group_ids {
            unindex_group(&mut self.groups, group_id, &key);
        }
        Some((key, entry.value))
    }

    // == Remove Group ==
    /// Removes every member of a group.
    pub fn remove_group(&mut self, group_id: &str) -> Evicted<V> {
        let Some(members) = self.groups.remove(group_id) else {
            return Vec::new();
        };
        members.iter().filter_map(|key| self.remove(key)).collect()
    }

    pub fn group_item_ids(&self, group_id: &str) -> Vec<String> {
        self.groups
            .get(group_id)
            .map(|members| members.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn group_items(&self, group_id: &str) -> Vec<&V> {
        self.groups
            .get(group_id)
            .map(|members| members.iter().filter_map(|k| self.peek(k)).collect())
            .unwrap_or_default()
    }

    pub fn has_group(&self, group_id: &str) -> bool {
        self.groups.contains_key(group_id)
    }

    /// Keys starting with `prefix`; every key when the prefix is empty.
    pub fn item_ids(&self, prefix: &str) -> Vec<String> {
        self.entries
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect()
    }

    pub fn item_expiry_time(&self, key: &str) -> Option<Expiry> {
        self.entries.get(key).map(Entry::expiry)
    }

    pub fn has_item(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats::new(self.entries.len(), self.groups.len())
    }

    // == Clear ==
    /// Empties the partition, returning every removed item.
    pub fn clear(&mut self) -> Evicted<V> {
        self.lru.clear();
        self.ttl_order.clear();
        self.groups.clear();
        self.entries.drain().map(|(k, e)| (k, e.value)).collect()
    }

    // == Sweep ==
    /// Inspects the soonest-expiring item and removes it if it is due.
    pub fn sweep(&mut self, now: DateTime<Utc>) -> SweepStep<V> {
        let Some(key) = self.ttl_order.back().map(|(_, k)| k.to_owned()) else {
            return SweepStep::Idle;
        };
        match self.entries.get(&key).and_then(|e| e.expires_at) {
            Some(at) if now < at => SweepStep::WaitUntil(at),
            _ => match self.remove(&key) {
                Some((key, value)) => SweepStep::Expired(key, value),
                None => {
                    // Orphaned TTL node; drop it so the sweep makes progress
                    self.ttl_order.pop_back();
                    SweepStep::Idle
                }
            },
        }
    }

    #[cfg(test)]
    pub fn lru_keys(&self) -> Vec<String> {
        self.lru.iter().map(str::to_owned).collect()
    }

    #[cfg(test)]
    pub fn ttl_keys(&self) -> Vec<String> {
        self.ttl_order.iter().map(str::to_owned).collect()
    }
}

fn index_group(groups: &mut HashMap<String, HashSet<String>>, group_id: &str, key: &str) {
    groups
        .entry(group_id.to_owned())
        .or_default()
        .insert(key.to_owned());
}

fn unindex_group(groups: &mut HashMap<String, HashSet<String>>, group_id: &str, key: &str) {
    if let Some(members) = groups.get_mut(group_id) {
        members.remove(key);
        if members.is_empty() {
            groups.remove(group_id);
        }
    }
}

// == Shared ==
/// Lock plus callbacks, shared between a [`Cache`] handle and its expirer.
pub(crate) struct Shared<V> {
    name: String,
    store: RwLock<Store<V>>,
    on_evicted: Vec<EvictionCallback<V>>,
    touch_on_get: bool,
}

impl<V> Shared<V> {
    pub fn name(&self) -> &str {
        &self.name
    }

    // Callbacks run after the partition lock is released.
    fn notify(&self, evicted: Evicted<V>) {
        if self.on_evicted.is_empty() {
            return;
        }
        for (key, value) in &evicted {
            for callback in &self.on_evicted {
                callback(key, value);
            }
        }
    }

    /// One expirer iteration: remove the next due item or report when to look again.
    pub(crate) fn sweep(&self) -> SweepStep<()> {
        let step = self.store.write().sweep(Utc::now());
        match step {
            SweepStep::Idle => SweepStep::Idle,
            SweepStep::WaitUntil(at) => SweepStep::WaitUntil(at),
            SweepStep::Expired(key, value) => {
                debug!(cache = %self.name, key = %key, "expired item removed");
                self.notify(vec![(key.clone(), value)]);
                SweepStep::Expired(key, ())
            }
        }
    }
}

// == Cache ==
/// A single cache partition with LRU eviction, TTL expiry and group tags.
///
/// Partitions with a non-zero TTL own a background expirer thread, stopped when
/// the cache is dropped or [`Cache::shutdown`] is called.
pub struct Cache<V> {
    shared: Arc<Shared<V>>,
    pub(crate) expirer: Option<Expirer>,
}

impl<V> Cache<V>
where
    V: Clone + Send + Sync + 'static,
{
    // == Constructor ==
    /// Creates a partition.
    ///
    /// # Arguments
    /// * `max_entries` - capacity limit, or [`UNLIMITED`](crate::cache::UNLIMITED) /
    ///   [`DISABLED`](crate::cache::DISABLED)
    /// * `ttl` - lifetime of new entries, zero for no expiry
    /// * `static_ttl` - do not renew expiry on access
    /// * `on_evicted` - callbacks fired once per removed item
    pub fn new(
        max_entries: i64,
        ttl: Duration,
        static_ttl: bool,
        on_evicted: Vec<EvictionCallback<V>>,
    ) -> Self {
        let config = CacheConfig {
            max_items: max_entries,
            ttl,
            static_ttl,
            on_evicted,
        };
        Self::from_config("cache", config)
    }

    /// Creates a named partition from its configuration.
    pub fn from_config(name: &str, config: CacheConfig<V>) -> Self {
        let store = Store::new(config.capacity(), config.ttl, config.static_ttl);
        let shared = Arc::new(Shared {
            name: name.to_owned(),
            touch_on_get: store.touches_on_get(),
            store: RwLock::new(store),
            on_evicted: config.on_evicted,
        });

        let expirer = if config.ttl.is_zero() {
            None
        } else {
            match Expirer::spawn(Arc::clone(&shared), config.ttl) {
                Ok(expirer) => Some(expirer),
                Err(err) => {
                    error!(cache = %name, error = %err, "failed to start expirer");
                    None
                }
            }
        };

        Self { shared, expirer }
    }

    // == Get ==
    /// Retrieves a value, recording the access for LRU and sliding TTL.
    pub fn get(&self, key: &str) -> Option<V> {
        if self.shared.touch_on_get {
            let mut store = self.shared.store.write();
            let value = store.touch(key, Utc::now()).cloned();
            value
        } else {
            let store = self.shared.store.read();
            let value = store.peek(key).cloned();
            value
        }
    }

    // == Set ==
    /// Stores a value under `key`, tagged with `group_ids`.
    pub fn set(&self, key: &str, value: V, group_ids: &[String]) {
        let evicted = self.shared.store.write().set(key, value, group_ids, Utc::now());
        if let Some((key, value)) = evicted {
            debug!(cache = %self.shared.name, key = %key, "evicted least recently used item");
            self.shared.notify(vec![(key, value)]);
        }
    }

    // == Remove ==
    /// Removes a key. Absent keys are ignored; returns whether anything went.
    pub fn remove(&self, key: &str) -> bool {
        let removed = self.shared.store.write().remove(key);
        match removed {
            Some(item) => {
                self.shared.notify(vec![item]);
                true
            }
            None => false,
        }
    }

    /// Removes every item tagged with `group_id`.
    pub fn remove_group(&self, group_id: &str) {
        let removed = self.shared.store.write().remove_group(group_id);
        debug!(cache = %self.shared.name, group = %group_id, count = removed.len(), "group removed");
        self.shared.notify(removed);
    }

    pub fn group_item_ids(&self, group_id: &str) -> Vec<String> {
        self.shared.store.read().group_item_ids(group_id)
    }

    pub fn group_items(&self, group_id: &str) -> Vec<V> {
        let store = self.shared.store.read();
        let items = store.group_items(group_id).into_iter().cloned().collect();
        items
    }

    pub fn has_group(&self, group_id: &str) -> bool {
        self.shared.store.read().has_group(group_id)
    }

    /// Keys starting with `prefix`, or all keys for an empty prefix.
    pub fn item_ids(&self, prefix: &str) -> Vec<String> {
        self.shared.store.read().item_ids(prefix)
    }

    pub fn keys(&self) -> Vec<String> {
        self.item_ids("")
    }

    /// Current expiry of a key without renewing it.
    pub fn item_expiry_time(&self, key: &str) -> Option<Expiry> {
        self.shared.store.read().item_expiry_time(key)
    }

    pub fn has_item(&self, key: &str) -> bool {
        self.shared.store.read().has_item(key)
    }

    pub fn len(&self) -> usize {
        self.shared.store.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        self.shared.store.read().stats()
    }

    // == Clear ==
    /// Removes everything, firing the eviction callbacks once per item.
    pub fn clear(&self) {
        let removed = self.shared.store.write().clear();
        debug!(cache = %self.shared.name, count = removed.len(), "cache cleared");
        self.shared.notify(removed);
    }

    /// Stops the background expirer. Items stop expiring but stay readable.
    pub fn shutdown(&mut self) {
        if let Some(mut expirer) = self.expirer.take() {
            expirer.stop();
        }
    }

    pub fn name(&self) -> &str {
        self.shared.name()
    }
}

impl<V> Cache<V>
where
    V: Clone + DeepClone + Send + Sync + 'static,
{
    // == Get Cloned ==
    /// Retrieves an isolated copy of a value.
    ///
    /// Fails with [`CacheError::NotFound`] when the key is absent and with
    /// [`CacheError::NotClonable`] when the value refuses to clone.
    pub fn get_cloned(&self, key: &str) -> Result<V> {
        let cloned = if self.shared.touch_on_get {
            let mut store = self.shared.store.write();
            let cloned = store.touch(key, Utc::now()).map(V::deep_clone);
            cloned
        } else {
            let store = self.shared.store.read();
            let cloned = store.peek(key).map(V::deep_clone);
            cloned
        };
        cloned.unwrap_or_else(|| Err(CacheError::NotFound(key.to_string())))
    }
}
