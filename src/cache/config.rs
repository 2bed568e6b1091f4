//! Partition configuration: capacity policy, TTL policy and eviction callbacks.

use std::fmt;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

/// `max_items` value meaning "no capacity limit, no LRU tracking".
pub const UNLIMITED: i64 = -1;

/// `max_items` value meaning "caching disabled, every write is a no-op".
pub const DISABLED: i64 = 0;

/// Called once per removed item with its key and last value.
pub type EvictionCallback<V> = Arc<dyn Fn(&str, &V) + Send + Sync>;

// == Capacity ==
/// Capacity policy of a partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capacity {
    Unlimited,
    Disabled,
    Bounded(NonZeroUsize),
}

impl Capacity {
    /// Maps the integer sentinels onto a policy. Negative values other than
    /// [`UNLIMITED`] are treated as unlimited too.
    pub fn from_limit(limit: i64) -> Self {
        if limit == DISABLED {
            return Capacity::Disabled;
        }
        usize::try_from(limit)
            .ok()
            .and_then(NonZeroUsize::new)
            .map_or(Capacity::Unlimited, Capacity::Bounded)
    }

    pub fn is_bounded(&self) -> bool {
        matches!(self, Capacity::Bounded(_))
    }
}

// == Cache Config ==
/// Construction parameters for one partition.
pub struct CacheConfig<V> {
    /// Capacity sentinel or hard limit, see [`Capacity::from_limit`]
    pub max_items: i64,
    /// Lifetime of new entries; zero disables expiry
    pub ttl: Duration,
    /// Expiry fixed at creation instead of sliding on access
    pub static_ttl: bool,
    pub on_evicted: Vec<EvictionCallback<V>>,
}

impl<V> CacheConfig<V> {
    pub fn new(max_items: i64, ttl: Duration, static_ttl: bool) -> Self {
        Self {
            max_items,
            ttl,
            static_ttl,
            on_evicted: Vec::new(),
        }
    }

    /// Adds an eviction callback.
    ///
    /// Callbacks run after the partition lock is released, but a
    /// [`TransCache`](crate::cache::TransCache) write, commit or clear still
    /// holds its cross-partition lock while they fire. A callback must not
    /// call back into the `TransCache` that owns this partition; doing so
    /// deadlocks.
    pub fn with_on_evicted<F>(mut self, callback: F) -> Self
    where
        F: Fn(&str, &V) + Send + Sync + 'static,
    {
        self.on_evicted.push(Arc::new(callback));
        self
    }

    pub fn capacity(&self) -> Capacity {
        Capacity::from_limit(self.max_items)
    }
}

impl<V> Default for CacheConfig<V> {
    fn default() -> Self {
        Self::new(UNLIMITED, Duration::ZERO, false)
    }
}

impl<V> Clone for CacheConfig<V> {
    fn clone(&self) -> Self {
        Self {
            max_items: self.max_items,
            ttl: self.ttl,
            static_ttl: self.static_ttl,
            on_evicted: self.on_evicted.clone(),
        }
    }
}

impl<V> fmt::Debug for CacheConfig<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheConfig")
            .field("max_items", &self.max_items)
            .field("ttl", &self.ttl)
            .field("static_ttl", &self.static_ttl)
            .field("on_evicted", &self.on_evicted.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capacity_sentinels() {
        assert_eq!(Capacity::from_limit(UNLIMITED), Capacity::Unlimited);
        assert_eq!(Capacity::from_limit(DISABLED), Capacity::Disabled);
        assert_eq!(Capacity::from_limit(-42), Capacity::Unlimited);
        assert_eq!(
            Capacity::from_limit(3),
            Capacity::Bounded(NonZeroUsize::new(3).unwrap())
        );
        assert!(Capacity::from_limit(1).is_bounded());
        assert!(!Capacity::from_limit(UNLIMITED).is_bounded());
    }

    #[test]
    fn test_config_default() {
        let cfg: CacheConfig<String> = CacheConfig::default();
        assert_eq!(cfg.max_items, UNLIMITED);
        assert_eq!(cfg.ttl, Duration::ZERO);
        assert!(!cfg.static_ttl);
        assert!(cfg.on_evicted.is_empty());
    }

    #[test]
    fn test_config_clone_shares_callbacks() {
        let cfg: CacheConfig<String> = CacheConfig::new(10, Duration::from_secs(1), true)
            .with_on_evicted(|_, _| {});
        let cloned = cfg.clone();
        assert_eq!(cloned.on_evicted.len(), 1);
        assert!(Arc::ptr_eq(&cfg.on_evicted[0], &cloned.on_evicted[0]));
    }
}
