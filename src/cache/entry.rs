//! Cache Entry Module
//!
//! Defines individual cache entries, their expiry and the deep-clone capability.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::cache::list::Slot;
use crate::error::{CacheError, Result};

// == Expiry ==
/// Expiry of a stored item as reported to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "at", rename_all = "snake_case")]
pub enum Expiry {
    /// Partition does not track TTL; the item only leaves by removal or eviction.
    Never,
    /// Item becomes eligible for removal at this instant.
    At(DateTime<Utc>),
}

impl Expiry {
    /// Returns the instant, if any.
    pub fn instant(&self) -> Option<DateTime<Utc>> {
        match self {
            Expiry::Never => None,
            Expiry::At(at) => Some(*at),
        }
    }
}

// == Cache Entry ==
/// A single stored item plus its index bookkeeping.
#[derive(Debug)]
pub(crate) struct Entry<V> {
    /// The stored value
    pub value: V,
    /// Expiration instant, None when the partition has no TTL
    pub expires_at: Option<DateTime<Utc>>,
    /// Groups the key is currently indexed under
    pub group_ids: HashSet<String>,
    /// Position in the LRU list (bounded partitions only)
    pub lru_slot: Option<Slot>,
    /// Position in the TTL list (TTL partitions only)
    pub ttl_slot: Option<Slot>,
}

impl<V> Entry<V> {
    pub fn new(value: V, expires_at: Option<DateTime<Utc>>, group_ids: HashSet<String>) -> Self {
        Self {
            value,
            expires_at,
            group_ids,
            lru_slot: None,
            ttl_slot: None,
        }
    }

    pub fn expiry(&self) -> Expiry {
        match self.expires_at {
            Some(at) => Expiry::At(at),
            None => Expiry::Never,
        }
    }
}

// == Deep Clone ==
/// Optional capability for values that can produce an isolated copy.
///
/// Plain reads share the stored value (`V: Clone` is expected to be cheap, e.g.
/// an `Arc`); callers that need isolation use `get_cloned`, which goes through
/// this trait. The default implementation refuses.
pub trait DeepClone: Sized {
    fn deep_clone(&self) -> Result<Self> {
        Err(CacheError::NotClonable(std::any::type_name::<Self>().to_string()))
    }
}

impl DeepClone for String {
    fn deep_clone(&self) -> Result<Self> {
        Ok(self.clone())
    }
}

impl DeepClone for serde_json::Value {
    fn deep_clone(&self) -> Result<Self> {
        Ok(self.clone())
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    struct Opaque;

    impl DeepClone for Opaque {}

    #[test]
    fn test_entry_without_ttl_never_expires() {
        let entry = Entry::new("v".to_string(), None, HashSet::new());

        assert_eq!(entry.expiry(), Expiry::Never);
        assert!(entry.expiry().instant().is_none());
    }

    #[test]
    fn test_entry_expiry_instant() {
        let now = Utc::now();
        let entry = Entry::new(1u32, Some(now), HashSet::new());

        assert_eq!(entry.expiry(), Expiry::At(now));
        assert_eq!(entry.expiry().instant(), Some(now));
    }

    #[test]
    fn test_default_deep_clone_refuses() {
        let err = Opaque.deep_clone().err();
        assert!(matches!(err, Some(CacheError::NotClonable(_))));
    }

    #[test]
    fn test_json_deep_clone() {
        let value = serde_json::json!({"tenant": "cgrates.org", "weight": 10});
        assert_eq!(value.deep_clone().unwrap(), value);
    }

    #[test]
    fn test_expiry_serialize() {
        let json = serde_json::to_value(Expiry::Never).unwrap();
        assert_eq!(json["kind"], "never");
    }
}
