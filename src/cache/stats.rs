//! Cache Statistics Module
//!
//! Point-in-time item and group counts of a partition.

use serde::{Deserialize, Serialize};

// == Cache Stats ==
/// Snapshot of a partition's size.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Number of items currently stored
    pub items: usize,
    /// Number of non-empty groups currently indexed
    pub groups: usize,
}

impl CacheStats {
    // == Constructor ==
    pub fn new(items: usize, groups: usize) -> Self {
        Self { items, groups }
    }

    /// True when the partition holds nothing.
    pub fn is_empty(&self) -> bool {
        self.items == 0
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_default() {
        let stats = CacheStats::default();
        assert_eq!(stats.items, 0);
        assert_eq!(stats.groups, 0);
        assert!(stats.is_empty());
    }

    #[test]
    fn test_stats_serialize() {
        let json = serde_json::to_string(&CacheStats::new(3, 1)).unwrap();
        assert_eq!(json, r#"{"items":3,"groups":1}"#);
    }
}
