//! Cache Module
//!
//! In-memory cache partitions with TTL expiration, LRU eviction and group tags,
//! plus the transactional multi-partition wrapper.

mod config;
mod entry;
mod list;
mod stats;
pub(crate) mod store;
mod transaction;
mod transcache;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use config::{CacheConfig, Capacity, EvictionCallback, DISABLED, UNLIMITED};
pub use entry::{DeepClone, Expiry};
pub use stats::CacheStats;
pub use store::Cache;
pub use transcache::TransCache;

// == Public Constants ==
/// Name of the partition that always exists and receives unknown partition names.
pub const DEFAULT_CACHE_ID: &str = "*default";
