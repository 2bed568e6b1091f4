//! Transcache - A transactional, partitioned in-memory cache
//!
//! Named LRU+TTL cache partitions with group tags and all-or-nothing batch
//! writes, plus a small HTTP admin service over JSON values.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod tasks;

pub use api::AppState;
pub use cache::{Cache, CacheConfig, TransCache};
pub use config::Config;
pub use error::{CacheError, Result};
pub use tasks::spawn_janitor_task;
