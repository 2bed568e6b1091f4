//! Configuration Module
//!
//! Handles loading server settings from environment variables and partition
//! definitions from an optional JSON file.

use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;

use crate::cache::{CacheConfig, DEFAULT_CACHE_ID};

/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Capacity of the default partition (-1 unlimited, 0 disabled)
    pub max_entries: i64,
    /// TTL in seconds of the default partition, 0 = no expiry
    pub default_ttl: u64,
    /// Whether the default partition uses a fixed TTL
    pub static_ttl: bool,
    /// HTTP server port
    pub server_port: u16,
    /// Transaction janitor interval in seconds
    pub janitor_interval: u64,
    /// Age in seconds after which an uncommitted transaction is dropped
    pub transaction_timeout: u64,
    /// Optional JSON file describing named partitions
    pub partitions_file: Option<PathBuf>,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `MAX_ENTRIES` - Default partition capacity (default: 1000)
    /// - `DEFAULT_TTL` - Default partition TTL in seconds (default: 300)
    /// - `STATIC_TTL` - Default partition uses fixed TTL (default: false)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `JANITOR_INTERVAL` - Transaction janitor frequency in seconds (default: 30)
    /// - `TRANSACTION_TIMEOUT` - Abandoned transaction age in seconds (default: 300)
    /// - `PARTITIONS_FILE` - Path to a JSON partitions file (default: none)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_entries: parse_env("MAX_ENTRIES").unwrap_or(defaults.max_entries),
            default_ttl: parse_env("DEFAULT_TTL").unwrap_or(defaults.default_ttl),
            static_ttl: parse_env("STATIC_TTL").unwrap_or(defaults.static_ttl),
            server_port: parse_env("SERVER_PORT").unwrap_or(defaults.server_port),
            janitor_interval: parse_env("JANITOR_INTERVAL").unwrap_or(defaults.janitor_interval),
            transaction_timeout: parse_env("TRANSACTION_TIMEOUT")
                .unwrap_or(defaults.transaction_timeout),
            partitions_file: env::var("PARTITIONS_FILE").ok().map(PathBuf::from),
        }
    }

    pub fn transaction_timeout(&self) -> Duration {
        Duration::from_secs(self.transaction_timeout)
    }

    /// Builds the partition map for the cache: the default partition from the
    /// environment, plus every entry of the partitions file. A `*default` entry
    /// in the file overrides the environment.
    pub fn partitions<V>(&self) -> anyhow::Result<HashMap<String, CacheConfig<V>>> {
        let mut partitions = HashMap::new();
        partitions.insert(
            DEFAULT_CACHE_ID.to_string(),
            CacheConfig::new(
                self.max_entries,
                Duration::from_secs(self.default_ttl),
                self.static_ttl,
            ),
        );
        if let Some(path) = &self.partitions_file {
            for (name, partition) in load_partitions_file(path)? {
                partitions.insert(name, partition.to_cache_config());
            }
        }
        Ok(partitions)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_entries: 1000,
            default_ttl: 300,
            static_ttl: false,
            server_port: 3000,
            janitor_interval: 30,
            transaction_timeout: 300,
            partitions_file: None,
        }
    }
}

fn parse_env<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.parse().ok())
}

// == Partition Config ==
/// One partition as written in the partitions file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PartitionConfig {
    /// Capacity (-1 unlimited, 0 disabled)
    #[serde(default = "unlimited")]
    pub limit: i64,
    /// TTL in milliseconds, 0 = no expiry
    #[serde(default)]
    pub ttl_ms: u64,
    #[serde(default)]
    pub static_ttl: bool,
}

fn unlimited() -> i64 {
    crate::cache::UNLIMITED
}

impl PartitionConfig {
    pub fn to_cache_config<V>(&self) -> CacheConfig<V> {
        CacheConfig::new(self.limit, Duration::from_millis(self.ttl_ms), self.static_ttl)
    }
}

/// Parses a partitions file of the form `{"<name>": {"limit": .., "ttl_ms": .., "static_ttl": ..}}`.
pub fn load_partitions_file(path: &Path) -> anyhow::Result<HashMap<String, PartitionConfig>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("reading partitions file {}", path.display()))?;
    parse_partitions(&raw).with_context(|| format!("parsing partitions file {}", path.display()))
}

pub fn parse_partitions(raw: &str) -> anyhow::Result<HashMap<String, PartitionConfig>> {
    Ok(serde_json::from_str(raw)?)
}
