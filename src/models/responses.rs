//! Response DTOs for the cache server API
//!
//! Defines the structure of outgoing HTTP response bodies.

use std::collections::HashMap;

use serde::Serialize;

use crate::cache::{CacheStats, Expiry};

/// Response body for reading an item (GET .../items/:key)
#[derive(Debug, Clone, Serialize)]
pub struct ItemResponse {
    pub cache_id: String,
    pub key: String,
    pub value: serde_json::Value,
}

impl ItemResponse {
    pub fn new(
        cache_id: impl Into<String>,
        key: impl Into<String>,
        value: serde_json::Value,
    ) -> Self {
        Self {
            cache_id: cache_id.into(),
            key: key.into(),
            value,
        }
    }
}

/// Response body for write operations, immediate or deferred
#[derive(Debug, Clone, Serialize)]
pub struct WriteResponse {
    /// Success message
    pub message: String,
    pub cache_id: String,
    /// The item key or group ID written
    pub target: String,
    /// Set when the write was buffered in a transaction
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
}

impl WriteResponse {
    pub fn new(action: &str, cache_id: impl Into<String>, target: impl Into<String>) -> Self {
        let target = target.into();
        Self {
            message: format!("'{}' {} successfully", target, action),
            cache_id: cache_id.into(),
            target,
            transaction_id: None,
        }
    }

    pub fn deferred(
        action: &str,
        trans_id: impl Into<String>,
        cache_id: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        let target = target.into();
        let trans_id = trans_id.into();
        Self {
            message: format!("'{}' {} queued in transaction {}", target, action, trans_id),
            cache_id: cache_id.into(),
            target,
            transaction_id: Some(trans_id),
        }
    }
}

/// Response body for listings of item IDs (by prefix or by group)
#[derive(Debug, Clone, Serialize)]
pub struct ItemIdsResponse {
    pub cache_id: String,
    pub item_ids: Vec<String>,
}

impl ItemIdsResponse {
    /// Creates a listing with the IDs sorted for stable output
    pub fn new(cache_id: impl Into<String>, mut item_ids: Vec<String>) -> Self {
        item_ids.sort();
        Self {
            cache_id: cache_id.into(),
            item_ids,
        }
    }
}

/// Response body for the existence checks of items and groups
#[derive(Debug, Clone, Serialize)]
pub struct ExistsResponse {
    pub cache_id: String,
    /// The item key or group ID checked
    pub id: String,
    pub exists: bool,
}

/// Response body for POST /caches/remove_items
#[derive(Debug, Clone, Serialize)]
pub struct RemoveItemsResponse {
    pub message: String,
    /// Items that were present and got removed
    pub removed: usize,
}

/// Response body for GET .../items/:key/expiry
#[derive(Debug, Clone, Serialize)]
pub struct ExpiryResponse {
    pub cache_id: String,
    pub key: String,
    pub expiry: Expiry,
}

/// Response body for the stats endpoint (GET /stats)
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    /// Per-partition item and group counts
    pub caches: HashMap<String, CacheStats>,
    /// Transactions currently open
    pub open_transactions: usize,
}

/// Response body for transaction lifecycle endpoints
#[derive(Debug, Clone, Serialize)]
pub struct TransactionResponse {
    pub transaction_id: String,
    /// "open", "committed" or "rolled_back"
    pub status: String,
}

impl TransactionResponse {
    pub fn new(transaction_id: impl Into<String>, status: impl Into<String>) -> Self {
        Self {
            transaction_id: transaction_id.into(),
            status: status.into(),
        }
    }
}

/// Response body for POST /clear
#[derive(Debug, Clone, Serialize)]
pub struct ClearResponse {
    pub message: String,
    pub cache_ids: Vec<String>,
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Error response body for all error conditions
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error message describing what went wrong
    pub error: String,
}

impl ErrorResponse {
    /// Creates a new ErrorResponse
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
