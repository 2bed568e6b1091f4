//! Request DTOs for the cache server API
//!
//! Defines the structure of incoming HTTP request bodies and query strings.

use std::collections::HashMap;

use serde::Deserialize;

/// Maximum accepted length of an item key, in bytes
pub const MAX_KEY_LENGTH: usize = 256;

/// Checks an item key taken from the request path.
///
/// Returns an error message if validation fails, None if valid.
pub fn validate_key(key: &str) -> Option<String> {
    if key.is_empty() {
        return Some("Key cannot be empty".to_string());
    }
    if key.len() > MAX_KEY_LENGTH {
        return Some(format!(
            "Key exceeds maximum length of {} characters",
            MAX_KEY_LENGTH
        ));
    }
    None
}

/// Checks a group ID taken from the request path or body.
pub fn validate_group_id(group_id: &str) -> Option<String> {
    if group_id.is_empty() {
        return Some("Group ID cannot be empty".to_string());
    }
    None
}

/// Request body for storing an item (PUT .../items/:key)
///
/// # Fields
/// - `value`: Any JSON value
/// - `group_ids`: Group tags replacing the item's previous membership
#[derive(Debug, Clone, Deserialize)]
pub struct SetItemRequest {
    /// The value to store
    pub value: serde_json::Value,
    /// Group tags for the item
    #[serde(default)]
    pub group_ids: Vec<String>,
}

impl SetItemRequest {
    pub fn validate(&self) -> Option<String> {
        self.group_ids.iter().find_map(|g| validate_group_id(g))
    }
}

/// Request body for POST /caches/remove_items: item IDs per partition.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RemoveItemsRequest {
    #[serde(default)]
    pub items: HashMap<String, Vec<String>>,
}

impl RemoveItemsRequest {
    pub fn validate(&self) -> Option<String> {
        self.items.values().flatten().find_map(|key| validate_key(key))
    }
}

/// Request body for POST /clear. An empty list clears every partition.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClearRequest {
    #[serde(default)]
    pub cache_ids: Vec<String>,
}

/// Query string for GET .../items
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ItemIdsQuery {
    pub prefix: Option<String>,
}

/// Query string for GET /stats, e.g. `?ids=*default,*rpc_responses`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatsQuery {
    pub ids: Option<String>,
}

impl StatsQuery {
    /// Partition names from the comma separated list, empty meaning all.
    pub fn cache_ids(&self) -> Vec<String> {
        self.ids
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(String::from)
            .collect()
    }
}
