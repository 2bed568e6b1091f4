//! API Handlers
//!
//! HTTP request handlers for each cache server endpoint.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::Value;
use tracing::debug;

use crate::cache::{CacheConfig, TransCache};
use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::models::{
    validate_group_id, validate_key, ClearRequest, ClearResponse, ExistsResponse, ExpiryResponse,
    HealthResponse, ItemIdsQuery, ItemIdsResponse, ItemResponse, RemoveItemsRequest,
    RemoveItemsResponse, SetItemRequest, StatsQuery, StatsResponse, TransactionResponse,
    WriteResponse,
};

/// Application state shared across all handlers.
///
/// The cache does its own locking, so handlers share a plain Arc.
#[derive(Clone)]
pub struct AppState {
    pub cache: Arc<TransCache<Value>>,
}

impl AppState {
    /// Creates a new AppState with the given cache.
    pub fn new(cache: Arc<TransCache<Value>>) -> Self {
        Self { cache }
    }

    /// Creates a new AppState with the given partitions.
    pub fn with_partitions(partitions: HashMap<String, CacheConfig<Value>>) -> Self {
        Self::new(Arc::new(TransCache::new(partitions)))
    }

    /// Creates a new AppState from configuration.
    ///
    /// Every partition logs its evictions at debug level.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let partitions = config
            .partitions::<Value>()?
            .into_iter()
            .map(|(name, cfg)| {
                let cache_id = name.clone();
                let cfg = cfg.with_on_evicted(move |key: &str, _: &Value| {
                    debug!("Evicted '{}' from {}", key, cache_id);
                });
                (name, cfg)
            })
            .collect();
        Ok(Self::with_partitions(partitions))
    }
}

fn check_key(key: &str) -> Result<()> {
    match validate_key(key) {
        Some(msg) => Err(CacheError::InvalidRequest(msg)),
        None => Ok(()),
    }
}

fn check_group(group_id: &str) -> Result<()> {
    match validate_group_id(group_id) {
        Some(msg) => Err(CacheError::InvalidRequest(msg)),
        None => Ok(()),
    }
}

// == Reads ==

/// Handler for GET /caches/:cache_id/items/:key
///
/// Returns a deep copy of the stored value.
pub async fn get_item_handler(
    State(state): State<AppState>,
    Path((cache_id, key)): Path<(String, String)>,
) -> Result<Json<ItemResponse>> {
    check_key(&key)?;
    let value = state.cache.get_cloned(&cache_id, &key)?;
    Ok(Json(ItemResponse::new(cache_id, key, value)))
}

/// Handler for GET /caches/:cache_id/items?prefix=
pub async fn item_ids_handler(
    State(state): State<AppState>,
    Path(cache_id): Path<String>,
    Query(query): Query<ItemIdsQuery>,
) -> Json<ItemIdsResponse> {
    let prefix = query.prefix.unwrap_or_default();
    let ids = state.cache.item_ids(&cache_id, &prefix);
    Json(ItemIdsResponse::new(cache_id, ids))
}

/// Handler for GET /caches/:cache_id/items/:key/exists
///
/// Unlike a read, this leaves LRU and TTL positions alone.
pub async fn has_item_handler(
    State(state): State<AppState>,
    Path((cache_id, key)): Path<(String, String)>,
) -> Result<Json<ExistsResponse>> {
    check_key(&key)?;
    let exists = state.cache.has_item(&cache_id, &key);
    Ok(Json(ExistsResponse {
        cache_id,
        id: key,
        exists,
    }))
}

/// Handler for GET /caches/:cache_id/items/:key/expiry
pub async fn item_expiry_handler(
    State(state): State<AppState>,
    Path((cache_id, key)): Path<(String, String)>,
) -> Result<Json<ExpiryResponse>> {
    check_key(&key)?;
    let expiry = state
        .cache
        .item_expiry_time(&cache_id, &key)
        .ok_or_else(|| CacheError::NotFound(key.clone()))?;
    Ok(Json(ExpiryResponse {
        cache_id,
        key,
        expiry,
    }))
}

/// Handler for GET /caches/:cache_id/groups/:group_id
pub async fn group_item_ids_handler(
    State(state): State<AppState>,
    Path((cache_id, group_id)): Path<(String, String)>,
) -> Result<Json<ItemIdsResponse>> {
    check_group(&group_id)?;
    let ids = state.cache.group_item_ids(&cache_id, &group_id);
    if ids.is_empty() {
        return Err(CacheError::NotFound(group_id));
    }
    Ok(Json(ItemIdsResponse::new(cache_id, ids)))
}

/// Handler for GET /caches/:cache_id/groups/:group_id/exists
pub async fn has_group_handler(
    State(state): State<AppState>,
    Path((cache_id, group_id)): Path<(String, String)>,
) -> Result<Json<ExistsResponse>> {
    check_group(&group_id)?;
    let exists = state.cache.has_group(&cache_id, &group_id);
    Ok(Json(ExistsResponse {
        cache_id,
        id: group_id,
        exists,
    }))
}

/// Handler for GET /stats?ids=
pub async fn stats_handler(
    State(state): State<AppState>,
    Query(query): Query<StatsQuery>,
) -> Json<StatsResponse> {
    Json(StatsResponse {
        caches: state.cache.cache_stats(&query.cache_ids()),
        open_transactions: state.cache.open_transactions(),
    })
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}

// == Immediate Writes ==

/// Handler for PUT /caches/:cache_id/items/:key
pub async fn set_item_handler(
    State(state): State<AppState>,
    Path((cache_id, key)): Path<(String, String)>,
    Json(req): Json<SetItemRequest>,
) -> Result<Json<WriteResponse>> {
    check_key(&key)?;
    if let Some(msg) = req.validate() {
        return Err(CacheError::InvalidRequest(msg));
    }
    state.cache.set(&cache_id, &key, req.value, &req.group_ids);
    Ok(Json(WriteResponse::new("set", cache_id, key)))
}

/// Handler for DELETE /caches/:cache_id/items/:key
pub async fn remove_item_handler(
    State(state): State<AppState>,
    Path((cache_id, key)): Path<(String, String)>,
) -> Result<Json<WriteResponse>> {
    check_key(&key)?;
    if !state.cache.remove(&cache_id, &key) {
        return Err(CacheError::NotFound(key));
    }
    Ok(Json(WriteResponse::new("removed", cache_id, key)))
}

/// Handler for POST /caches/remove_items
///
/// Missing items are skipped; the response counts the ones removed.
pub async fn remove_items_handler(
    State(state): State<AppState>,
    Json(req): Json<RemoveItemsRequest>,
) -> Result<Json<RemoveItemsResponse>> {
    if let Some(msg) = req.validate() {
        return Err(CacheError::InvalidRequest(msg));
    }
    let removed = state.cache.remove_items(&req.items);
    Ok(Json(RemoveItemsResponse {
        message: format!("Removed {} item(s)", removed),
        removed,
    }))
}

/// Handler for DELETE /caches/:cache_id/groups/:group_id
///
/// Removing an absent group succeeds without effect.
pub async fn remove_group_handler(
    State(state): State<AppState>,
    Path((cache_id, group_id)): Path<(String, String)>,
) -> Result<Json<WriteResponse>> {
    check_group(&group_id)?;
    state.cache.remove_group(&cache_id, &group_id);
    Ok(Json(WriteResponse::new("removed", cache_id, group_id)))
}

/// Handler for POST /clear
pub async fn clear_handler(
    State(state): State<AppState>,
    Json(req): Json<ClearRequest>,
) -> Json<ClearResponse> {
    state.cache.clear(&req.cache_ids);
    let cache_ids = if req.cache_ids.is_empty() {
        let mut all = state.cache.cache_ids();
        all.sort();
        all
    } else {
        req.cache_ids
    };
    Json(ClearResponse {
        message: format!("Cleared {} partition(s)", cache_ids.len()),
        cache_ids,
    })
}

// == Transactions ==

/// Handler for POST /transactions
pub async fn begin_transaction_handler(
    State(state): State<AppState>,
) -> (StatusCode, Json<TransactionResponse>) {
    let id = state.cache.begin_transaction();
    (StatusCode::CREATED, Json(TransactionResponse::new(id, "open")))
}

/// Handler for POST /transactions/:trans_id/commit
pub async fn commit_transaction_handler(
    State(state): State<AppState>,
    Path(trans_id): Path<String>,
) -> Result<Json<TransactionResponse>> {
    state.cache.commit_transaction(&trans_id)?;
    Ok(Json(TransactionResponse::new(trans_id, "committed")))
}

/// Handler for POST /transactions/:trans_id/rollback
pub async fn rollback_transaction_handler(
    State(state): State<AppState>,
    Path(trans_id): Path<String>,
) -> Result<Json<TransactionResponse>> {
    state.cache.rollback_transaction(&trans_id)?;
    Ok(Json(TransactionResponse::new(trans_id, "rolled_back")))
}

/// Handler for PUT /transactions/:trans_id/caches/:cache_id/items/:key
pub async fn deferred_set_handler(
    State(state): State<AppState>,
    Path((trans_id, cache_id, key)): Path<(String, String, String)>,
    Json(req): Json<SetItemRequest>,
) -> Result<Json<WriteResponse>> {
    check_key(&key)?;
    if let Some(msg) = req.validate() {
        return Err(CacheError::InvalidRequest(msg));
    }
    state
        .cache
        .set_deferred(&trans_id, &cache_id, &key, req.value, &req.group_ids)?;
    Ok(Json(WriteResponse::deferred("set", trans_id, cache_id, key)))
}

/// Handler for DELETE /transactions/:trans_id/caches/:cache_id/items/:key
pub async fn deferred_remove_handler(
    State(state): State<AppState>,
    Path((trans_id, cache_id, key)): Path<(String, String, String)>,
) -> Result<Json<WriteResponse>> {
    check_key(&key)?;
    state.cache.remove_deferred(&trans_id, &cache_id, &key)?;
    Ok(Json(WriteResponse::deferred("removed", trans_id, cache_id, key)))
}

/// Handler for DELETE /transactions/:trans_id/caches/:cache_id/groups/:group_id
pub async fn deferred_remove_group_handler(
    State(state): State<AppState>,
    Path((trans_id, cache_id, group_id)): Path<(String, String, String)>,
) -> Result<Json<WriteResponse>> {
    check_group(&group_id)?;
    state
        .cache
        .remove_group_deferred(&trans_id, &cache_id, &group_id)?;
    Ok(Json(WriteResponse::deferred(
        "removed", trans_id, cache_id, group_id,
    )))
}
