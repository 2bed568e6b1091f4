//! API Routes
//!
//! Configures the Axum router with all cache server endpoints.

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    begin_transaction_handler, clear_handler, commit_transaction_handler,
    deferred_remove_group_handler, deferred_remove_handler, deferred_set_handler,
    get_item_handler, group_item_ids_handler, has_group_handler, has_item_handler,
    health_handler, item_expiry_handler, item_ids_handler, remove_group_handler,
    remove_item_handler, remove_items_handler, rollback_transaction_handler, set_item_handler,
    stats_handler, AppState,
};

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `GET /health` - Health check endpoint
/// - `GET /stats` - Per-partition item and group counts
/// - `POST /clear` - Clear some or all partitions
/// - `GET /caches/:cache_id/items` - List item IDs by prefix
/// - `GET|PUT|DELETE /caches/:cache_id/items/:key` - Read, store, remove an item
/// - `GET /caches/:cache_id/items/:key/exists` - Item presence, without touching it
/// - `GET /caches/:cache_id/items/:key/expiry` - Item expiry
/// - `POST /caches/remove_items` - Remove items across partitions
/// - `GET|DELETE /caches/:cache_id/groups/:group_id` - List or remove a group
/// - `GET /caches/:cache_id/groups/:group_id/exists` - Group presence
/// - `POST /transactions` - Begin a transaction
/// - `POST /transactions/:trans_id/commit|rollback` - Close a transaction
/// - `PUT|DELETE /transactions/:trans_id/caches/:cache_id/items/:key` - Deferred writes
/// - `DELETE /transactions/:trans_id/caches/:cache_id/groups/:group_id` - Deferred group removal
///
/// # Middleware
/// - CORS: Allows any origin (configurable for production)
/// - Tracing: Logs all requests for debugging
pub fn create_router(state: AppState) -> Router {
    // Configure CORS middleware
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let caches = Router::new()
        .route("/remove_items", post(remove_items_handler))
        .route("/:cache_id/items", get(item_ids_handler))
        .route(
            "/:cache_id/items/:key",
            get(get_item_handler)
                .put(set_item_handler)
                .delete(remove_item_handler),
        )
        .route("/:cache_id/items/:key/exists", get(has_item_handler))
        .route("/:cache_id/items/:key/expiry", get(item_expiry_handler))
        .route(
            "/:cache_id/groups/:group_id",
            get(group_item_ids_handler).delete(remove_group_handler),
        )
        .route("/:cache_id/groups/:group_id/exists", get(has_group_handler));

    let transactions = Router::new()
        .route("/:trans_id/commit", post(commit_transaction_handler))
        .route("/:trans_id/rollback", post(rollback_transaction_handler))
        .route(
            "/:trans_id/caches/:cache_id/items/:key",
            put(deferred_set_handler).delete(deferred_remove_handler),
        )
        .route(
            "/:trans_id/caches/:cache_id/groups/:group_id",
            delete(deferred_remove_group_handler),
        );

    Router::new()
        .route("/health", get(health_handler))
        .route("/stats", get(stats_handler))
        .route("/clear", post(clear_handler))
        .route("/transactions", post(begin_transaction_handler))
        .nest("/caches", caches)
        .nest("/transactions", transactions)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use std::collections::HashMap;
    use tower::util::ServiceExt;

    fn create_test_app() -> Router {
        create_router(AppState::with_partitions(HashMap::new()))
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let app = create_test_app();

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_stats_endpoint() {
        let app = create_test_app();

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/stats?ids=*default")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_set_endpoint() {
        let app = create_test_app();

        let response = app
            .oneshot(
                Request::builder()
                    .method("PUT")
                    .uri("/caches/*default/items/test")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"value":"hello"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_get_not_found() {
        let app = create_test_app();

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/caches/*default/items/nonexistent")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_begin_transaction_endpoint() {
        let app = create_test_app();

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/transactions")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
    }

    #[tokio::test]
    async fn test_exists_endpoint() {
        let app = create_test_app();

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/caches/*default/items/nonexistent/exists")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_remove_items_endpoint() {
        let app = create_test_app();

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/caches/remove_items")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"items":{"*default":["a"]}}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }
}
