//! API Module
//!
//! HTTP handlers and routing for the cache admin REST API.
//!
//! # Endpoints
//! - `GET /health`, `GET /stats`, `POST /clear`
//! - `/caches/:cache_id/...` - Item and group operations, applied immediately
//! - `/transactions/...` - Begin, buffer, commit or roll back batches

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
