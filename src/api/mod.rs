//! API Module
//!
//! HTTP handlers and routing for the cache REST API.
//!
//! # Endpoints
//! - `PUT /cache/:key` - Cache a JSON value
//! - `GET /cache/:key` - Read a cached value
//! - `DELETE /cache/:key` - Delete one entry
//! - `DELETE /cache` - Clear the namespace
//! - `GET /stats` - Get cache statistics
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
