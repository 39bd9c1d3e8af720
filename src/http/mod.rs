//! HTTP server module
//!
//! This module handles HTTP request routing and handling:
//! - Axum router with the relay, listing and status endpoints
//! - Error mapping to HTTP status codes
//! - Response headers for live bodies (Content-Type, Cache-Control, Connection)
//! - CORS middleware

pub mod handlers;
pub mod routes;

pub use routes::create_router;
