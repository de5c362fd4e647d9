//! HTTP and WebSocket layer for Parlor.
//!
//! Axum-based surface: the realtime WebSocket at `/ws`, one authenticated
//! REST read endpoint under `/api/v1/`, envelope response format, CORS.

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod response;
pub mod router;
