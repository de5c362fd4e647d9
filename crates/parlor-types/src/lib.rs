//! Shared domain types for Parlor.
//!
//! This crate contains the core domain types used across the Parlor
//! messaging server: user identities, conversation addressing, messages,
//! realtime events, and their associated error types.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror.

pub mod config;
pub mod conversation;
pub mod error;
pub mod event;
pub mod message;
pub mod user;
