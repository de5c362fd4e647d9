//! Business logic and repository trait definitions for Parlor.
//!
//! This crate defines the "ports" (repository traits) that the
//! infrastructure layer implements, plus the in-memory realtime state:
//! presence registry, broadcast groups, connection sessions, and the
//! delivery router that ties them together. It depends only on
//! `parlor-types` -- never on `parlor-infra` or any database/IO crate.

pub mod conversation;
pub mod delivery;
pub mod message;
pub mod presence;
pub mod session;
