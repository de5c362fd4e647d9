//! Request extractors for the HTTP surface.

pub mod auth;
