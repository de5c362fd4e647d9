//! Observability setup for Parlor.

pub mod tracing_setup;
