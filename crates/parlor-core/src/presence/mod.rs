//! Live presence tracking: who is online, on which connection.

pub mod registry;

pub use registry::{PresenceRegistry, RosterSnapshot};
