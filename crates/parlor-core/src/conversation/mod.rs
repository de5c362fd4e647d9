//! Conversation broadcast-group membership.

pub mod groups;

pub use groups::GroupTable;
