use thiserror::Error;

/// Errors from identity and conversation-address construction.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdentityError {
    #[error("user identity must be non-empty")]
    EmptyUser,

    #[error("conversation id must be non-empty")]
    EmptyConversation,
}

/// Errors from repository operations (used by trait definitions in parlor-core).
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database connection error")]
    Connection,

    #[error("query error: {0}")]
    Query(String),

    #[error("entity not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),
}
