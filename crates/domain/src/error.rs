//! Common error types used across the workspace.
//!
//! Each layer defines its own typed errors and converts into [`DevIotError`]
//! at port boundaries.

use std::error::Error as StdError;

/// Top-level error for the gateway.
#[derive(Debug, thiserror::Error)]
pub enum DevIotError {
    #[error("validation error")]
    Validation(#[from] ValidationError),

    #[error("not found")]
    NotFound(#[from] NotFoundError),

    /// The broker connection failed (connect, subscribe, publish).
    #[error("transport error")]
    Transport(#[source] Box<dyn StdError + Send + Sync>),

    /// Talking to the catalog failed.
    #[error("catalog error")]
    Catalog(#[source] Box<dyn StdError + Send + Sync>),

    #[error("gateway already started")]
    AlreadyStarted,
}

/// Domain invariant violations on Thing descriptors.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("thing id must not be empty")]
    EmptyId,

    #[error("duplicate property {0:?}")]
    DuplicateProperty(String),

    #[error("duplicate action {0:?}")]
    DuplicateAction(String),

    #[error("duplicate parameter {parameter:?} in action {action:?}")]
    DuplicateParameter { action: String, parameter: String },
}

/// A lookup by identifier found nothing.
#[derive(Debug, thiserror::Error)]
#[error("{entity} {id} not found")]
pub struct NotFoundError {
    pub entity: &'static str,
    pub id: String,
}
