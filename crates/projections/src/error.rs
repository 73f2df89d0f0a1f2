//! Projection error types.

use thiserror::Error;

/// Errors that can occur during projection processing.
#[derive(Debug, Error)]
pub enum ProjectionError {
    /// An error occurred in the event store.
    #[error("Event store error: {0}")]
    EventStore(#[from] event_store::EventStoreError),

    /// Failed to deserialize an event payload.
    #[error("Event deserialization error: {0}")]
    Deserialization(#[from] serde_json::Error),

    /// The read-side store could not complete a write or read.
    #[error("Read store error: {0}")]
    Store(String),

    /// A query asked for pages of size zero.
    #[error("Page size must be greater than zero")]
    InvalidPageSize,

    /// The envelope has no log offset, so it cannot be checkpointed.
    #[error("Event {0} has not been committed")]
    UncommittedEvent(event_store::EventId),
}

impl ProjectionError {
    /// Returns true when applying the same event again may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            ProjectionError::EventStore(e) => e.is_transient(),
            ProjectionError::Store(_) => true,
            ProjectionError::Deserialization(_)
            | ProjectionError::InvalidPageSize
            | ProjectionError::UncommittedEvent(_) => false,
        }
    }
}

/// Result type for projection operations.
pub type Result<T> = std::result::Result<T, ProjectionError>;
