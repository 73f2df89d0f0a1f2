//! Domain error types.

use std::time::Duration;

use common::AggregateId;
use event_store::EventStoreError;
use thiserror::Error;

use crate::item::ItemError;

/// Errors that can occur during domain operations.
#[derive(Debug, Error)]
pub enum DomainError {
    /// An error occurred in the event store.
    #[error("Event store error: {0}")]
    EventStore(#[from] EventStoreError),

    /// A command was rejected by the item aggregate.
    #[error("Item error: {0}")]
    Item(#[from] ItemError),

    /// The command targets an item that was never created.
    #[error("Item not found: {0}")]
    ItemNotFound(AggregateId),

    /// A stored payload could not be decoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The command did not finish in time. Nothing was committed by this
    /// attempt unless the append had already completed.
    #[error("Command on {aggregate_id} timed out after {after:?}")]
    Timeout {
        aggregate_id: AggregateId,
        after: Duration,
    },
}

impl DomainError {
    /// Returns true when the same command may succeed if retried.
    pub fn is_transient(&self) -> bool {
        match self {
            DomainError::EventStore(e) => e.is_transient(),
            DomainError::Timeout { .. } => true,
            DomainError::Item(_) | DomainError::ItemNotFound(_) | DomainError::Serialization(_) => {
                false
            }
        }
    }
}
