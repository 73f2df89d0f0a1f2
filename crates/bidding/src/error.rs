//! Bidding adapter error types.

use domain::DomainError;
use thiserror::Error;

use crate::feed::DeliveryTag;

/// Errors that can occur while consuming the bidding feed.
#[derive(Debug, Error)]
pub enum BiddingError {
    /// The item command failed.
    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),

    /// A feed message could not be decoded.
    #[error("Malformed bid event: {0}")]
    Decode(#[from] serde_json::Error),

    /// Ack or nack for a delivery the feed does not have in flight.
    #[error("Unknown delivery tag: {0}")]
    UnknownDelivery(DeliveryTag),

    /// The feed no longer accepts events.
    #[error("Bid feed is closed")]
    FeedClosed,
}

impl BiddingError {
    /// Returns true when handling the same event again may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            BiddingError::Domain(e) => e.is_transient(),
            BiddingError::Decode(_) | BiddingError::UnknownDelivery(_) | BiddingError::FeedClosed => {
                false
            }
        }
    }
}

/// Convenience type alias for bidding results.
pub type Result<T> = std::result::Result<T, BiddingError>;
