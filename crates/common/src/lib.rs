//! Shared types for the auction item service.

pub mod retry;
pub mod types;

pub use retry::{RetryPolicy, retry_with_backoff};
pub use types::{AggregateId, UserId};
