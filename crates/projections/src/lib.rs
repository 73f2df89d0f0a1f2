//! Read side of the auction service.
//!
//! This crate provides:
//! - [`Projection`] trait for folding committed events into read models
//! - [`ProjectionProcessor`], which feeds the log to projections and keeps a
//!   checkpoint per projection and partition
//! - [`ItemSummaryProjection`] with its [`SummaryStore`] for the
//!   "items by owner and status" listing

pub mod checkpoint;
pub mod error;
pub mod partition;
pub mod processor;
pub mod projection;
pub mod summary_store;
pub mod views;

pub use checkpoint::{CheckpointStore, InMemoryCheckpointStore};
pub use error::{ProjectionError, Result};
pub use partition::Partition;
pub use processor::{DEFAULT_POLL_INTERVAL, ProjectionProcessor};
pub use projection::Projection;
pub use summary_store::{
    DEFAULT_PAGE_SIZE, InMemorySummaryStore, ItemSummary, PaginatedSequence, SummaryStore,
};
pub use views::ItemSummaryProjection;
