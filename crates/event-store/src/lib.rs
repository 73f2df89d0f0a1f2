//! Append-only event log.
//!
//! Events are stored per aggregate in version order and receive a global,
//! strictly increasing [`Offset`] when committed. Read-side consumers resume
//! from an offset; the command side replays an aggregate by id.

pub mod error;
pub mod event;
pub mod memory;
pub mod postgres;
pub mod store;

pub use common::AggregateId;
pub use error::{EventStoreError, Result};
pub use event::{EventEnvelope, EventEnvelopeBuilder, EventId, Offset, Version};
pub use memory::InMemoryEventStore;
pub use postgres::PostgresEventStore;
pub use store::{AppendOptions, EventStore, EventStoreExt, EventStream};
