use std::pin::Pin;

use async_trait::async_trait;
use futures_core::Stream;

use crate::{AggregateId, EventEnvelope, EventStoreError, Offset, Result, Version};

/// Options for appending events to the store.
#[derive(Debug, Clone, Default)]
pub struct AppendOptions {
    /// Expected current version of the aggregate. `None` skips the check.
    pub expected_version: Option<Version>,
}

impl AppendOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn expect_version(version: Version) -> Self {
        Self {
            expected_version: Some(version),
        }
    }

    /// Expects the aggregate to have no events yet.
    pub fn expect_new() -> Self {
        Self::expect_version(Version::initial())
    }

    /// Picks `expect_new` or `expect_version` based on `current`.
    pub fn after(current: Version) -> Self {
        if current == Version::initial() {
            Self::expect_new()
        } else {
            Self::expect_version(current)
        }
    }
}

/// A stream of committed events.
pub type EventStream = Pin<Box<dyn Stream<Item = Result<EventEnvelope>> + Send>>;

/// The durable append-only log.
///
/// Implementations guarantee per-aggregate ordering and assign every stored
/// envelope a global offset before it becomes visible to readers.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Appends a batch for one aggregate atomically.
    ///
    /// Fails with `ConcurrencyConflict` when `options.expected_version` does
    /// not match. Returns the committed envelopes with their offsets set.
    async fn append(
        &self,
        events: Vec<EventEnvelope>,
        options: AppendOptions,
    ) -> Result<Vec<EventEnvelope>>;

    /// All events of one aggregate, oldest first.
    async fn get_events_for_aggregate(
        &self,
        aggregate_id: AggregateId,
    ) -> Result<Vec<EventEnvelope>>;

    /// All events with an offset strictly greater than `after`, in offset order.
    async fn stream_events_from(&self, after: Offset) -> Result<EventStream>;

    /// Current version of an aggregate, `None` if it has no events.
    async fn get_aggregate_version(&self, aggregate_id: AggregateId) -> Result<Option<Version>>;

    /// Offset of the most recently committed event, `Offset::NONE` when empty.
    async fn latest_offset(&self) -> Result<Offset>;
}

/// Convenience methods available on every [`EventStore`].
#[async_trait]
pub trait EventStoreExt: EventStore {
    /// Appends a single event and returns its committed offset.
    async fn append_event(&self, event: EventEnvelope, options: AppendOptions) -> Result<Offset> {
        let committed = self.append(vec![event], options).await?;
        committed
            .last()
            .map(|e| e.offset)
            .ok_or_else(|| EventStoreError::InvalidAppend("nothing was committed".to_string()))
    }

    async fn aggregate_exists(&self, aggregate_id: AggregateId) -> Result<bool> {
        Ok(self.get_aggregate_version(aggregate_id).await?.is_some())
    }
}

impl<T: EventStore + ?Sized> EventStoreExt for T {}

/// Checks a batch before it is appended: non-empty, a single aggregate, and
/// consecutive versions.
pub fn validate_events_for_append(events: &[EventEnvelope]) -> Result<()> {
    let Some(first) = events.first() else {
        return Err(EventStoreError::InvalidAppend(
            "cannot append an empty batch".to_string(),
        ));
    };

    let mut expected_version = first.version;
    for event in events.iter().skip(1) {
        if event.aggregate_id != first.aggregate_id || event.aggregate_type != first.aggregate_type
        {
            return Err(EventStoreError::InvalidAppend(
                "all events in a batch must belong to the same aggregate".to_string(),
            ));
        }
        expected_version = expected_version.next();
        if event.version != expected_version {
            return Err(EventStoreError::InvalidAppend(format!(
                "event versions must be sequential, expected {expected_version}, got {}",
                event.version
            )));
        }
    }

    Ok(())
}
