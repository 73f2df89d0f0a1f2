use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{
    AggregateId, EventEnvelope, EventStoreError, Offset, Result, Version,
    store::{AppendOptions, EventStore, EventStream, validate_events_for_append},
};

/// In-memory event log.
///
/// Events are kept in commit order, so the offset of an event is its
/// position in the log plus one. Cloning shares the underlying log.
#[derive(Clone, Default)]
pub struct InMemoryEventStore {
    events: Arc<RwLock<Vec<EventEnvelope>>>,
    failing_appends: Arc<AtomicU32>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn event_count(&self) -> usize {
        self.events.read().await.len()
    }

    /// Makes the next `count` appends fail with `Unavailable`, as a stand-in
    /// for a log outage.
    pub fn fail_next_appends(&self, count: u32) {
        self.failing_appends.store(count, Ordering::SeqCst);
    }

    fn take_injected_failure(&self) -> bool {
        self.failing_appends
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn append(
        &self,
        events: Vec<EventEnvelope>,
        options: AppendOptions,
    ) -> Result<Vec<EventEnvelope>> {
        validate_events_for_append(&events)?;

        if self.take_injected_failure() {
            return Err(EventStoreError::Unavailable(
                "injected append failure".to_string(),
            ));
        }

        let aggregate_id = events[0].aggregate_id;
        let mut log = self.events.write().await;

        let current_version = log
            .iter()
            .filter(|e| e.aggregate_id == aggregate_id)
            .map(|e| e.version)
            .max()
            .unwrap_or(Version::initial());

        if let Some(expected) = options.expected_version
            && current_version != expected
        {
            return Err(EventStoreError::ConcurrencyConflict {
                aggregate_id,
                expected,
                actual: current_version,
            });
        }

        // Same effect as the unique (aggregate_id, version) constraint in SQL.
        if events[0].version <= current_version {
            return Err(EventStoreError::ConcurrencyConflict {
                aggregate_id,
                expected: options.expected_version.unwrap_or(current_version),
                actual: current_version,
            });
        }

        let mut committed = Vec::with_capacity(events.len());
        for mut event in events {
            event.offset = Offset::new(log.len() as i64 + 1);
            log.push(event.clone());
            committed.push(event);
        }

        Ok(committed)
    }

    async fn get_events_for_aggregate(
        &self,
        aggregate_id: AggregateId,
    ) -> Result<Vec<EventEnvelope>> {
        let log = self.events.read().await;
        let mut events: Vec<_> = log
            .iter()
            .filter(|e| e.aggregate_id == aggregate_id)
            .cloned()
            .collect();
        events.sort_by_key(|e| e.version);
        Ok(events)
    }

    async fn stream_events_from(&self, after: Offset) -> Result<EventStream> {
        use futures_util::stream;

        let log = self.events.read().await;
        let start = usize::try_from(after.as_i64()).unwrap_or(0).min(log.len());
        let events: Vec<_> = log[start..].to_vec();

        Ok(Box::pin(stream::iter(events.into_iter().map(Ok))))
    }

    async fn get_aggregate_version(&self, aggregate_id: AggregateId) -> Result<Option<Version>> {
        let log = self.events.read().await;
        Ok(log
            .iter()
            .filter(|e| e.aggregate_id == aggregate_id)
            .map(|e| e.version)
            .max())
    }

    async fn latest_offset(&self) -> Result<Offset> {
        Ok(Offset::new(self.events.read().await.len() as i64))
    }
}
