//! Projection processor for feeding the event log to projections.

use std::time::Duration;

use common::{RetryPolicy, retry_with_backoff};
use event_store::{EventEnvelope, EventStore, Offset};
use futures_util::StreamExt;
use tokio::sync::{Mutex, watch};

use crate::checkpoint::CheckpointStore;
use crate::partition::Partition;
use crate::projection::Projection;
use crate::{ProjectionError, Result};

/// How long the background loop waits between catch-up passes.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Delivers committed events from an event store to projections.
///
/// The processor supports:
/// - Catch-up: streams the log from the lowest checkpoint and delivers every
///   event a projection has not applied yet
/// - Single event delivery for an event just read from the log
/// - Rebuild: resets every projection and replays from the start
/// - A polling loop that runs catch-up until shutdown is signalled
///
/// Each projection keeps one checkpoint per partition. A checkpoint moves
/// only after the projection applied the event, so a failure (after
/// retries) leaves it where it was and the event is delivered again later.
/// A failure stalls only its (projection, partition) pair for the rest of the
/// pass; other partitions keep advancing. Catch-up passes and single
/// deliveries never overlap.
pub struct ProjectionProcessor<S: EventStore, C: CheckpointStore> {
    store: S,
    checkpoints: C,
    projections: Vec<Box<dyn Projection>>,
    partitions: u32,
    retry: RetryPolicy,
    poll_interval: Duration,
    pass: Mutex<()>,
}

impl<S: EventStore, C: CheckpointStore> ProjectionProcessor<S, C> {
    pub fn new(store: S, checkpoints: C) -> Self {
        Self {
            store,
            checkpoints,
            projections: Vec::new(),
            partitions: 1,
            retry: RetryPolicy::default(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            pass: Mutex::new(()),
        }
    }

    /// Splits checkpoints into `partitions` slices (at least one).
    pub fn with_partitions(mut self, partitions: u32) -> Self {
        self.partitions = partitions.max(1);
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Registers a projection with this processor.
    pub fn register(&mut self, projection: Box<dyn Projection>) {
        self.projections.push(projection);
    }

    /// Returns the number of registered projections.
    pub fn projection_count(&self) -> usize {
        self.projections.len()
    }

    pub fn partitions(&self) -> u32 {
        self.partitions
    }

    pub fn checkpoints(&self) -> &C {
        &self.checkpoints
    }

    /// Brings every projection up to the end of the log.
    ///
    /// Returns the number of (projection, event) deliveries made. When a
    /// projection could not apply an event, later events of that partition
    /// are held back for the pass and the first such error is returned once
    /// the log has been read to the end.
    #[tracing::instrument(skip(self))]
    pub async fn run_catch_up(&self) -> Result<usize> {
        if self.projections.is_empty() {
            return Ok(0);
        }
        let _pass = self.pass.lock().await;

        let mut positions = Vec::with_capacity(self.projections.len());
        for projection in &self.projections {
            let mut offsets = Vec::with_capacity(self.partitions as usize);
            for partition in Partition::all(self.partitions) {
                offsets.push(
                    self.checkpoints
                        .get_offset(projection.name(), partition)
                        .await?,
                );
            }
            positions.push(offsets);
        }

        let start = positions
            .iter()
            .flatten()
            .copied()
            .min()
            .unwrap_or(Offset::NONE);
        let mut stalled = vec![vec![false; self.partitions as usize]; self.projections.len()];
        let mut first_error = None;
        let mut stream = self.store.stream_events_from(start).await?;
        let mut delivered = 0;

        while let Some(result) = stream.next().await {
            let event = result?;
            let partition = Partition::for_aggregate(event.aggregate_id, self.partitions);
            let slot = partition.index() as usize;

            for ((projection, offsets), stalled) in self
                .projections
                .iter()
                .zip(positions.iter_mut())
                .zip(stalled.iter_mut())
            {
                if stalled[slot] {
                    continue;
                }
                if event.offset <= offsets[slot] {
                    metrics::counter!("projections_events_skipped").increment(1);
                    continue;
                }
                match self.deliver(projection.as_ref(), &event, partition).await {
                    Ok(()) => {
                        offsets[slot] = event.offset;
                        delivered += 1;
                    }
                    Err(e) => {
                        stalled[slot] = true;
                        first_error.get_or_insert(e);
                    }
                }
            }
        }

        if delivered > 0 {
            tracing::info!(delivered, from = start.as_i64(), "catch-up complete");
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(delivered),
        }
    }

    /// Delivers one committed event to every projection whose checkpoint is
    /// behind it. Events are expected in log order.
    #[tracing::instrument(skip(self, event), fields(event_type = %event.event_type, offset = event.offset.as_i64()))]
    pub async fn process_event(&self, event: &EventEnvelope) -> Result<()> {
        if !event.is_committed() {
            return Err(ProjectionError::UncommittedEvent(event.event_id));
        }

        let _pass = self.pass.lock().await;
        let partition = Partition::for_aggregate(event.aggregate_id, self.partitions);
        for projection in &self.projections {
            let checkpoint = self
                .checkpoints
                .get_offset(projection.name(), partition)
                .await?;
            if event.offset <= checkpoint {
                metrics::counter!("projections_events_skipped").increment(1);
                continue;
            }
            self.deliver(projection.as_ref(), event, partition).await?;
        }
        Ok(())
    }

    /// Resets all projections, forgets their checkpoints and replays the log.
    #[tracing::instrument(skip(self))]
    pub async fn rebuild_all(&self) -> Result<usize> {
        for projection in &self.projections {
            projection.reset().await?;
            self.checkpoints.clear(projection.name()).await?;
        }
        self.run_catch_up().await
    }

    /// Runs catch-up every poll interval until `shutdown` turns true or its
    /// sender is dropped. A failed pass is logged and tried again on the next
    /// tick.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        tracing::info!(
            projections = self.projections.len(),
            partitions = self.partitions,
            poll_interval_ms = self.poll_interval.as_millis() as u64,
            "projection processor started"
        );

        loop {
            if *shutdown.borrow() {
                break;
            }
            if let Err(e) = self.run_catch_up().await {
                tracing::error!(error = %e, "catch-up pass failed");
            }
            tokio::select! {
                _ = tokio::time::sleep(self.poll_interval) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        tracing::info!("projection processor stopped");
    }

    async fn deliver(
        &self,
        projection: &dyn Projection,
        event: &EventEnvelope,
        partition: Partition,
    ) -> Result<()> {
        let name = projection.name();
        let mut attempts: u32 = 0;
        let result = retry_with_backoff(self.retry, ProjectionError::is_transient, || {
            attempts += 1;
            projection.handle(event)
        })
        .await;

        if attempts > 1 {
            metrics::counter!("projections_retries_total", "projection" => name)
                .increment(u64::from(attempts - 1));
        }

        if let Err(e) = result {
            tracing::error!(
                projection = name,
                %partition,
                offset = event.offset.as_i64(),
                attempts,
                error = %e,
                "projection failed to apply event"
            );
            return Err(e);
        }

        self.checkpoints
            .set_offset(name, partition, event.offset)
            .await?;
        metrics::counter!("projections_events_processed", "projection" => name).increment(1);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkpoint::InMemoryCheckpointStore;
    use async_trait::async_trait;
    use common::AggregateId;
    use event_store::{AppendOptions, InMemoryEventStore, Version};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Records the offsets it sees and fails on demand.
    #[derive(Clone, Default)]
    struct RecordingProjection {
        seen: Arc<tokio::sync::Mutex<Vec<Offset>>>,
        transient_failures: Arc<AtomicU32>,
        permanent: Arc<AtomicU32>,
        attempts: Arc<AtomicU32>,
    }

    impl RecordingProjection {
        async fn seen(&self) -> Vec<i64> {
            self.seen.lock().await.iter().map(|o| o.as_i64()).collect()
        }
    }

    #[async_trait]
    impl Projection for RecordingProjection {
        fn name(&self) -> &'static str {
            "RecordingProjection"
        }

        async fn handle(&self, event: &EventEnvelope) -> Result<()> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            if self.permanent.load(Ordering::SeqCst) > 0 {
                return Err(ProjectionError::InvalidPageSize);
            }
            let failing = self
                .transient_failures
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if failing {
                return Err(ProjectionError::Store("unavailable".to_string()));
            }
            self.seen.lock().await.push(event.offset);
            Ok(())
        }

        async fn reset(&self) -> Result<()> {
            self.seen.lock().await.clear();
            Ok(())
        }
    }

    fn test_event(aggregate_id: AggregateId, version: i64) -> EventEnvelope {
        EventEnvelope::builder()
            .aggregate_id(aggregate_id)
            .aggregate_type("Test")
            .event_type("TestEvent")
            .version(Version::new(version))
            .payload_raw(serde_json::json!({"test": true}))
            .build()
            .unwrap()
    }

    async fn store_with_events(count: i64) -> InMemoryEventStore {
        let store = InMemoryEventStore::new();
        let id = AggregateId::new();
        let events = (1..=count).map(|v| test_event(id, v)).collect();
        store.append(events, AppendOptions::new()).await.unwrap();
        store
    }

    fn processor(
        store: InMemoryEventStore,
        projection: &RecordingProjection,
    ) -> ProjectionProcessor<InMemoryEventStore, InMemoryCheckpointStore> {
        let mut processor = ProjectionProcessor::new(store, InMemoryCheckpointStore::new())
            .with_retry(RetryPolicy::no_retry());
        processor.register(Box::new(projection.clone()));
        processor
    }

    #[tokio::test]
    async fn catch_up_delivers_each_event_once() {
        let projection = RecordingProjection::default();
        let processor = processor(store_with_events(3).await, &projection);

        assert_eq!(processor.run_catch_up().await.unwrap(), 3);
        assert_eq!(processor.run_catch_up().await.unwrap(), 0);
        assert_eq!(projection.seen().await, [1, 2, 3]);
        assert_eq!(
            processor
                .checkpoints()
                .get_offset("RecordingProjection", Partition::new(0))
                .await
                .unwrap(),
            Offset::new(3)
        );
    }

    #[tokio::test]
    async fn empty_store_catch_up() {
        let projection = RecordingProjection::default();
        let processor = processor(InMemoryEventStore::new(), &projection);
        assert_eq!(processor.run_catch_up().await.unwrap(), 0);
        assert!(projection.seen().await.is_empty());
    }

    #[tokio::test]
    async fn failure_leaves_checkpoint_in_place() {
        let projection = RecordingProjection::default();
        let processor = processor(store_with_events(2).await, &projection);
        projection.transient_failures.store(1, Ordering::SeqCst);

        assert!(processor.run_catch_up().await.is_err());
        assert_eq!(
            processor
                .checkpoints()
                .get_offset("RecordingProjection", Partition::new(0))
                .await
                .unwrap(),
            Offset::NONE
        );

        assert_eq!(processor.run_catch_up().await.unwrap(), 2);
        assert_eq!(projection.seen().await, [1, 2]);
    }

    #[tokio::test]
    async fn stalled_partition_does_not_hold_back_the_others() {
        let stuck = AggregateId::new();
        let healthy = loop {
            let id = AggregateId::new();
            if Partition::for_aggregate(id, 2) != Partition::for_aggregate(stuck, 2) {
                break id;
            }
        };
        let store = InMemoryEventStore::new();
        for event in [test_event(stuck, 1), test_event(healthy, 1), test_event(stuck, 2)] {
            store.append(vec![event], AppendOptions::new()).await.unwrap();
        }
        let projection = RecordingProjection::default();
        let processor = processor(store, &projection).with_partitions(2);
        projection.transient_failures.store(1, Ordering::SeqCst);

        assert!(processor.run_catch_up().await.is_err());
        assert_eq!(projection.seen().await, [2]);
        let checkpoint = |id: AggregateId| {
            processor
                .checkpoints()
                .get_offset("RecordingProjection", Partition::for_aggregate(id, 2))
        };
        assert_eq!(checkpoint(stuck).await.unwrap(), Offset::NONE);
        assert_eq!(checkpoint(healthy).await.unwrap(), Offset::new(2));

        assert_eq!(processor.run_catch_up().await.unwrap(), 2);
        assert_eq!(projection.seen().await, [2, 1, 3]);
    }

    #[tokio::test(start_paused = true)]
    async fn transient_failures_are_retried_within_one_pass() {
        let projection = RecordingProjection::default();
        let processor = processor(store_with_events(1).await, &projection)
            .with_retry(RetryPolicy::new(3, Duration::from_millis(10)));
        projection.transient_failures.store(2, Ordering::SeqCst);

        assert_eq!(processor.run_catch_up().await.unwrap(), 1);
        assert_eq!(projection.attempts.load(Ordering::SeqCst), 3);
        assert_eq!(projection.seen().await, [1]);
    }

    #[tokio::test]
    async fn permanent_failures_are_not_retried() {
        let projection = RecordingProjection::default();
        let processor = processor(store_with_events(1).await, &projection)
            .with_retry(RetryPolicy::new(5, Duration::ZERO));
        projection.permanent.store(1, Ordering::SeqCst);

        assert!(processor.run_catch_up().await.is_err());
        assert_eq!(projection.attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn process_event_skips_checkpointed_and_rejects_uncommitted() {
        let store = store_with_events(2).await;
        let events: Vec<_> = store
            .stream_events_from(Offset::NONE)
            .await
            .unwrap()
            .map(|e| e.unwrap())
            .collect()
            .await;
        let projection = RecordingProjection::default();
        let processor = processor(store, &projection);

        processor.process_event(&events[0]).await.unwrap();
        processor.process_event(&events[0]).await.unwrap();
        processor.process_event(&events[1]).await.unwrap();
        assert_eq!(projection.seen().await, [1, 2]);

        let uncommitted = test_event(AggregateId::new(), 1);
        assert!(matches!(
            processor.process_event(&uncommitted).await,
            Err(ProjectionError::UncommittedEvent(_))
        ));
    }

    #[tokio::test]
    async fn partitions_keep_separate_checkpoints() {
        let store = InMemoryEventStore::new();
        let ids: Vec<_> = (0..8).map(|_| AggregateId::new()).collect();
        for id in &ids {
            store
                .append(vec![test_event(*id, 1)], AppendOptions::new())
                .await
                .unwrap();
        }
        let projection = RecordingProjection::default();
        let processor = processor(store, &projection).with_partitions(4);

        assert_eq!(processor.run_catch_up().await.unwrap(), 8);

        for partition in Partition::all(4) {
            let expected = ids
                .iter()
                .enumerate()
                .filter(|(_, id)| Partition::for_aggregate(**id, 4) == partition)
                .map(|(i, _)| i as i64 + 1)
                .max()
                .unwrap_or(0);
            assert_eq!(
                processor
                    .checkpoints()
                    .get_offset("RecordingProjection", partition)
                    .await
                    .unwrap(),
                Offset::new(expected)
            );
        }
    }

    #[tokio::test]
    async fn rebuild_resets_and_replays() {
        let projection = RecordingProjection::default();
        let processor = processor(store_with_events(2).await, &projection);

        processor.run_catch_up().await.unwrap();
        assert_eq!(processor.rebuild_all().await.unwrap(), 2);
        assert_eq!(projection.seen().await, [1, 2]);
    }

    #[tokio::test]
    async fn run_stops_on_shutdown() {
        let projection = RecordingProjection::default();
        let processor = Arc::new(
            processor(store_with_events(2).await, &projection)
                .with_poll_interval(Duration::from_millis(5)),
        );
        let (tx, rx) = watch::channel(false);

        let handle = tokio::spawn({
            let processor = Arc::clone(&processor);
            async move { processor.run(rx).await }
        });

        for _ in 0..100 {
            if projection.seen().await.len() == 2 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(projection.seen().await, [1, 2]);
    }
}
