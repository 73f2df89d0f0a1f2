//! Integration tests: ItemService commands → ProjectionProcessor → item summaries.

use std::time::Duration;

use common::{AggregateId, RetryPolicy, UserId};
use domain::{
    CreateItem, FinishAuction, ItemDraft, ItemService, ItemStatus, Price, StartAuction,
    UpdatePrice,
};
use event_store::{
    AppendOptions, EventEnvelope, EventStore, InMemoryEventStore, Offset, Version,
};
use futures_util::StreamExt;
use projections::{
    CheckpointStore, InMemoryCheckpointStore, InMemorySummaryStore, ItemSummaryProjection,
    Partition, ProjectionError, ProjectionProcessor,
};
use tokio::sync::watch;

type Processor = ProjectionProcessor<InMemoryEventStore, InMemoryCheckpointStore>;

struct Harness {
    service: ItemService<InMemoryEventStore>,
    store: InMemoryEventStore,
    summaries: InMemorySummaryStore,
    view: ItemSummaryProjection<InMemorySummaryStore>,
}

fn setup() -> Harness {
    let store = InMemoryEventStore::new();
    let summaries = InMemorySummaryStore::new();
    Harness {
        service: ItemService::new(store.clone()),
        view: ItemSummaryProjection::new(summaries.clone()),
        store,
        summaries,
    }
}

impl Harness {
    fn processor(&self, partitions: u32, retry: RetryPolicy) -> Processor {
        self.processor_with_checkpoints(InMemoryCheckpointStore::new(), partitions, retry)
    }

    fn processor_with_checkpoints(
        &self,
        checkpoints: InMemoryCheckpointStore,
        partitions: u32,
        retry: RetryPolicy,
    ) -> Processor {
        let mut processor = ProjectionProcessor::new(self.store.clone(), checkpoints)
            .with_partitions(partitions)
            .with_retry(retry);
        processor.register(Box::new(self.view.clone()));
        processor
    }

    async fn create(&self, owner: UserId, title: &str) -> AggregateId {
        let draft = ItemDraft {
            id: AggregateId::new(),
            creator_id: owner,
            title: title.to_string(),
            description: format!("{title} description"),
            currency_id: "EUR".to_string(),
            reserve_price: Price::new(10),
            price_increment: Price::new(1),
            auction_duration: Duration::from_secs(3600),
        };
        let id = draft.id;
        self.service.create_item(CreateItem::new(draft)).await.unwrap();
        id
    }

    async fn committed_events(&self) -> Vec<EventEnvelope> {
        self.store
            .stream_events_from(Offset::NONE)
            .await
            .unwrap()
            .map(|e| e.unwrap())
            .collect()
            .await
    }
}

#[tokio::test]
async fn summary_follows_the_item_lifecycle() {
    let h = setup();
    let processor = h.processor(1, RetryPolicy::no_retry());
    let owner = UserId::new();
    let id = h.create(owner, "Lamp").await;

    processor.run_catch_up().await.unwrap();
    let summary = h.view.get_summary(id).await.unwrap().unwrap();
    assert_eq!(summary.status, ItemStatus::Created);
    assert_eq!(summary.owner_id, owner);
    assert_eq!(summary.currency_id, "EUR");

    h.service
        .start_auction(StartAuction::new(id, owner))
        .await
        .unwrap();
    h.service
        .update_price(UpdatePrice::new(id, 15))
        .await
        .unwrap();
    processor.run_catch_up().await.unwrap();
    assert_eq!(
        h.view.get_summary(id).await.unwrap().unwrap().status,
        ItemStatus::Auction
    );

    h.service
        .finish_auction(FinishAuction::new(id, Some(UserId::new()), 15))
        .await
        .unwrap();
    processor.run_catch_up().await.unwrap();
    assert_eq!(
        h.view.get_summary(id).await.unwrap().unwrap().status,
        ItemStatus::Completed
    );
}

#[tokio::test]
async fn refeeding_old_events_changes_nothing() {
    let h = setup();
    let processor = h.processor(1, RetryPolicy::no_retry());
    let owner = UserId::new();
    let id = h.create(owner, "Lamp").await;
    h.service
        .start_auction(StartAuction::new(id, owner))
        .await
        .unwrap();
    processor.run_catch_up().await.unwrap();
    let before = h.view.get_summary(id).await.unwrap();

    for event in h.committed_events().await {
        processor.process_event(&event).await.unwrap();
    }

    assert_eq!(h.view.get_summary(id).await.unwrap(), before);
    assert_eq!(h.summaries.len().await, 1);
}

#[tokio::test]
async fn lost_checkpoint_replays_without_duplicates() {
    let h = setup();
    let owner = UserId::new();
    let id = h.create(owner, "Lamp").await;
    h.service
        .start_auction(StartAuction::new(id, owner))
        .await
        .unwrap();
    h.service
        .finish_auction(FinishAuction::new(id, None, 10))
        .await
        .unwrap();

    h.processor(1, RetryPolicy::no_retry())
        .run_catch_up()
        .await
        .unwrap();
    // A fresh checkpoint store sees the whole log again.
    let replayed = h
        .processor(1, RetryPolicy::no_retry())
        .run_catch_up()
        .await
        .unwrap();

    assert_eq!(replayed, 3);
    assert_eq!(h.summaries.len().await, 1);
    assert_eq!(
        h.view.get_summary(id).await.unwrap().unwrap().status,
        ItemStatus::Completed
    );
}

#[tokio::test]
async fn items_are_listed_newest_first_per_owner_and_status() {
    let h = setup();
    let processor = h.processor(1, RetryPolicy::no_retry());
    let owner = UserId::new();
    for i in 0..35 {
        h.create(owner, &format!("title{i}")).await;
    }
    let other = h.create(UserId::new(), "someone else").await;
    processor.run_catch_up().await.unwrap();

    let page = h
        .view
        .get_items(owner, ItemStatus::Created, 2, 10)
        .await
        .unwrap();
    assert_eq!(page.count, 35);
    assert_eq!(page.total_pages, 4);
    assert_eq!(page.items.len(), 10);
    assert_eq!(page.items[0].title, "title14");
    assert_eq!(page.items[3].title, "title11");

    let last = h
        .view
        .get_items(owner, ItemStatus::Created, 3, 10)
        .await
        .unwrap();
    assert_eq!(last.items.len(), 5);
    assert_eq!(last.items[4].title, "title0");

    let in_auction = h
        .view
        .get_items(owner, ItemStatus::Auction, 0, 10)
        .await
        .unwrap();
    assert_eq!(in_auction.count, 0);
    assert!(in_auction.items.iter().all(|s| s.item_id != other));
}

#[tokio::test]
async fn zero_page_size_is_an_error() {
    let h = setup();
    let result = h.view.get_items(UserId::new(), ItemStatus::Created, 0, 0).await;
    assert!(matches!(result, Err(ProjectionError::InvalidPageSize)));
}

#[tokio::test]
async fn failed_write_is_delivered_again_on_next_pass() {
    let h = setup();
    let checkpoints = InMemoryCheckpointStore::new();
    let processor = h.processor_with_checkpoints(checkpoints.clone(), 1, RetryPolicy::no_retry());
    let id = h.create(UserId::new(), "Lamp").await;

    h.summaries.fail_next_writes(1);
    let err = processor.run_catch_up().await.unwrap_err();
    assert!(err.is_transient());
    assert_eq!(
        checkpoints
            .get_offset("ItemSummaryProjection", Partition::new(0))
            .await
            .unwrap(),
        Offset::NONE
    );
    assert!(h.view.get_summary(id).await.unwrap().is_none());

    processor.run_catch_up().await.unwrap();
    assert!(h.view.get_summary(id).await.unwrap().is_some());
    assert_eq!(
        checkpoints
            .get_offset("ItemSummaryProjection", Partition::new(0))
            .await
            .unwrap(),
        Offset::new(1)
    );
}

#[tokio::test(start_paused = true)]
async fn failed_write_is_retried_within_one_pass() {
    let h = setup();
    let processor = h.processor(1, RetryPolicy::new(4, Duration::from_millis(20)));
    let id = h.create(UserId::new(), "Lamp").await;

    h.summaries.fail_next_writes(3);
    assert_eq!(processor.run_catch_up().await.unwrap(), 1);
    assert!(h.view.get_summary(id).await.unwrap().is_some());
}

#[tokio::test]
async fn partitioned_catch_up_covers_every_item() {
    let h = setup();
    let processor = h.processor(4, RetryPolicy::no_retry());
    let owner = UserId::new();
    let mut ids = Vec::new();
    for i in 0..12 {
        let id = h.create(owner, &format!("item{i}")).await;
        h.service
            .start_auction(StartAuction::new(id, owner))
            .await
            .unwrap();
        ids.push(id);
    }

    assert_eq!(processor.run_catch_up().await.unwrap(), 24);
    for id in ids {
        assert_eq!(
            h.view.get_summary(id).await.unwrap().unwrap().status,
            ItemStatus::Auction
        );
    }
    assert_eq!(processor.run_catch_up().await.unwrap(), 0);
}

#[tokio::test]
async fn unknown_event_types_still_advance_the_checkpoint() {
    let h = setup();
    let checkpoints = InMemoryCheckpointStore::new();
    let processor = h.processor_with_checkpoints(checkpoints.clone(), 1, RetryPolicy::no_retry());

    let relisted = EventEnvelope::builder()
        .aggregate_id(AggregateId::new())
        .aggregate_type("Item")
        .event_type("ItemRelisted")
        .version(Version::first())
        .payload_raw(serde_json::json!({"reason": "no bids"}))
        .build()
        .unwrap();
    h.store
        .append(vec![relisted], AppendOptions::expect_new())
        .await
        .unwrap();

    assert_eq!(processor.run_catch_up().await.unwrap(), 1);
    assert_eq!(
        checkpoints
            .get_offset("ItemSummaryProjection", Partition::new(0))
            .await
            .unwrap(),
        Offset::new(1)
    );
    assert!(h.summaries.is_empty().await);
}

#[tokio::test]
async fn rebuild_reproduces_the_same_table() {
    let h = setup();
    let processor = h.processor(2, RetryPolicy::no_retry());
    let owner = UserId::new();
    let id = h.create(owner, "Lamp").await;
    h.service
        .start_auction(StartAuction::new(id, owner))
        .await
        .unwrap();
    processor.run_catch_up().await.unwrap();
    let before = h.view.get_summary(id).await.unwrap();

    processor.rebuild_all().await.unwrap();
    assert_eq!(h.view.get_summary(id).await.unwrap(), before);
    assert_eq!(h.summaries.len().await, 1);
}

#[tokio::test]
async fn background_loop_picks_up_new_items_until_shutdown() {
    let h = setup();
    let processor = std::sync::Arc::new(
        h.processor(1, RetryPolicy::no_retry())
            .with_poll_interval(Duration::from_millis(10)),
    );
    let (tx, rx) = watch::channel(false);
    let handle = tokio::spawn({
        let processor = std::sync::Arc::clone(&processor);
        async move { processor.run(rx).await }
    });

    let id = h.create(UserId::new(), "Lamp").await;
    let mut found = false;
    for _ in 0..200 {
        if h.view.get_summary(id).await.unwrap().is_some() {
            found = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert!(found);

    tx.send(true).unwrap();
    tokio::time::timeout(Duration::from_secs(1), handle)
        .await
        .unwrap()
        .unwrap();
}
