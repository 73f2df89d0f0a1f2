use std::time::Duration;

use common::{AggregateId, UserId};
use criterion::{Criterion, criterion_group, criterion_main};
use domain::{DomainEvent, ItemDraft, ItemEvent, ItemStatus, Price};
use event_store::{AppendOptions, EventEnvelope, InMemoryEventStore, Version, store::EventStore};
use projections::{
    InMemoryCheckpointStore, InMemorySummaryStore, ItemSummaryProjection, Projection,
    ProjectionProcessor,
};

fn make_envelope(aggregate_id: AggregateId, version: i64, event: &ItemEvent) -> EventEnvelope {
    EventEnvelope::builder()
        .aggregate_id(aggregate_id)
        .aggregate_type("Item")
        .event_type(DomainEvent::event_type(event))
        .version(Version::new(version))
        .payload(event)
        .unwrap()
        .build()
        .unwrap()
}

/// Populate a store with N items, each having 3 events (created + started + price).
async fn populate_store(store: &InMemoryEventStore, owner: UserId, n: usize) {
    for i in 0..n {
        let id = AggregateId::new();
        let draft = ItemDraft {
            id,
            creator_id: owner,
            title: format!("item{i}"),
            description: String::new(),
            currency_id: "EUR".to_string(),
            reserve_price: Price::new(10),
            price_increment: Price::new(1),
            auction_duration: Duration::from_secs(60),
        };

        let events = vec![
            make_envelope(id, 1, &ItemEvent::item_created(draft)),
            make_envelope(id, 2, &ItemEvent::auction_started(id)),
            make_envelope(id, 3, &ItemEvent::price_updated(id, Price::new(12))),
        ];
        store.append(events, AppendOptions::new()).await.unwrap();
    }
}

fn bench_catch_up(c: &mut Criterion, items: usize, partitions: u32) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let store = InMemoryEventStore::new();
    rt.block_on(populate_store(&store, UserId::new(), items));

    let name = format!("projections/catch_up_{}_events_{partitions}p", items * 3);
    c.bench_function(&name, |b| {
        b.iter(|| {
            rt.block_on(async {
                let view = ItemSummaryProjection::new(InMemorySummaryStore::new());
                let mut processor =
                    ProjectionProcessor::new(store.clone(), InMemoryCheckpointStore::new())
                        .with_partitions(partitions);
                processor.register(Box::new(view) as Box<dyn Projection>);
                processor.run_catch_up().await.unwrap();
            });
        });
    });
}

fn bench_catch_up_100_items(c: &mut Criterion) {
    bench_catch_up(c, 100, 1);
}

fn bench_catch_up_1000_items_partitioned(c: &mut Criterion) {
    bench_catch_up(c, 1000, 4);
}

fn bench_paged_query(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let store = InMemoryEventStore::new();
    let owner = UserId::new();
    let view = ItemSummaryProjection::new(InMemorySummaryStore::new());

    rt.block_on(async {
        populate_store(&store, owner, 1000).await;
        let mut processor = ProjectionProcessor::new(store.clone(), InMemoryCheckpointStore::new());
        processor.register(Box::new(view.clone()));
        processor.run_catch_up().await.unwrap();
    });

    c.bench_function("projections/query_page_of_1000", |b| {
        b.iter(|| {
            rt.block_on(async {
                view.get_items(owner, ItemStatus::Auction, 3, 10)
                    .await
                    .unwrap();
            });
        });
    });
}

criterion_group!(
    benches,
    bench_catch_up_100_items,
    bench_catch_up_1000_items_partitioned,
    bench_paged_query,
);
criterion_main!(benches);
