use std::time::Duration;

use common::{AggregateId, UserId};
use criterion::{Criterion, criterion_group, criterion_main};
use domain::{
    CreateItem, FinishAuction, ItemDraft, ItemService, Price, StartAuction, UpdatePrice,
};
use event_store::InMemoryEventStore;

fn draft(creator: UserId) -> ItemDraft {
    ItemDraft {
        id: AggregateId::new(),
        creator_id: creator,
        title: "Bench lamp".to_string(),
        description: String::new(),
        currency_id: "EUR".to_string(),
        reserve_price: Price::new(10),
        price_increment: Price::new(1),
        auction_duration: Duration::from_secs(60),
    }
}

fn bench_create_item(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("domain/create_item", |b| {
        b.iter(|| {
            rt.block_on(async {
                let service = ItemService::new(InMemoryEventStore::new());
                service
                    .create_item(CreateItem::new(draft(UserId::new())))
                    .await
                    .unwrap();
            });
        });
    });
}

fn bench_full_auction(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("domain/create_start_bid_finish", |b| {
        b.iter(|| {
            rt.block_on(async {
                let service = ItemService::new(InMemoryEventStore::new());
                let creator = UserId::new();
                let draft = draft(creator);
                let id = draft.id;

                service.create_item(CreateItem::new(draft)).await.unwrap();
                service
                    .start_auction(StartAuction::new(id, creator))
                    .await
                    .unwrap();
                service
                    .update_price(UpdatePrice::new(id, 12))
                    .await
                    .unwrap();
                service
                    .finish_auction(FinishAuction::new(id, Some(UserId::new()), 12))
                    .await
                    .unwrap();
            });
        });
    });
}

/// Each price update replays the whole history first, so this grows with it.
fn bench_price_update_after_history(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let service = ItemService::new(InMemoryEventStore::new());
    let creator = UserId::new();
    let draft = draft(creator);
    let id = draft.id;

    rt.block_on(async {
        service.create_item(CreateItem::new(draft)).await.unwrap();
        service
            .start_auction(StartAuction::new(id, creator))
            .await
            .unwrap();
        for price in 11..=110 {
            service
                .update_price(UpdatePrice::new(id, price))
                .await
                .unwrap();
        }
    });

    c.bench_function("domain/get_item_after_100_updates", |b| {
        b.iter(|| {
            rt.block_on(async {
                service.get_item(id).await.unwrap().unwrap();
            });
        });
    });
}

criterion_group!(
    benches,
    bench_create_item,
    bench_full_auction,
    bench_price_update_after_history,
);
criterion_main!(benches);
