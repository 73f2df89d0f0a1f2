//! Item summaries per owner, fed by item lifecycle events.

use std::collections::HashMap;

use async_trait::async_trait;
use common::{AggregateId, UserId};
use domain::{Aggregate, Item, ItemEvent, ItemStatus};
use event_store::EventEnvelope;

use crate::Result;
use crate::projection::Projection;
use crate::summary_store::{ItemSummary, PaginatedSequence, SummaryStore};

/// What an event kind does to the summary table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SummaryUpdate {
    Insert,
    AdvanceStatus(ItemStatus),
    Ignore,
}

/// Projection maintaining one [`ItemSummary`] per created item.
///
/// Every update is idempotent: creation inserts only if absent and a status
/// change only ever moves forward in the lifecycle, so an event delivered a
/// second time leaves the table as it was.
#[derive(Clone)]
pub struct ItemSummaryProjection<St: SummaryStore> {
    store: St,
    handlers: HashMap<&'static str, SummaryUpdate>,
}

impl<St: SummaryStore> ItemSummaryProjection<St> {
    pub fn new(store: St) -> Self {
        let handlers = HashMap::from([
            (ItemEvent::ITEM_CREATED, SummaryUpdate::Insert),
            (
                ItemEvent::AUCTION_STARTED,
                SummaryUpdate::AdvanceStatus(ItemStatus::Auction),
            ),
            (ItemEvent::PRICE_UPDATED, SummaryUpdate::Ignore),
            (
                ItemEvent::AUCTION_FINISHED,
                SummaryUpdate::AdvanceStatus(ItemStatus::Completed),
            ),
        ]);
        Self { store, handlers }
    }

    pub fn store(&self) -> &St {
        &self.store
    }

    pub async fn get_summary(&self, item_id: AggregateId) -> Result<Option<ItemSummary>> {
        self.store.get(item_id).await
    }

    /// Items of one owner in one status, newest first.
    pub async fn get_items(
        &self,
        owner_id: UserId,
        status: ItemStatus,
        page_no: usize,
        page_size: usize,
    ) -> Result<PaginatedSequence<ItemSummary>> {
        self.store
            .query(owner_id, status, page_no, page_size)
            .await
    }

    async fn insert(&self, event: &EventEnvelope) -> Result<()> {
        let ItemEvent::ItemCreated(data) = serde_json::from_value(event.payload.clone())? else {
            tracing::warn!(event_id = %event.event_id, "payload does not match ItemCreated");
            return Ok(());
        };

        let summary = ItemSummary {
            item_id: data.item_id,
            owner_id: data.creator_id,
            title: data.title,
            currency_id: data.currency_id,
            reserve_price: data.reserve_price,
            status: ItemStatus::Created,
        };
        let inserted = self
            .store
            .insert_if_absent(summary, data.created_at, event.offset)
            .await?;
        if !inserted {
            tracing::debug!(item_id = %data.item_id, "summary already present");
        }
        Ok(())
    }

    async fn advance_status(&self, item_id: AggregateId, status: ItemStatus) -> Result<()> {
        let Some(mut summary) = self.store.get(item_id).await? else {
            tracing::warn!(%item_id, %status, "status change for an item with no summary");
            return Ok(());
        };
        if summary.status >= status {
            return Ok(());
        }
        summary.status = status;
        self.store.upsert(summary).await
    }
}

#[async_trait]
impl<St: SummaryStore> Projection for ItemSummaryProjection<St> {
    fn name(&self) -> &'static str {
        "ItemSummaryProjection"
    }

    async fn handle(&self, event: &EventEnvelope) -> Result<()> {
        if event.aggregate_type != Item::aggregate_type() {
            return Ok(());
        }

        match self.handlers.get(event.event_type.as_str()) {
            Some(SummaryUpdate::Insert) => self.insert(event).await,
            Some(SummaryUpdate::AdvanceStatus(status)) => {
                self.advance_status(event.aggregate_id, *status).await
            }
            Some(SummaryUpdate::Ignore) => Ok(()),
            None => {
                tracing::debug!(event_type = %event.event_type, "no handler for event type");
                Ok(())
            }
        }
    }

    async fn reset(&self) -> Result<()> {
        self.store.clear().await
    }
}
