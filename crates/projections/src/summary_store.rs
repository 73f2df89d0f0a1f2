//! Read-side storage for item summaries.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{AggregateId, UserId};
use domain::{ItemStatus, Price};
use event_store::Offset;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::{ProjectionError, Result};

/// Page size used when a caller does not pick one.
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// One row of the "items by owner" listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemSummary {
    pub item_id: AggregateId,
    pub owner_id: UserId,
    pub title: String,
    pub currency_id: String,
    pub reserve_price: Price,
    pub status: ItemStatus,
}

/// One page of a larger result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginatedSequence<T> {
    pub items: Vec<T>,
    pub page_no: usize,
    pub page_size: usize,
    /// Number of matching rows across all pages.
    pub count: usize,
    pub total_pages: usize,
}

impl<T> PaginatedSequence<T> {
    pub fn new(items: Vec<T>, page_no: usize, page_size: usize, count: usize) -> Self {
        Self {
            items,
            page_no,
            page_size,
            count,
            total_pages: count.div_ceil(page_size.max(1)),
        }
    }

    pub fn is_last(&self) -> bool {
        self.page_no + 1 >= self.total_pages
    }
}

/// Storage for [`ItemSummary`] rows, keyed by item id.
///
/// Rows remember when and at which log offset they were inserted; queries
/// return newest first by that order.
#[async_trait]
pub trait SummaryStore: Send + Sync {
    /// Inserts a row unless one already exists for the item. Returns whether
    /// the row was inserted.
    async fn insert_if_absent(
        &self,
        summary: ItemSummary,
        created_at: DateTime<Utc>,
        offset: Offset,
    ) -> Result<bool>;

    async fn get(&self, item_id: AggregateId) -> Result<Option<ItemSummary>>;

    /// Replaces the row for `summary.item_id`, keeping its creation order.
    async fn upsert(&self, summary: ItemSummary) -> Result<()>;

    /// Rows for one owner and status, newest first. `page_no` is zero based.
    async fn query(
        &self,
        owner_id: UserId,
        status: ItemStatus,
        page_no: usize,
        page_size: usize,
    ) -> Result<PaginatedSequence<ItemSummary>>;

    async fn clear(&self) -> Result<()>;
}

#[derive(Debug, Clone)]
struct StoredSummary {
    summary: ItemSummary,
    created_at: DateTime<Utc>,
    created_offset: Offset,
}

/// In-memory summary store. Cloning shares the underlying rows.
#[derive(Debug, Clone, Default)]
pub struct InMemorySummaryStore {
    rows: Arc<RwLock<HashMap<AggregateId, StoredSummary>>>,
    failing_writes: Arc<AtomicU32>,
}

impl InMemorySummaryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }

    /// Makes the next `count` writes fail with a transient store error.
    pub fn fail_next_writes(&self, count: u32) {
        self.failing_writes.store(count, Ordering::SeqCst);
    }

    fn check_injected_failure(&self) -> Result<()> {
        let failed = self
            .failing_writes
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failed {
            return Err(ProjectionError::Store("injected write failure".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl SummaryStore for InMemorySummaryStore {
    async fn insert_if_absent(
        &self,
        summary: ItemSummary,
        created_at: DateTime<Utc>,
        offset: Offset,
    ) -> Result<bool> {
        self.check_injected_failure()?;

        let mut rows = self.rows.write().await;
        if rows.contains_key(&summary.item_id) {
            return Ok(false);
        }
        rows.insert(
            summary.item_id,
            StoredSummary {
                summary,
                created_at,
                created_offset: offset,
            },
        );
        Ok(true)
    }

    async fn get(&self, item_id: AggregateId) -> Result<Option<ItemSummary>> {
        Ok(self
            .rows
            .read()
            .await
            .get(&item_id)
            .map(|row| row.summary.clone()))
    }

    async fn upsert(&self, summary: ItemSummary) -> Result<()> {
        self.check_injected_failure()?;

        let mut rows = self.rows.write().await;
        match rows.get_mut(&summary.item_id) {
            Some(row) => row.summary = summary,
            None => {
                rows.insert(
                    summary.item_id,
                    StoredSummary {
                        summary,
                        created_at: Utc::now(),
                        created_offset: Offset::NONE,
                    },
                );
            }
        }
        Ok(())
    }

    async fn query(
        &self,
        owner_id: UserId,
        status: ItemStatus,
        page_no: usize,
        page_size: usize,
    ) -> Result<PaginatedSequence<ItemSummary>> {
        if page_size == 0 {
            return Err(ProjectionError::InvalidPageSize);
        }

        let rows = self.rows.read().await;
        let mut matching: Vec<&StoredSummary> = rows
            .values()
            .filter(|row| row.summary.owner_id == owner_id && row.summary.status == status)
            .collect();
        matching.sort_by(|a, b| {
            b.created_offset
                .cmp(&a.created_offset)
                .then_with(|| b.created_at.cmp(&a.created_at))
        });

        let count = matching.len();
        let items = matching
            .into_iter()
            .skip(page_no.saturating_mul(page_size))
            .take(page_size)
            .map(|row| row.summary.clone())
            .collect();

        Ok(PaginatedSequence::new(items, page_no, page_size, count))
    }

    async fn clear(&self) -> Result<()> {
        self.rows.write().await.clear();
        Ok(())
    }
}
