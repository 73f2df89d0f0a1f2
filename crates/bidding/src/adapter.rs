//! Maps bidding feed events to item commands.

use std::sync::Arc;

use common::{RetryPolicy, retry_with_backoff};
use domain::{DomainError, FinishAuction, ItemService, UpdatePrice};
use event_store::EventStore;
use tokio::sync::watch;

use crate::error::{BiddingError, Result};
use crate::events::BidEvent;
use crate::feed::{BidEventFeed, Delivery};

/// What handling one bid event did to the item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BidOutcome {
    /// A new item event was committed.
    Applied,
    /// The item was already in the requested state, or the bid was stale.
    NoOp,
    /// The event names an item that does not exist.
    UnknownItem,
    /// The event kind is not handled here.
    Ignored,
}

/// Subscriber turning bid notifications into item commands.
///
/// Safe under at-least-once delivery: a repeated `BiddingFinished` is a no-op
/// on a completed item, and a `BidPlaced` lower than the current price is
/// dropped.
pub struct BidEventAdapter<S: EventStore> {
    items: Arc<ItemService<S>>,
    retry: RetryPolicy,
}

impl<S: EventStore> BidEventAdapter<S> {
    pub fn new(items: Arc<ItemService<S>>) -> Self {
        Self {
            items,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Handles one event with a single attempt.
    #[tracing::instrument(skip(self, event), fields(kind = event.kind(), item_id = ?event.item_id()))]
    pub async fn handle(&self, event: &BidEvent) -> Result<BidOutcome> {
        let result = match event {
            BidEvent::BidPlaced { item_id, bid } => {
                self.items
                    .raise_price(UpdatePrice::new(*item_id, bid.price))
                    .await
            }
            BidEvent::BiddingFinished {
                item_id,
                winning_bid: Some(bid),
            } => {
                self.items
                    .finish_auction(FinishAuction::new(*item_id, Some(bid.bidder), bid.price))
                    .await
            }
            BidEvent::BiddingFinished {
                item_id,
                winning_bid: None,
            } => self.items.finish_auction_unsold(*item_id).await,
            BidEvent::Unknown => {
                tracing::debug!("ignoring unknown bid event kind");
                return Ok(BidOutcome::Ignored);
            }
        };

        match result {
            Ok(r) if r.is_noop() => Ok(BidOutcome::NoOp),
            Ok(_) => Ok(BidOutcome::Applied),
            Err(DomainError::ItemNotFound(item_id)) => {
                tracing::warn!(%item_id, "bid event for unknown item dropped");
                Ok(BidOutcome::UnknownItem)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Consumes `feed` until it is exhausted or `shutdown` turns true.
    ///
    /// Transient failures are retried with backoff. A delivery is acked once
    /// handled or once it failed permanently, and nacked when the retry
    /// budget ran out so the feed delivers it again.
    pub async fn run<F>(&self, feed: &F, mut shutdown: watch::Receiver<bool>)
    where
        F: BidEventFeed + ?Sized,
    {
        tracing::info!("bid event adapter started");

        loop {
            if *shutdown.borrow() {
                break;
            }
            let delivery = tokio::select! {
                delivery = feed.next() => match delivery {
                    Some(delivery) => delivery,
                    None => break,
                },
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    continue;
                }
            };
            self.process(feed, delivery).await;
        }

        tracing::info!("bid event adapter stopped");
    }

    async fn process<F>(&self, feed: &F, delivery: Delivery)
    where
        F: BidEventFeed + ?Sized,
    {
        let Delivery {
            tag,
            event,
            redelivered,
        } = delivery;
        metrics::counter!("bid_events_total", "kind" => event.kind()).increment(1);
        if redelivered {
            metrics::counter!("bid_events_redelivered_total", "kind" => event.kind())
                .increment(1);
        }

        let result =
            retry_with_backoff(self.retry, BiddingError::is_transient, || self.handle(&event))
                .await;

        let answer = match result {
            Ok(outcome) => {
                tracing::debug!(%tag, ?outcome, "bid event handled");
                feed.ack(tag).await
            }
            Err(e) if e.is_transient() => {
                tracing::warn!(%tag, error = %e, "bid event failed, returning it to the feed");
                feed.nack(tag).await
            }
            Err(e) => {
                tracing::error!(%tag, kind = event.kind(), error = %e, "bid event rejected, dropping");
                feed.ack(tag).await
            }
        };
        if let Err(e) = answer {
            tracing::error!(%tag, error = %e, "could not answer delivery");
        }
    }
}
