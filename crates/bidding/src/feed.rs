//! At-least-once delivery of bid events.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::{BiddingError, Result};
use crate::events::BidEvent;

/// Identifies one delivery of an event. A redelivery gets a fresh tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeliveryTag(u64);

impl DeliveryTag {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for DeliveryTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone)]
pub struct Delivery {
    pub tag: DeliveryTag,
    pub event: BidEvent,
    /// True when the event was handed out before and nacked.
    pub redelivered: bool,
}

/// A subscription to the bidding feed.
///
/// Every delivery must be answered with `ack` (done, never deliver again) or
/// `nack` (deliver again later).
#[async_trait]
pub trait BidEventFeed: Send + Sync {
    /// Waits for the next delivery. Returns `None` once the feed is closed
    /// and drained.
    async fn next(&self) -> Option<Delivery>;

    async fn ack(&self, tag: DeliveryTag) -> Result<()>;

    async fn nack(&self, tag: DeliveryTag) -> Result<()>;
}

#[derive(Default)]
struct Pending {
    in_flight: HashMap<DeliveryTag, BidEvent>,
    /// Nacked after the feed was closed.
    redeliveries: VecDeque<BidEvent>,
}

struct FeedState {
    sender: Mutex<Option<mpsc::UnboundedSender<(BidEvent, bool)>>>,
    receiver: tokio::sync::Mutex<mpsc::UnboundedReceiver<(BidEvent, bool)>>,
    pending: Mutex<Pending>,
    next_tag: AtomicU64,
    acked: AtomicU64,
}

/// Channel-backed feed. Nacked events go to the back of the queue.
///
/// Cloning shares the same queue.
#[derive(Clone)]
pub struct InMemoryBidFeed {
    state: Arc<FeedState>,
}

impl InMemoryBidFeed {
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            state: Arc::new(FeedState {
                sender: Mutex::new(Some(sender)),
                receiver: tokio::sync::Mutex::new(receiver),
                pending: Mutex::new(Pending::default()),
                next_tag: AtomicU64::new(1),
                acked: AtomicU64::new(0),
            }),
        }
    }

    pub fn publish(&self, event: BidEvent) -> Result<()> {
        self.send(event, false)
    }

    /// Decodes and publishes one raw JSON message.
    pub fn publish_json(&self, bytes: &[u8]) -> Result<()> {
        self.publish(BidEvent::decode(bytes)?)
    }

    /// Stops accepting new events. Queued and nacked events are still
    /// delivered; after that `next` returns `None`.
    pub fn close(&self) {
        self.state
            .sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }

    /// Number of deliveries acknowledged so far.
    pub fn acked_count(&self) -> u64 {
        self.state.acked.load(Ordering::SeqCst)
    }

    /// Number of deliveries handed out and not yet answered.
    pub fn in_flight(&self) -> usize {
        self.pending().in_flight.len()
    }

    fn pending(&self) -> std::sync::MutexGuard<'_, Pending> {
        self.state
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn send(&self, event: BidEvent, redelivered: bool) -> Result<()> {
        let sender = self
            .state
            .sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        match sender.as_ref() {
            Some(tx) => tx
                .send((event, redelivered))
                .map_err(|_| BiddingError::FeedClosed),
            None => Err(BiddingError::FeedClosed),
        }
    }

    fn hand_out(&self, event: BidEvent, redelivered: bool) -> Delivery {
        let tag = DeliveryTag(self.state.next_tag.fetch_add(1, Ordering::SeqCst));
        self.pending().in_flight.insert(tag, event.clone());
        Delivery {
            tag,
            event,
            redelivered,
        }
    }
}

impl Default for InMemoryBidFeed {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BidEventFeed for InMemoryBidFeed {
    async fn next(&self) -> Option<Delivery> {
        let parked = self.pending().redeliveries.pop_front();
        if let Some(event) = parked {
            return Some(self.hand_out(event, true));
        }

        let (event, redelivered) = self.state.receiver.lock().await.recv().await?;
        Some(self.hand_out(event, redelivered))
    }

    async fn ack(&self, tag: DeliveryTag) -> Result<()> {
        self.pending()
            .in_flight
            .remove(&tag)
            .ok_or(BiddingError::UnknownDelivery(tag))?;
        self.state.acked.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn nack(&self, tag: DeliveryTag) -> Result<()> {
        let event = self
            .pending()
            .in_flight
            .remove(&tag)
            .ok_or(BiddingError::UnknownDelivery(tag))?;

        if let Err(BiddingError::FeedClosed) = self.send(event.clone(), true) {
            self.pending().redeliveries.push_back(event);
        }
        tracing::debug!(%tag, "delivery returned to the feed");
        Ok(())
    }
}
