//! Item domain events.

use std::time::Duration;

use chrono::{DateTime, Utc};
use common::{AggregateId, UserId};
use serde::{Deserialize, Serialize};

use crate::aggregate::DomainEvent;

use super::{ItemDraft, Price};

/// Events that can occur on an item aggregate.
///
/// The set is closed: adding a kind means touching every `match` on it, the
/// applier and the projection handlers included.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ItemEvent {
    ItemCreated(ItemCreatedData),
    AuctionStarted(AuctionStartedData),
    PriceUpdated(PriceUpdatedData),
    AuctionFinished(AuctionFinishedData),
}

impl ItemEvent {
    pub const ITEM_CREATED: &'static str = "ItemCreated";
    pub const AUCTION_STARTED: &'static str = "AuctionStarted";
    pub const PRICE_UPDATED: &'static str = "PriceUpdated";
    pub const AUCTION_FINISHED: &'static str = "AuctionFinished";

    /// Id of the item the event belongs to.
    pub fn item_id(&self) -> AggregateId {
        match self {
            ItemEvent::ItemCreated(data) => data.item_id,
            ItemEvent::AuctionStarted(data) => data.item_id,
            ItemEvent::PriceUpdated(data) => data.item_id,
            ItemEvent::AuctionFinished(data) => data.item_id,
        }
    }
}

impl DomainEvent for ItemEvent {
    fn event_type(&self) -> &'static str {
        match self {
            ItemEvent::ItemCreated(_) => Self::ITEM_CREATED,
            ItemEvent::AuctionStarted(_) => Self::AUCTION_STARTED,
            ItemEvent::PriceUpdated(_) => Self::PRICE_UPDATED,
            ItemEvent::AuctionFinished(_) => Self::AUCTION_FINISHED,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemCreatedData {
    pub item_id: AggregateId,
    pub creator_id: UserId,
    pub title: String,
    pub description: String,
    pub currency_id: String,
    pub reserve_price: Price,
    pub price_increment: Price,
    pub auction_duration: Duration,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuctionStartedData {
    pub item_id: AggregateId,
    pub started_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceUpdatedData {
    pub item_id: AggregateId,
    pub price: Price,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuctionFinishedData {
    pub item_id: AggregateId,
    /// `None` when the reserve price was not met.
    pub winner: Option<UserId>,
    pub price: Price,
}

// Convenience constructors for events
impl ItemEvent {
    pub fn item_created(draft: ItemDraft) -> Self {
        ItemEvent::ItemCreated(ItemCreatedData {
            item_id: draft.id,
            creator_id: draft.creator_id,
            title: draft.title,
            description: draft.description,
            currency_id: draft.currency_id,
            reserve_price: draft.reserve_price,
            price_increment: draft.price_increment,
            auction_duration: draft.auction_duration,
            created_at: Utc::now(),
        })
    }

    pub fn auction_started(item_id: AggregateId) -> Self {
        ItemEvent::AuctionStarted(AuctionStartedData {
            item_id,
            started_at: Utc::now(),
        })
    }

    pub fn price_updated(item_id: AggregateId, price: Price) -> Self {
        ItemEvent::PriceUpdated(PriceUpdatedData { item_id, price })
    }

    pub fn auction_finished(item_id: AggregateId, winner: Option<UserId>, price: Price) -> Self {
        ItemEvent::AuctionFinished(AuctionFinishedData {
            item_id,
            winner,
            price,
        })
    }
}
