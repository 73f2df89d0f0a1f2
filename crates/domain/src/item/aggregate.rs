//! Item aggregate implementation.

use std::time::Duration;

use chrono::{DateTime, Utc};
use common::{AggregateId, UserId};
use event_store::Version;
use serde::{Deserialize, Serialize};

use crate::aggregate::Aggregate;

use super::{
    ItemDraft, ItemError, ItemEvent, ItemStatus, Price,
    events::{AuctionFinishedData, AuctionStartedData, ItemCreatedData},
};

/// Item aggregate root.
///
/// An item is put up for auction by its creator, receives price updates while
/// the auction runs, and ends with an optional winner.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    id: Option<AggregateId>,

    #[serde(default)]
    version: Version,

    creator_id: Option<UserId>,
    title: String,
    description: String,
    currency_id: String,
    reserve_price: Price,
    price_increment: Price,
    auction_duration: Duration,
    status: ItemStatus,

    /// Starts at the reserve price.
    price: Price,

    auction_start: Option<DateTime<Utc>>,
    auction_end: Option<DateTime<Utc>>,
    winner: Option<UserId>,
}

impl Aggregate for Item {
    type Event = ItemEvent;
    type Error = ItemError;

    fn aggregate_type() -> &'static str {
        "Item"
    }

    fn id(&self) -> Option<AggregateId> {
        self.id
    }

    fn version(&self) -> Version {
        self.version
    }

    fn set_version(&mut self, version: Version) {
        self.version = version;
    }

    fn apply(&mut self, event: Self::Event) {
        match event {
            ItemEvent::ItemCreated(data) => self.apply_item_created(data),
            ItemEvent::AuctionStarted(data) => self.apply_auction_started(data),
            ItemEvent::PriceUpdated(data) => self.price = data.price,
            ItemEvent::AuctionFinished(data) => self.apply_auction_finished(data),
        }
    }
}

// Query methods
impl Item {
    pub fn creator_id(&self) -> Option<UserId> {
        self.creator_id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn currency_id(&self) -> &str {
        &self.currency_id
    }

    pub fn reserve_price(&self) -> Price {
        self.reserve_price
    }

    pub fn price_increment(&self) -> Price {
        self.price_increment
    }

    pub fn auction_duration(&self) -> Duration {
        self.auction_duration
    }

    pub fn status(&self) -> ItemStatus {
        self.status
    }

    /// Current price: the reserve until the first update, the final price
    /// once completed.
    pub fn price(&self) -> Price {
        self.price
    }

    pub fn auction_start(&self) -> Option<DateTime<Utc>> {
        self.auction_start
    }

    pub fn auction_end(&self) -> Option<DateTime<Utc>> {
        self.auction_end
    }

    /// Set only once completed, and even then absent if the reserve was not met.
    pub fn winner(&self) -> Option<UserId> {
        self.winner
    }

    pub fn is_created(&self) -> bool {
        self.id.is_some()
    }
}

// Command methods (return events)
//
// Commands that arrive in a state where they make no sense return an empty
// event list instead of an error, with two exceptions: creating twice and
// starting an auction as someone other than the creator.
impl Item {
    pub fn create(&self, draft: ItemDraft) -> Result<Vec<ItemEvent>, ItemError> {
        if self.is_created() {
            return Err(ItemError::AlreadyCreated);
        }
        draft.validate()?;

        Ok(vec![ItemEvent::item_created(draft)])
    }

    /// Opens the auction. The creator check comes before the status check, so
    /// a stranger is refused even on a completed item.
    pub fn start_auction(&self, requester: UserId) -> Result<Vec<ItemEvent>, ItemError> {
        let (id, creator) = self.require_created()?;
        if requester != creator {
            return Err(ItemError::NotCreator { requester });
        }
        if !self.status.can_start_auction() {
            return Ok(vec![]);
        }

        Ok(vec![ItemEvent::auction_started(id)])
    }

    /// Records a new price. Does not compare with the current price.
    pub fn update_price(&self, price: Price) -> Result<Vec<ItemEvent>, ItemError> {
        let (id, _) = self.require_created()?;
        if !self.status.is_open() {
            return Ok(vec![]);
        }

        Ok(vec![ItemEvent::price_updated(id, price)])
    }

    pub fn finish_auction(
        &self,
        winner: Option<UserId>,
        price: Price,
    ) -> Result<Vec<ItemEvent>, ItemError> {
        let (id, _) = self.require_created()?;
        if !self.status.is_open() {
            return Ok(vec![]);
        }

        Ok(vec![ItemEvent::auction_finished(id, winner, price)])
    }

    fn require_created(&self) -> Result<(AggregateId, UserId), ItemError> {
        match (self.id, self.creator_id) {
            (Some(id), Some(creator)) => Ok((id, creator)),
            _ => Err(ItemError::NotCreated),
        }
    }
}

// Apply event helpers
impl Item {
    fn apply_item_created(&mut self, data: ItemCreatedData) {
        self.id = Some(data.item_id);
        self.creator_id = Some(data.creator_id);
        self.title = data.title;
        self.description = data.description;
        self.currency_id = data.currency_id;
        self.reserve_price = data.reserve_price;
        self.price_increment = data.price_increment;
        self.auction_duration = data.auction_duration;
        self.status = ItemStatus::Created;
        self.price = data.reserve_price;
    }

    fn apply_auction_started(&mut self, data: AuctionStartedData) {
        self.status = ItemStatus::Auction;
        self.auction_start = Some(data.started_at);
        self.auction_end = chrono::Duration::from_std(self.auction_duration)
            .ok()
            .and_then(|duration| data.started_at.checked_add_signed(duration));
    }

    fn apply_auction_finished(&mut self, data: AuctionFinishedData) {
        self.status = ItemStatus::Completed;
        self.price = data.price;
        self.winner = data.winner;
    }
}
