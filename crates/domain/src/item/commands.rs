//! Item commands.

use common::{AggregateId, UserId};

use crate::command::Command;

use super::{Item, ItemDraft, Price};

/// Command to create a new item.
#[derive(Debug, Clone)]
pub struct CreateItem {
    pub draft: ItemDraft,
}

impl CreateItem {
    pub fn new(draft: ItemDraft) -> Self {
        Self { draft }
    }
}

impl Command for CreateItem {
    type Aggregate = Item;

    fn aggregate_id(&self) -> AggregateId {
        self.draft.id
    }
}

/// Command to open the auction of an item.
#[derive(Debug, Clone)]
pub struct StartAuction {
    pub item_id: AggregateId,

    /// Must be the item's creator.
    pub requester: UserId,
}

impl StartAuction {
    pub fn new(item_id: AggregateId, requester: UserId) -> Self {
        Self { item_id, requester }
    }
}

impl Command for StartAuction {
    type Aggregate = Item;

    fn aggregate_id(&self) -> AggregateId {
        self.item_id
    }
}

/// Command to record a new current price.
#[derive(Debug, Clone)]
pub struct UpdatePrice {
    pub item_id: AggregateId,
    pub price: Price,
}

impl UpdatePrice {
    pub fn new(item_id: AggregateId, price: impl Into<Price>) -> Self {
        Self {
            item_id,
            price: price.into(),
        }
    }
}

impl Command for UpdatePrice {
    type Aggregate = Item;

    fn aggregate_id(&self) -> AggregateId {
        self.item_id
    }
}

/// Command to close the auction.
#[derive(Debug, Clone)]
pub struct FinishAuction {
    pub item_id: AggregateId,

    /// `None` when no bid met the reserve.
    pub winner: Option<UserId>,

    pub price: Price,
}

impl FinishAuction {
    pub fn new(item_id: AggregateId, winner: Option<UserId>, price: impl Into<Price>) -> Self {
        Self {
            item_id,
            winner,
            price: price.into(),
        }
    }
}

impl Command for FinishAuction {
    type Aggregate = Item;

    fn aggregate_id(&self) -> AggregateId {
        self.item_id
    }
}
