//! Value objects for the item domain.

use std::time::Duration;

use common::{AggregateId, UserId};
use serde::{Deserialize, Serialize};

use super::ItemError;

/// A price in the smallest unit of the item's currency.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Price(i64);

impl Price {
    pub fn new(amount: i64) -> Self {
        Self(amount)
    }

    pub fn zero() -> Self {
        Self(0)
    }

    pub fn amount(&self) -> i64 {
        self.0
    }

    pub fn is_negative(&self) -> bool {
        self.0 < 0
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }
}

impl std::fmt::Display for Price {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for Price {
    fn from(amount: i64) -> Self {
        Self(amount)
    }
}

/// Everything needed to create an item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemDraft {
    pub id: AggregateId,
    pub creator_id: UserId,
    pub title: String,
    pub description: String,
    /// ISO currency code such as `"EUR"`.
    pub currency_id: String,
    pub reserve_price: Price,
    pub price_increment: Price,
    pub auction_duration: Duration,
}

impl ItemDraft {
    /// Checks the draft's own fields; says nothing about whether the id is
    /// already taken.
    pub fn validate(&self) -> Result<(), ItemError> {
        let reason = if self.title.trim().is_empty() {
            "title must not be blank"
        } else if self.currency_id.trim().is_empty() {
            "currency must not be blank"
        } else if self.reserve_price.is_negative() {
            "reserve price must not be negative"
        } else if !self.price_increment.is_positive() {
            "price increment must be positive"
        } else if self.auction_duration.is_zero() {
            "auction duration must be positive"
        } else {
            return Ok(());
        };

        Err(ItemError::InvalidDraft { reason })
    }
}
