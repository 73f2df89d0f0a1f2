//! Notifications published by the bidding service.

use chrono::{DateTime, Utc};
use common::{AggregateId, UserId};
use domain::Price;
use serde::{Deserialize, Serialize};

use crate::Result;

/// A bid as reported by the bidding service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bid {
    pub bidder: UserId,
    pub bid_time: DateTime<Utc>,
    /// Price the item reached with this bid.
    pub price: Price,
    /// Highest amount the bidder authorised.
    pub maximum_price: Price,
}

impl Bid {
    pub fn new(bidder: UserId, price: impl Into<Price>, maximum_price: impl Into<Price>) -> Self {
        Self {
            bidder,
            bid_time: Utc::now(),
            price: price.into(),
            maximum_price: maximum_price.into(),
        }
    }
}

/// Events consumed from the bidding feed.
///
/// Kinds this service does not know about decode to [`BidEvent::Unknown`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum BidEvent {
    #[serde(rename_all = "camelCase")]
    BidPlaced { item_id: AggregateId, bid: Bid },

    /// `winning_bid` is absent when the reserve was not met.
    #[serde(rename_all = "camelCase")]
    BiddingFinished {
        item_id: AggregateId,
        winning_bid: Option<Bid>,
    },

    #[serde(other)]
    Unknown,
}

impl BidEvent {
    pub fn bid_placed(item_id: AggregateId, bid: Bid) -> Self {
        BidEvent::BidPlaced { item_id, bid }
    }

    pub fn bidding_finished(item_id: AggregateId, winning_bid: Option<Bid>) -> Self {
        BidEvent::BiddingFinished {
            item_id,
            winning_bid,
        }
    }

    /// Decodes one JSON message from the feed.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    pub fn item_id(&self) -> Option<AggregateId> {
        match self {
            BidEvent::BidPlaced { item_id, .. } | BidEvent::BiddingFinished { item_id, .. } => {
                Some(*item_id)
            }
            BidEvent::Unknown => None,
        }
    }

    /// Metric label for the event kind.
    pub fn kind(&self) -> &'static str {
        match self {
            BidEvent::BidPlaced { .. } => "bid_placed",
            BidEvent::BiddingFinished { .. } => "bidding_finished",
            BidEvent::Unknown => "unknown",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_known_kinds() {
        let item_id = AggregateId::new();
        let bidder = UserId::new();
        let json = serde_json::json!({
            "type": "BidPlaced",
            "itemId": item_id,
            "bid": {
                "bidder": bidder,
                "bidTime": "2024-03-01T12:00:00Z",
                "price": 25,
                "maximumPrice": 40
            }
        });

        let event = BidEvent::decode(json.to_string().as_bytes()).unwrap();
        let BidEvent::BidPlaced { item_id: id, bid } = event else {
            panic!("expected BidPlaced, got {event:?}");
        };
        assert_eq!(id, item_id);
        assert_eq!(bid.bidder, bidder);
        assert_eq!(bid.price, Price::new(25));
        assert_eq!(bid.maximum_price, Price::new(40));
    }

    #[test]
    fn missing_winning_bid_decodes_as_none() {
        let item_id = AggregateId::new();
        let json = serde_json::json!({"type": "BiddingFinished", "itemId": item_id});
        let event = BidEvent::decode(json.to_string().as_bytes()).unwrap();
        assert_eq!(event, BidEvent::bidding_finished(item_id, None));
    }

    #[test]
    fn unrecognised_kinds_decode_as_unknown() {
        let json = serde_json::json!({
            "type": "BidWithdrawn",
            "itemId": AggregateId::new(),
            "reason": "changed my mind"
        });
        let event = BidEvent::decode(json.to_string().as_bytes()).unwrap();
        assert_eq!(event, BidEvent::Unknown);
        assert_eq!(event.item_id(), None);
        assert_eq!(event.kind(), "unknown");
    }

    #[test]
    fn malformed_messages_fail_to_decode() {
        assert!(BidEvent::decode(b"{\"type\": \"BidPlaced\"}").is_err());
        assert!(BidEvent::decode(b"not json").is_err());
    }
}
