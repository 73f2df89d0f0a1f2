//! Bridge from the external bidding service to item commands.
//!
//! The bidding service publishes bid notifications at least once and may
//! redeliver an older event after a newer one. This crate provides:
//! - [`BidEvent`] and [`Bid`], decoded from the feed's JSON messages
//! - [`BidEventFeed`], the ack/nack subscription contract, with the
//!   channel-backed [`InMemoryBidFeed`]
//! - [`BidEventAdapter`], which turns each event into at most one item command

pub mod adapter;
pub mod error;
pub mod events;
pub mod feed;

pub use adapter::{BidEventAdapter, BidOutcome};
pub use error::{BiddingError, Result};
pub use events::{Bid, BidEvent};
pub use feed::{BidEventFeed, Delivery, DeliveryTag, InMemoryBidFeed};
