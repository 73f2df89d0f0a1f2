//! Item aggregate and related types.

mod aggregate;
mod commands;
mod events;
mod service;
mod state;
mod value_objects;

pub use aggregate::Item;
pub use commands::*;
pub use events::{
    AuctionFinishedData, AuctionStartedData, ItemCreatedData, ItemEvent, PriceUpdatedData,
};
pub use service::ItemService;
pub use state::{ItemStatus, UnknownStatus};
pub use value_objects::{ItemDraft, Price};

use common::UserId;
use thiserror::Error;

/// How a rejected command should be reported to its caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Authorization,
}

/// Errors that can occur during item operations.
#[derive(Debug, Error)]
pub enum ItemError {
    /// An item with this id already exists.
    #[error("Item already created")]
    AlreadyCreated,

    /// The draft failed validation.
    #[error("Invalid item: {reason}")]
    InvalidDraft { reason: &'static str },

    /// Only the creator may start the auction.
    #[error("User {requester} is not the creator of this item")]
    NotCreator { requester: UserId },

    /// The command needs an existing item.
    #[error("Item has not been created")]
    NotCreated,
}

impl ItemError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ItemError::NotCreator { .. } => ErrorKind::Authorization,
            ItemError::AlreadyCreated | ItemError::InvalidDraft { .. } | ItemError::NotCreated => {
                ErrorKind::Validation
            }
        }
    }
}
