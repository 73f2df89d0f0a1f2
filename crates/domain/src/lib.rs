//! Domain layer for the auction item service.
//!
//! This crate provides:
//! - the `Aggregate` and `DomainEvent` traits
//! - `CommandHandler`, which replays, validates and commits under a per-item lock
//! - the `Item` aggregate with its events, commands and `ItemService`

pub mod aggregate;
pub mod command;
pub mod error;
pub mod item;

pub use aggregate::{Aggregate, DomainEvent};
pub use command::{Command, CommandHandler, CommandResult, DEFAULT_COMMAND_TIMEOUT};
pub use error::DomainError;
pub use item::{
    AuctionFinishedData, AuctionStartedData, CreateItem, ErrorKind, FinishAuction, Item,
    ItemCreatedData, ItemDraft, ItemError, ItemEvent, ItemService, ItemStatus, Price,
    PriceUpdatedData, StartAuction, UnknownStatus, UpdatePrice,
};
