//! Item lifecycle states.

use serde::{Deserialize, Serialize};

/// The status of an item in its auction lifecycle.
///
/// ```text
/// Created ──StartAuction──► Auction ──FinishAuction──► Completed
///                            ▲    │
///                            └────┘ UpdatePrice
/// ```
///
/// Variants are declared in lifecycle order, so `Ord` follows the lifecycle
/// and "never moves backward" is a plain `>=` comparison.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemStatus {
    /// Created but not yet open for bids.
    #[default]
    Created,

    /// Open for bids.
    Auction,

    /// Auction finished (terminal).
    Completed,
}

impl ItemStatus {
    pub fn can_start_auction(&self) -> bool {
        matches!(self, ItemStatus::Created)
    }

    /// Price updates and the finish signal are only accepted while open.
    pub fn is_open(&self) -> bool {
        matches!(self, ItemStatus::Auction)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ItemStatus::Completed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ItemStatus::Created => "CREATED",
            ItemStatus::Auction => "AUCTION",
            ItemStatus::Completed => "COMPLETED",
        }
    }
}

impl std::fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown status name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown item status: {0}")]
pub struct UnknownStatus(pub String);

impl std::str::FromStr for ItemStatus {
    type Err = UnknownStatus;

    /// Case-insensitive, so query strings may say `auction` or `AUCTION`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "CREATED" => Ok(ItemStatus::Created),
            "AUCTION" => Ok(ItemStatus::Auction),
            "COMPLETED" => Ok(ItemStatus::Completed),
            _ => Err(UnknownStatus(s.to_string())),
        }
    }
}
