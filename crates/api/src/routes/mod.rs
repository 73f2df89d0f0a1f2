//! HTTP route handlers.

pub mod bids;
pub mod health;
pub mod items;
pub mod metrics;
pub mod users;

use common::AggregateId;

use crate::error::ApiError;

/// Parses an item id from a path segment.
pub(crate) fn parse_aggregate_id(id: &str) -> Result<AggregateId, ApiError> {
    id.parse::<AggregateId>()
        .map_err(|e| ApiError::BadRequest(format!("Invalid item id: {e}")))
}
