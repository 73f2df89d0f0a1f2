//! Ingest endpoint for the external bidding feed.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use event_store::EventStore;

use super::items::AppState;
use crate::error::ApiError;

/// POST /bid-events — queue one raw bid notification for the bid adapter.
///
/// Kinds the item service does not handle are accepted and later ignored.
#[tracing::instrument(skip(state, body), fields(bytes = body.len()))]
pub async fn publish<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    body: Bytes,
) -> Result<StatusCode, ApiError> {
    state.bid_feed.publish_json(&body)?;
    Ok(StatusCode::ACCEPTED)
}
