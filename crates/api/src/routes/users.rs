//! Per-user item listing backed by the summary projection.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use common::UserId;
use domain::ItemStatus;
use event_store::EventStore;
use projections::{DEFAULT_PAGE_SIZE, ItemSummary, PaginatedSequence};
use serde::Deserialize;

use super::items::AppState;
use crate::error::ApiError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemsQuery {
    pub status: Option<String>,
    pub page_no: Option<usize>,
    pub page_size: Option<usize>,
}

/// GET /users/:id/items?status=&pageNo=&pageSize= — the user's items in one
/// status, newest first. Pages are zero based.
#[tracing::instrument(skip(state))]
pub async fn items<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    Query(query): Query<ItemsQuery>,
) -> Result<Json<PaginatedSequence<ItemSummary>>, ApiError> {
    let owner_id = id
        .parse::<UserId>()
        .map_err(|e| ApiError::BadRequest(format!("Invalid user id: {e}")))?;
    let status = query
        .status
        .as_deref()
        .ok_or_else(|| ApiError::BadRequest("status query parameter is required".to_string()))?
        .parse::<ItemStatus>()
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    // Run catch-up so the listing includes the caller's latest writes. The
    // view tolerates lag, so a stalled projector still gets the stored rows.
    if let Err(e) = state.projection_processor.run_catch_up().await {
        tracing::warn!(error = %e, "catch-up before listing failed, serving stored summaries");
    }

    let page = state
        .summaries
        .get_items(
            owner_id,
            status,
            query.page_no.unwrap_or(0),
            query.page_size.unwrap_or(DEFAULT_PAGE_SIZE),
        )
        .await?;

    Ok(Json(page))
}
