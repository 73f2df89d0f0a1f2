//! Item command and query endpoints.

use std::sync::Arc;
use std::time::Duration;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use bidding::InMemoryBidFeed;
use chrono::{DateTime, Utc};
use common::{AggregateId, UserId};
use domain::{CreateItem, Item, ItemDraft, ItemService, ItemStatus, Price, StartAuction};
use event_store::{EventEnvelope, EventStore, Offset};
use projections::{
    InMemoryCheckpointStore, InMemorySummaryStore, ItemSummaryProjection, ProjectionProcessor,
};
use serde::{Deserialize, Serialize};

use super::parse_aggregate_id;
use crate::error::ApiError;
use crate::extract::CurrentUser;

/// Shared application state accessible from all handlers.
pub struct AppState<S: EventStore> {
    pub items: Arc<ItemService<S>>,
    pub summaries: ItemSummaryProjection<InMemorySummaryStore>,
    pub projection_processor: Arc<ProjectionProcessor<S, InMemoryCheckpointStore>>,
    /// Inbound bid notifications, drained by the bid adapter.
    pub bid_feed: InMemoryBidFeed,
}

/// Page size of the item event feed when the caller gives none.
pub const DEFAULT_FEED_LIMIT: usize = 100;
/// Largest page the item event feed returns.
pub const MAX_FEED_LIMIT: usize = 1000;

// -- Request types --

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateItemRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub currency_id: String,
    pub increment: i64,
    pub reserve_price: i64,
    /// In seconds.
    pub auction_duration: u64,
}

#[derive(Debug, Deserialize)]
pub struct FeedQuery {
    /// Offset of the last event the caller has seen.
    pub after: Option<i64>,
    pub limit: Option<usize>,
}

// -- Response types --

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemResponse {
    pub id: AggregateId,
    pub creator: Option<UserId>,
    pub title: String,
    pub description: String,
    pub currency_id: String,
    pub increment: Price,
    pub reserve_price: Price,
    pub price: Price,
    pub status: ItemStatus,
    /// In seconds.
    pub auction_duration: u64,
    pub auction_start: Option<DateTime<Utc>>,
    pub auction_end: Option<DateTime<Utc>>,
    pub auction_winner: Option<UserId>,
}

impl ItemResponse {
    fn new(id: AggregateId, item: &Item) -> Self {
        Self {
            id,
            creator: item.creator_id(),
            title: item.title().to_string(),
            description: item.description().to_string(),
            currency_id: item.currency_id().to_string(),
            increment: item.price_increment(),
            reserve_price: item.reserve_price(),
            price: item.price(),
            status: item.status(),
            auction_duration: item.auction_duration().as_secs(),
            auction_start: item.auction_start(),
            auction_end: item.auction_end(),
            auction_winner: item.winner(),
        }
    }
}

/// Response type for event envelope data.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventEnvelopeResponse {
    pub event_id: String,
    pub event_type: String,
    pub item_id: AggregateId,
    pub version: i64,
    pub offset: i64,
    pub timestamp: DateTime<Utc>,
    pub payload: serde_json::Value,
}

impl From<EventEnvelope> for EventEnvelopeResponse {
    fn from(e: EventEnvelope) -> Self {
        Self {
            event_id: e.event_id.to_string(),
            event_type: e.event_type,
            item_id: e.aggregate_id,
            version: e.version.as_i64(),
            offset: e.offset.as_i64(),
            timestamp: e.timestamp,
            payload: e.payload,
        }
    }
}

// -- Handlers --

/// POST /items — create an item owned by the caller.
#[tracing::instrument(skip(state, req), fields(creator = %creator))]
pub async fn create<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(creator): CurrentUser,
    Json(req): Json<CreateItemRequest>,
) -> Result<(StatusCode, Json<ItemResponse>), ApiError> {
    let draft = ItemDraft {
        id: AggregateId::new(),
        creator_id: creator,
        title: req.title,
        description: req.description,
        currency_id: req.currency_id,
        reserve_price: Price::new(req.reserve_price),
        price_increment: Price::new(req.increment),
        auction_duration: Duration::from_secs(req.auction_duration),
    };
    let item_id = draft.id;

    let result = state.items.create_item(CreateItem::new(draft)).await?;

    Ok((
        StatusCode::CREATED,
        Json(ItemResponse::new(item_id, &result.aggregate)),
    ))
}

/// GET /items/:id — load an item by replaying its events.
#[tracing::instrument(skip(state))]
pub async fn get<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<ItemResponse>, ApiError> {
    let item_id = parse_aggregate_id(&id)?;
    let item = state
        .items
        .get_item(item_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Item {id} not found")))?;

    Ok(Json(ItemResponse::new(item_id, &item)))
}

/// POST /items/:id/start — start the auction; only the creator may.
///
/// Starting an auction that already started returns the item unchanged.
#[tracing::instrument(skip(state), fields(requester = %requester))]
pub async fn start<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    CurrentUser(requester): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<ItemResponse>, ApiError> {
    let item_id = parse_aggregate_id(&id)?;
    let result = state
        .items
        .start_auction(StartAuction::new(item_id, requester))
        .await?;

    Ok(Json(ItemResponse::new(item_id, &result.aggregate)))
}

/// GET /items/:id/events — the committed history of an item.
#[tracing::instrument(skip(state))]
pub async fn events<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<EventEnvelopeResponse>>, ApiError> {
    let item_id = parse_aggregate_id(&id)?;
    let envelopes = state.items.get_item_events(item_id).await?;
    if envelopes.is_empty() {
        return Err(ApiError::NotFound(format!("Item {id} not found")));
    }

    Ok(Json(envelopes.into_iter().map(Into::into).collect()))
}

/// GET /items/events?after=&limit= — item events committed after `after`,
/// in log order. Callers pass the offset of the last event they read.
#[tracing::instrument(skip(state))]
pub async fn feed<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Query(query): Query<FeedQuery>,
) -> Result<Json<Vec<EventEnvelopeResponse>>, ApiError> {
    let after = query.after.unwrap_or(0);
    if after < 0 {
        return Err(ApiError::BadRequest("after must not be negative".to_string()));
    }
    let limit = query.limit.unwrap_or(DEFAULT_FEED_LIMIT);
    if limit == 0 {
        return Err(ApiError::BadRequest("limit must be positive".to_string()));
    }

    let envelopes = state
        .items
        .item_events_after(Offset::new(after), limit.min(MAX_FEED_LIMIT))
        .await?;

    Ok(Json(envelopes.into_iter().map(Into::into).collect()))
}
