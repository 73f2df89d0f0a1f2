//! HTTP API server with observability for the auction item service.
//!
//! Provides REST endpoints for item commands, item history, the item event
//! feed, the per-user summary listing and bid feed ingest, with structured
//! logging (tracing) and Prometheus metrics.
//! The projector and the bid event adapter run as background tasks.

pub mod config;
pub mod error;
pub mod extract;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use bidding::{BidEventAdapter, InMemoryBidFeed};
use domain::ItemService;
use event_store::EventStore;
use metrics_exporter_prometheus::PrometheusHandle;
use projections::{
    InMemoryCheckpointStore, InMemorySummaryStore, ItemSummaryProjection, Projection,
    ProjectionProcessor,
};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use config::Config;
pub use routes::items::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: EventStore + Clone + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check::<S>))
        .route("/items", post(routes::items::create::<S>))
        .route("/items/events", get(routes::items::feed::<S>))
        .route("/items/{id}", get(routes::items::get::<S>))
        .route("/items/{id}/start", post(routes::items::start::<S>))
        .route("/items/{id}/events", get(routes::items::events::<S>))
        .route("/users/{id}/items", get(routes::users::items::<S>))
        .route("/bid-events", post(routes::bids::publish::<S>))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Wires the item service, the summary projection with its processor, and
/// the bid adapter over one event store.
pub fn create_default_state<S: EventStore + Clone + 'static>(
    event_store: S,
    config: &Config,
) -> (Arc<AppState<S>>, Arc<BidEventAdapter<S>>) {
    let items = Arc::new(ItemService::with_timeout(
        event_store.clone(),
        config.command_timeout,
    ));

    let summaries = ItemSummaryProjection::new(InMemorySummaryStore::new());
    let mut processor = ProjectionProcessor::new(event_store, InMemoryCheckpointStore::new())
        .with_partitions(config.projection_partitions)
        .with_retry(config.retry_policy())
        .with_poll_interval(config.projection_poll_interval);
    processor.register(Box::new(summaries.clone()) as Box<dyn Projection>);

    let adapter =
        Arc::new(BidEventAdapter::new(Arc::clone(&items)).with_retry(config.retry_policy()));

    let state = Arc::new(AppState {
        items,
        summaries,
        projection_processor: Arc::new(processor),
        bid_feed: InMemoryBidFeed::new(),
    });

    (state, adapter)
}

/// Starts the projector loop and the bid adapter loop. Both stop when
/// `shutdown` turns true.
pub fn spawn_workers<S: EventStore + Clone + 'static>(
    state: &Arc<AppState<S>>,
    adapter: Arc<BidEventAdapter<S>>,
    shutdown: watch::Receiver<bool>,
) -> Vec<JoinHandle<()>> {
    let processor = Arc::clone(&state.projection_processor);
    let projector_shutdown = shutdown.clone();
    let projector = tokio::spawn(async move { processor.run(projector_shutdown).await });

    let feed = state.bid_feed.clone();
    let bids = tokio::spawn(async move { adapter.run(&feed, shutdown).await });

    vec![projector, bids]
}
