//! Health check endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use event_store::EventStore;
use serde::Serialize;

use super::items::AppState;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    /// Offset of the newest committed event, when the log is reachable.
    pub log_offset: Option<i64>,
}

/// GET /health — reports whether the event log answers.
pub async fn check<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> (StatusCode, Json<HealthResponse>) {
    match state.items.handler().store().latest_offset().await {
        Ok(offset) => (
            StatusCode::OK,
            Json(HealthResponse {
                status: "ok",
                log_offset: Some(offset.as_i64()),
            }),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "event log unreachable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse {
                    status: "unavailable",
                    log_offset: None,
                }),
            )
        }
    }
}
