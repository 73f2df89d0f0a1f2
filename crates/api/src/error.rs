//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use bidding::BiddingError;
use domain::{DomainError, ErrorKind};
use event_store::EventStoreError;
use projections::ProjectionError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Resource not found.
    #[error("{0}")]
    NotFound(String),
    /// Bad request from the client.
    #[error("{0}")]
    BadRequest(String),
    /// No caller identity on a request that needs one.
    #[error("{0}")]
    Unauthorized(String),
    /// Domain logic error.
    #[error(transparent)]
    Domain(#[from] DomainError),
    /// Read-side error.
    #[error(transparent)]
    Projection(#[from] ProjectionError),
    /// Bid feed ingest error.
    #[error(transparent)]
    Bidding(#[from] BiddingError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::Domain(err) => domain_error_to_response(err),
            ApiError::Projection(err) => projection_error_to_response(err),
            ApiError::Bidding(err) => bidding_error_to_response(err),
        };

        if status.is_server_error() {
            tracing::error!(%status, error = %message, "request failed");
        }

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

fn domain_error_to_response(err: DomainError) -> (StatusCode, String) {
    let status = match &err {
        DomainError::Item(item_err) => match item_err.kind() {
            ErrorKind::Validation => StatusCode::BAD_REQUEST,
            ErrorKind::Authorization => StatusCode::FORBIDDEN,
        },
        DomainError::ItemNotFound(_) => StatusCode::NOT_FOUND,
        DomainError::EventStore(EventStoreError::ConcurrencyConflict { .. }) => {
            StatusCode::CONFLICT
        }
        DomainError::Timeout { .. } => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, err.to_string())
}

fn projection_error_to_response(err: ProjectionError) -> (StatusCode, String) {
    let status = match &err {
        ProjectionError::InvalidPageSize => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, err.to_string())
}

fn bidding_error_to_response(err: BiddingError) -> (StatusCode, String) {
    let status = match &err {
        BiddingError::Decode(_) => StatusCode::BAD_REQUEST,
        BiddingError::FeedClosed => StatusCode::SERVICE_UNAVAILABLE,
        BiddingError::Domain(_) | BiddingError::UnknownDelivery(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, err.to_string())
}
