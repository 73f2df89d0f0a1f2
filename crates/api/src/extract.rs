//! Request extractors.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use common::UserId;

use crate::error::ApiError;

/// Name of the header carrying the caller's user id.
pub const USER_ID_HEADER: &str = "User-Id";

/// The authenticated caller, taken from the `User-Id` header.
///
/// Rejects with 401 when the header is missing and 400 when it is not a UUID.
#[derive(Debug, Clone, Copy)]
pub struct CurrentUser(pub UserId);

impl<S: Send + Sync> FromRequestParts<S> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(USER_ID_HEADER)
            .ok_or_else(|| ApiError::Unauthorized(format!("missing {USER_ID_HEADER} header")))?;
        let value = value
            .to_str()
            .map_err(|_| ApiError::BadRequest(format!("{USER_ID_HEADER} is not valid text")))?;
        let user_id = value
            .parse::<UserId>()
            .map_err(|e| ApiError::BadRequest(format!("Invalid {USER_ID_HEADER}: {e}")))?;
        Ok(CurrentUser(user_id))
    }
}
