//! Token authentication.
//!
//! Clients present `Authorization: Token <key>` (the `Bearer` keyword is also
//! accepted). Handlers that take an [`AuthUser`] argument are protected: the
//! extractor rejects the request with 401 before the handler runs.

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};
use recipe_core::User;
use tracing::debug;

use crate::{ApiError, AppState};

pub const MSG_NOT_PROVIDED: &str = "Authentication credentials were not provided.";
pub const MSG_INVALID_TOKEN: &str = "Invalid token.";
pub const MSG_INACTIVE: &str = "User inactive or deleted.";
pub const MSG_BAD_HEADER: &str = "Invalid token header.";

const SCHEMES: [&str; 2] = ["Token", "Bearer"];

/// The authenticated requester.
#[derive(Debug, Clone)]
pub struct AuthUser(pub User);

impl AuthUser {
    pub fn id(&self) -> i64 {
        self.0.id
    }
}

/// Pulls the key out of an `Authorization` header value.
///
/// `Ok(None)` means the header uses some other scheme and should be ignored.
pub fn parse_authorization(value: &str) -> Result<Option<&str>, ApiError> {
    let mut parts = value.split_whitespace();
    let Some(scheme) = parts.next() else {
        return Ok(None);
    };
    if !SCHEMES.iter().any(|s| s.eq_ignore_ascii_case(scheme)) {
        return Ok(None);
    }

    match (parts.next(), parts.next()) {
        (Some(key), None) => Ok(Some(key)),
        _ => Err(ApiError::Unauthorized(MSG_BAD_HEADER.to_string())),
    }
}

impl<S> FromRequestParts<S> for AuthUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = AppState::from_ref(state);

        let header = parts
            .headers
            .get(AUTHORIZATION)
            .map(|v| v.to_str())
            .transpose()
            .map_err(|_| ApiError::Unauthorized(MSG_BAD_HEADER.to_string()))?;

        let Some(key) = header.map(parse_authorization).transpose()?.flatten() else {
            return Err(ApiError::Unauthorized(MSG_NOT_PROVIDED.to_string()));
        };

        let user = state
            .db
            .user_for_token(key)
            .await?
            .ok_or_else(|| ApiError::Unauthorized(MSG_INVALID_TOKEN.to_string()))?;

        if !user.is_active {
            debug!(user_id = user.id, "Rejected token for inactive user");
            return Err(ApiError::Unauthorized(MSG_INACTIVE.to_string()));
        }

        Ok(AuthUser(user))
    }
}
