//! `Caller` extractor: the identity asserted by the upstream proxy.
//!
//! Toolhub does not authenticate users itself. The proxy in front of it
//! validates the session and forwards the user's ID and email as headers.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use toolhub_core::error::AppError;

use crate::error::ApiError;

/// Header carrying the authenticated user's ID.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Header carrying the authenticated user's email.
pub const USER_EMAIL_HEADER: &str = "x-user-email";

/// Authenticated caller available in handlers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    /// User ID.
    pub user_id: String,
    /// User email.
    pub email: String,
}

impl<S: Send + Sync> FromRequestParts<S> for Caller {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = |name: &str| {
            parts
                .headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(String::from)
        };

        let user_id = header(USER_ID_HEADER)
            .ok_or_else(|| AppError::authentication("Authentication required"))?;
        let email = header(USER_EMAIL_HEADER)
            .ok_or_else(|| AppError::authentication("Authentication required"))?;

        Ok(Caller { user_id, email })
    }
}
