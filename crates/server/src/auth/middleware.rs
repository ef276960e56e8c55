//! # Authentication Middleware
//!
//! This module provides the Axum extractor for session-based authentication.
//! The `AuthenticatedUser` extractor validates the `Authorization: Bearer`
//! header against the sessions issued by the login flow, so handlers always
//! receive a resolved `User`.

use axum::{
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use linkstash_access::{get_session, User};
use serde_json::json;
use tracing::{error, warn};

use crate::state::AppState;

/// An Axum extractor that provides the currently authenticated user.
///
/// Requests without a valid, unexpired session token are rejected with a
/// `401 Unauthorized`.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user: User,
    /// The session token the request authenticated with, kept so logout can
    /// destroy exactly this session.
    pub session_token: String,
}

/// A custom rejection type for authentication failures.
///
/// This allows the `FromRequestParts` implementation to return a specific
/// HTTP status code and error message, which Axum then turns into a response.
pub struct AuthError(StatusCode, String);

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        (self.0, Json(json!({ "success": false, "error": self.1 }))).into_response()
    }
}

impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| {
                    AuthError(
                        StatusCode::UNAUTHORIZED,
                        "Missing or malformed Authorization header.".to_string(),
                    )
                })?;

        let session_token = bearer.token().to_string();
        let user = get_session(&state.store.db, &session_token)
            .await
            .map_err(|e| {
                error!("Session lookup failed: {e}");
                AuthError(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Could not verify session.".to_string(),
                )
            })?
            .ok_or_else(|| {
                warn!("Rejected request with invalid or expired session token");
                AuthError(
                    StatusCode::UNAUTHORIZED,
                    "Invalid or expired session.".to_string(),
                )
            })?;

        Ok(AuthenticatedUser {
            user,
            session_token,
        })
    }
}
