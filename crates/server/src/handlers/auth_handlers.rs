//! # Auth Route Handlers
//!
//! The login-token redemption flow: the Telegram bot hands the user a
//! single-use code via `/login`, and these endpoints exchange it for a
//! bearer session.

use super::{wrap_response, AppError, AppState};
use crate::auth::middleware::AuthenticatedUser;
use crate::types::ApiResponse;
use axum::{extract::State, http::StatusCode, Json};
use linkstash_access::{create_session, destroy_session, verify_login_token, User};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

#[derive(Deserialize)]
pub struct LoginRequest {
    /// The single-use code issued by the bot's `/login` command.
    pub token: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    /// The bearer session token for subsequent API calls.
    pub session_token: String,
    pub user: User,
}

/// The handler for `POST /api/auth/login`.
///
/// Redeems a login token for a session. An unknown, expired, or already-used
/// token is rejected with a 400.
pub async fn login_handler(
    State(app_state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<ApiResponse<LoginResponse>>, AppError> {
    let Some(user_id) = verify_login_token(&app_state.store.db, &payload.token).await? else {
        return Err(AppError::BadRequest(
            "Invalid or expired login token.".to_string(),
        ));
    };

    let session_token = create_session(&app_state.store.db, &user_id).await?;
    let user = linkstash_access::get_session(&app_state.store.db, &session_token)
        .await?
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("session vanished after creation")))?;

    info!(user_id = %user.id, "Login token redeemed");
    Ok(wrap_response(LoginResponse {
        session_token,
        user,
    }))
}

/// The handler for `POST /api/auth/logout`. Destroys the calling session.
pub async fn logout_handler(
    State(app_state): State<AppState>,
    auth: AuthenticatedUser,
) -> Result<(StatusCode, Json<Value>), AppError> {
    destroy_session(&app_state.store.db, &auth.session_token).await?;
    Ok((StatusCode::OK, Json(json!({ "success": true, "data": "logged out" }))))
}

/// The handler for `GET /api/auth/me`. Returns the authenticated user.
pub async fn me_handler(auth: AuthenticatedUser) -> Json<ApiResponse<User>> {
    wrap_response(auth.user)
}
