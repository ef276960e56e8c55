//! # Tag and Stats Route Handlers

use super::{wrap_response, AppError, AppState};
use crate::auth::middleware::AuthenticatedUser;
use crate::types::ApiResponse;
use axum::{extract::State, Json};
use linkstash::content::ContentStats;
use serde::Serialize;

#[derive(Serialize)]
pub struct TagWithCount {
    pub id: String,
    pub name: String,
    pub count: u64,
}

/// The handler for `GET /api/tags`: every tag on the user's saved content,
/// most used first.
pub async fn list_tags_handler(
    State(app_state): State<AppState>,
    auth: AuthenticatedUser,
) -> Result<Json<ApiResponse<Vec<TagWithCount>>>, AppError> {
    let tags = app_state
        .contents
        .user_tags(&auth.user.id)
        .await?
        .into_iter()
        .map(|(tag, count)| TagWithCount {
            id: tag.id,
            name: tag.name,
            count,
        })
        .collect();
    Ok(wrap_response(tags))
}

/// The handler for `GET /api/stats`: totals per platform for the dashboard.
pub async fn stats_handler(
    State(app_state): State<AppState>,
    auth: AuthenticatedUser,
) -> Result<Json<ApiResponse<ContentStats>>, AppError> {
    let stats = app_state.contents.stats(&auth.user.id).await?;
    Ok(wrap_response(stats))
}
