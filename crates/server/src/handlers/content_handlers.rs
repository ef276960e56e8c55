//! # Content Route Handlers
//!
//! The save endpoint plus CRUD and search over the user's saved content.

use super::{wrap_response, AppError, AppState};
use crate::auth::middleware::AuthenticatedUser;
use crate::types::ApiResponse;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use linkstash::save::{codes, SaveOutcome, SaveRequest};
use linkstash::{ContentFilters, ContentUpdate, Page, Pagination, Platform, SavedContent};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

#[derive(Deserialize)]
pub struct SaveContentRequest {
    pub url: String,
    pub memo: Option<String>,
}

/// The handler for `POST /api/contents`: the main save pipeline.
///
/// The outcome's pipeline code picks the HTTP status: a fresh save is a 201,
/// a duplicate a 409, an invalid URL a 400.
pub async fn save_content_handler(
    State(app_state): State<AppState>,
    auth: AuthenticatedUser,
    Json(payload): Json<SaveContentRequest>,
) -> (StatusCode, Json<SaveOutcome>) {
    info!(user_id = %auth.user.id, url = %payload.url, "Received save request");
    let outcome = app_state
        .orchestrator
        .save(&SaveRequest {
            url: payload.url,
            user_id: Some(auth.user.id),
            telegram_user_id: None,
            telegram_username: None,
            memo: payload.memo,
        })
        .await;

    let status = if outcome.success {
        StatusCode::CREATED
    } else {
        match outcome.code {
            Some(codes::DUPLICATE) => StatusCode::CONFLICT,
            Some(codes::INVALID_URL) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    };
    (status, Json(outcome))
}

#[derive(Deserialize, Default)]
pub struct ListParams {
    pub platform: Option<String>,
    pub search: Option<String>,
    /// Comma-separated tag names.
    pub tags: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl ListParams {
    fn filters(&self) -> Result<ContentFilters, AppError> {
        let platform = match self.platform.as_deref() {
            Some(name) => Some(
                Platform::from_name(name)
                    .ok_or_else(|| AppError::BadRequest(format!("Unknown platform '{name}'")))?,
            ),
            None => None,
        };
        let tags = self
            .tags
            .as_deref()
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        Ok(ContentFilters {
            platform,
            search: self.search.clone(),
            tags,
        })
    }

    fn pagination(&self) -> Pagination {
        let defaults = Pagination::default();
        Pagination {
            page: self.page.unwrap_or(defaults.page),
            limit: self.limit.unwrap_or(defaults.limit),
        }
    }
}

/// The handler for `GET /api/contents`.
pub async fn list_contents_handler(
    State(app_state): State<AppState>,
    auth: AuthenticatedUser,
    Query(params): Query<ListParams>,
) -> Result<Json<ApiResponse<Page<SavedContent>>>, AppError> {
    let page = app_state
        .contents
        .list(&auth.user.id, &params.filters()?, params.pagination())
        .await?;
    Ok(wrap_response(page))
}

#[derive(Deserialize)]
pub struct SearchParams {
    pub q: String,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

/// The handler for `GET /api/search`: full-text search over the user's
/// saved content.
pub async fn search_handler(
    State(app_state): State<AppState>,
    auth: AuthenticatedUser,
    Query(params): Query<SearchParams>,
) -> Result<Json<ApiResponse<Page<SavedContent>>>, AppError> {
    let defaults = Pagination::default();
    let page = app_state
        .contents
        .list(
            &auth.user.id,
            &ContentFilters {
                search: Some(params.q),
                ..Default::default()
            },
            Pagination {
                page: params.page.unwrap_or(defaults.page),
                limit: params.limit.unwrap_or(defaults.limit),
            },
        )
        .await?;
    Ok(wrap_response(page))
}

/// The handler for `GET /api/contents/{id}`.
pub async fn get_content_handler(
    State(app_state): State<AppState>,
    auth: AuthenticatedUser,
    Path(content_id): Path<String>,
) -> Result<Json<ApiResponse<SavedContent>>, AppError> {
    let content = app_state.contents.get(&content_id, &auth.user.id).await?;
    Ok(wrap_response(content))
}

/// The handler for `PATCH /api/contents/{id}`.
pub async fn update_content_handler(
    State(app_state): State<AppState>,
    auth: AuthenticatedUser,
    Path(content_id): Path<String>,
    Json(payload): Json<ContentUpdate>,
) -> Result<Json<ApiResponse<SavedContent>>, AppError> {
    let content = app_state
        .contents
        .update(&content_id, &auth.user.id, &payload)
        .await?;
    Ok(wrap_response(content))
}

/// The handler for `DELETE /api/contents/{id}`.
pub async fn delete_content_handler(
    State(app_state): State<AppState>,
    auth: AuthenticatedUser,
    Path(content_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    app_state
        .contents
        .delete(&content_id, &auth.user.id)
        .await?;
    Ok(Json(json!({ "success": true, "data": "deleted" })))
}
