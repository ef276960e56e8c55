//! # Folder Route Handlers
//!
//! CRUD over a user's folders and their content membership. The default
//! folder is protected; renaming or deleting it is a 400.

use super::{wrap_response, AppError, AppState};
use crate::auth::middleware::AuthenticatedUser;
use crate::types::ApiResponse;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use linkstash::{Folder, SavedContent};
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Deserialize)]
pub struct FolderRequest {
    pub name: String,
}

#[derive(Deserialize)]
pub struct FolderContentRequest {
    pub content_id: String,
}

/// The handler for `POST /api/folders`.
pub async fn create_folder_handler(
    State(app_state): State<AppState>,
    auth: AuthenticatedUser,
    Json(payload): Json<FolderRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Folder>>), AppError> {
    if payload.name.trim().is_empty() {
        return Err(AppError::BadRequest(
            "Folder name must not be empty.".to_string(),
        ));
    }
    let folder = app_state
        .folders
        .create(&auth.user.id, &payload.name)
        .await?;
    Ok((StatusCode::CREATED, wrap_response(folder)))
}

/// The handler for `GET /api/folders`.
pub async fn list_folders_handler(
    State(app_state): State<AppState>,
    auth: AuthenticatedUser,
) -> Result<Json<ApiResponse<Vec<Folder>>>, AppError> {
    let folders = app_state.folders.list(&auth.user.id).await?;
    Ok(wrap_response(folders))
}

/// The handler for `PATCH /api/folders/{id}`.
pub async fn rename_folder_handler(
    State(app_state): State<AppState>,
    auth: AuthenticatedUser,
    Path(folder_id): Path<String>,
    Json(payload): Json<FolderRequest>,
) -> Result<Json<ApiResponse<Folder>>, AppError> {
    let folder = app_state
        .folders
        .rename(&folder_id, &auth.user.id, &payload.name)
        .await?;
    Ok(wrap_response(folder))
}

/// The handler for `DELETE /api/folders/{id}`.
pub async fn delete_folder_handler(
    State(app_state): State<AppState>,
    auth: AuthenticatedUser,
    Path(folder_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    app_state.folders.delete(&folder_id, &auth.user.id).await?;
    Ok(Json(json!({ "success": true, "data": "deleted" })))
}

/// The handler for `GET /api/folders/{id}/contents`.
pub async fn folder_contents_handler(
    State(app_state): State<AppState>,
    auth: AuthenticatedUser,
    Path(folder_id): Path<String>,
) -> Result<Json<ApiResponse<Vec<SavedContent>>>, AppError> {
    let contents = app_state
        .folders
        .contents(&folder_id, &auth.user.id)
        .await?;
    Ok(wrap_response(contents))
}

/// The handler for `POST /api/folders/{id}/contents`.
pub async fn add_folder_content_handler(
    State(app_state): State<AppState>,
    auth: AuthenticatedUser,
    Path(folder_id): Path<String>,
    Json(payload): Json<FolderContentRequest>,
) -> Result<Json<Value>, AppError> {
    app_state
        .folders
        .add_content(&folder_id, &auth.user.id, &payload.content_id)
        .await?;
    Ok(Json(json!({ "success": true, "data": "added" })))
}

/// The handler for `DELETE /api/folders/{id}/contents/{content_id}`.
pub async fn remove_folder_content_handler(
    State(app_state): State<AppState>,
    auth: AuthenticatedUser,
    Path((folder_id, content_id)): Path<(String, String)>,
) -> Result<Json<Value>, AppError> {
    app_state
        .folders
        .remove_content(&folder_id, &auth.user.id, &content_id)
        .await?;
    Ok(Json(json!({ "success": true, "data": "removed" })))
}
