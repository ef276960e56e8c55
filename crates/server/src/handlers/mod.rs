//! # API Route Handlers
//!
//! This module organizes all the Axum route handlers for the
//! `linkstash-server`. The handlers are split into logical sub-modules based
//! on their functionality (e.g., `content_handlers`, `folder_handlers`).

// Sub-modules for different handler categories.
pub mod auth_handlers;
pub mod content_handlers;
pub mod folder_handlers;
pub mod general;
pub mod tag_handlers;
pub mod telegram_handlers;

// Re-export all handlers from the sub-modules to make them easily accessible
// to the router under a single `handlers::` path.
pub use auth_handlers::*;
pub use content_handlers::*;
pub use folder_handlers::*;
pub use general::*;
pub use tag_handlers::*;
pub use telegram_handlers::*;

// Shared items used by multiple handler modules.
use super::{errors::AppError, state::AppState, types::ApiResponse};
use axum::Json;

/// A shared helper to wrap a successful result in the standard `ApiResponse`
/// envelope.
pub(crate) fn wrap_response<T>(data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse {
        success: true,
        data,
    })
}
