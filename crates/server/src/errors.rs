use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use linkstash::StoreError;
use linkstash_access::AccessError;
use serde_json::json;
use tracing::error;

/// A custom error type for the server application.
///
/// This enum encapsulates the kinds of errors that can occur within the
/// server, allowing them to be converted into appropriate HTTP responses.
pub enum AppError {
    /// Errors originating from the persistence services.
    Store(StoreError),
    /// Errors originating from the access crate.
    Access(AccessError),
    /// Malformed or rejected client input.
    BadRequest(String),
    /// Generic internal server errors.
    Internal(anyhow::Error),
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        AppError::Store(err)
    }
}

impl From<AccessError> for AppError {
    fn from(err: AccessError) -> Self {
        AppError::Access(err)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status_code, error_message) = match self {
            AppError::Store(err) => match err {
                StoreError::Duplicate => (StatusCode::CONFLICT, err.to_string()),
                StoreError::NotFound => (StatusCode::NOT_FOUND, err.to_string()),
                StoreError::DefaultFolder => (StatusCode::BAD_REQUEST, err.to_string()),
                other => {
                    error!("Store error: {other}");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "An internal server error occurred.".to_string(),
                    )
                }
            },
            AppError::Access(err) => {
                error!("Access error: {err}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal server error occurred.".to_string(),
                )
            }
            AppError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            AppError::Internal(err) => {
                error!("Internal server error: {:?}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal server error occurred.".to_string(),
                )
            }
        };

        let body = Json(json!({
            "success": false,
            "error": error_message,
        }));

        (status_code, body).into_response()
    }
}
