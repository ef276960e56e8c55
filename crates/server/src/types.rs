use serde::{Deserialize, Serialize};

/// The standard envelope for successful API responses.
///
/// Failures use the same shape with `success: false` and an `error` string
/// instead of `data`; see `errors::AppError`.
#[derive(Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
}
