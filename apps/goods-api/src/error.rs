//! Error types for the Goods API.
//!
//! Every handler returns `Result<_, ApiError>`. The status code comes from
//! the wrapped [`CoreError`]; the body is always `{"error": "<message>"}`.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use goods_core::{CoreError, ValidationError};
use serde_json::json;
use tracing::error;

use crate::auth::AuthError;

/// Body used for every 500; internal details stay in the logs.
pub const INTERNAL_MESSAGE: &str = "Internal Server Error";

/// HTTP-facing error.
#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub struct ApiError(pub CoreError);

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            CoreError::Validation(_) | CoreError::SamePriority { .. } => StatusCode::BAD_REQUEST,
            CoreError::GoodNotFound { .. } => StatusCode::NOT_FOUND,
            CoreError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            CoreError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        ApiError(err)
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError(CoreError::Validation(err))
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        ApiError(CoreError::Unauthorized(err.to_string()))
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError(CoreError::Validation(ValidationError::InvalidFormat {
            field: "body".to_string(),
            reason: rejection.body_text(),
        }))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self.0 {
            CoreError::Internal(detail) => {
                error!(error = %detail, "request failed");
                INTERNAL_MESSAGE.to_string()
            }
            other => other.to_string(),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
