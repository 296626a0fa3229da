//! Error handling for the application

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::quotes::responses::ErrorResponse;
use crate::quotes::services::QuoteError;
use crate::quotes::store::StoreError;

/// Application error type
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Unprocessable(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl From<QuoteError> for AppError {
    fn from(err: QuoteError) -> Self {
        match err {
            QuoteError::QuoteNotFound(_) | QuoteError::LineItemNotFound { .. } => {
                AppError::NotFound(err.to_string())
            }
            QuoteError::RegionNotFound(_) | QuoteError::Validation(_) => {
                AppError::Unprocessable(err.to_string())
            }
            QuoteError::InvalidTransition(_) | QuoteError::NotEditable { .. } => {
                AppError::Conflict(err.to_string())
            }
            QuoteError::Store(StoreError::NotFound) => AppError::NotFound(err.to_string()),
            QuoteError::Store(StoreError::Conflict) => AppError::Conflict(err.to_string()),
            QuoteError::Store(store) => AppError::Store(store),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg.clone()),
            AppError::Unprocessable(msg) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "validation_error", msg.clone())
            }
            AppError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg.clone()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg.clone()),
            AppError::Store(e) => {
                tracing::error!("Store error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "store_error", "Store error".to_string())
            }
        };

        let body = ErrorResponse {
            error_type: error_type.to_string(),
            message,
        };

        (status, Json(body)).into_response()
    }
}

/// Body parse failures: malformed JSON is a 400, well-formed JSON with the
/// wrong shape is a 422.
impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        match err.classify() {
            serde_json::error::Category::Data => {
                AppError::Unprocessable(format!("invalid request body: {}", err))
            }
            _ => AppError::BadRequest(format!("malformed JSON body: {}", err)),
        }
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
