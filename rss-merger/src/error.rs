use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use interfaces::StoreError;
use serde_json::json;
use thiserror::Error;

use crate::types::SourceError;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

impl AppError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        AppError::BadRequest(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        AppError::NotFound(msg.into())
    }

    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Store(_) => (StatusCode::INTERNAL_SERVER_ERROR, "storage_unavailable"),
            // The one source the user asked about could not be used.
            AppError::Source(e) => (StatusCode::FAILED_DEPENDENCY, e.kind().as_str()),
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        if status.is_server_error() {
            tracing::error!("API Error: {} - {}", status.as_u16(), self);
        } else {
            tracing::warn!("API Error: {} - {}", status.as_u16(), self);
        }

        let body = Json(json!({
            "error": code,
            "message": self.to_string(),
            "status_code": status.as_u16(),
        }));

        (status, body).into_response()
    }
}
