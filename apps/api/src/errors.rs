use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::llm_client::LlmError;

/// Message shown to the caller for every failure that aborts a request.
const PROCESSING_FAILED: &str = "Failed to process resume";

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
///
/// A malformed model reply is never an `AppError`; the normalizer absorbs it.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    /// Unreadable multipart body; keeps the status the extractor chose (e.g. 413).
    #[error("{message}")]
    Upload { status: StatusCode, message: String },

    #[error("PDF extraction error: {0}")]
    Extraction(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<LlmError> for AppError {
    fn from(e: LlmError) -> Self {
        AppError::Llm(e.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, json!({ "error": msg })),
            AppError::Upload { status, message } => (*status, json!({ "error": message })),
            AppError::Extraction(msg) => {
                tracing::error!("Extraction error: {msg}");
                failed(msg)
            }
            AppError::Llm(msg) => {
                tracing::error!("LLM error: {msg}");
                failed(msg)
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                failed(&e.to_string())
            }
        };

        (status, Json(body)).into_response()
    }
}

fn failed(details: &str) -> (StatusCode, serde_json::Value) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        json!({
            "error": PROCESSING_FAILED,
            "details": details
        }),
    )
}
