//! Axum route handler for the resume upload endpoint.

use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        Multipart, State,
    },
    Json,
};
use serde::Serialize;
use tracing::{debug, info};

use crate::errors::AppError;
use crate::extraction::PdfUpload;
use crate::feedback::normalizer::FeedbackResult;
use crate::state::AppState;

/// Multipart field carrying the PDF.
pub const RESUME_FIELD: &str = "resume";

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub feedback: FeedbackResult,
}

/// POST /upload
///
/// Extracts the uploaded PDF, asks the model for feedback, and returns the
/// normalized four-field result.
pub async fn handle_upload(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>, AppError> {
    let mut multipart = multipart.map_err(|e| AppError::Upload {
        status: e.status(),
        message: e.body_text(),
    })?;

    let upload = read_resume_field(&mut multipart)
        .await?
        .ok_or_else(|| {
            info!("No file uploaded");
            AppError::Validation("No file uploaded".to_string())
        })?;

    info!("Received file: {}", upload.file_name);
    let resume_text = state.extractor.extract(upload).await?;
    info!("Extracted resume text length: {}", resume_text.chars().count());

    info!("Requesting feedback from model");
    let feedback = state.feedback.review(&resume_text).await?;
    debug!("Normalized feedback: {feedback:?}");

    Ok(Json(UploadResponse { feedback }))
}

/// Finds the `resume` field. Other fields are skipped.
///
/// A `resume` field with neither a file name nor content counts as no file,
/// which is what browsers send when the file input is left empty.
async fn read_resume_field(multipart: &mut Multipart) -> Result<Option<PdfUpload>, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(upload_error)?
    {
        if field.name() != Some(RESUME_FIELD) {
            continue;
        }

        let file_name = field.file_name().unwrap_or_default().to_string();
        let data = field
            .bytes()
            .await
            .map_err(upload_error)?;

        if file_name.is_empty() && data.is_empty() {
            return Ok(None);
        }

        let file_name = if file_name.is_empty() {
            "resume.pdf".to_string()
        } else {
            file_name
        };
        return Ok(Some(PdfUpload { file_name, data }));
    }

    Ok(None)
}

fn upload_error(e: MultipartError) -> AppError {
    AppError::Upload {
        status: e.status(),
        message: e.body_text(),
    }
}
