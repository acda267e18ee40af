//! PDF text extraction for uploaded resumes.
//!
//! The upload is written to a uniquely-named temp file inside the upload directory,
//! extracted on the blocking pool, and the file is removed whether or not extraction
//! succeeds.

use std::path::PathBuf;

use async_trait::async_trait;
use bytes::Bytes;
use tracing::debug;

use crate::errors::AppError;

/// A single uploaded file as read from the multipart body.
#[derive(Debug, Clone)]
pub struct PdfUpload {
    pub file_name: String,
    pub data: Bytes,
}

/// Turns an uploaded document into plain resume text.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    async fn extract(&self, upload: PdfUpload) -> Result<String, AppError>;
}

/// Extracts text with `pdf-extract` via a temp file in `upload_dir`.
pub struct PdfTextExtractor {
    upload_dir: PathBuf,
}

impl PdfTextExtractor {
    pub fn new(upload_dir: PathBuf) -> Self {
        Self { upload_dir }
    }
}

#[async_trait]
impl TextExtractor for PdfTextExtractor {
    async fn extract(&self, upload: PdfUpload) -> Result<String, AppError> {
        let upload_dir = self.upload_dir.clone();

        // File I/O and PDF parsing are both blocking.
        tokio::task::spawn_blocking(move || extract_via_temp_file(upload_dir, upload))
            .await
            .map_err(|e| {
                AppError::Internal(anyhow::anyhow!("spawn_blocking failed in extraction: {e}"))
            })?
    }
}

fn extract_via_temp_file(upload_dir: PathBuf, upload: PdfUpload) -> Result<String, AppError> {
    use std::io::Write;

    let mut file = tempfile::Builder::new()
        .prefix("resume-")
        .suffix(".pdf")
        .tempfile_in(&upload_dir)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("failed to create temp file: {e}")))?;
    debug!(
        "Stored upload '{}' at {}",
        upload.file_name,
        file.path().display()
    );

    file.write_all(&upload.data)
        .and_then(|_| file.flush())
        .map_err(|e| AppError::Internal(anyhow::anyhow!("failed to write temp file: {e}")))?;

    let extracted = pdf_extract::extract_text(file.path()).map_err(|e| {
        AppError::Extraction(format!(
            "Failed to extract text from '{}': {e}",
            upload.file_name
        ))
    });

    // Remove now; `NamedTempFile` would also remove it on drop if this fails.
    if let Err(e) = file.close() {
        tracing::warn!("Failed to delete temp upload: {e}");
    }

    extracted
}
