use std::sync::Arc;

use crate::config::Config;
use crate::extraction::TextExtractor;
use crate::feedback::FeedbackNormalizer;

/// Shared application state injected into all route handlers via Axum extractors.
/// Nothing in here is mutated per request.
#[derive(Clone)]
pub struct AppState {
    pub feedback: FeedbackNormalizer,
    /// Pluggable extractor. Default: PdfTextExtractor over `config.upload_dir`.
    pub extractor: Arc<dyn TextExtractor>,
    pub config: Config,
}
