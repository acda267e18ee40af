pub mod health;
pub mod index;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::feedback::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let max_upload_bytes = state.config.max_upload_bytes;

    Router::new()
        .route("/", get(index::index_handler))
        .route("/health", get(health::health_handler))
        .route(
            "/upload",
            post(handlers::handle_upload).layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        .with_state(state)
}
