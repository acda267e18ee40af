use axum::response::Html;

/// Browser client for the upload endpoint.
const INDEX_HTML: &str = include_str!("../../static/index.html");

/// GET /
pub async fn index_handler() -> Html<&'static str> {
    Html(INDEX_HTML)
}
