//! LLM client, the single point of entry for all generation API calls.
//!
//! No other module may call the Gemini REST API directly.
//! Model: gemini-1.5-flash-latest (baked into the endpoint URL, not selectable per request)

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Malformed response envelope: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("LLM returned empty content")]
    EmptyContent,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<RequestContent<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    role: &'a str,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

/// `generateContent` response envelope. Every level may be absent or null.
#[derive(Debug, Deserialize)]
pub struct LlmResponse {
    #[serde(default)]
    pub candidates: Option<Vec<Candidate>>,
}

#[derive(Debug, Deserialize)]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
pub struct CandidateContent {
    #[serde(default)]
    pub parts: Option<Vec<CandidatePart>>,
}

#[derive(Debug, Deserialize)]
pub struct CandidatePart {
    #[serde(default)]
    pub text: Option<String>,
}

impl LlmResponse {
    /// Text of the first part of the first candidate, if the whole path is present.
    pub fn text(&self) -> Option<&str> {
        self.candidates
            .as_deref()?
            .first()?
            .content
            .as_ref()?
            .parts
            .as_deref()?
            .first()?
            .text
            .as_deref()
    }
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    error: GeminiErrorBody,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorBody {
    message: String,
}

/// Anything that turns a prompt into raw model text.
///
/// Carried in `AppState` behind an `Arc<dyn CompletionModel>` so the upload
/// pipeline can run against a canned backend.
#[async_trait]
pub trait CompletionModel: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, LlmError>;
}

/// The single LLM client used by the service.
/// Wraps the Gemini `generateContent` endpoint. One request per call, no retries.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    api_key: String,
    endpoint: String,
}

impl LlmClient {
    pub fn new(api_key: String, endpoint: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            endpoint,
        }
    }

    /// Makes a raw call to the generation API, returning the full response envelope.
    pub async fn call(&self, prompt: &str) -> Result<LlmResponse, LlmError> {
        let request_body = GenerateRequest {
            contents: vec![RequestContent {
                role: "user",
                parts: vec![RequestPart { text: prompt }],
            }],
        };

        let response = self
            .client
            .post(&self.endpoint)
            .query(&[("key", &self.api_key)])
            .json(&request_body)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            warn!("LLM API returned {}: {}", status, body);
            let message = serde_json::from_str::<GeminiError>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl CompletionModel for LlmClient {
    async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        let response = self.call(prompt).await?;
        let text = response.text().ok_or(LlmError::EmptyContent)?;
        debug!("LLM call succeeded: reply_chars={}", text.len());
        Ok(text.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use axum::{extract::Query, http::StatusCode, routing::post, Json, Router};
    use serde_json::{json, Value};
    use std::collections::HashMap;

    /// Serves `app` on an ephemeral local port and returns its generate URL.
    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}/generate")
    }

    fn client_for(endpoint: String) -> LlmClient {
        LlmClient::new("test-key".to_string(), endpoint)
    }

    #[test]
    fn test_text_walks_full_path() {
        let resp: LlmResponse = serde_json::from_value(json!({
            "candidates": [{ "content": { "parts": [{ "text": "hello" }] } }]
        }))
        .unwrap();
        assert_eq!(resp.text(), Some("hello"));
    }

    #[test]
    fn test_text_tolerates_missing_and_null_levels() {
        for envelope in [
            json!({}),
            json!({ "candidates": null }),
            json!({ "candidates": [] }),
            json!({ "candidates": [{}] }),
            json!({ "candidates": [{ "content": { "parts": [] } }] }),
            json!({ "candidates": [{ "content": { "parts": [{ "text": null }] } }] }),
        ] {
            let resp: LlmResponse = serde_json::from_value(envelope.clone()).unwrap();
            assert_eq!(resp.text(), None, "envelope: {envelope}");
        }
    }

    #[tokio::test]
    async fn test_complete_sends_prompt_and_key() {
        let app = Router::new().route(
            "/generate",
            post(
                |Query(q): Query<HashMap<String, String>>, Json(body): Json<Value>| async move {
                    assert_eq!(q.get("key").map(String::as_str), Some("test-key"));
                    assert_eq!(body["contents"][0]["role"], "user");
                    let prompt = body["contents"][0]["parts"][0]["text"].as_str().unwrap();
                    Json(json!({
                        "candidates": [{ "content": { "parts": [{ "text": format!("echo:{prompt}") }] } }]
                    }))
                },
            ),
        );
        let client = client_for(serve(app).await);

        let text = client.complete("review this").await.unwrap();
        assert_eq!(text, "echo:review this");
    }

    #[tokio::test]
    async fn test_api_error_message_is_extracted() {
        let app = Router::new().route(
            "/generate",
            post(|| async {
                (
                    StatusCode::FORBIDDEN,
                    Json(json!({ "error": { "code": 403, "message": "API key not valid" } })),
                )
            }),
        );
        let client = client_for(serve(app).await);

        match client.complete("x").await {
            Err(LlmError::Api { status, message }) => {
                assert_eq!(status, 403);
                assert_eq!(message, "API key not valid");
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_server_error_is_not_retried() {
        let hits = std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let counter = hits.clone();
        let app = Router::new().route(
            "/generate",
            post(move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                    (StatusCode::SERVICE_UNAVAILABLE, "overloaded")
                }
            }),
        );
        let client = client_for(serve(app).await);

        let err = client.complete("x").await.unwrap_err();
        assert!(matches!(err, LlmError::Api { status: 503, ref message } if message == "overloaded"));
        assert_eq!(hits.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_missing_text_is_empty_content() {
        let app = Router::new().route(
            "/generate",
            post(|| async { Json(json!({ "candidates": [] })) }),
        );
        let client = client_for(serve(app).await);

        assert!(matches!(
            client.complete("x").await,
            Err(LlmError::EmptyContent)
        ));
    }

    #[tokio::test]
    async fn test_non_json_envelope_is_parse_error() {
        let app = Router::new().route("/generate", post(|| async { "<html>oops</html>" }));
        let client = client_for(serve(app).await);

        assert!(matches!(client.complete("x").await, Err(LlmError::Parse(_))));
    }

    #[tokio::test]
    async fn test_connection_refused_is_http_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let client = client_for(format!("http://{addr}/generate"));

        assert!(matches!(client.complete("x").await, Err(LlmError::Http(_))));
    }
}
