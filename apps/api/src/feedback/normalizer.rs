//! Feedback normalization: reduces an untrusted model reply to a `FeedbackResult`.
//!
//! Ordered fallbacks:
//! 1. strip a ```json / ``` fenced block if one is present, then trim
//! 2. parse as a JSON object; on failure surface the text verbatim in `suggestions`
//! 3. if only `suggestions` is set and it is a string, try it as a nested JSON object
//! 4. otherwise read the four keys directly
//!
//! Every path yields a result. Nothing here returns an error.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

/// Placeholder used when the reply carries no text at all.
pub const EMPTY_REPLY_FALLBACK: &str = "See above.";

static JSON_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)```json\s*(.*?)```").expect("valid fence regex"));
static PLAIN_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```\s*(.*?)```").expect("valid fence regex"));

/// The four-field feedback contract returned to the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackResult {
    pub clarity: String,
    pub strengths: String,
    pub gaps: String,
    pub suggestions: String,
}

impl FeedbackResult {
    /// Unstructured reply: everything goes into `suggestions` for a human to read.
    fn verbatim(text: &str) -> Self {
        let suggestions = if text.is_empty() {
            EMPTY_REPLY_FALLBACK.to_string()
        } else {
            text.to_string()
        };
        Self {
            suggestions,
            ..Self::default()
        }
    }

    fn from_object(obj: &Map<String, Value>) -> Self {
        Self {
            clarity: field_text(obj, "clarity"),
            strengths: field_text(obj, "strengths"),
            gaps: field_text(obj, "gaps"),
            suggestions: field_text(obj, "suggestions"),
        }
    }
}

/// What the stripped reply turned out to be.
#[derive(Debug)]
enum ReplyShape<'a> {
    /// Not a JSON object.
    Unparsed(&'a str),
    /// Only a string `suggestions` is set; it may hold the real payload.
    DoubleEncoded(String),
    Structured(Map<String, Value>),
}

/// Normalizes a raw model reply into a `FeedbackResult`. Never fails.
pub fn normalize(raw: &str) -> FeedbackResult {
    let text = strip_fences(raw);

    match classify(text) {
        ReplyShape::Unparsed(text) => {
            warn!("Model reply is not a JSON object; returning it verbatim");
            FeedbackResult::verbatim(text)
        }
        ReplyShape::DoubleEncoded(inner) => match parse_object(&inner) {
            Some(obj) => FeedbackResult::from_object(&obj),
            None => {
                warn!("Nested suggestions payload is not a JSON object; returning it verbatim");
                FeedbackResult::verbatim(&inner)
            }
        },
        ReplyShape::Structured(obj) => FeedbackResult::from_object(&obj),
    }
}

/// Returns the body of the first fenced block (```json preferred), trimmed.
/// Text without fences is only trimmed.
pub fn strip_fences(raw: &str) -> &str {
    JSON_FENCE
        .captures(raw)
        .or_else(|| PLAIN_FENCE.captures(raw))
        .and_then(|caps| caps.get(1))
        .map_or(raw, |m| m.as_str())
        .trim()
}

fn classify(text: &str) -> ReplyShape<'_> {
    let Some(mut obj) = parse_object(text) else {
        return ReplyShape::Unparsed(text);
    };

    let only_suggestions = ["clarity", "strengths", "gaps"]
        .iter()
        .all(|key| !obj.get(*key).is_some_and(is_truthy));

    if only_suggestions && obj.get("suggestions").is_some_and(Value::is_string) {
        if let Some(Value::String(inner)) = obj.remove("suggestions") {
            return ReplyShape::DoubleEncoded(inner);
        }
    }

    ReplyShape::Structured(obj)
}

fn parse_object(text: &str) -> Option<Map<String, Value>> {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(obj)) => Some(obj),
        _ => None,
    }
}

/// Loose truthiness: null, false, 0 and "" count as absent.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Displayable text for a field. Non-strings are serialized rather than dropped.
fn field_text(obj: &Map<String, Value>, key: &str) -> String {
    match obj.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(v) if is_truthy(v) => v.to_string(),
        _ => String::new(),
    }
}
