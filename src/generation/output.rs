//! Cleaning and parsing of model output into typed records.

use std::sync::LazyLock;

use regex::Regex;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::GenerationError;

static LEADING_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^```(?:json)?\s*").expect("valid regex"));
static TRAILING_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"```$").expect("valid regex"));
static LEADING_TICKS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^`+").expect("valid regex"));
static TRAILING_TICKS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"`+$").expect("valid regex"));

/// Strip code-fence and backtick wrapping from a model answer.
///
/// Handles ```` ```json ... ``` ````, ```` ``` ... ``` ```` and `` `...` ``.
/// Text without wrapping comes back trimmed and otherwise untouched.
pub fn clean_model_json(raw: &str) -> String {
    let text = raw.trim();
    let text = LEADING_FENCE.replace(text, "");
    let text = TRAILING_FENCE.replace(&text, "");
    let text = LEADING_TICKS.replace(&text, "");
    let text = TRAILING_TICKS.replace(&text, "");
    text.trim().to_string()
}

/// Clean `raw` and parse it as a JSON object of shape `T`.
///
/// Anything that is not a JSON object, or an object missing one of `T`'s
/// required fields, is a [`GenerationError::MalformedModelOutput`].
pub fn parse_model_json<T: DeserializeOwned>(raw: &str) -> Result<T, GenerationError> {
    let cleaned = clean_model_json(raw);

    let value: Value = serde_json::from_str(&cleaned).map_err(|e| malformed(raw, format!("not valid JSON: {e}")))?;
    if !value.is_object() {
        return Err(malformed(raw, "expected a JSON object".to_string()));
    }

    serde_json::from_value(value).map_err(|e| malformed(raw, e.to_string()))
}

fn malformed(raw: &str, reason: String) -> GenerationError {
    GenerationError::MalformedModelOutput {
        reason,
        raw: raw.to_string(),
    }
}
