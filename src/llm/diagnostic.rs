//! Operator-facing detail mined from provider errors.
//!
//! OpenAI and Anthropic both answer failed requests with a JSON body shaped
//! like `{"error": {"message", "type", "code", "param"}}`. rig surfaces that
//! body inside its error text, so we look for the first JSON object there.

use serde_json::Value;

use crate::error::LlmError;

/// Structured view of a provider failure for logging.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProviderDiagnostic {
    pub provider: Option<String>,
    pub message: String,
    pub code: Option<String>,
    pub kind: Option<String>,
    pub param: Option<String>,
}

impl ProviderDiagnostic {
    pub fn from_llm_error(err: &LlmError) -> Self {
        match err {
            LlmError::RequestFailed { provider, reason }
            | LlmError::InvalidResponse { provider, reason } => {
                let mut diag = Self::from_reason(reason);
                diag.provider = Some(provider.clone());
                diag
            }
        }
    }

    /// Parse a provider error string, keeping the whole text as the message
    /// when no JSON body is embedded.
    pub fn from_reason(reason: &str) -> Self {
        let mut diag = Self {
            message: reason.to_string(),
            ..Self::default()
        };

        let Some(body) = embedded_json(reason) else {
            return diag;
        };
        let error = body.get("error").unwrap_or(&body);

        if let Some(message) = error.get("message").and_then(Value::as_str) {
            diag.message = message.to_string();
        }
        diag.code = scalar(error.get("code"));
        diag.kind = scalar(error.get("type"));
        diag.param = scalar(error.get("param"));
        diag
    }
}

fn embedded_json(text: &str) -> Option<Value> {
    text.match_indices('{').find_map(|(start, _)| {
        serde_json::Deserializer::from_str(&text[start..])
            .into_iter::<Value>()
            .next()
            .and_then(Result::ok)
            .filter(Value::is_object)
    })
}

fn scalar(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
