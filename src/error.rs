//! Error types for EAIsy Mail.

/// Top-level error type for wiring services at startup.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Delivery error: {0}")]
    Delivery(#[from] DeliveryError),

    #[error("Template error: {0}")]
    Template(#[from] TemplateError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// LLM provider errors.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Provider {provider} request failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    /// The provider answered without any usable text.
    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },
}

/// A required input was missing or empty. Raised before any external call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{0} is required")]
    MissingField(&'static str),

    #[error("Email body required")]
    EmailBodyRequired,

    #[error("Translated {0} is required")]
    MissingTranslation(&'static str),
}

/// Failures of the draft and translation extractors.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The model answered, but not with the JSON object we asked for.
    #[error("Malformed model output: {reason}")]
    MalformedModelOutput { reason: String, raw: String },

    #[error("External service error: {0}")]
    ExternalService(#[from] LlmError),
}

/// Failures while composing or dispatching the outbound message.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Failed to stage attachment {name}: {source}")]
    Staging {
        name: String,
        source: std::io::Error,
    },

    #[error("Failed to build email: {reason}")]
    Build { reason: String },

    #[error("SMTP send failed: {reason}")]
    Transport { reason: String },
}

/// Template configuration store errors.
#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: std::path::PathBuf,
        source: std::io::Error,
    },

    #[error("Template JSON error in {path}: {source}")]
    Json {
        path: std::path::PathBuf,
        source: serde_json::Error,
    },
}

/// Result type alias for the service.
pub type Result<T> = std::result::Result<T, Error>;
