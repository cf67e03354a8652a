//! HTTP JSON API.

pub mod routes;

pub use routes::api_routes;

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::config::AppConfig;
use crate::delivery::{Dispatcher, SmtpMailer};
use crate::error::{DeliveryError, GenerationError, Result, TemplateError};
use crate::generation::{DraftExtractor, TranslationExtractor};
use crate::llm::{ProviderDiagnostic, create_provider};
use crate::template::TemplateStore;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub drafts: Arc<DraftExtractor>,
    pub translator: Arc<TranslationExtractor>,
    pub dispatcher: Arc<Dispatcher>,
    pub templates: Arc<TemplateStore>,
}

impl AppState {
    /// Wire production services from configuration.
    pub async fn from_config(config: &AppConfig) -> Result<Self> {
        let llm = create_provider(&config.llm)?;
        let mailer = Arc::new(SmtpMailer::new(&config.mail)?);
        let templates = TemplateStore::load(&config.template_path, config.owner.clone()).await?;

        Ok(Self {
            drafts: Arc::new(DraftExtractor::new(llm.clone(), config.owner.clone())),
            translator: Arc::new(TranslationExtractor::new(llm, config.owner.clone())),
            dispatcher: Arc::new(Dispatcher::new(mailer, &config.mail, &config.upload_dir)),
            templates: Arc::new(templates),
        })
    }
}

/// Error returned to HTTP callers: a short message, optional details.
///
/// Full diagnostics are logged where the failure happens; only a summary
/// reaches the visitor.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Generation { details: Option<String> },
    Send,
    TemplateSave,
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Generation { .. } | Self::Send | Self::TemplateSave => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn message(&self) -> &str {
        match self {
            Self::BadRequest(msg) => msg,
            Self::Generation { .. } => "Failed to generate email content",
            Self::Send => "Failed to send email",
            Self::TemplateSave => "Failed to save template config",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut body = serde_json::json!({ "error": self.message() });
        if let Self::Generation {
            details: Some(details),
        } = &self
        {
            body["details"] = serde_json::Value::String(details.clone());
        }
        (self.status(), Json(body)).into_response()
    }
}

impl From<GenerationError> for ApiError {
    fn from(err: GenerationError) -> Self {
        match err {
            GenerationError::Validation(e) => Self::BadRequest(e.to_string()),
            GenerationError::MalformedModelOutput { reason, .. } => Self::Generation {
                details: Some(format!("Model response was not a valid email object: {reason}")),
            },
            GenerationError::ExternalService(e) => Self::Generation {
                details: Some(ProviderDiagnostic::from_llm_error(&e).message),
            },
        }
    }
}

impl From<DeliveryError> for ApiError {
    fn from(err: DeliveryError) -> Self {
        match err {
            DeliveryError::Validation(e) => Self::BadRequest(e.to_string()),
            _ => Self::Send,
        }
    }
}

/// Malformed or mistyped JSON bodies get the same `{error}` shape as any
/// other bad request.
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(format!("Invalid request body: {}", rejection.body_text()))
    }
}

impl From<TemplateError> for ApiError {
    fn from(_: TemplateError) -> Self {
        Self::TemplateSave
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{LlmError, ValidationError};

    #[test]
    fn validation_maps_to_bad_request() {
        let err: ApiError = GenerationError::from(ValidationError::MissingField("Subject")).into();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.message(), "Subject is required");

        let err: ApiError = DeliveryError::from(ValidationError::EmailBodyRequired).into();
        assert_eq!(err.message(), "Email body required");
    }

    #[test]
    fn provider_failure_is_generic_with_details() {
        let err: ApiError = GenerationError::ExternalService(LlmError::RequestFailed {
            provider: "openai".into(),
            reason: r#"{"error": {"message": "model not found", "code": "model_not_found"}}"#.into(),
        })
        .into();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.message(), "Failed to generate email content");
        match err {
            ApiError::Generation { details } => assert_eq!(details.as_deref(), Some("model not found")),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn transport_failure_hides_reason() {
        let err: ApiError = DeliveryError::Transport {
            reason: "535 auth failed for relay@example.com".into(),
        }
        .into();
        assert_eq!(err.message(), "Failed to send email");
    }
}
