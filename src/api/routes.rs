//! Axum handlers for the visitor-facing endpoints.
//!
//! Endpoints:
//! - `POST /api/generate-email`: form answers to English draft
//! - `POST /api/translate-email`: draft to owner-language translation
//! - `POST /api/send-email`: multipart send with attachments
//! - `GET|POST /api/template-config`
//! - `GET /health`

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde::Deserialize;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use super::{ApiError, AppState};
use crate::delivery::{OutgoingEmail, Upload};
use crate::error::ValidationError;
use crate::generation::{DraftEmail, TranslatedEmail};
use crate::template::{FormAnswers, TemplateConfig};

/// Upper bound on a whole multipart send request.
pub const MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

/// Build the service router.
pub fn api_routes(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/generate-email", post(generate_email))
        .route("/api/translate-email", post(translate_email))
        .route(
            "/api/send-email",
            post(send_email).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route(
            "/api/template-config",
            get(get_template_config).post(save_template_config),
        )
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "eaisy-mail",
    }))
}

// ── Generation ──────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    #[serde(default)]
    form_data: FormAnswers,
    #[serde(default)]
    template_config: Option<TemplateConfig>,
}

async fn generate_email(
    State(state): State<AppState>,
    payload: Result<Json<GenerateRequest>, JsonRejection>,
) -> Result<Json<DraftEmail>, ApiError> {
    let Json(req) = payload?;

    // A client-supplied template without a user prompt falls back to the stored one.
    let template = match req.template_config {
        Some(t) if !t.prompt_template.user.trim().is_empty() => t,
        _ => state.templates.get().await,
    };

    let draft = state
        .drafts
        .generate_from_answers(&template, &req.form_data)
        .await?;
    Ok(Json(draft))
}

/// Absent and `null` fields both count as empty.
#[derive(Debug, Deserialize)]
struct TranslateRequest {
    #[serde(default)]
    subject: Option<String>,
    #[serde(default)]
    content: Option<String>,
}

async fn translate_email(
    State(state): State<AppState>,
    payload: Result<Json<TranslateRequest>, JsonRejection>,
) -> Result<Json<TranslatedEmail>, ApiError> {
    let Json(req) = payload?;
    let draft = DraftEmail {
        subject: req.subject.unwrap_or_default(),
        content: req.content.unwrap_or_default(),
    };
    let translation = state.translator.translate(&draft).await?;
    Ok(Json(translation))
}

// ── Delivery ────────────────────────────────────────────────────────────

/// Everything read out of a send request, before validation.
#[derive(Debug, Default)]
struct SendForm {
    subject: String,
    email_body: String,
    subject_translation: Option<String>,
    content_translation: Option<String>,
    reply_to: Option<String>,
    uploads: Vec<Upload>,
}

impl SendForm {
    async fn read(mut multipart: Multipart) -> Result<Self, ApiError> {
        let mut form = Self::default();
        while let Some(field) = multipart.next_field().await.map_err(bad_multipart)? {
            let name = field.name().unwrap_or_default().to_string();
            match name.as_str() {
                "attachments" | "attachments[]" => {
                    let file_name = field
                        .file_name()
                        .filter(|n| !n.is_empty())
                        .unwrap_or("attachment")
                        .to_string();
                    let bytes = field.bytes().await.map_err(bad_multipart)?;
                    form.uploads.push(Upload::new(file_name, bytes.to_vec()));
                }
                "subject" => form.subject = field.text().await.map_err(bad_multipart)?,
                "emailBody" => form.email_body = field.text().await.map_err(bad_multipart)?,
                "subjectTranslation" => {
                    form.subject_translation = Some(field.text().await.map_err(bad_multipart)?)
                }
                "contentTranslation" => {
                    form.content_translation = Some(field.text().await.map_err(bad_multipart)?)
                }
                "replyTo" => form.reply_to = Some(field.text().await.map_err(bad_multipart)?),
                other => warn!(field = other, "Ignoring unknown multipart field"),
            }
        }
        Ok(form)
    }

    /// Decide which kind of message this is. Nothing is staged yet.
    fn into_email(self, language: &str) -> Result<(OutgoingEmail, Vec<Upload>), ApiError> {
        if self.email_body.trim().is_empty() {
            return Err(ApiError::BadRequest(
                ValidationError::EmailBodyRequired.to_string(),
            ));
        }

        let email = match (self.subject_translation, self.content_translation) {
            (Some(subject_translation), Some(content_translation)) => OutgoingEmail::Bilingual {
                draft: DraftEmail {
                    subject: self.subject,
                    content: self.email_body,
                },
                translation: TranslatedEmail {
                    subject_translation,
                    content_translation,
                    language: language.to_string(),
                },
                reply_to: self.reply_to,
            },
            (None, None) => OutgoingEmail::Precomposed {
                subject: self.subject,
                body: self.email_body,
            },
            (None, Some(_)) => {
                return Err(ApiError::BadRequest(
                    ValidationError::MissingTranslation("subject").to_string(),
                ));
            }
            (Some(_), None) => {
                return Err(ApiError::BadRequest(
                    ValidationError::MissingTranslation("content").to_string(),
                ));
            }
        };
        Ok((email, self.uploads))
    }
}

fn bad_multipart(e: axum::extract::multipart::MultipartError) -> ApiError {
    ApiError::BadRequest(format!("Invalid multipart request: {}", e.body_text()))
}

async fn send_email(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<serde_json::Value>, ApiError> {
    let form = SendForm::read(multipart).await?;
    let (email, uploads) = form.into_email(state.translator.language())?;

    let receipt = state.dispatcher.send(email, uploads).await?;
    info!(
        subject = %receipt.subject,
        attachments = receipt.attachments,
        "Send request completed"
    );
    Ok(Json(serde_json::json!({ "message": "Email sent successfully" })))
}

// ── Template configuration ──────────────────────────────────────────────

async fn get_template_config(State(state): State<AppState>) -> Json<TemplateConfig> {
    Json(state.templates.get().await)
}

async fn save_template_config(
    State(state): State<AppState>,
    payload: Result<Json<TemplateConfig>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(config) = payload?;
    if let Err(e) = state.templates.replace(config).await {
        warn!(error = %e, path = %state.templates.path().display(), "Failed to save template config");
        return Err(e.into());
    }
    Ok((
        StatusCode::OK,
        Json(serde_json::json!({ "message": "Template config saved" })),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(subject_t: Option<&str>, content_t: Option<&str>) -> SendForm {
        SendForm {
            subject: "S".into(),
            email_body: "C".into(),
            subject_translation: subject_t.map(String::from),
            content_translation: content_t.map(String::from),
            reply_to: Some("me@example.com".into()),
            uploads: vec![Upload::new("a.txt", b"a".to_vec())],
        }
    }

    #[test]
    fn both_translations_make_a_bilingual_email() {
        let (email, uploads) = form(Some("S2"), Some("C2")).into_email("Chinese").unwrap();
        assert_eq!(uploads.len(), 1);
        match email {
            OutgoingEmail::Bilingual {
                translation,
                reply_to,
                ..
            } => {
                assert_eq!(translation.language, "Chinese");
                assert_eq!(reply_to.as_deref(), Some("me@example.com"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn no_translations_is_precomposed() {
        let (email, _) = form(None, None).into_email("Chinese").unwrap();
        assert!(matches!(email, OutgoingEmail::Precomposed { ref body, .. } if body == "C"));
    }

    #[test]
    fn half_a_translation_is_rejected() {
        let err = form(Some("S2"), None).into_email("Chinese").unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(ref m) if m == "Translated content is required"));
        let err = form(None, Some("C2")).into_email("Chinese").unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(ref m) if m == "Translated subject is required"));
    }

    #[test]
    fn blank_body_is_rejected_first() {
        let mut f = form(Some("S2"), None);
        f.email_body = "   ".into();
        let err = f.into_email("Chinese").unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(ref m) if m == "Email body required"));
    }
}
