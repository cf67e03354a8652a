//! Translation extractor: renders a draft in the owner's language.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use super::draft::DraftEmail;
use super::output::parse_model_json;
use super::{GENERATION_MAX_TOKENS, GENERATION_TEMPERATURE, log_failure};
use crate::error::{GenerationError, ValidationError};
use crate::llm::provider::{ChatMessage, CompletionRequest, LlmProvider};
use crate::template::OwnerProfile;

/// A draft translated into the owner's language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslatedEmail {
    pub subject_translation: String,
    pub content_translation: String,
    /// Language tag from configuration, not from the model.
    pub language: String,
}

/// Shape the model is asked to produce.
#[derive(Debug, Deserialize)]
struct TranslationPayload {
    #[serde(alias = "subjectTranslation")]
    subject_translation: String,
    #[serde(alias = "contentTranslation")]
    content_translation: String,
}

/// Translates drafts into the configured owner language.
///
/// Target language and the owner's localized name come from configuration,
/// so request content cannot redirect who the email is addressed to.
pub struct TranslationExtractor {
    llm: Arc<dyn LlmProvider>,
    owner: OwnerProfile,
}

impl TranslationExtractor {
    pub fn new(llm: Arc<dyn LlmProvider>, owner: OwnerProfile) -> Self {
        Self { llm, owner }
    }

    pub fn language(&self) -> &str {
        &self.owner.language
    }

    pub fn system_prompt(&self) -> String {
        format!(
            "You are an expert in translating English into {lang}. Translate the given email \
             into {lang}. The receiver's name in {lang} is {name_alt}.\n\n\
             Respond with a JSON object with exactly two string fields:\n\
             - \"subject_translation\": the translated subject line\n\
             - \"content_translation\": the translated email body\n\n\
             ONLY output the JSON object. No other text.",
            lang = self.owner.language,
            name_alt = self.owner.name_alt
        )
    }

    pub fn user_prompt(&self, draft: &DraftEmail) -> String {
        format!(
            "Subject: {}\n{}\nTranslate the whole email into {}.",
            draft.subject, draft.content, self.owner.language
        )
    }

    /// Translate `draft`. Fails fast, without calling the model, when the
    /// subject or content is empty.
    pub async fn translate(&self, draft: &DraftEmail) -> Result<TranslatedEmail, GenerationError> {
        validate_draft(draft)?;

        info!(
            model = self.llm.model_name(),
            language = %self.owner.language,
            "Translating email draft"
        );

        let result = self.request_translation(draft).await;
        if let Err(ref e) = result {
            log_failure("translation", e);
        }
        result
    }

    async fn request_translation(&self, draft: &DraftEmail) -> Result<TranslatedEmail, GenerationError> {
        let request = CompletionRequest::new(vec![
            ChatMessage::system(self.system_prompt()),
            ChatMessage::user(self.user_prompt(draft)),
        ])
        .with_temperature(GENERATION_TEMPERATURE)
        .with_max_tokens(GENERATION_MAX_TOKENS);

        let response = self.llm.complete(request).await?;
        let payload: TranslationPayload = parse_model_json(&response.content)?;

        info!(
            input_tokens = response.input_tokens,
            output_tokens = response.output_tokens,
            "Email translated"
        );

        Ok(TranslatedEmail {
            subject_translation: payload.subject_translation,
            content_translation: payload.content_translation,
            language: self.owner.language.clone(),
        })
    }
}

fn validate_draft(draft: &DraftEmail) -> Result<(), ValidationError> {
    if draft.subject.trim().is_empty() {
        return Err(ValidationError::MissingField("Subject"));
    }
    if draft.content.trim().is_empty() {
        return Err(ValidationError::MissingField("Content"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::testing::StubLlm;

    fn owner() -> OwnerProfile {
        OwnerProfile {
            name: "Lingze".into(),
            name_alt: "泽".into(),
            language: "Chinese".into(),
        }
    }

    fn draft(subject: &str, content: &str) -> DraftEmail {
        DraftEmail {
            subject: subject.into(),
            content: content.into(),
        }
    }

    #[tokio::test]
    async fn empty_subject_fails_before_model_call() {
        let llm = StubLlm::replying("unused");
        let extractor = TranslationExtractor::new(llm.clone(), owner());

        let err = extractor.translate(&draft("", "Body")).await.unwrap_err();
        assert!(matches!(
            err,
            GenerationError::Validation(ValidationError::MissingField("Subject"))
        ));
        assert_eq!(llm.calls(), 0);
    }

    #[tokio::test]
    async fn empty_content_fails_before_model_call() {
        let llm = StubLlm::replying("unused");
        let extractor = TranslationExtractor::new(llm.clone(), owner());

        let err = extractor.translate(&draft("Hi", "  \n")).await.unwrap_err();
        assert_eq!(err.to_string(), "Content is required");
        assert_eq!(llm.calls(), 0);
    }

    #[tokio::test]
    async fn translation_merges_language_tag() {
        let llm = StubLlm::replying(
            "```json\n{\"subject_translation\": \"你好\", \"content_translation\": \"正文\"}\n```",
        );
        let extractor = TranslationExtractor::new(llm.clone(), owner());

        let translated = extractor.translate(&draft("Hello", "Body")).await.unwrap();
        assert_eq!(translated.subject_translation, "你好");
        assert_eq!(translated.content_translation, "正文");
        assert_eq!(translated.language, "Chinese");
        assert_eq!(llm.calls(), 1);

        let request = llm.last_request().unwrap();
        assert!(request.messages[0].content.contains("泽"));
        assert_eq!(
            request.messages[1].content,
            "Subject: Hello\nBody\nTranslate the whole email into Chinese."
        );
    }

    #[tokio::test]
    async fn camel_case_fields_are_accepted() {
        let llm = StubLlm::replying(r#"{"subjectTranslation": "S2", "contentTranslation": "C2"}"#);
        let extractor = TranslationExtractor::new(llm, owner());
        let translated = extractor.translate(&draft("S", "C")).await.unwrap();
        assert_eq!(translated.subject_translation, "S2");
    }

    #[tokio::test]
    async fn missing_translation_field_is_malformed() {
        let llm = StubLlm::replying(r#"{"subject_translation": "S2"}"#);
        let extractor = TranslationExtractor::new(llm, owner());
        let err = extractor.translate(&draft("S", "C")).await.unwrap_err();
        assert!(matches!(err, GenerationError::MalformedModelOutput { .. }));
    }

    #[test]
    fn serializes_camel_case() {
        let t = TranslatedEmail {
            subject_translation: "a".into(),
            content_translation: "b".into(),
            language: "Chinese".into(),
        };
        let v = serde_json::to_value(&t).unwrap();
        assert_eq!(v["subjectTranslation"], "a");
        assert_eq!(v["contentTranslation"], "b");
        assert_eq!(v["language"], "Chinese");
    }
}
