//! Draft extractor: turns visitor answers into a structured English email.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use super::output::parse_model_json;
use super::{GENERATION_MAX_TOKENS, GENERATION_TEMPERATURE, log_failure};
use crate::error::GenerationError;
use crate::llm::provider::{ChatMessage, CompletionRequest, LlmProvider};
use crate::template::{FormAnswers, OwnerProfile, TemplateConfig, compile_prompt, fill_owner_name};

/// The English email produced from the visitor's answers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftEmail {
    pub subject: String,
    pub content: String,
}

/// Generates [`DraftEmail`]s addressed to the configured owner.
pub struct DraftExtractor {
    llm: Arc<dyn LlmProvider>,
    owner: OwnerProfile,
}

impl DraftExtractor {
    pub fn new(llm: Arc<dyn LlmProvider>, owner: OwnerProfile) -> Self {
        Self { llm, owner }
    }

    /// Fixed instruction contract, parameterized only by the owner's name.
    pub fn system_prompt(&self) -> String {
        format!(
            "You are an assistant that generates professional emails to {name}, based on what \
             the sender wants {name} to know and what they want {name} to do. The sender may \
             write in any language, but everything in the email must be written in English.\n\n\
             Respond with a JSON object with exactly two string fields:\n\
             - \"subject\": the email subject line\n\
             - \"content\": the full email body\n\n\
             ONLY output the JSON object. No other text.",
            name = self.owner.name
        )
    }

    /// Compile `template`'s user prompt with `answers` and generate a draft.
    pub async fn generate_from_answers(
        &self,
        template: &TemplateConfig,
        answers: &FormAnswers,
    ) -> Result<DraftEmail, GenerationError> {
        let user_template = fill_owner_name(&template.prompt_template.user, &self.owner.name);
        let prompt = compile_prompt(&user_template, answers);
        self.generate(&prompt).await
    }

    /// Generate a draft from an already compiled user prompt.
    pub async fn generate(&self, prompt: &str) -> Result<DraftEmail, GenerationError> {
        info!(
            model = self.llm.model_name(),
            prompt_len = prompt.len(),
            "Generating email draft"
        );

        let result = self.request_draft(prompt).await;
        if let Err(ref e) = result {
            log_failure("draft", e);
        }
        result
    }

    async fn request_draft(&self, prompt: &str) -> Result<DraftEmail, GenerationError> {
        let request = CompletionRequest::new(vec![
            ChatMessage::system(self.system_prompt()),
            ChatMessage::user(prompt),
        ])
        .with_temperature(GENERATION_TEMPERATURE)
        .with_max_tokens(GENERATION_MAX_TOKENS);

        let response = self.llm.complete(request).await?;
        let draft: DraftEmail = parse_model_json(&response.content)?;

        info!(
            subject = %draft.subject,
            input_tokens = response.input_tokens,
            output_tokens = response.output_tokens,
            "Email draft generated"
        );
        Ok(draft)
    }
}
