//! Bridges rig-core's `CompletionModel` to our `LlmProvider` trait.

use async_trait::async_trait;
use rig::completion::CompletionModel;
use rig::message::{AssistantContent, Message};

use crate::error::LlmError;
use crate::llm::provider::{
    CompletionRequest, CompletionResponse, LlmProvider, Role,
};

/// Wraps any rig completion model.
pub struct RigAdapter<M> {
    model: M,
    model_name: String,
    provider: &'static str,
}

impl<M> RigAdapter<M>
where
    M: CompletionModel,
{
    pub fn new(model: M, model_name: &str) -> Self {
        Self {
            model,
            model_name: model_name.to_string(),
            provider: "rig",
        }
    }

    /// Name used in errors and logs.
    pub fn with_provider(mut self, provider: &'static str) -> Self {
        self.provider = provider;
        self
    }
}

#[async_trait]
impl<M> LlmProvider for RigAdapter<M>
where
    M: CompletionModel + Send + Sync + 'static,
{
    fn model_name(&self) -> &str {
        &self.model_name
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let mut preamble: Vec<String> = Vec::new();
        let mut history: Vec<Message> = Vec::new();
        for msg in request.messages {
            match msg.role {
                Role::System => preamble.push(msg.content),
                Role::User => history.push(Message::user(msg.content)),
            }
        }

        // rig takes the last message as the prompt and the rest as history.
        let prompt = history.pop().ok_or_else(|| LlmError::RequestFailed {
            provider: self.provider.to_string(),
            reason: "completion request has no user message".to_string(),
        })?;

        let mut builder = self.model.completion_request(prompt).messages(history);
        if !preamble.is_empty() {
            builder = builder.preamble(preamble.join("\n\n"));
        }
        if let Some(temperature) = request.temperature {
            builder = builder.temperature(f64::from(temperature));
        }
        if let Some(max_tokens) = request.max_tokens {
            builder = builder.max_tokens(u64::from(max_tokens));
        }

        let response = builder.send().await.map_err(|e| LlmError::RequestFailed {
            provider: self.provider.to_string(),
            reason: e.to_string(),
        })?;

        let content = completion_text(self.provider, response.choice.iter())?;

        Ok(CompletionResponse {
            content,
            input_tokens: u32::try_from(response.usage.input_tokens).unwrap_or(u32::MAX),
            output_tokens: u32::try_from(response.usage.output_tokens).unwrap_or(u32::MAX),
        })
    }
}

/// Join the text parts of a completion. A reply with no text at all (only
/// tool calls or reasoning, or blank) is an invalid response.
fn completion_text<'a>(
    provider: &str,
    choice: impl IntoIterator<Item = &'a AssistantContent>,
) -> Result<String, LlmError> {
    let content = choice
        .into_iter()
        .filter_map(|c| match c {
            AssistantContent::Text(text) => Some(text.text.as_str()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("");

    if content.trim().is_empty() {
        return Err(LlmError::InvalidResponse {
            provider: provider.to_string(),
            reason: "completion contained no text".to_string(),
        });
    }
    Ok(content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_parts_are_joined() {
        let parts = vec![AssistantContent::text("{\"subject\": "), AssistantContent::text("\"Hi\"}")];
        assert_eq!(
            completion_text("openai", &parts).unwrap(),
            r#"{"subject": "Hi"}"#
        );
    }

    #[test]
    fn blank_completion_is_invalid_response() {
        let err = completion_text("anthropic", &[AssistantContent::text("  \n")]).unwrap_err();
        assert!(matches!(
            err,
            LlmError::InvalidResponse { ref provider, .. } if provider == "anthropic"
        ));

        let err = completion_text("openai", &Vec::<AssistantContent>::new()).unwrap_err();
        assert!(matches!(err, LlmError::InvalidResponse { .. }));
    }
}
