//! Model-backed drafting and translation with a strict JSON output contract.

pub mod draft;
pub mod output;
pub mod translate;

pub use draft::{DraftEmail, DraftExtractor};
pub use output::{clean_model_json, parse_model_json};
pub use translate::{TranslatedEmail, TranslationExtractor};

use tracing::{error, warn};

use crate::error::GenerationError;
use crate::llm::ProviderDiagnostic;

/// Sampling temperature for both drafting and translation. Not configurable.
pub const GENERATION_TEMPERATURE: f32 = 0.7;

/// Upper bound on completion length; Anthropic requires one.
pub const GENERATION_MAX_TOKENS: u32 = 2048;

/// Log a failed stage with everything an operator needs to diagnose it.
pub(crate) fn log_failure(stage: &str, err: &GenerationError) {
    match err {
        GenerationError::Validation(e) => {
            warn!(stage, error = %e, "Rejected generation request");
        }
        GenerationError::MalformedModelOutput { reason, raw } => {
            error!(stage, reason = %reason, raw = %raw, "Model output failed the JSON contract");
        }
        GenerationError::ExternalService(e) => {
            let diag = ProviderDiagnostic::from_llm_error(e);
            error!(
                stage,
                provider = diag.provider.as_deref().unwrap_or("unknown"),
                message = %diag.message,
                code = diag.code.as_deref(),
                kind = diag.kind.as_deref(),
                param = diag.param.as_deref(),
                "LLM request failed"
            );
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;

    use crate::error::LlmError;
    use crate::llm::provider::{CompletionRequest, CompletionResponse, LlmProvider};

    /// Canned LLM that records what it was asked.
    pub struct StubLlm {
        reply: Result<String, String>,
        calls: AtomicUsize,
        last: Mutex<Option<CompletionRequest>>,
    }

    impl StubLlm {
        pub fn replying(text: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Ok(text.to_string()),
                calls: AtomicUsize::new(0),
                last: Mutex::new(None),
            })
        }

        pub fn failing(reason: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Err(reason.to_string()),
                calls: AtomicUsize::new(0),
                last: Mutex::new(None),
            })
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        pub fn last_request(&self) -> Option<CompletionRequest> {
            self.last.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl LlmProvider for StubLlm {
        fn model_name(&self) -> &str {
            "stub"
        }

        async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last.lock().unwrap() = Some(request);
            match &self.reply {
                Ok(text) => Ok(CompletionResponse {
                    content: text.clone(),
                    input_tokens: 10,
                    output_tokens: 20,
                }),
                Err(reason) => Err(LlmError::RequestFailed {
                    provider: "stub".into(),
                    reason: reason.clone(),
                }),
            }
        }
    }
}
