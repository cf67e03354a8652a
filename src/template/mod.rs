//! Template configuration: the visitor question set and prompt wording.

pub mod prompt;
pub mod store;
pub mod types;

pub use prompt::{compile_prompt, fill_owner_name};
pub use store::{TemplateStore, default_template};
pub use types::{FormAnswers, OwnerProfile, PromptTemplate, QuestionKind, QuestionSpec, TemplateConfig};
