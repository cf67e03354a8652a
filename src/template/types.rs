use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Visitor answers keyed by question id.
pub type FormAnswers = HashMap<String, String>;

/// Input widget used to render a question.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionKind {
    #[default]
    Text,
    Textarea,
    Email,
    /// Any widget the renderer knows and we don't.
    #[serde(untagged)]
    Other(String),
}

/// One question on the visitor form. Its `id` names the prompt placeholder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionSpec {
    pub id: String,
    #[serde(default)]
    pub label: String,
    #[serde(rename = "type", default)]
    pub kind: QuestionKind,
    #[serde(default)]
    pub placeholder: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rows: Option<u32>,
}

/// Who the emails are for.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerProfile {
    /// Display name used in English prompts.
    pub name: String,
    /// Name as written in the owner's language.
    pub name_alt: String,
    /// Target language of the translation.
    pub language: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptTemplate {
    #[serde(default)]
    pub system: String,
    #[serde(default)]
    pub user: String,
}

/// Visitor-facing form definition and prompt wording.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TemplateConfig {
    pub title: String,
    pub welcome_message: String,
    pub owner: OwnerProfile,
    pub prompt_template: PromptTemplate,
    pub questions: Vec<QuestionSpec>,
}

impl TemplateConfig {
    /// Look up a question by id.
    pub fn question(&self, id: &str) -> Option<&QuestionSpec> {
        self.questions.iter().find(|q| q.id == id)
    }
}
