//! File-backed template configuration store.
//!
//! The store is the only mutable state shared between requests. Reads clone
//! the current configuration; writes persist to disk before swapping it in.

use std::path::{Path, PathBuf};

use tokio::fs;
use tokio::sync::RwLock;
use tracing::{info, warn};

use super::types::{OwnerProfile, PromptTemplate, QuestionKind, QuestionSpec, TemplateConfig};
use crate::error::TemplateError;

/// Holds the current [`TemplateConfig`] and the file it is persisted to.
pub struct TemplateStore {
    path: PathBuf,
    owner: OwnerProfile,
    current: RwLock<TemplateConfig>,
}

impl TemplateStore {
    /// Load the configuration at `path`, or fall back to [`default_template`]
    /// when the file does not exist yet.
    ///
    /// The owner section always reflects `owner` (process configuration),
    /// whatever the file says.
    pub async fn load(path: impl Into<PathBuf>, owner: OwnerProfile) -> Result<Self, TemplateError> {
        let path = path.into();
        let mut config = match fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| TemplateError::Json {
                path: path.clone(),
                source: e,
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(path = %path.display(), "Template config not found, using built-in default");
                default_template()
            }
            Err(e) => return Err(TemplateError::Io { path, source: e }),
        };
        config.owner = owner.clone();

        info!(
            path = %path.display(),
            questions = config.questions.len(),
            "Template config loaded"
        );

        Ok(Self {
            path,
            owner,
            current: RwLock::new(config),
        })
    }

    /// Create an in-memory store seeded with `config` that persists to `path`.
    pub fn with_config(path: impl Into<PathBuf>, owner: OwnerProfile, mut config: TemplateConfig) -> Self {
        config.owner = owner.clone();
        Self {
            path: path.into(),
            owner,
            current: RwLock::new(config),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Snapshot of the current configuration.
    pub async fn get(&self) -> TemplateConfig {
        self.current.read().await.clone()
    }

    /// Replace the configuration and persist it as pretty JSON.
    pub async fn replace(&self, mut config: TemplateConfig) -> Result<(), TemplateError> {
        config.owner = self.owner.clone();

        let json = serde_json::to_vec_pretty(&config).map_err(|e| TemplateError::Json {
            path: self.path.clone(),
            source: e,
        })?;

        // Hold the write lock across the file write so concurrent saves
        // land on disk in the same order they land in memory.
        let mut guard = self.current.write().await;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await.map_err(|e| TemplateError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }
        fs::write(&self.path, json).await.map_err(|e| TemplateError::Io {
            path: self.path.clone(),
            source: e,
        })?;
        *guard = config;

        info!(path = %self.path.display(), "Template config saved");
        Ok(())
    }
}

/// The form the service ships with: a contact address and two free-text questions.
pub fn default_template() -> TemplateConfig {
    TemplateConfig {
        title: "Email me eAIsily!".into(),
        welcome_message: "Please answer the following questions in any language! You don't need \
                          to think about how to make the email organized or polite. Just write \
                          down anything you'd like to share with me!"
            .into(),
        owner: OwnerProfile::default(),
        prompt_template: PromptTemplate {
            system: String::new(),
            user: "I want {ownerName} to know: {toknow}.\n\
                   I want {ownerName} to do: {todo}.\n\
                   Compose a detailed, polite, and professional email based on the above information."
                .into(),
        },
        questions: vec![
            QuestionSpec {
                id: "email".into(),
                label: "What's your email address? (I need to know this in order to reply. You may \
                        leave this blank if you want to be anonymous.)"
                    .into(),
                kind: QuestionKind::Email,
                placeholder: "Your email address".into(),
                rows: None,
            },
            QuestionSpec {
                id: "toknow".into(),
                label: "What do you want me to know? (Feel free to include your name!)".into(),
                kind: QuestionKind::Textarea,
                placeholder: "What do you want me to know?".into(),
                rows: Some(3),
            },
            QuestionSpec {
                id: "todo".into(),
                label: "What do you want me to do?".into(),
                kind: QuestionKind::Textarea,
                placeholder: "What do you want me to do?".into(),
                rows: Some(3),
            },
        ],
    }
}
