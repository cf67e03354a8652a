//! Process-wide configuration, read once from the environment at startup.

use std::path::PathBuf;

use secrecy::SecretString;

use crate::delivery::mailer::{MailConfig, SmtpSecurity, parse_mailbox};
use crate::error::ConfigError;
use crate::llm::{LlmBackend, LlmConfig};
use crate::template::OwnerProfile;

/// Default generation model.
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Default subject tag.
pub const DEFAULT_CAMPAIGN_TAG: &str = "EAIsyEmail";

/// Everything the service needs, immutable after boot.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub owner: OwnerProfile,
    pub llm: LlmConfig,
    pub mail: MailConfig,
    /// HTTP listen port.
    pub port: u16,
    pub template_path: PathBuf,
    /// Where attachments are staged during a send.
    pub upload_dir: PathBuf,
}

impl AppConfig {
    /// Build config from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let require = |key: &str| get(key).ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()));

        // ── Owner ───────────────────────────────────────────────────────
        let name = require("OWNER_NAME")?;
        let owner = OwnerProfile {
            name_alt: get("OWNER_NAME_ALT").unwrap_or_else(|| name.clone()),
            language: require("OWNER_LANG")?,
            name,
        };

        // ── LLM ─────────────────────────────────────────────────────────
        let backend: LlmBackend = get("LLM_BACKEND")
            .map(|s| s.parse::<LlmBackend>())
            .transpose()?
            .unwrap_or(LlmBackend::OpenAi);
        let llm = LlmConfig {
            backend,
            api_key: SecretString::from(require(backend.api_key_var())?),
            model: get("LLM_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
        };

        // ── Mail ────────────────────────────────────────────────────────
        let smtp_port = parse_port(&get, "SMTP_PORT", 587)?;
        let security = match get("SMTP_SECURITY") {
            Some(v) => SmtpSecurity::parse("SMTP_SECURITY", &v)?,
            None => SmtpSecurity::for_port(smtp_port),
        };
        let username = require("SMTP_USER")?;
        let from = get("EMAIL_FROM").unwrap_or_else(|| username.clone());
        let mail = MailConfig {
            smtp_host: require("SMTP_HOST")?,
            smtp_port,
            security,
            password: SecretString::from(get("SMTP_PASS").unwrap_or_default()),
            from: parse_mailbox("EMAIL_FROM", &from)?,
            recipient: parse_mailbox("EMAIL_RECIPIENT", &require("EMAIL_RECIPIENT")?)?,
            campaign_tag: get("CAMPAIGN_TAG").unwrap_or_else(|| DEFAULT_CAMPAIGN_TAG.to_string()),
            username,
        };

        // ── Service ─────────────────────────────────────────────────────
        let port = parse_port(&get, "PORT", 5000)?;
        let template_path = get("TEMPLATE_CONFIG_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./data/template-config.json"));
        let upload_dir = get("UPLOAD_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| std::env::temp_dir().join("eaisy-mail-uploads"));

        Ok(Self {
            owner,
            llm,
            mail,
            port,
            template_path,
            upload_dir,
        })
    }
}

fn parse_port<G>(get: &G, key: &str, default: u16) -> Result<u16, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(v) => v.trim().parse().map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("'{v}' is not a port number: {e}"),
        }),
        None => Ok(default),
    }
}
