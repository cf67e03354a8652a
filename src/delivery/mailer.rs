//! SMTP transport and message building via lettre.

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use secrecy::{ExposeSecret, SecretString};
use tracing::info;

use super::attachments::StagedAttachment;
use crate::error::{ConfigError, DeliveryError};

/// Encryption mode for the SMTP connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmtpSecurity {
    /// Implicit TLS (usually port 465).
    Tls,
    StartTls,
    /// Plain connection, for local relays only.
    None,
}

impl SmtpSecurity {
    /// Port 465 speaks TLS from the first byte; everything else upgrades.
    pub fn for_port(port: u16) -> Self {
        if port == 465 { Self::Tls } else { Self::StartTls }
    }

    pub fn parse(key: &str, value: &str) -> Result<Self, ConfigError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "tls" | "ssl" => Ok(Self::Tls),
            "starttls" => Ok(Self::StartTls),
            "none" | "plain" => Ok(Self::None),
            other => Err(ConfigError::InvalidValue {
                key: key.to_string(),
                message: format!("unknown SMTP security mode '{other}'"),
            }),
        }
    }
}

/// Mail relay settings and the fixed envelope.
#[derive(Debug, Clone)]
pub struct MailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub security: SmtpSecurity,
    pub username: String,
    pub password: SecretString,
    /// Sender identity for every message.
    pub from: Mailbox,
    /// The owner's inbox; the only recipient.
    pub recipient: Mailbox,
    /// Tag that opens every subject line.
    pub campaign_tag: String,
}

/// Something that can deliver a built message.
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(&self, message: Message) -> Result<(), DeliveryError>;
}

/// Production transport backed by an async lettre SMTP client.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailer {
    pub fn new(config: &MailConfig) -> Result<Self, DeliveryError> {
        let creds = Credentials::new(
            config.username.clone(),
            config.password.expose_secret().to_string(),
        );
        let relay_err = |e: lettre::transport::smtp::Error| DeliveryError::Transport {
            reason: format!("SMTP relay error: {e}"),
        };

        let transport = match config.security {
            SmtpSecurity::Tls => AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_host)
                .map_err(relay_err)?
                .port(config.smtp_port)
                .credentials(creds)
                .build(),
            SmtpSecurity::StartTls => {
                AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)
                    .map_err(relay_err)?
                    .port(config.smtp_port)
                    .credentials(creds)
                    .build()
            }
            SmtpSecurity::None => {
                AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.smtp_host)
                    .port(config.smtp_port)
                    .credentials(creds)
                    .build()
            }
        };

        Ok(Self { transport })
    }
}

#[async_trait]
impl MailTransport for SmtpMailer {
    async fn send(&self, message: Message) -> Result<(), DeliveryError> {
        self.transport
            .send(message)
            .await
            .map_err(|e| DeliveryError::Transport {
                reason: e.to_string(),
            })?;
        info!("Email handed to SMTP relay");
        Ok(())
    }
}

/// Build a plain-text message, wrapped in `multipart/mixed` when there are
/// attachments. Attachment bytes are read back from their staged paths.
pub async fn build_message(
    from: &Mailbox,
    to: &Mailbox,
    subject: &str,
    body: &str,
    attachments: &[StagedAttachment],
) -> Result<Message, DeliveryError> {
    let builder = Message::builder()
        .from(from.clone())
        .to(to.clone())
        .subject(subject);

    let message = if attachments.is_empty() {
        builder.header(ContentType::TEXT_PLAIN).body(body.to_string())
    } else {
        let mut mixed = MultiPart::mixed().singlepart(SinglePart::plain(body.to_string()));
        for staged in attachments {
            let bytes = tokio::fs::read(&staged.temporary_path)
                .await
                .map_err(|e| DeliveryError::Staging {
                    name: staged.original_name.clone(),
                    source: e,
                })?;
            mixed = mixed.singlepart(
                Attachment::new(staged.original_name.clone()).body(bytes, content_type_for(&staged.original_name)),
            );
        }
        builder.multipart(mixed)
    };

    message.map_err(|e| DeliveryError::Build {
        reason: e.to_string(),
    })
}

/// Guess a MIME type from the file name, defaulting to octet-stream.
fn content_type_for(file_name: &str) -> ContentType {
    let guess = mime_guess::from_path(file_name).first_or_octet_stream();
    ContentType::parse(guess.as_ref()).unwrap_or_else(|_| {
        "application/octet-stream"
            .parse()
            .expect("valid MIME type")
    })
}

/// Parse an address from configuration.
pub fn parse_mailbox(key: &str, value: &str) -> Result<Mailbox, ConfigError> {
    value.parse::<Mailbox>().map_err(|e| ConfigError::InvalidValue {
        key: key.to_string(),
        message: format!("invalid address '{value}': {e}"),
    })
}
