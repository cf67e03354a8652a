//! Composition and dispatch of the outbound message.
//!
//! Flow for one send:
//! 1. Validate and compose subject/body (no I/O)
//! 2. Stage uploads to temporary storage
//! 3. Build the message and hand it to the transport, exactly once
//! 4. Remove staged files, whatever happened in 2-3

pub mod attachments;
pub mod compose;
pub mod mailer;

pub use attachments::{AttachmentStage, StagedAttachment, Upload};
pub use compose::{ComposedEmail, NO_SUBJECT, compose_bilingual, compose_precomposed};
pub use mailer::{MailConfig, MailTransport, SmtpMailer, SmtpSecurity, build_message};

use std::path::PathBuf;
use std::sync::Arc;

use lettre::message::Mailbox;
use tracing::{error, info};

use crate::error::DeliveryError;
use crate::generation::{DraftEmail, TranslatedEmail};

/// What the visitor asked to send.
#[derive(Debug, Clone)]
pub enum OutgoingEmail {
    /// Draft plus translation, composed server-side.
    Bilingual {
        draft: DraftEmail,
        translation: TranslatedEmail,
        reply_to: Option<String>,
    },
    /// Subject and body the client already composed.
    Precomposed { subject: String, body: String },
}

/// Outcome of a successful send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendReceipt {
    pub subject: String,
    pub attachments: usize,
}

/// Sends visitor emails to the owner through a [`MailTransport`].
///
/// Sender and recipient are fixed at construction; nothing in a request can
/// change the envelope.
pub struct Dispatcher {
    transport: Arc<dyn MailTransport>,
    from: Mailbox,
    to: Mailbox,
    campaign_tag: String,
    upload_dir: PathBuf,
}

impl Dispatcher {
    pub fn new(
        transport: Arc<dyn MailTransport>,
        config: &MailConfig,
        upload_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            transport,
            from: config.from.clone(),
            to: config.recipient.clone(),
            campaign_tag: config.campaign_tag.clone(),
            upload_dir: upload_dir.into(),
        }
    }

    pub fn compose(&self, email: &OutgoingEmail) -> Result<ComposedEmail, DeliveryError> {
        let composed = match email {
            OutgoingEmail::Bilingual {
                draft,
                translation,
                reply_to,
            } => compose_bilingual(&self.campaign_tag, draft, translation, reply_to.as_deref())?,
            OutgoingEmail::Precomposed { subject, body } => compose_precomposed(subject, body)?,
        };
        Ok(composed)
    }

    /// Compose, stage `uploads`, and make one send attempt.
    ///
    /// Validation happens before anything touches disk or network. Staged
    /// files are removed afterwards on every path; a cleanup failure never
    /// replaces the send result.
    pub async fn send(
        &self,
        email: OutgoingEmail,
        uploads: Vec<Upload>,
    ) -> Result<SendReceipt, DeliveryError> {
        let composed = self.compose(&email)?;

        let mut stage = AttachmentStage::new(&self.upload_dir);
        let staging = stage.stage_all(&uploads).await;
        let result = match staging {
            Ok(()) => self.dispatch(&composed, stage.attachments()).await,
            Err(e) => Err(e),
        };

        let staged = stage.len();
        let removed = stage.release().await;

        match &result {
            Ok(()) => info!(
                subject = %composed.subject,
                attachments = staged,
                removed,
                "Email sent"
            ),
            Err(e) => error!(
                error = %e,
                attachments = staged,
                removed,
                "Failed to send email"
            ),
        }

        result.map(|()| SendReceipt {
            subject: composed.subject,
            attachments: staged,
        })
    }

    async fn dispatch(
        &self,
        composed: &ComposedEmail,
        attachments: &[StagedAttachment],
    ) -> Result<(), DeliveryError> {
        let message = build_message(
            &self.from,
            &self.to,
            &composed.subject,
            &composed.body,
            attachments,
        )
        .await?;
        self.transport.send(message).await
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use lettre::Message;
    use secrecy::SecretString;
    use tempfile::TempDir;

    use super::*;
    use crate::error::ValidationError;

    /// Transport that records formatted messages instead of sending them.
    struct RecordingTransport {
        fail: bool,
        calls: AtomicUsize,
        sent: Mutex<Vec<String>>,
        /// Staged files seen on disk at send time.
        seen_files: Mutex<usize>,
        dir: PathBuf,
    }

    impl RecordingTransport {
        fn new(dir: &Path, fail: bool) -> Arc<Self> {
            Arc::new(Self {
                fail,
                calls: AtomicUsize::new(0),
                sent: Mutex::new(Vec::new()),
                seen_files: Mutex::new(0),
                dir: dir.to_path_buf(),
            })
        }
    }

    #[async_trait]
    impl MailTransport for RecordingTransport {
        async fn send(&self, message: Message) -> Result<(), DeliveryError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.seen_files.lock().unwrap() = count_files(&self.dir);
            self.sent
                .lock()
                .unwrap()
                .push(String::from_utf8_lossy(&message.formatted()).to_string());
            if self.fail {
                Err(DeliveryError::Transport {
                    reason: "550 mailbox unavailable".into(),
                })
            } else {
                Ok(())
            }
        }
    }

    fn count_files(dir: &Path) -> usize {
        std::fs::read_dir(dir).map(|d| d.count()).unwrap_or(0)
    }

    fn mail_config() -> MailConfig {
        MailConfig {
            smtp_host: "smtp.example.com".into(),
            smtp_port: 587,
            security: SmtpSecurity::StartTls,
            username: "relay".into(),
            password: SecretString::from("secret"),
            from: "relay@example.com".parse().unwrap(),
            recipient: "owner@example.com".parse().unwrap(),
            campaign_tag: "EAIsyEmail".into(),
        }
    }

    fn bilingual(content: &str) -> OutgoingEmail {
        OutgoingEmail::Bilingual {
            draft: DraftEmail {
                subject: "S".into(),
                content: content.into(),
            },
            translation: TranslatedEmail {
                subject_translation: "S2".into(),
                content_translation: "C2".into(),
                language: "Chinese".into(),
            },
            reply_to: None,
        }
    }

    fn uploads(n: usize) -> Vec<Upload> {
        (0..n)
            .map(|i| Upload::new(format!("file{i}.txt"), format!("contents {i}").into_bytes()))
            .collect()
    }

    #[tokio::test]
    async fn success_removes_all_staged_files() {
        let tmp = TempDir::new().unwrap();
        let transport = RecordingTransport::new(tmp.path(), false);
        let dispatcher = Dispatcher::new(transport.clone(), &mail_config(), tmp.path());

        let receipt = dispatcher.send(bilingual("C"), uploads(3)).await.unwrap();
        assert_eq!(receipt.attachments, 3);
        assert_eq!(receipt.subject, "[EAIsyEmail] S (S2)");
        assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
        assert_eq!(*transport.seen_files.lock().unwrap(), 3);
        assert_eq!(count_files(tmp.path()), 0);
    }

    #[tokio::test]
    async fn failure_still_removes_all_staged_files() {
        let tmp = TempDir::new().unwrap();
        let transport = RecordingTransport::new(tmp.path(), true);
        let dispatcher = Dispatcher::new(transport.clone(), &mail_config(), tmp.path());

        let err = dispatcher.send(bilingual("C"), uploads(2)).await.unwrap_err();
        assert!(matches!(err, DeliveryError::Transport { .. }));
        assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
        assert_eq!(*transport.seen_files.lock().unwrap(), 2);
        assert_eq!(count_files(tmp.path()), 0);
    }

    #[tokio::test]
    async fn empty_body_fails_before_staging_or_sending() {
        let tmp = TempDir::new().unwrap();
        let transport = RecordingTransport::new(tmp.path(), false);
        let dispatcher = Dispatcher::new(transport.clone(), &mail_config(), tmp.path().join("up"));

        let err = dispatcher.send(bilingual(""), uploads(1)).await.unwrap_err();
        assert!(matches!(
            err,
            DeliveryError::Validation(ValidationError::EmailBodyRequired)
        ));
        assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
        assert!(!tmp.path().join("up").exists());
    }

    #[tokio::test]
    async fn envelope_is_fixed_by_configuration() {
        let tmp = TempDir::new().unwrap();
        let transport = RecordingTransport::new(tmp.path(), false);
        let dispatcher = Dispatcher::new(transport.clone(), &mail_config(), tmp.path());

        let email = OutgoingEmail::Bilingual {
            draft: DraftEmail {
                subject: "S".into(),
                content: "C".into(),
            },
            translation: TranslatedEmail {
                subject_translation: "S2".into(),
                content_translation: "C2".into(),
                language: "Chinese".into(),
            },
            reply_to: Some("attacker@evil.example".into()),
        };
        dispatcher.send(email, vec![]).await.unwrap();

        let raw = transport.sent.lock().unwrap()[0].clone();
        assert!(raw.contains("From: relay@example.com"));
        assert!(raw.contains("To: owner@example.com"));
        assert!(!raw.contains("Reply-To:"));
        assert!(!raw.contains("To: attacker@evil.example"));
    }

    #[tokio::test]
    async fn precomposed_message_is_sent_as_given() {
        let tmp = TempDir::new().unwrap();
        let transport = RecordingTransport::new(tmp.path(), false);
        let dispatcher = Dispatcher::new(transport.clone(), &mail_config(), tmp.path());

        let receipt = dispatcher
            .send(
                OutgoingEmail::Precomposed {
                    subject: String::new(),
                    body: "Just this".into(),
                },
                vec![],
            )
            .await
            .unwrap();
        assert_eq!(receipt.subject, NO_SUBJECT);
        assert!(transport.sent.lock().unwrap()[0].contains("Just this"));
    }
}
