//! Bilingual subject/body composition.

use crate::error::ValidationError;
use crate::generation::{DraftEmail, TranslatedEmail};

/// Subject used when a pre-composed message arrives without one.
pub const NO_SUBJECT: &str = "(No Subject)";

/// Subject and plain-text body ready for dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposedEmail {
    pub subject: String,
    pub body: String,
}

/// Combine a draft and its translation into one message.
///
/// `reply_to` is the visitor's own contact address. It is copied into the
/// subject and body as text only and never validated or used as a header.
pub fn compose_bilingual(
    campaign_tag: &str,
    draft: &DraftEmail,
    translation: &TranslatedEmail,
    reply_to: Option<&str>,
) -> Result<ComposedEmail, ValidationError> {
    if draft.content.trim().is_empty() {
        return Err(ValidationError::EmailBodyRequired);
    }
    if draft.subject.trim().is_empty() {
        return Err(ValidationError::MissingField("Subject"));
    }
    if translation.subject_translation.trim().is_empty() {
        return Err(ValidationError::MissingTranslation("subject"));
    }
    if translation.content_translation.trim().is_empty() {
        return Err(ValidationError::MissingTranslation("content"));
    }

    let reply_to = reply_to.map(str::trim).filter(|addr| !addr.is_empty());

    let subject = match reply_to {
        Some(addr) => format!(
            "[{campaign_tag} - Reply to: {addr}] {} ({})",
            draft.subject, translation.subject_translation
        ),
        None => format!(
            "[{campaign_tag}] {} ({})",
            draft.subject, translation.subject_translation
        ),
    };

    let mut body = draft.content.clone();
    if let Some(addr) = reply_to {
        body.push_str("\n\nReply to: ");
        body.push_str(addr);
    }
    body.push_str("\n\n");
    body.push_str(&translation.content_translation);

    Ok(ComposedEmail { subject, body })
}

/// Accept a subject/body the client already composed.
pub fn compose_precomposed(subject: &str, body: &str) -> Result<ComposedEmail, ValidationError> {
    if body.trim().is_empty() {
        return Err(ValidationError::EmailBodyRequired);
    }
    let subject = if subject.trim().is_empty() {
        NO_SUBJECT.to_string()
    } else {
        subject.to_string()
    };
    Ok(ComposedEmail {
        subject,
        body: body.to_string(),
    })
}
