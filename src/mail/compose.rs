//! Reply composition: threading headers and base64url envelope construction.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;

use crate::error::ValidationError;

use super::types::{OriginalHeaders, ReplyEnvelope};

/// Reply subject: unchanged when already prefixed `Re:` (case-sensitive).
pub fn reply_subject(original: &str) -> String {
    if original.starts_with("Re:") {
        original.to_string()
    } else {
        format!("Re: {original}")
    }
}

/// References chain: ancestors followed by the original Message-ID.
pub fn references_chain(references: &str, message_id: &str) -> String {
    match (references.trim(), message_id.trim()) {
        ("", id) => id.to_string(),
        (refs, "") => refs.to_string(),
        (refs, id) => format!("{refs} {id}"),
    }
}

/// Build the reply envelope for `original`, addressed to its sender.
pub fn compose_reply(
    original: &OriginalHeaders,
    reply_text: &str,
) -> Result<ReplyEnvelope, ValidationError> {
    let to = single_line(&original.from);
    if to.trim().is_empty() {
        return Err(ValidationError::MissingRecipient);
    }

    let subject = single_line(&reply_subject(&original.subject));
    let in_reply_to = single_line(original.message_id.trim());
    let references = single_line(&references_chain(
        &original.references,
        &original.message_id,
    ));

    let message = assemble(&to, &subject, &in_reply_to, &references, reply_text);
    let raw = URL_SAFE_NO_PAD.encode(message.as_bytes());

    Ok(ReplyEnvelope {
        to,
        subject,
        in_reply_to,
        references,
        body: reply_text.to_string(),
        raw,
    })
}

/// Assemble the message text in fixed header order.
pub fn assemble(
    to: &str,
    subject: &str,
    in_reply_to: &str,
    references: &str,
    body: &str,
) -> String {
    [
        "MIME-Version: 1.0".to_string(),
        format!("To: {to}"),
        format!("Subject: {subject}"),
        format!("In-Reply-To: {in_reply_to}"),
        format!("References: {references}"),
        "Content-Type: text/plain; charset=utf-8".to_string(),
        "Content-Transfer-Encoding: quoted-printable".to_string(),
        String::new(),
        body.to_string(),
    ]
    .join("\n")
}

/// Header values must not break onto a new line.
fn single_line(value: &str) -> String {
    value.replace(['\r', '\n'], " ")
}
