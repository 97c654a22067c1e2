//! Message body extraction: turns a provider payload tree into bounded plain text.
//!
//! Pure string processing, no network. Never fails: undecodable or missing
//! content yields an empty body.

use std::sync::LazyLock;

use base64::Engine;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use regex::Regex;
use tracing::debug;

use super::types::{MessagePart, NormalizedEmail, RawMessage};

/// Maximum body length (in chars) before truncation.
pub const MAX_BODY_CHARS: usize = 500;

/// Appended to truncated bodies.
pub const TRUNCATION_MARKER: &str = "...";

pub const DEFAULT_SUBJECT: &str = "No Subject";
pub const DEFAULT_SENDER: &str = "Unknown Sender";

/// URL-safe decoder that tolerates padding and loose trailing bits.
const LENIENT_URL_SAFE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

static HTML_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").expect("HTML tag pattern is valid"));

/// Build the caller-facing view of a raw message.
pub fn normalize(raw: &RawMessage) -> NormalizedEmail {
    NormalizedEmail {
        id: raw.id.clone(),
        thread_id: raw.thread_id.clone(),
        subject: raw
            .header("Subject")
            .unwrap_or(DEFAULT_SUBJECT)
            .to_string(),
        from: raw.header("From").unwrap_or(DEFAULT_SENDER).to_string(),
        to: raw.header("To").unwrap_or_default().to_string(),
        date: raw.header("Date").unwrap_or_default().to_string(),
        snippet: raw.snippet.clone(),
        body: extract_body(&raw.payload),
    }
}

/// Extract the normalized plain-text body from a payload tree.
///
/// A body carried directly by the root wins. Otherwise the first `text/plain`
/// part (depth-first) is used, then the first `text/html` part with tags
/// stripped. A `text/plain` part that decodes to nothing still wins over HTML.
pub fn extract_body(payload: &MessagePart) -> String {
    let text = if let Some(data) = payload.body_data() {
        decode_base64(data)
    } else if let Some(plain) = first_part_data(&payload.parts, "text/plain") {
        decode_base64(plain)
    } else if let Some(html) = first_part_data(&payload.parts, "text/html") {
        strip_tags(&decode_base64(html))
    } else {
        String::new()
    };

    truncate_body(text.replace("\r\n", "\n").trim())
}

/// Depth-first search for the first part of `mime_type` that carries body data.
fn first_part_data<'a>(parts: &'a [MessagePart], mime_type: &str) -> Option<&'a str> {
    for part in parts {
        if part.mime_type.eq_ignore_ascii_case(mime_type) {
            if let Some(data) = part.body_data() {
                return Some(data);
            }
        }
        if let Some(data) = first_part_data(&part.parts, mime_type) {
            return Some(data);
        }
    }
    None
}

/// Decode base64 body data as (lossy) UTF-8.
///
/// Accepts both the URL-safe and standard alphabets, with or without padding.
pub fn decode_base64(data: &str) -> String {
    let normalized: String = data
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .map(|c| match c {
            '+' => '-',
            '/' => '_',
            other => other,
        })
        .collect();

    match LENIENT_URL_SAFE.decode(normalized.as_bytes()) {
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(e) => {
            debug!(error = %e, "Undecodable body data, treating as empty");
            String::new()
        }
    }
}

/// Remove everything matching `<[^>]*>`. Best effort; never fails.
pub fn strip_tags(html: &str) -> String {
    HTML_TAG.replace_all(html, "").into_owned()
}

/// Truncate to `MAX_BODY_CHARS` chars and append `...` when longer.
pub fn truncate_body(text: &str) -> String {
    match text.char_indices().nth(MAX_BODY_CHARS) {
        Some((cut, _)) => format!("{}{}", &text[..cut], TRUNCATION_MARKER),
        None => text.to_string(),
    }
}
