//! Message and attachment types shared by the mailbox client and the
//! pipeline

use chrono::{DateTime, FixedOffset, Local};
use serde::Serialize;
use std::fmt;
use tracing::debug;

pub const UNKNOWN_SENDER: &str = "Unknown";
pub const NO_SUBJECT: &str = "(no subject)";

/// Opaque message identifier returned by enumeration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct MessageRef(pub String);

impl MessageRef {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MessageRef {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for MessageRef {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Where an attachment's bytes come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttachmentBody {
    /// Fetched separately with the mailbox client.
    Remote(String),
    /// Small parts the API already returned inline, decoded.
    Inline(Vec<u8>),
}

/// A message part that may be a file attachment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentPart {
    /// Empty for body parts that are not attachments.
    pub filename: String,
    pub body: Option<AttachmentBody>,
}

impl AttachmentPart {
    #[must_use]
    pub fn remote(filename: impl Into<String>, attachment_ref: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            body: Some(AttachmentBody::Remote(attachment_ref.into())),
        }
    }
}

/// A message as returned by the mailbox client: raw headers plus the
/// flattened part list.
#[derive(Debug, Clone, Default)]
pub struct MessageDetail {
    pub headers: Vec<(String, String)>,
    pub parts: Vec<AttachmentPart>,
}

impl MessageDetail {
    /// First header with this name, compared case-insensitively.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// The fields the pipeline needs from one message.
#[derive(Debug, Clone)]
pub struct MessageSummary {
    pub sender: String,
    pub subject: String,
    pub received_at: DateTime<FixedOffset>,
    pub attachment_parts: Vec<AttachmentPart>,
}

impl MessageSummary {
    /// Extract sender, subject and date from the headers.
    ///
    /// A missing or unparsable `Date` header falls back to the current
    /// local time.
    #[must_use]
    pub fn from_detail(detail: MessageDetail) -> Self {
        let sender = detail.header("From").unwrap_or(UNKNOWN_SENDER).to_string();
        let subject = detail.header("Subject").unwrap_or(NO_SUBJECT).to_string();
        let received_at = detail
            .header("Date")
            .and_then(parse_date)
            .unwrap_or_else(|| Local::now().fixed_offset());

        Self {
            sender,
            subject,
            received_at,
            attachment_parts: detail.parts,
        }
    }
}

/// Parse an RFC 2822 `Date` header, tolerating a trailing comment such
/// as `(UTC)` or `(CEST)`.
#[must_use]
pub fn parse_date(value: &str) -> Option<DateTime<FixedOffset>> {
    let trimmed = value.trim();
    let without_comment = match trimmed.rfind('(') {
        Some(idx) if trimmed.ends_with(')') => trimmed[..idx].trim_end(),
        _ => trimmed,
    };

    DateTime::parse_from_rfc2822(without_comment)
        .inspect_err(|e| debug!("Unparsable Date header '{}': {}", value, e))
        .ok()
}
