//! Gmail REST API mailbox client
//!
//! Uses three endpoints of the Gmail API v1:
//! - `users.messages.list` for paged message ids
//! - `users.messages.get` (`format=full`) for headers and the part tree
//! - `users.messages.attachments.get` for attachment bytes

use crate::auth::Token;
use crate::config::ApiSettings;
use crate::error::{Error, Result};
use crate::mailbox::{MailboxClient, MessagePage};
use crate::message::{AttachmentBody, AttachmentPart, MessageDetail, MessageRef};
use base64::prelude::*;
use reqwest::StatusCode;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};

const RETRY_BASE_DELAY: Duration = Duration::from_millis(500);

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListResponse {
    messages: Option<Vec<MessageStub>>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MessageStub {
    id: String,
}

#[derive(Debug, Deserialize)]
struct GmailMessage {
    payload: Option<GmailPart>,
}

/// A node of the MIME tree. The message payload is one too.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GmailPart {
    #[serde(default)]
    filename: String,
    headers: Option<Vec<GmailHeader>>,
    body: Option<GmailBody>,
    parts: Option<Vec<GmailPart>>,
}

#[derive(Debug, Deserialize)]
struct GmailHeader {
    name: String,
    value: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GmailBody {
    attachment_id: Option<String>,
    data: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AttachmentResponse {
    data: String,
}

/// Mailbox client for the Gmail REST API.
#[derive(Debug, Clone)]
pub struct GmailClient {
    http: reqwest::Client,
    base_url: String,
    token: Token,
    page_size: u32,
    retry_attempts: u32,
}

impl GmailClient {
    #[must_use]
    pub fn new(base_url: impl Into<String>, token: Token) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
            page_size: 100,
            retry_attempts: 0,
        }
    }

    /// Build a client with the page size, retry count and request
    /// timeout from the settings.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the HTTP client cannot be built.
    pub fn from_settings(api: &ApiSettings, token: Token) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(api.timeout_secs))
            .build()
            .map_err(|e| Error::Config(format!("Cannot build HTTP client: {e}")))?;

        Ok(Self {
            http,
            ..Self::new(&api.base_url, token)
        }
        .with_page_size(api.page_size)
        .with_retries(api.retry_attempts))
    }

    #[must_use]
    pub const fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    /// Retry transient failures this many extra times per call.
    #[must_use]
    pub const fn with_retries(mut self, attempts: u32) -> Self {
        self.retry_attempts = attempts;
        self
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> Result<T> {
        let mut attempt = 0;
        loop {
            match self.get_once(path, query).await {
                Err(e) if e.is_transient() && attempt < self.retry_attempts => {
                    attempt += 1;
                    warn!("GET {} failed ({}), retry {}/{}", path, e, attempt, self.retry_attempts);
                    tokio::time::sleep(RETRY_BASE_DELAY * attempt).await;
                }
                other => return other,
            }
        }
    }

    async fn get_once<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        debug!("GET {}", url);

        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.token.access_token)
            .query(query)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, &body));
        }

        response
            .json()
            .await
            .map_err(|e| Error::permanent(format!("Unexpected response from {path}: {e}")))
    }
}

impl MailboxClient for GmailClient {
    async fn list_messages(&self, page_token: Option<&str>) -> Result<MessagePage> {
        let page_size = self.page_size.to_string();
        let mut query = vec![("maxResults", page_size.as_str())];
        if let Some(token) = page_token {
            query.push(("pageToken", token));
        }

        let list: ListResponse = self.get_json("/messages", &query).await?;
        Ok(MessagePage {
            ids: list
                .messages
                .unwrap_or_default()
                .into_iter()
                .map(|m| MessageRef(m.id))
                .collect(),
            next_page_token: list.next_page_token.filter(|t| !t.is_empty()),
        })
    }

    async fn get_message(&self, id: &MessageRef) -> Result<MessageDetail> {
        let path = format!("/messages/{id}");
        let message: GmailMessage = self.get_json(&path, &[("format", "full")]).await?;
        let payload = message.payload.unwrap_or_default();

        let headers = payload
            .headers
            .iter()
            .flatten()
            .map(|h| (h.name.clone(), h.value.clone()))
            .collect();

        let mut parts = Vec::new();
        collect_parts(payload, &mut parts);

        Ok(MessageDetail { headers, parts })
    }

    async fn get_attachment(&self, message_id: &MessageRef, attachment_ref: &str) -> Result<Vec<u8>> {
        let path = format!("/messages/{message_id}/attachments/{attachment_ref}");
        let attachment: AttachmentResponse = self.get_json(&path, &[]).await?;
        decode_base64url(&attachment.data)
    }
}

/// Flatten the MIME tree depth-first, keeping leaves only.
fn collect_parts(part: GmailPart, out: &mut Vec<AttachmentPart>) {
    match part.parts {
        Some(children) if !children.is_empty() => {
            for child in children {
                collect_parts(child, out);
            }
        }
        _ => {
            let body = part.body.and_then(|b| match (b.attachment_id, b.data) {
                (Some(id), _) => Some(AttachmentBody::Remote(id)),
                (None, Some(data)) => decode_base64url(&data).ok().map(AttachmentBody::Inline),
                (None, None) => None,
            });
            out.push(AttachmentPart {
                filename: part.filename,
                body,
            });
        }
    }
}

/// Gmail sends base64url, sometimes with padding.
fn decode_base64url(data: &str) -> Result<Vec<u8>> {
    BASE64_URL_SAFE_NO_PAD
        .decode(data.trim().trim_end_matches('='))
        .map_err(|e| Error::permanent(format!("Invalid base64url attachment data: {e}")))
}

fn status_error(status: StatusCode, body: &str) -> Error {
    let message = format!("HTTP {status}: {}", body.trim());
    match status.as_u16() {
        401 | 403 => Error::Auth(message),
        429 | 500..=599 => Error::transient(message),
        _ => Error::permanent(message),
    }
}
