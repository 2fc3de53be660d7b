//! The mailbox API seam
//!
//! The pipeline only ever talks to a [`MailboxClient`]. [`GmailClient`]
//! is the production implementation; tests substitute in-memory ones.
//!
//! [`GmailClient`]: crate::GmailClient

use crate::error::Result;
use crate::message::{MessageDetail, MessageRef};
use std::future::Future;

/// One page of message ids.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessagePage {
    pub ids: Vec<MessageRef>,
    /// Present when more pages follow.
    pub next_page_token: Option<String>,
}

/// Read-only access to a remote mailbox.
///
/// Every call may fail with [`Error::Remote`]; the caller decides
/// whether that is fatal.
///
/// [`Error::Remote`]: crate::Error::Remote
pub trait MailboxClient {
    /// List one page of message ids, starting at `page_token`.
    fn list_messages(
        &self,
        page_token: Option<&str>,
    ) -> impl Future<Output = Result<MessagePage>> + Send;

    /// Fetch headers and attachment parts for one message.
    fn get_message(&self, id: &MessageRef) -> impl Future<Output = Result<MessageDetail>> + Send;

    /// Fetch and decode one attachment's bytes.
    fn get_attachment(
        &self,
        message_id: &MessageRef,
        attachment_ref: &str,
    ) -> impl Future<Output = Result<Vec<u8>>> + Send;
}
