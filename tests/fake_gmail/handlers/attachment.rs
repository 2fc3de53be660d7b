//! `users.messages.attachments.get` handler.

use super::encode;
use crate::fake_gmail::io::{Request, Response};
use crate::fake_gmail::mailbox::Mailbox;
use serde_json::json;

/// Handle an attachment request. Answers 404 for unknown ids.
pub fn handle_attachment(
    _request: &Request,
    message_id: &str,
    attachment_id: &str,
    mailbox: &Mailbox,
) -> Response {
    mailbox
        .get_message(message_id)
        .and_then(|m| m.attachments.iter().find(|a| a.id == attachment_id))
        .map_or_else(
            || Response::error(404, "Invalid attachment token"),
            |a| Response::ok(json!({ "size": a.data.len(), "data": encode(&a.data) })),
        )
}
