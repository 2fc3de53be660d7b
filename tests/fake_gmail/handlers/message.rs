//! `users.messages.get` handler (`format=full`).
//!
//! Builds a `multipart/mixed` payload: a nested `multipart/alternative`
//! with the text body first, then one leaf per attachment carrying an
//! `attachmentId`. This mirrors the shape Gmail returns for a typical
//! invoice mail.

use super::encode;
use crate::fake_gmail::io::{Request, Response};
use crate::fake_gmail::mailbox::{Mailbox, TestMessage};
use serde_json::{Value, json};

/// Handle a message request for `id`.
pub fn handle_message(_request: &Request, id: &str, mailbox: &Mailbox) -> Response {
    mailbox.get_message(id).map_or_else(
        || Response::error(404, "Requested entity was not found."),
        |message| Response::ok(json!({ "id": message.id, "payload": payload(message) })),
    )
}

fn payload(message: &TestMessage) -> Value {
    let headers: Vec<Value> = message
        .headers
        .iter()
        .map(|(name, value)| json!({ "name": name, "value": value }))
        .collect();

    let mut parts = vec![json!({
        "mimeType": "multipart/alternative",
        "filename": "",
        "body": { "size": 0 },
        "parts": [
            {
                "mimeType": "text/plain",
                "filename": "",
                "body": { "size": 5, "data": encode(b"hello") }
            },
            {
                "mimeType": "text/html",
                "filename": "",
                "body": { "size": 12, "data": encode(b"<p>hello</p>") }
            }
        ]
    })];

    parts.extend(message.attachments.iter().map(|a| {
        json!({
            "mimeType": "application/octet-stream",
            "filename": a.filename,
            "body": { "attachmentId": a.id, "size": a.data.len() }
        })
    }));

    json!({
        "mimeType": "multipart/mixed",
        "filename": "",
        "headers": headers,
        "body": { "size": 0 },
        "parts": parts
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake_gmail::mailbox::MailboxBuilder;
    use std::collections::HashMap;

    fn request() -> Request {
        Request {
            method: "GET".into(),
            path: String::new(),
            query: HashMap::new(),
            headers: HashMap::new(),
            body: String::new(),
        }
    }

    #[test]
    fn attachments_follow_the_body() {
        let mailbox = MailboxBuilder::new()
            .message("m1", "a@x.com", "Invoice", "Mon, 1 Jan 2024 00:00:00 +0000")
            .attachment("invoice.pdf", b"pdf")
            .build();
        let response = handle_message(&request(), "m1", &mailbox);

        let parts = &response.body["payload"]["parts"];
        assert_eq!(parts[1]["filename"], "invoice.pdf");
        assert_eq!(parts[1]["body"]["attachmentId"], "m1-att0");
        assert_eq!(response.body["payload"]["headers"][0]["name"], "From");
    }

    #[test]
    fn unknown_id_is_404() {
        let mailbox = MailboxBuilder::new().build();
        assert_eq!(handle_message(&request(), "nope", &mailbox).status, 404);
    }
}
