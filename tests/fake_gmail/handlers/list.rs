//! `users.messages.list` handler.
//!
//! Page tokens are plain offsets into the message list. The page size
//! comes from `maxResults` (default 100, like Gmail):
//!
//! ```text
//! GET /gmail/v1/users/me/messages?maxResults=2&pageToken=2
//! {"messages": [{"id": "m3", "threadId": "m3"}], "resultSizeEstimate": 1}
//! ```

use crate::fake_gmail::io::{Request, Response};
use crate::fake_gmail::mailbox::Mailbox;
use serde_json::json;

/// Handle a list request.
pub fn handle_list(request: &Request, mailbox: &Mailbox) -> Response {
    let page_token = request.query.get("pageToken");
    if page_token.is_some() && page_token == mailbox.broken_page_token.as_ref() {
        return Response::error(500, "Backend Error");
    }

    let page_size: usize = request
        .query
        .get("maxResults")
        .and_then(|v| v.parse().ok())
        .unwrap_or(100);
    let offset: usize = page_token.and_then(|t| t.parse().ok()).unwrap_or(0);

    let page: Vec<_> = mailbox
        .messages
        .iter()
        .skip(offset)
        .take(page_size)
        .map(|m| json!({ "id": m.id, "threadId": m.id }))
        .collect();

    let next = offset + page_size;
    let mut body = json!({ "resultSizeEstimate": page.len() });
    if !page.is_empty() {
        body["messages"] = json!(page);
    }
    if next < mailbox.messages.len() {
        body["nextPageToken"] = json!(next.to_string());
    }
    Response::ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake_gmail::mailbox::MailboxBuilder;
    use std::collections::HashMap;

    fn request(query: &[(&str, &str)]) -> Request {
        Request {
            method: "GET".into(),
            path: "/gmail/v1/users/me/messages".into(),
            query: query
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
            headers: HashMap::new(),
            body: String::new(),
        }
    }

    fn three_messages() -> Mailbox {
        MailboxBuilder::new()
            .message("m1", "a@x.com", "1", "Mon, 1 Jan 2024 00:00:00 +0000")
            .message("m2", "a@x.com", "2", "Mon, 1 Jan 2024 00:00:00 +0000")
            .message("m3", "a@x.com", "3", "Mon, 1 Jan 2024 00:00:00 +0000")
            .build()
    }

    #[test]
    fn pages_by_offset() {
        let mailbox = three_messages();
        let first = handle_list(&request(&[("maxResults", "2")]), &mailbox);
        assert_eq!(first.body["messages"][1]["id"], "m2");
        assert_eq!(first.body["nextPageToken"], "2");

        let second = handle_list(&request(&[("maxResults", "2"), ("pageToken", "2")]), &mailbox);
        assert_eq!(second.body["messages"][0]["id"], "m3");
        assert!(second.body.get("nextPageToken").is_none());
    }

    #[test]
    fn empty_mailbox_has_no_messages_key() {
        let mailbox = MailboxBuilder::new().build();
        let response = handle_list(&request(&[]), &mailbox);
        assert!(response.body.get("messages").is_none());
    }

    #[test]
    fn broken_page_fails() {
        let mailbox = MailboxBuilder::new().broken_page("2").build();
        let response = handle_list(&request(&[("pageToken", "2")]), &mailbox);
        assert_eq!(response.status, 500);
    }
}
