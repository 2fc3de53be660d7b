//! OAuth token endpoint handler.
//!
//! Accepts a `refresh_token` grant for the mailbox's refresh token and
//! returns the refreshed access token, like Google's endpoint:
//!
//! ```text
//! POST /token
//! client_id=..&client_secret=..&refresh_token=..&grant_type=refresh_token
//! {"access_token": "ya29...", "expires_in": 3599, "token_type": "Bearer"}
//! ```

use crate::fake_gmail::io::{Request, Response};
use crate::fake_gmail::mailbox::Mailbox;
use serde_json::json;

/// Handle a token request. Returns the response and, on success, the
/// access token the server should accept from now on.
pub fn handle_token(request: &Request, mailbox: &Mailbox) -> (Response, Option<String>) {
    let form = request.form();
    let valid = form.get("grant_type").map(String::as_str) == Some("refresh_token")
        && form.get("refresh_token") == Some(&mailbox.refresh_token)
        && form.contains_key("client_id");

    if !valid {
        return (
            Response {
                status: 400,
                body: json!({ "error": "invalid_grant", "error_description": "Bad Request" }),
            },
            None,
        );
    }

    let token = mailbox.refreshed_token.clone();
    (
        Response::ok(json!({
            "access_token": token,
            "expires_in": 3599,
            "scope": "https://www.googleapis.com/auth/gmail.readonly",
            "token_type": "Bearer"
        })),
        Some(token),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake_gmail::mailbox::{DEFAULT_REFRESH_TOKEN, MailboxBuilder};
    use std::collections::HashMap;

    fn post(body: &str) -> Request {
        Request {
            method: "POST".into(),
            path: "/token".into(),
            query: HashMap::new(),
            headers: HashMap::new(),
            body: body.into(),
        }
    }

    #[test]
    fn refresh_grant_issues_new_token() {
        let mailbox = MailboxBuilder::new().build();
        let body = format!(
            "client_id=id&client_secret=s&refresh_token={}&grant_type=refresh_token",
            DEFAULT_REFRESH_TOKEN.replace('/', "%2F")
        );
        let (response, token) = handle_token(&post(&body), &mailbox);
        assert_eq!(response.status, 200);
        assert_eq!(token.as_deref(), Some("ya29.refreshed"));
    }

    #[test]
    fn wrong_refresh_token_is_invalid_grant() {
        let mailbox = MailboxBuilder::new().build();
        let (response, token) = handle_token(
            &post("client_id=id&refresh_token=nope&grant_type=refresh_token"),
            &mailbox,
        );
        assert_eq!(response.status, 400);
        assert_eq!(response.body["error"], "invalid_grant");
        assert!(token.is_none());
    }
}
