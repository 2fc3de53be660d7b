//! In-process fake Gmail API server for integration testing
//!
//! # How the Gmail API looks on the wire
//!
//! The Gmail API is plain JSON over HTTPS. Every API request carries
//! the OAuth access token as `Authorization: Bearer <token>`; a wrong
//! or missing token gets `401`. The three read endpoints the
//! downloader uses are:
//!
//! ```text
//!   GET /gmail/v1/users/me/messages?maxResults=N&pageToken=T
//!   GET /gmail/v1/users/me/messages/{id}?format=full
//!   GET /gmail/v1/users/me/messages/{id}/attachments/{attachmentId}
//! ```
//!
//! Access tokens are short-lived. The client trades its refresh token
//! for a new one with a form POST to the OAuth token endpoint, served
//! here at `/token`.
//!
//! The fake speaks plain HTTP on `127.0.0.1`, one request per
//! connection.

use super::handlers::{handle_attachment, handle_list, handle_message, handle_token};
use super::io::{Request, Response, read_request, write_response};
use super::mailbox::Mailbox;
use std::sync::{Arc, Mutex};
use tokio::io::BufReader;
use tokio::net::TcpListener;

const API_PREFIX: &str = "/gmail/v1/users/me";

/// A fake Gmail server on localhost with an OS-assigned port.
pub struct FakeGmailServer {
    port: u16,
    mailbox: Arc<Mutex<Mailbox>>,
    /// Handle to the background task so it lives as long as the server.
    _handle: tokio::task::JoinHandle<()>,
}

impl FakeGmailServer {
    /// Start a new fake server with the given mailbox state.
    ///
    /// Binds to `127.0.0.1:0` and spawns the accept loop. The server
    /// runs until the runtime shuts down.
    pub async fn start(mailbox: Mailbox) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind to ephemeral port");
        let port = listener.local_addr().unwrap().port();
        let mailbox = Arc::new(Mutex::new(mailbox));

        let shared = mailbox.clone();
        let handle = tokio::spawn(async move {
            loop {
                let Ok((stream, _addr)) = listener.accept().await else {
                    break;
                };
                let mailbox = shared.clone();
                tokio::spawn(async move {
                    handle_connection(stream, &mailbox).await;
                });
            }
        });

        Self {
            port,
            mailbox,
            _handle: handle,
        }
    }

    pub const fn port(&self) -> u16 {
        self.port
    }

    /// Base URL of the Gmail API for `users/me`.
    pub fn api_base(&self) -> String {
        format!("http://127.0.0.1:{}{API_PREFIX}", self.port)
    }

    pub fn token_url(&self) -> String {
        format!("http://127.0.0.1:{}/token", self.port)
    }

    /// Every request seen so far as `METHOD path`.
    pub fn requests(&self) -> Vec<String> {
        self.mailbox.lock().unwrap().requests.clone()
    }

    /// The access token API endpoints currently accept.
    pub fn access_token(&self) -> String {
        self.mailbox.lock().unwrap().access_token.clone()
    }
}

async fn handle_connection(stream: tokio::net::TcpStream, mailbox: &Mutex<Mailbox>) {
    let mut reader = BufReader::new(stream);
    let Some(request) = read_request(&mut reader).await else {
        return;
    };
    let response = route(&request, mailbox);
    let _ = write_response(reader.get_mut(), &response).await;
}

/// Dispatch one request. Records it, applies failure injection and the
/// bearer check, then hands a snapshot to the endpoint handler.
fn route(request: &Request, mailbox: &Mutex<Mailbox>) -> Response {
    let mut state = mailbox.lock().unwrap();
    state
        .requests
        .push(format!("{} {}", request.method, request.path));

    if request.method == "POST" && request.path == "/token" {
        let (response, token) = handle_token(request, &state);
        if let Some(token) = token {
            state.access_token = token;
        }
        return response;
    }

    if state.fail_first > 0 {
        state.fail_first -= 1;
        return Response::error(503, "Service Unavailable");
    }

    if request.bearer() != Some(state.access_token.as_str()) {
        return Response::error(401, "Request had invalid authentication credentials.");
    }

    let snap = state.clone();
    drop(state);

    let Some(rest) = request.path.strip_prefix(API_PREFIX) else {
        return Response::error(404, "Not Found");
    };
    let segments: Vec<&str> = rest.split('/').filter(|s| !s.is_empty()).collect();

    match (request.method.as_str(), segments.as_slice()) {
        ("GET", ["messages"]) => handle_list(request, &snap),
        ("GET", ["messages", id]) => handle_message(request, id, &snap),
        ("GET", ["messages", id, "attachments", aid]) => {
            handle_attachment(request, id, aid, &snap)
        }
        _ => Response::error(404, "Not Found"),
    }
}
