//! Fake Gmail API server for integration testing
//!
//! This module provides an in-process HTTP server that speaks enough
//! of the Gmail REST API (and the OAuth token endpoint) to test
//! `GmailClient`, `TokenFileProvider` and the CLI end-to-end:
//!
//! TCP -> one HTTP/1.1 request -> JSON response -> close
//!
//! ## Module layout
//!
//! - `server` -- TCP listener, request parsing, and routing
//! - `handlers/` -- one file per endpoint (list, message, attachment, token)
//! - `mailbox` -- test data model (messages, attachments, builder)
//! - `io` -- request reading and response writing helpers

mod handlers;
mod server;

pub use mailbox::MailboxBuilder;
pub use server::FakeGmailServer;
