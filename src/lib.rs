//! Gmail attachment downloader
//!
//! Walks a Gmail mailbox through the REST API, filters messages by
//! sender and date and attachments by extension and filename keywords,
//! and saves the accepted files under
//! `<download_root>/<year>/<quarter>/<sender>/`.
//!
//! The mailbox is reached through the [`MailboxClient`] trait;
//! [`GmailClient`] is the production implementation and authenticates
//! with a token from a [`CredentialProvider`] such as
//! [`TokenFileProvider`]. [`AttachmentPipeline`] drives a run and
//! returns [`RunStats`].

mod auth;
mod config;
mod date_range;
mod enumerate;
mod error;
mod filter;
mod gmail;
mod mailbox;
mod message;
mod path;
mod pipeline;
mod sanitize;

pub use auth::{CredentialProvider, REMEDIATION, StoredToken, Token, TokenFileProvider};
pub use config::{
    ApiSettings, DEFAULT_API_BASE, DEFAULT_SETTINGS_PATH, DEFAULT_TOKEN_URL, Settings,
};
pub use date_range::{DateRange, in_range};
pub use enumerate::{Enumeration, list_message_ids};
pub use error::{Error, Result};
pub use filter::{AttachmentFilter, Rejection, SenderFilter};
pub use gmail::GmailClient;
pub use mailbox::{MailboxClient, MessagePage};
pub use message::{
    AttachmentBody, AttachmentPart, MessageDetail, MessageRef, MessageSummary, NO_SUBJECT,
    UNKNOWN_SENDER, parse_date,
};
pub use path::{PathResolver, Quarter};
pub use pipeline::{AttachmentOutcome, AttachmentPipeline, MessageOutcome, RunStats, SkipReason};
pub use sanitize::FilenameSanitizer;
