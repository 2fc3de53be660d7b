//! Attachment and sender filters
//!
//! Both filters use plain substring matching. Folding is a simple
//! lowercase unless `case_sensitive` is set, in which case the
//! configured lists are compared verbatim. An empty list never
//! rejects anything.

use crate::config::Settings;
use thiserror::Error;

/// Why an attachment was not saved.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    #[error("not an attachment")]
    NotAnAttachment,

    #[error("extension '{0}' not allowed")]
    Extension(String),

    #[error("no allowed keyword in filename")]
    NoAllowedKeyword,

    #[error("denied keyword '{0}' in filename")]
    DeniedKeyword(String),

    #[error("download limit reached")]
    LimitReached,
}

/// Decides whether an attachment filename passes the extension and
/// keyword rules.
#[derive(Debug, Clone, Copy)]
pub struct AttachmentFilter<'a> {
    settings: &'a Settings,
}

impl<'a> AttachmentFilter<'a> {
    #[must_use]
    pub const fn new(settings: &'a Settings) -> Self {
        Self { settings }
    }

    /// Run every configured rule in order, stopping at the first
    /// rejection.
    ///
    /// # Errors
    ///
    /// Returns the [`Rejection`] for the first rule the filename fails.
    pub fn check(&self, filename: &str) -> Result<(), Rejection> {
        let s = self.settings;

        if filename.is_empty() {
            return Err(Rejection::NotAnAttachment);
        }

        if !s.allowed_extensions.is_empty() {
            let ext = extension(filename).to_lowercase();
            if !s.allowed_extensions.contains(&ext) {
                return Err(Rejection::Extension(ext));
            }
        }

        let folded = s.fold(filename);

        if !s.allow_keywords.is_empty()
            && !s.allow_keywords.iter().any(|kw| folded.contains(kw.as_str()))
        {
            return Err(Rejection::NoAllowedKeyword);
        }

        if let Some(kw) = s.deny_keywords.iter().find(|kw| folded.contains(kw.as_str())) {
            return Err(Rejection::DeniedKeyword(kw.clone()));
        }

        Ok(())
    }

    #[must_use]
    pub fn accepts(&self, filename: &str) -> bool {
        self.check(filename).is_ok()
    }
}

/// Decides whether a message sender passes the allow and deny lists.
#[derive(Debug, Clone, Copy)]
pub struct SenderFilter<'a> {
    settings: &'a Settings,
}

impl<'a> SenderFilter<'a> {
    #[must_use]
    pub const fn new(settings: &'a Settings) -> Self {
        Self { settings }
    }

    #[must_use]
    pub fn accepts(&self, sender: &str) -> bool {
        let s = self.settings;
        let folded = s.fold(sender);

        let allowed = s.allow_senders.is_empty()
            || s.allow_senders.iter().any(|a| folded.contains(a.as_str()));
        let denied = s.deny_senders.iter().any(|d| folded.contains(d.as_str()));

        allowed && !denied
    }
}

/// Text after the last `.`, or empty when there is none.
fn extension(filename: &str) -> &str {
    filename.rsplit_once('.').map_or("", |(_, ext)| ext)
}
