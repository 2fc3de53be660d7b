//! Destination directory layout
//!
//! Attachments land in `<root>/<year>/T<quarter>/<sender>/`. The
//! quarter label uses a `T` prefix (trimestre) so existing archives
//! keep their layout.

use crate::config::Settings;
use crate::message::UNKNOWN_SENDER;
use crate::sanitize::FilenameSanitizer;
use chrono::{DateTime, Datelike, FixedOffset};
use std::fmt;
use std::path::PathBuf;

/// A calendar quarter.
///
/// # Examples
///
/// ```
/// use attach_downloader::Quarter;
///
/// assert_eq!(Quarter::from_month(7), Quarter::T3);
/// assert_eq!(Quarter::T3.as_str(), "T3");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Quarter {
    /// January to March.
    T1,
    /// April to June.
    T2,
    /// July to September.
    T3,
    /// October to December.
    T4,
}

impl Quarter {
    /// Quarter for a 1-based month. Out-of-range months fall into `T1`.
    #[must_use]
    pub const fn from_month(month: u32) -> Self {
        match month {
            4..=6 => Self::T2,
            7..=9 => Self::T3,
            10..=12 => Self::T4,
            _ => Self::T1,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::T1 => "T1",
            Self::T2 => "T2",
            Self::T3 => "T3",
            Self::T4 => "T4",
        }
    }
}

impl fmt::Display for Quarter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Derives the destination directory for a message's attachments.
///
/// Pure: it never touches the filesystem.
#[derive(Debug, Clone)]
pub struct PathResolver<'a> {
    settings: &'a Settings,
    sanitizer: FilenameSanitizer,
}

impl<'a> PathResolver<'a> {
    #[must_use]
    pub const fn new(settings: &'a Settings) -> Self {
        Self {
            settings,
            sanitizer: FilenameSanitizer::new(settings.max_filename_length)
                .replace_spaces(settings.replace_spaces),
        }
    }

    #[must_use]
    pub fn resolve(&self, received_at: DateTime<FixedOffset>, sender: &str) -> PathBuf {
        let quarter = Quarter::from_month(received_at.month());
        self.settings
            .download_root
            .join(received_at.year().to_string())
            .join(quarter.as_str())
            .join(self.sender_bucket(sender))
    }

    /// Directory name for a sender: the whole address, or just its
    /// domain when `use_domain_only` is set. Blank values go to
    /// [`UNKNOWN_SENDER`].
    #[must_use]
    pub fn sender_bucket(&self, sender: &str) -> String {
        let name = if self.settings.use_domain_only {
            domain_of(sender).unwrap_or(sender)
        } else {
            sender
        };
        if name.trim().is_empty() {
            return UNKNOWN_SENDER.to_string();
        }
        self.sanitizer.sanitize(name)
    }
}

/// `"Acme <billing@acme.com>"` -> `"acme.com"`.
fn domain_of(sender: &str) -> Option<&str> {
    sender
        .split_once('@')
        .map(|(_, domain)| domain.trim_end().trim_end_matches('>').trim())
}
