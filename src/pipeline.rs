//! The download pipeline
//!
//! One pass over the mailbox: enumerate ids, then fully process each
//! message (filters, path, fetch, write) before starting the next.
//! Per-message and per-attachment failures are recorded as outcomes
//! and never stop the run.

use crate::config::Settings;
use crate::date_range::DateRange;
use crate::enumerate::list_message_ids;
use crate::error::{Error, Result};
use crate::filter::{AttachmentFilter, Rejection, SenderFilter};
use crate::mailbox::MailboxClient;
use crate::message::{AttachmentBody, AttachmentPart, MessageRef, MessageSummary};
use crate::path::PathResolver;
use crate::sanitize::FilenameSanitizer;
use chrono::Local;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Counters for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunStats {
    pub total_messages: usize,
    /// Messages carrying at least one named part, saved or not.
    pub messages_with_attachments: usize,
    pub files_downloaded: usize,
    pub files_filtered: usize,
    /// Messages or attachments that failed with an error.
    pub errors: usize,
    /// The message list stopped early because a page request failed.
    pub incomplete: bool,
}

impl RunStats {
    fn record(&mut self, outcome: &MessageOutcome) {
        match outcome {
            MessageOutcome::Failed(_) => self.errors += 1,
            MessageOutcome::Skipped(_) => {}
            MessageOutcome::Processed(attachments) => {
                self.messages_with_attachments += 1;
                for attachment in attachments {
                    match attachment {
                        AttachmentOutcome::Saved(_) | AttachmentOutcome::WouldSave(_) => {
                            self.files_downloaded += 1;
                        }
                        AttachmentOutcome::Filtered { .. } => self.files_filtered += 1,
                        AttachmentOutcome::Failed { .. } => self.errors += 1,
                    }
                }
            }
        }
    }
}

/// Why a whole message was passed over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    SenderRejected,
    OutOfDateRange,
    NoAttachments,
}

impl SkipReason {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SenderRejected => "sender filtered",
            Self::OutOfDateRange => "outside date range",
            Self::NoAttachments => "no attachments",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What happened to one message.
#[derive(Debug)]
pub enum MessageOutcome {
    /// The message could not be fetched.
    Failed(Error),
    Skipped(SkipReason),
    /// One entry per part with a non-empty filename, in message order.
    Processed(Vec<AttachmentOutcome>),
}

impl MessageOutcome {
    /// The credential failure behind this outcome, if any.
    #[must_use]
    pub fn auth_error(&self) -> Option<&str> {
        match self {
            Self::Failed(Error::Auth(message)) => Some(message.as_str()),
            Self::Processed(attachments) => attachments.iter().find_map(|a| match a {
                AttachmentOutcome::Failed {
                    error: Error::Auth(message),
                    ..
                } => Some(message.as_str()),
                _ => None,
            }),
            _ => None,
        }
    }
}

/// What happened to one named attachment part.
#[derive(Debug)]
pub enum AttachmentOutcome {
    Saved(PathBuf),
    /// Dry run: the file that would have been written.
    WouldSave(PathBuf),
    Filtered { filename: String, reason: Rejection },
    Failed { filename: String, error: Error },
}

/// Drives one download run against a mailbox.
pub struct AttachmentPipeline<'a, M> {
    client: &'a M,
    settings: &'a Settings,
    resolver: PathResolver<'a>,
    sanitizer: FilenameSanitizer,
    dry_run: bool,
}

impl<'a, M: MailboxClient> AttachmentPipeline<'a, M> {
    #[must_use]
    pub const fn new(client: &'a M, settings: &'a Settings) -> Self {
        Self {
            client,
            settings,
            resolver: PathResolver::new(settings),
            sanitizer: FilenameSanitizer::new(settings.max_filename_length)
                .replace_spaces(settings.replace_spaces),
            dry_run: false,
        }
    }

    /// Evaluate filters and paths without fetching or writing files.
    #[must_use]
    pub const fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Process every message and return the counters.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Auth`] as soon as the mailbox rejects the
    /// credentials. Every other failure is recorded and the run goes on.
    pub async fn run(&self) -> Result<RunStats> {
        let mut stats = RunStats::default();

        let range = self.settings.date_range().unwrap_or_else(|e| {
            warn!("{}; date filter disabled for this run", e);
            DateRange::unbounded()
        });

        let listing = list_message_ids(self.client, self.settings.max_messages).await?;
        stats.total_messages = listing.ids.len();
        stats.incomplete = listing.incomplete;
        if listing.incomplete {
            warn!("Message list is incomplete; this run may have missed messages");
        }

        for id in &listing.ids {
            let outcome = self
                .process_message(id, &range, stats.files_downloaded)
                .await;
            if let Some(message) = outcome.auth_error() {
                return Err(Error::Auth(message.to_string()));
            }
            stats.record(&outcome);
        }

        info!(
            "Run finished: {} messages, {} with attachments, {} downloaded, {} filtered",
            stats.total_messages,
            stats.messages_with_attachments,
            stats.files_downloaded,
            stats.files_filtered
        );
        Ok(stats)
    }

    /// Process one message. `saved_before` is the number of files
    /// already saved in this run, for the download limit.
    pub async fn process_message(
        &self,
        id: &MessageRef,
        range: &DateRange,
        saved_before: usize,
    ) -> MessageOutcome {
        let detail = match self.client.get_message(id).await {
            Ok(detail) => detail,
            Err(e) => {
                warn!("Skipping message {}: {}", id, e);
                return MessageOutcome::Failed(e);
            }
        };
        let summary = MessageSummary::from_detail(detail);

        if !SenderFilter::new(self.settings).accepts(&summary.sender) {
            debug!("Message {} from '{}' skipped: sender filtered", id, summary.sender);
            return MessageOutcome::Skipped(SkipReason::SenderRejected);
        }

        if !range.contains(summary.received_at) {
            debug!("Message {} dated {} skipped: outside date range", id, summary.received_at);
            return MessageOutcome::Skipped(SkipReason::OutOfDateRange);
        }

        let named: Vec<&AttachmentPart> = summary
            .attachment_parts
            .iter()
            .filter(|p| !p.filename.is_empty())
            .collect();
        if named.is_empty() {
            return MessageOutcome::Skipped(SkipReason::NoAttachments);
        }

        debug!("Message {} '{}' has {} attachment(s)", id, summary.subject, named.len());

        let mut saved = saved_before;
        let mut outcomes = Vec::with_capacity(named.len());
        for part in named {
            let outcome = self.process_attachment(id, &summary, part, saved).await;
            if matches!(outcome, AttachmentOutcome::Saved(_) | AttachmentOutcome::WouldSave(_)) {
                saved += 1;
            }
            outcomes.push(outcome);
        }

        MessageOutcome::Processed(outcomes)
    }

    async fn process_attachment(
        &self,
        id: &MessageRef,
        summary: &MessageSummary,
        part: &AttachmentPart,
        saved: usize,
    ) -> AttachmentOutcome {
        let filename = part.filename.clone();

        let verdict = AttachmentFilter::new(self.settings).check(&filename).and_then(|()| {
            let limit_reached = self
                .settings
                .max_attachments
                .and_then(|max| usize::try_from(max).ok())
                .is_some_and(|max| saved >= max);
            if limit_reached {
                Err(Rejection::LimitReached)
            } else {
                Ok(())
            }
        });

        if let Err(reason) = verdict {
            debug!("Attachment '{}' in {} filtered: {}", filename, id, reason);
            return AttachmentOutcome::Filtered { filename, reason };
        }

        let dir = self.resolver.resolve(summary.received_at, &summary.sender);

        if self.dry_run {
            let target = dir.join(self.sanitizer.sanitize(&filename));
            info!("Would save {} -> {}", filename, target.display());
            return AttachmentOutcome::WouldSave(target);
        }

        match self.save(id, part, &dir).await {
            Ok(target) => {
                if self.settings.log_successful_downloads {
                    info!("Saved {} -> {}", filename, target.display());
                } else {
                    debug!("Saved {} -> {}", filename, target.display());
                }
                AttachmentOutcome::Saved(target)
            }
            Err(error) => {
                warn!("Failed to save '{}' from {}: {}", filename, id, error);
                AttachmentOutcome::Failed { filename, error }
            }
        }
    }

    async fn save(&self, id: &MessageRef, part: &AttachmentPart, dir: &Path) -> Result<PathBuf> {
        self.ensure_dir(dir).await?;

        let bytes = match &part.body {
            Some(AttachmentBody::Remote(attachment_ref)) => {
                self.client.get_attachment(id, attachment_ref).await?
            }
            Some(AttachmentBody::Inline(data)) => data.clone(),
            None => {
                return Err(Error::permanent(format!(
                    "Part '{}' has no attachment body",
                    part.filename
                )));
            }
        };

        let name = self.sanitizer.sanitize(&part.filename);
        let mut target = dir.join(&name);
        if self.settings.add_timestamp_on_duplicate && tokio::fs::try_exists(&target).await? {
            let stamp = Local::now().format("%Y%m%d_%H%M%S").to_string();
            target = dir.join(timestamped(&name, &stamp));
            let mut counter = 1;
            while tokio::fs::try_exists(&target).await? {
                target = dir.join(timestamped(&name, &format!("{stamp}_{counter}")));
                counter += 1;
            }
        }

        tokio::fs::write(&target, &bytes).await?;
        Ok(target)
    }

    async fn ensure_dir(&self, dir: &Path) -> Result<()> {
        if self.settings.create_folders {
            tokio::fs::create_dir_all(dir).await?;
        } else if !tokio::fs::try_exists(dir).await? {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("{} does not exist and folder creation is disabled", dir.display()),
            )));
        }
        Ok(())
    }
}

/// `factura.pdf` -> `factura_<stamp>.pdf`; names without an extension
/// get the suffix at the end.
fn timestamped(name: &str, stamp: &str) -> String {
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{stem}_{stamp}.{ext}"),
        _ => format!("{name}_{stamp}"),
    }
}
