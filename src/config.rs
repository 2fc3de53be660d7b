//! Settings loading and normalization
//!
//! The settings file is a JSON object with one nested object per
//! section. Every key is optional; missing keys take the defaults
//! below. List values may be written either as JSON arrays or as a
//! single comma-separated string.

use crate::date_range::DateRange;
use crate::error::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeSet;
use std::env;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const DEFAULT_SETTINGS_PATH: &str = "config/settings.json";
pub const DEFAULT_API_BASE: &str = "https://gmail.googleapis.com/gmail/v1/users/me";
pub const DEFAULT_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

const MIN_FILENAME_LENGTH: usize = 8;
const MAX_PAGE_SIZE: u32 = 500;

/// Effective configuration for one run.
///
/// Built once by [`Settings::from_file`] and never mutated afterwards.
/// Keyword and sender lists are lowercased unless `case_sensitive` is
/// set; extensions are always lowercase without a leading dot.
#[derive(Debug, Clone, Serialize)]
pub struct Settings {
    pub project_name: String,

    pub download_root: PathBuf,
    pub create_folders: bool,

    pub allowed_extensions: BTreeSet<String>,
    pub allow_keywords: BTreeSet<String>,
    pub deny_keywords: BTreeSet<String>,
    pub case_sensitive: bool,

    pub allow_senders: BTreeSet<String>,
    pub deny_senders: BTreeSet<String>,
    pub use_domain_only: bool,

    pub date_from: Option<String>,
    pub date_to: Option<String>,
    pub date_format: String,

    /// `None` means every message in the mailbox.
    pub max_messages: Option<u32>,
    /// `None` means no cap on saved files.
    pub max_attachments: Option<u32>,

    pub add_timestamp_on_duplicate: bool,
    pub max_filename_length: usize,
    pub replace_spaces: bool,

    pub api: ApiSettings,

    pub log_level: String,
    pub log_successful_downloads: bool,
    /// Append log lines to this file as well as (or instead of) stderr.
    pub log_file: Option<PathBuf>,
    pub console_output: bool,
}

/// Where and how to talk to the mailbox API.
#[derive(Debug, Clone, Serialize)]
pub struct ApiSettings {
    pub base_url: String,
    pub token_url: String,
    pub token_file: PathBuf,
    pub page_size: u32,
    pub retry_attempts: u32,
    pub timeout_secs: u64,
}

impl Settings {
    /// Load settings from the path in `ATTACH_CONFIG`.
    ///
    /// Reads from `.env` file if present. Recognized variables:
    /// - `ATTACH_CONFIG` (default: `config/settings.json`)
    /// - `GMAIL_API_BASE` (overrides `gmail_api.base_url`)
    /// - `GMAIL_TOKEN_URL` (overrides `gmail_api.token_url`)
    ///
    /// # Errors
    ///
    /// See [`Settings::from_file`].
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        let path = env::var("ATTACH_CONFIG").unwrap_or_else(|_| DEFAULT_SETTINGS_PATH.to_string());
        Self::from_file(path)
    }

    /// Load and normalize a settings file, then apply environment
    /// overrides.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the file cannot be read, is not
    /// valid JSON, or holds an out-of-range value.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!(
                "Cannot read settings file {}: {e}",
                path.display()
            ))
        })?;
        let file: SettingsFile = serde_json::from_str(&text).map_err(|e| {
            Error::Config(format!("Invalid settings file {}: {e}", path.display()))
        })?;

        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        let home = env::var_os("HOME").map(PathBuf::from);
        let mut settings = file.into_settings(base_dir, home.as_deref())?;

        if let Ok(url) = env::var("GMAIL_API_BASE") {
            settings.api.base_url = url;
        }
        if let Ok(url) = env::var("GMAIL_TOKEN_URL") {
            settings.api.token_url = url;
        }

        debug!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    /// Parse the configured date bounds.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if either bound does not match
    /// `date_format`.
    pub fn date_range(&self) -> Result<DateRange> {
        DateRange::parse(
            self.date_from.as_deref(),
            self.date_to.as_deref(),
            &self.date_format,
        )
    }

    /// Fold text the same way the keyword and sender lists were folded.
    #[must_use]
    pub fn fold(&self, text: &str) -> String {
        if self.case_sensitive {
            text.to_string()
        } else {
            text.to_lowercase()
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        SettingsFile::default()
            .into_settings(Path::new("."), None)
            .unwrap_or_else(|e| unreachable!("built-in defaults are valid: {e}"))
    }
}

// -- on-disk representation --

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SettingsFile {
    general: GeneralSection,
    downloads: DownloadsSection,
    gmail_api: GmailApiSection,
    filters: FiltersSection,
    senders: SendersSection,
    dates: DatesSection,
    sanitization: SanitizationSection,
    logging: LoggingSection,
    advanced: AdvancedSection,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct GeneralSection {
    project_name: String,
}

impl Default for GeneralSection {
    fn default() -> Self {
        Self {
            project_name: "AttachDownloader".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct DownloadsSection {
    download_folder: PathBuf,
    create_folders_if_not_exist: bool,
}

impl Default for DownloadsSection {
    fn default() -> Self {
        Self {
            download_folder: PathBuf::from("downloads"),
            create_folders_if_not_exist: true,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct GmailApiSection {
    base_url: String,
    token_url: String,
    token_file: PathBuf,
    page_size: u32,
    max_emails_to_process: u32,
    max_attachments_to_download: u32,
}

impl Default for GmailApiSection {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE.to_string(),
            token_url: DEFAULT_TOKEN_URL.to_string(),
            token_file: PathBuf::from("token.json"),
            page_size: 100,
            max_emails_to_process: 0,
            max_attachments_to_download: 0,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct FiltersSection {
    #[serde(deserialize_with = "list")]
    allowed_extensions: Vec<String>,
    #[serde(deserialize_with = "list", alias = "white_list")]
    allow_keywords: Vec<String>,
    #[serde(deserialize_with = "list", alias = "black_list")]
    deny_keywords: Vec<String>,
    #[serde(alias = "case_sensitive_filters")]
    case_sensitive: bool,
}

impl Default for FiltersSection {
    fn default() -> Self {
        Self {
            allowed_extensions: vec!["pdf".to_string()],
            allow_keywords: words(&["factura", "invoice", "receipt"]),
            deny_keywords: words(&["proforma", "draft", "borrador", "temporal"]),
            case_sensitive: false,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct SendersSection {
    #[serde(deserialize_with = "list", alias = "whitelist_senders")]
    allow_senders: Vec<String>,
    #[serde(deserialize_with = "list", alias = "blacklist_senders")]
    deny_senders: Vec<String>,
    use_domain_only: bool,
}

impl Default for SendersSection {
    fn default() -> Self {
        Self {
            allow_senders: Vec::new(),
            deny_senders: words(&["noreply@", "notification@"]),
            use_domain_only: false,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct DatesSection {
    date_format: String,
    date_from: Option<String>,
    date_to: Option<String>,
}

impl Default for DatesSection {
    fn default() -> Self {
        Self {
            date_format: "%Y-%m-%d".to_string(),
            date_from: None,
            date_to: None,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct SanitizationSection {
    max_filename_length: usize,
    replace_spaces_with_underscores: bool,
    add_timestamp_on_duplicate: bool,
}

impl Default for SanitizationSection {
    fn default() -> Self {
        Self {
            max_filename_length: 255,
            replace_spaces_with_underscores: false,
            add_timestamp_on_duplicate: true,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct LoggingSection {
    log_level: String,
    log_successful_downloads: bool,
    log_file: Option<PathBuf>,
    console_output: bool,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_successful_downloads: true,
            log_file: None,
            console_output: true,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct AdvancedSection {
    retry_attempts: u32,
    connection_timeout: u64,
}

impl Default for AdvancedSection {
    fn default() -> Self {
        Self {
            retry_attempts: 3,
            connection_timeout: 30,
        }
    }
}

impl SettingsFile {
    fn into_settings(self, base_dir: &Path, home: Option<&Path>) -> Result<Settings> {
        let case_sensitive = self.filters.case_sensitive;
        let fold_all = |items: Vec<String>| normalize(items, !case_sensitive);

        if self.sanitization.max_filename_length < MIN_FILENAME_LENGTH {
            return Err(Error::Config(format!(
                "max_filename_length must be at least {MIN_FILENAME_LENGTH}, got {}",
                self.sanitization.max_filename_length
            )));
        }
        if !(1..=MAX_PAGE_SIZE).contains(&self.gmail_api.page_size) {
            return Err(Error::Config(format!(
                "page_size must be between 1 and {MAX_PAGE_SIZE}, got {}",
                self.gmail_api.page_size
            )));
        }

        let token_file = expand_home(self.gmail_api.token_file, home);
        let token_file = if token_file.is_relative() {
            base_dir.join(token_file)
        } else {
            token_file
        };

        let allowed_extensions = self
            .filters
            .allowed_extensions
            .iter()
            .map(|ext| ext.trim().trim_start_matches('.').to_lowercase())
            .filter(|ext| !ext.is_empty())
            .collect();

        Ok(Settings {
            project_name: self.general.project_name,
            download_root: expand_home(self.downloads.download_folder, home),
            create_folders: self.downloads.create_folders_if_not_exist,
            allowed_extensions,
            allow_keywords: fold_all(self.filters.allow_keywords),
            deny_keywords: fold_all(self.filters.deny_keywords),
            case_sensitive,
            allow_senders: fold_all(self.senders.allow_senders),
            deny_senders: fold_all(self.senders.deny_senders),
            use_domain_only: self.senders.use_domain_only,
            date_from: non_blank(self.dates.date_from),
            date_to: non_blank(self.dates.date_to),
            date_format: self.dates.date_format,
            max_messages: non_zero(self.gmail_api.max_emails_to_process),
            max_attachments: non_zero(self.gmail_api.max_attachments_to_download),
            add_timestamp_on_duplicate: self.sanitization.add_timestamp_on_duplicate,
            max_filename_length: self.sanitization.max_filename_length,
            replace_spaces: self.sanitization.replace_spaces_with_underscores,
            api: ApiSettings {
                base_url: self.gmail_api.base_url,
                token_url: self.gmail_api.token_url,
                token_file,
                page_size: self.gmail_api.page_size,
                retry_attempts: self.advanced.retry_attempts,
                timeout_secs: self.advanced.connection_timeout,
            },
            log_level: self.logging.log_level,
            log_successful_downloads: self.logging.log_successful_downloads,
            log_file: self
                .logging
                .log_file
                .filter(|p| !p.as_os_str().is_empty())
                .map(|p| expand_home(p, home)),
            console_output: self.logging.console_output,
        })
    }
}

fn words(items: &[&str]) -> Vec<String> {
    items.iter().map(ToString::to_string).collect()
}

fn normalize(items: Vec<String>, lowercase: bool) -> BTreeSet<String> {
    items
        .into_iter()
        .map(|item| {
            let item = item.trim();
            if lowercase {
                item.to_lowercase()
            } else {
                item.to_string()
            }
        })
        .filter(|item| !item.is_empty())
        .collect()
}

/// Replace a leading `~` component with `home`. Paths without one, or
/// with no known home, are returned unchanged.
fn expand_home(path: PathBuf, home: Option<&Path>) -> PathBuf {
    match (path.strip_prefix("~"), home) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path,
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

const fn non_zero(value: u32) -> Option<u32> {
    if value == 0 { None } else { Some(value) }
}

/// Accept `"a, b"` as well as `["a", "b"]`.
fn list<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum ListValue {
        Csv(String),
        Items(Vec<String>),
    }

    Ok(match ListValue::deserialize(deserializer)? {
        ListValue::Csv(s) => s.split(',').map(str::to_string).collect(),
        ListValue::Items(items) => items,
    })
}
