//! OAuth bearer tokens for the mailbox API
//!
//! The downloader never runs an interactive consent flow. It expects a
//! token file written by a previous authorization (the "authorized
//! user" JSON Google's client libraries produce) and refreshes the
//! access token from it when needed.

use crate::error::{Error, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Shown with every authentication failure.
pub const REMEDIATION: &str = "Authorize the application once with your OAuth client \
    (Google Cloud Console > APIs & Services > Credentials, Gmail API enabled, \
    scope gmail.readonly) and save the resulting authorized-user JSON as the \
    configured token file.";

/// Seconds before expiry at which a token is already treated as expired.
const EXPIRY_MARGIN_SECS: i64 = 60;

/// A bearer token ready to be sent with API requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub access_token: String,
    pub expires_at: Option<DateTime<Utc>>,
}

impl Token {
    #[must_use]
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            expires_at: None,
        }
    }

    /// Checks if the token is expired (with 60 second buffer).
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.expires_at
            .is_some_and(|exp| Utc::now() + Duration::seconds(EXPIRY_MARGIN_SECS) >= exp)
    }
}

/// Source of valid bearer tokens.
pub trait CredentialProvider {
    /// Return a token that is valid right now.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Auth`] if no valid credential can be obtained.
    fn get_valid_token(&self) -> impl Future<Output = Result<Token>> + Send;
}

/// On-disk token file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoredToken {
    #[serde(alias = "token", skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_uri: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiry: Option<DateTime<Utc>>,
    /// Everything else (scopes, account, ...) is written back untouched.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access_token: String,
    expires_in: Option<i64>,
    refresh_token: Option<String>,
}

/// Reads the token file and refreshes it against the OAuth token
/// endpoint when the access token has expired.
#[derive(Debug, Clone)]
pub struct TokenFileProvider {
    path: PathBuf,
    token_url: String,
    http: reqwest::Client,
}

impl TokenFileProvider {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, token_url: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            token_url: token_url.into(),
            http: reqwest::Client::new(),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<StoredToken> {
        let text = std::fs::read_to_string(&self.path).map_err(|e| {
            Error::Auth(format!(
                "Cannot read token file {}: {e}. {REMEDIATION}",
                self.path.display()
            ))
        })?;
        serde_json::from_str(&text).map_err(|e| {
            Error::Auth(format!(
                "Token file {} is not valid JSON: {e}. {REMEDIATION}",
                self.path.display()
            ))
        })
    }

    fn save(&self, stored: &StoredToken) -> Result<()> {
        let json = serde_json::to_string_pretty(stored)?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }

    async fn refresh(&self, stored: &StoredToken) -> Result<StoredToken> {
        let (Some(refresh_token), Some(client_id), Some(client_secret)) = (
            stored.refresh_token.as_deref(),
            stored.client_id.as_deref(),
            stored.client_secret.as_deref(),
        ) else {
            return Err(Error::Auth(format!(
                "Access token expired and the token file has no refresh credentials. {REMEDIATION}"
            )));
        };

        let url = stored.token_uri.as_deref().unwrap_or(&self.token_url);
        debug!("Refreshing access token at {}", url);

        let params = [
            ("client_id", client_id),
            ("client_secret", client_secret),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ];

        let response = self
            .http
            .post(url)
            .form(&params)
            .send()
            .await
            .map_err(|e| Error::Auth(format!("Token refresh request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Auth(format!(
                "Token refresh failed ({status}): {body}. {REMEDIATION}"
            )));
        }

        let refreshed: RefreshResponse = response
            .json()
            .await
            .map_err(|e| Error::Auth(format!("Invalid token refresh response: {e}")))?;

        let mut updated = stored.clone();
        updated.access_token = Some(refreshed.access_token);
        updated.expiry = refreshed
            .expires_in
            .map(|secs| Utc::now() + Duration::seconds(secs));
        if let Some(rt) = refreshed.refresh_token {
            updated.refresh_token = Some(rt);
        }
        Ok(updated)
    }
}

impl CredentialProvider for TokenFileProvider {
    async fn get_valid_token(&self) -> Result<Token> {
        let stored = self.load()?;

        if let Some(access_token) = stored.access_token.clone() {
            let token = Token {
                access_token,
                expires_at: stored.expiry,
            };
            if !token.is_expired() {
                debug!("Using stored access token");
                return Ok(token);
            }
        }

        let updated = self.refresh(&stored).await?;
        if let Err(e) = self.save(&updated) {
            warn!("Could not save refreshed token to {}: {}", self.path.display(), e);
        }
        info!("Access token refreshed");

        let access_token = updated
            .access_token
            .ok_or_else(|| Error::Auth("Refresh returned no access token".into()))?;
        Ok(Token {
            access_token,
            expires_at: updated.expiry,
        })
    }
}
