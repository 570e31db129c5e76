//! Saved browser session state (cookies + localStorage) for a logged-in scrape.
//!
//! Looked up in order: the storage-state file (`auth.json` by default), then
//! the `TWITTER_AUTH_JSON` env var holding raw JSON or base64-encoded JSON.
//! With neither, the scrape runs anonymously.

use crate::error::{Result, TweetlogError};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};

pub const AUTH_ENV_VAR: &str = "TWITTER_AUTH_JSON";

/// Browser storage-state document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageState {
    pub cookies: Vec<Cookie>,
    pub origins: Vec<OriginStorage>,
}

/// An HTTP cookie with standard browser attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cookie {
    pub name: String,
    pub value: String,
    pub domain: String,
    #[serde(default = "default_path")]
    pub path: String,
    /// Unix seconds; `-1` (or absent) marks a session cookie.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires: Option<f64>,
    #[serde(default)]
    pub http_only: bool,
    #[serde(default)]
    pub secure: bool,
    /// `Strict`, `Lax` or `None`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub same_site: Option<String>,
}

fn default_path() -> String {
    "/".to_string()
}

impl Cookie {
    /// Expiry as Unix seconds, `None` for session cookies.
    pub fn expires_at(&self) -> Option<f64> {
        self.expires.filter(|e| *e > 0.0)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OriginStorage {
    pub origin: String,
    #[serde(default)]
    pub local_storage: Vec<StorageEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageEntry {
    pub name: String,
    pub value: String,
}

impl StorageState {
    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty() && self.origins.is_empty()
    }
}

/// Resolve auth state from `file` or the `TWITTER_AUTH_JSON` env var.
pub fn load(file: &Path) -> Result<Option<StorageState>> {
    resolve(file, std::env::var(AUTH_ENV_VAR).ok())
}

/// [`load`] with the env value passed in.
///
/// A present but unparsable file is an error; a bad env value only warns.
pub fn resolve(file: &Path, env_value: Option<String>) -> Result<Option<StorageState>> {
    if file.exists() {
        info!(path = %file.display(), "Loading auth state from file");
        let content = std::fs::read_to_string(file).map_err(|e| TweetlogError::Auth {
            path: file.to_path_buf(),
            reason: e.to_string(),
        })?;
        let state = serde_json::from_str(&content).map_err(|e| TweetlogError::Auth {
            path: file.to_path_buf(),
            reason: e.to_string(),
        })?;
        return Ok(Some(state));
    }

    let Some(raw) = env_value.filter(|v| !v.trim().is_empty()) else {
        warn!(path = %file.display(), "No auth state found; scraping anonymously");
        return Ok(None);
    };

    info!("Loading auth state from {AUTH_ENV_VAR}");
    match parse_env_value(&raw) {
        Ok(state) => Ok(Some(state)),
        Err(reason) => {
            warn!(%reason, "Failed to load auth from {AUTH_ENV_VAR}");
            Ok(None)
        }
    }
}

/// Accept raw JSON first, then base64 of JSON.
pub fn parse_env_value(raw: &str) -> std::result::Result<StorageState, String> {
    let raw = raw.trim();
    if let Ok(state) = serde_json::from_str(raw) {
        return Ok(state);
    }

    let bytes = STANDARD
        .decode(raw)
        .map_err(|e| format!("neither JSON nor base64: {e}"))?;
    let decoded = String::from_utf8(bytes).map_err(|e| format!("base64 payload is not UTF-8: {e}"))?;
    serde_json::from_str(&decoded).map_err(|e| format!("base64 payload is not valid JSON: {e}"))
}
