use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the scrape/publish pipeline.
///
/// Baseline problems never show up here: they degrade to an empty baseline.
/// Explicitly named input logs are different and fail with [`TweetlogError::Input`].
#[derive(Debug, Error)]
pub enum TweetlogError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("failed to parse config file {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("auth state at {path} is unreadable: {reason}")]
    Auth { path: PathBuf, reason: String },
    #[error("browser error: {0}")]
    Browser(String),
    #[error("scrape of {url} failed: {reason}")]
    Scrape { url: String, reason: String },
    #[error("cannot read input log {location}: {reason}")]
    Input { location: String, reason: String },
    #[error("failed to publish log to {path}: {source}")]
    Publish {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, TweetlogError>;
