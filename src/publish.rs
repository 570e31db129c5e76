//! Writing the merged log back to disk.

use crate::codec;
use crate::error::{Result, TweetlogError};
use crate::tweet::Tweet;
use std::path::{Path, PathBuf};
use tracing::info;

/// What [`publish`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishOutcome {
    Written { path: PathBuf, tweets: usize, bytes: usize },
    /// Nothing to write; an existing file is left alone.
    Skipped,
}

/// Overwrite `path` with the encoded log.
///
/// The new content lands in a sibling temp file first and is renamed over
/// the target, so readers never see a half-written log.
pub fn publish(path: &Path, log: Vec<Tweet>) -> Result<PublishOutcome> {
    if log.is_empty() {
        info!(path = %path.display(), "No tweets found; nothing published");
        return Ok(PublishOutcome::Skipped);
    }

    let encoded = codec::encode(&log);
    let publish_err = |source: std::io::Error| TweetlogError::Publish {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(publish_err)?;
    }

    let tmp = temp_path(path);
    std::fs::write(&tmp, encoded.as_bytes()).map_err(publish_err)?;
    if let Err(e) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(publish_err(e));
    }

    info!(path = %path.display(), tweets = log.len(), "Published log");
    Ok(PublishOutcome::Written {
        path: path.to_path_buf(),
        tweets: log.len(),
        bytes: encoded.len(),
    })
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "tweets.txt".into());
    name.push(".tmp");
    path.with_file_name(name)
}
