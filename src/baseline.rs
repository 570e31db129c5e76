//! Loading previously published logs.
//!
//! [`BaselineLoader::load`] degrades every failure to an empty baseline so a
//! run can always proceed as a fresh start. [`BaselineLoader::load_required`]
//! is for inputs the caller named explicitly and reports failures instead.

use crate::codec;
use crate::error::{Result, TweetlogError};
use crate::retry::{RetryPolicy, classify_reqwest_result, retry_with_backoff};
use crate::tweet::Tweet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

const USER_AGENT: &str = concat!("tweetlog/", env!("CARGO_PKG_VERSION"));

/// Where a log lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BaselineSource {
    Remote(Url),
    Local(PathBuf),
}

impl BaselineSource {
    /// `http://` / `https://` URLs are remote, everything else is a path.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            if let Ok(url) = Url::parse(trimmed) {
                return Self::Remote(url);
            }
        }
        Self::Local(PathBuf::from(trimmed))
    }
}

impl fmt::Display for BaselineSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Remote(url) => write!(f, "{url}"),
            Self::Local(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Why a source yielded no text.
#[derive(Debug)]
enum FetchFailure {
    /// 404 or missing file.
    NotFound,
    Failed(String),
}

/// Fetches and decodes logs.
#[derive(Debug, Clone)]
pub struct BaselineLoader {
    timeout: Duration,
    retry: RetryPolicy,
}

impl Default for BaselineLoader {
    fn default() -> Self {
        Self::new(Duration::from_secs(30), RetryPolicy::default())
    }
}

impl BaselineLoader {
    pub fn new(timeout: Duration, retry: RetryPolicy) -> Self {
        Self { timeout, retry }
    }

    /// Load and decode `source`. Never fails; problems yield an empty log.
    pub async fn load(&self, source: &BaselineSource) -> Vec<Tweet> {
        match self.fetch_text(source).await {
            Ok(text) => decode_logged(source, &text),
            Err(FetchFailure::NotFound) => {
                info!(source = %source, "No baseline yet; starting fresh");
                Vec::new()
            }
            Err(FetchFailure::Failed(reason)) => {
                warn!(source = %source, error = %reason, "Failed to load baseline; starting fresh");
                Vec::new()
            }
        }
    }

    /// Load and decode `source`, failing when it cannot be read.
    ///
    /// Malformed entries are still skipped one by one.
    pub async fn load_required(&self, source: &BaselineSource) -> Result<Vec<Tweet>> {
        match self.fetch_text(source).await {
            Ok(text) => Ok(decode_logged(source, &text)),
            Err(FetchFailure::NotFound) => Err(TweetlogError::Input {
                location: source.to_string(),
                reason: "not found".into(),
            }),
            Err(FetchFailure::Failed(reason)) => Err(TweetlogError::Input {
                location: source.to_string(),
                reason,
            }),
        }
    }

    async fn fetch_text(&self, source: &BaselineSource) -> std::result::Result<String, FetchFailure> {
        match source {
            BaselineSource::Remote(url) => self.fetch_remote(url).await,
            BaselineSource::Local(path) => read_local(path).await,
        }
    }

    async fn fetch_remote(&self, url: &Url) -> std::result::Result<String, FetchFailure> {
        let client = reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| FetchFailure::Failed(format!("failed to create HTTP client: {e}")))?;

        let response = retry_with_backoff(
            &self.retry,
            |attempt| {
                debug!(%url, attempt, "Fetching log");
                client.get(url.clone()).send()
            },
            classify_reqwest_result,
            |retry| {
                warn!(
                    %url,
                    attempt = retry.attempt,
                    delay_ms = retry.delay.as_millis() as u64,
                    reason = retry.reason.as_str(),
                    "Retrying log fetch"
                );
            },
        )
        .await
        .map_err(|e| FetchFailure::Failed(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(FetchFailure::NotFound);
        }
        if !status.is_success() {
            return Err(FetchFailure::Failed(format!("HTTP status {}", status.as_u16())));
        }

        response
            .text()
            .await
            .map_err(|e| FetchFailure::Failed(format!("failed to read body: {e}")))
    }
}

/// Read a local log. Invalid UTF-8 is replaced rather than rejected, so one
/// damaged byte only spoils the entry it sits in.
async fn read_local(path: &Path) -> std::result::Result<String, FetchFailure> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(FetchFailure::NotFound),
        Err(e) => return Err(FetchFailure::Failed(e.to_string())),
    };

    match String::from_utf8(bytes) {
        Ok(text) => Ok(text),
        Err(e) => {
            warn!(
                path = %path.display(),
                offset = e.utf8_error().valid_up_to(),
                "Log contains invalid UTF-8; replacing damaged bytes"
            );
            Ok(String::from_utf8_lossy(e.as_bytes()).into_owned())
        }
    }
}

fn decode_logged(source: &BaselineSource, text: &str) -> Vec<Tweet> {
    let decoded = codec::decode_report(text);
    if decoded.dropped > 0 {
        warn!(
            source = %source,
            dropped = decoded.dropped,
            "Skipped malformed entries"
        );
    }
    info!(source = %source, tweets = decoded.tweets.len(), "Loaded log");
    decoded.tweets
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve exactly one canned HTTP response on an ephemeral port.
    async fn serve_once(response: &'static str) -> Url {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 4096];
            let _ = socket.read(&mut buf).await;
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
        });
        Url::parse(&format!("http://{addr}/tweets.txt")).unwrap()
    }

    fn loader() -> BaselineLoader {
        BaselineLoader::new(Duration::from_secs(5), RetryPolicy::no_retry())
    }

    #[test]
    fn parses_sources() {
        assert!(matches!(
            BaselineSource::parse("https://example.com/tweets.txt"),
            BaselineSource::Remote(_)
        ));
        assert_eq!(
            BaselineSource::parse("data/tweets.txt"),
            BaselineSource::Local(PathBuf::from("data/tweets.txt"))
        );
    }

    #[tokio::test]
    async fn missing_local_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let source = BaselineSource::Local(dir.path().join("tweets.txt"));
        assert!(loader().load(&source).await.is_empty());
    }

    #[tokio::test]
    async fn local_file_is_decoded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tweets.txt");
        let tweets = vec![Tweet::new("Alice", "2024-01-01T00:00:00Z", "hi")];
        std::fs::write(&path, codec::encode(&tweets)).unwrap();
        assert_eq!(loader().load(&BaselineSource::Local(path)).await, tweets);
    }

    #[tokio::test]
    async fn invalid_utf8_only_spoils_its_own_entry() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tweets.txt");
        let mut bytes = codec::encode(&[
            Tweet::new("A", "1", "first"),
            Tweet::new("B", "2", "second"),
        ])
        .into_bytes();
        bytes.extend_from_slice(b"User: C\nTime: 3\nText: bro");
        bytes.push(0xff);
        bytes.extend_from_slice(b"ken\n--------------------\n");
        std::fs::write(&path, bytes).unwrap();

        let tweets = loader().load(&BaselineSource::Local(path)).await;
        assert_eq!(tweets.len(), 3);
        assert_eq!(tweets[0], Tweet::new("A", "1", "first"));
        assert_eq!(tweets[1], Tweet::new("B", "2", "second"));
        assert_eq!(tweets[2].text(), "bro\u{FFFD}ken");
    }

    #[tokio::test]
    async fn required_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let source = BaselineSource::Local(dir.path().join("typo.txt"));
        let err = loader().load_required(&source).await.unwrap_err();
        assert!(matches!(err, TweetlogError::Input { .. }));
        assert!(err.to_string().contains("typo.txt"));
    }

    #[tokio::test]
    async fn required_local_file_is_decoded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.txt");
        let tweets = vec![Tweet::new("Alice", "1", "hi")];
        std::fs::write(&path, codec::encode(&tweets)).unwrap();
        let loaded = loader().load_required(&BaselineSource::Local(path)).await.unwrap();
        assert_eq!(loaded, tweets);
    }

    #[tokio::test]
    async fn required_remote_404_is_an_error() {
        let url = serve_once(
            "HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
        )
        .await;
        assert!(loader().load_required(&BaselineSource::Remote(url)).await.is_err());
    }

    #[tokio::test]
    async fn remote_log_is_decoded() {
        let url = serve_once(
            "HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: 67\r\nConnection: close\r\n\r\n\
             User: Bob\nTime: 2024-01-02T00:00:00Z\nText: yo\n--------------------\n",
        )
        .await;
        let tweets = loader().load(&BaselineSource::Remote(url)).await;
        assert_eq!(tweets, vec![Tweet::new("Bob", "2024-01-02T00:00:00Z", "yo")]);
    }

    #[tokio::test]
    async fn remote_404_is_fresh_start() {
        let url = serve_once(
            "HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
        )
        .await;
        assert!(loader().load(&BaselineSource::Remote(url)).await.is_empty());
    }

    #[tokio::test]
    async fn unreachable_host_is_fresh_start() {
        // Bind then drop to get a port nobody listens on.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let url = Url::parse(&format!("http://{addr}/tweets.txt")).unwrap();
        assert!(loader().load(&BaselineSource::Remote(url)).await.is_empty());
    }
}
