//! On-disk configuration (`~/.tweetlog/config.toml`).

use crate::error::{Result, TweetlogError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_OUTPUT: &str = "tweets.txt";
pub const DEFAULT_AUTH_FILE: &str = "auth.json";
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Where the merged log is written.
    pub output: PathBuf,
    /// Existing log to merge into: a URL or a local path. Defaults to `output`.
    pub baseline: Option<String>,
    /// Saved browser storage state.
    pub auth_file: PathBuf,
    pub scrape: ScrapeConfig,
    pub fetch: FetchConfig,
}

/// Browser session knobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrapeConfig {
    /// Extraction rounds; each round ends with one scroll.
    pub scroll_count: u32,
    /// Mouse-wheel distance per scroll, in pixels.
    pub scroll_delta: f64,
    pub scroll_pause_ms: u64,
    pub navigation_timeout_secs: u64,
    /// How long to wait for the first `article` to render.
    pub selector_timeout_secs: u64,
    pub headless: bool,
    pub viewport_width: u32,
    pub viewport_height: u32,
    pub user_agent: String,
    pub locale: String,
}

/// Baseline download knobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub timeout_secs: u64,
    pub max_attempts: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output: PathBuf::from(DEFAULT_OUTPUT),
            baseline: None,
            auth_file: PathBuf::from(DEFAULT_AUTH_FILE),
            scrape: ScrapeConfig::default(),
            fetch: FetchConfig::default(),
        }
    }
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            scroll_count: 5,
            scroll_delta: 2000.0,
            scroll_pause_ms: 2000,
            navigation_timeout_secs: 10,
            selector_timeout_secs: 15,
            headless: true,
            viewport_width: 1280,
            viewport_height: 800,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            locale: "ja-JP".to_string(),
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            max_attempts: 3,
        }
    }
}

impl ScrapeConfig {
    pub fn scroll_pause(&self) -> Duration {
        Duration::from_millis(self.scroll_pause_ms)
    }

    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_secs(self.navigation_timeout_secs)
    }

    pub fn selector_timeout(&self) -> Duration {
        Duration::from_secs(self.selector_timeout_secs)
    }
}

impl Config {
    /// Default location: `~/.tweetlog/config.toml`.
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".tweetlog")
            .join("config.toml")
    }

    /// Load from `path` (or the default location). A missing file yields defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = path.map(Path::to_path_buf).unwrap_or_else(Self::default_path);

        if !config_path.exists() {
            return Ok(Config::default());
        }

        let content = std::fs::read_to_string(&config_path)?;
        let config: Config =
            toml::from_str(&content).map_err(|source| TweetlogError::ConfigParse {
                path: config_path.clone(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.scrape.viewport_width == 0 || self.scrape.viewport_height == 0 {
            return Err(TweetlogError::Config(
                "scrape.viewport_width and scrape.viewport_height must be positive".into(),
            ));
        }
        if self.fetch.timeout_secs == 0 {
            return Err(TweetlogError::Config(
                "fetch.timeout_secs must be positive".into(),
            ));
        }
        Ok(())
    }

    /// Baseline location, falling back to the output file itself.
    pub fn baseline_source(&self) -> String {
        self.baseline
            .clone()
            .unwrap_or_else(|| self.output.to_string_lossy().into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(Some(&dir.path().join("nope.toml"))).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.scrape.scroll_count, 5);
        assert_eq!(config.scrape.locale, "ja-JP");
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "output = \"out/log.txt\"\nbaseline = \"https://example.com/tweets.txt\"\n\n[scrape]\nscroll_count = 12\n",
        )
        .unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.output, PathBuf::from("out/log.txt"));
        assert_eq!(config.scrape.scroll_count, 12);
        assert_eq!(config.scrape.scroll_pause_ms, 2000);
        assert_eq!(config.baseline_source(), "https://example.com/tweets.txt");
    }

    #[test]
    fn baseline_defaults_to_output() {
        let config = Config::default();
        assert_eq!(config.baseline_source(), DEFAULT_OUTPUT);
    }

    #[test]
    fn invalid_toml_is_reported_with_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[scrape\n").unwrap();
        let err = Config::load(Some(&path)).unwrap_err();
        assert!(matches!(err, TweetlogError::ConfigParse { .. }));
    }

    #[test]
    fn zero_viewport_is_rejected() {
        let mut config = Config::default();
        config.scrape.viewport_width = 0;
        assert!(config.validate().is_err());
    }
}
