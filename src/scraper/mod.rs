//! Timeline scraping.
//!
//! [`TimelineScraper`] is the seam the pipeline talks to. The real
//! implementation drives Chromium over CDP when built with the `browser`
//! feature; without it [`BrowserScraper`] reports that it is unavailable.

#[cfg(feature = "browser")]
mod browser;

use crate::auth::StorageState;
use crate::config::ScrapeConfig;
use crate::error::Result;
use crate::merge::MergeState;
use crate::tweet::Tweet;
use async_trait::async_trait;

/// Produces one session's worth of tweets, deduplicated, in scrape order.
#[async_trait]
pub trait TimelineScraper: Send + Sync {
    async fn scrape(&self, url: &str) -> Result<Vec<Tweet>>;
}

/// Pulls every tweet article currently in the DOM. Missing parts come back
/// as `null` and are replaced by sentinels on the Rust side.
pub const EXTRACT_SCRIPT: &str = r#"
(() => Array.from(document.querySelectorAll('article[data-testid="tweet"]')).map((article) => {
    const user = article.querySelector('[data-testid="User-Name"]');
    const text = article.querySelector('[data-testid="tweetText"]');
    const time = article.querySelector('time');
    return {
        user_info: user ? user.innerText : null,
        text: text ? text.innerText : null,
        timestamp: time ? time.getAttribute('datetime') : null,
    };
}))()
"#;

/// Hides the automation flag from page scripts.
pub const STEALTH_SCRIPT: &str = r#"
Object.defineProperty(navigator, 'webdriver', {
    get: () => undefined
});
"#;

/// Accumulates tweets across scroll rounds, keeping the first sighting of
/// each signature.
#[derive(Debug, Default)]
pub struct SessionCollector {
    seen: MergeState,
    tweets: Vec<Tweet>,
}

impl SessionCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one round's extraction. Returns how many were new.
    pub fn absorb(&mut self, batch: impl IntoIterator<Item = Tweet>) -> usize {
        let before = self.tweets.len();
        for tweet in batch {
            if self.seen.observe(&tweet) {
                self.tweets.push(tweet);
            }
        }
        self.tweets.len() - before
    }

    pub fn len(&self) -> usize {
        self.tweets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tweets.is_empty()
    }

    pub fn into_tweets(self) -> Vec<Tweet> {
        self.tweets
    }
}

/// Headless Chromium scraper.
#[derive(Debug, Clone)]
pub struct BrowserScraper {
    config: ScrapeConfig,
    auth: Option<StorageState>,
}

impl BrowserScraper {
    pub fn new(config: ScrapeConfig, auth: Option<StorageState>) -> Self {
        Self { config, auth }
    }
}

#[cfg(not(feature = "browser"))]
#[async_trait]
impl TimelineScraper for BrowserScraper {
    async fn scrape(&self, url: &str) -> Result<Vec<Tweet>> {
        Err(crate::error::TweetlogError::Scrape {
            url: url.to_string(),
            reason: "browser automation requires the 'browser' feature. Build with: cargo build --features browser".into(),
        })
    }
}
