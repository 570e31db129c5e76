//! Tweet record and its deduplication signature.

use serde::{Deserialize, Serialize};

/// Placeholder when an article has no author block.
pub const NO_USER: &str = "(No User)";
/// Placeholder when an article has no tweet body.
pub const NO_TEXT: &str = "(No Text)";
/// Placeholder when an article has no `<time>` element.
pub const NO_TIME: &str = "(No Time)";

/// One scraped or decoded tweet.
///
/// Fields are only reachable through accessors so the `user_info`
/// normalization applied in [`Tweet::new`] always holds.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "RawTweet")]
pub struct Tweet {
    user_info: String,
    timestamp: String,
    text: String,
}

/// Unnormalized wire shape, shared by serde and the DOM extractor.
/// Missing fields become the sentinel strings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawTweet {
    #[serde(default)]
    pub user_info: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
}

impl From<RawTweet> for Tweet {
    fn from(raw: RawTweet) -> Self {
        Tweet::new(
            raw.user_info.unwrap_or_else(|| NO_USER.to_string()),
            raw.timestamp.unwrap_or_else(|| NO_TIME.to_string()),
            raw.text.unwrap_or_else(|| NO_TEXT.to_string()),
        )
    }
}

impl Tweet {
    /// Build a record. Newlines in `user_info` become single spaces.
    pub fn new(
        user_info: impl Into<String>,
        timestamp: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            user_info: user_info.into().replace('\n', " "),
            timestamp: timestamp.into(),
            text: text.into(),
        }
    }

    pub fn user_info(&self) -> &str {
        &self.user_info
    }

    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Identity key: `user_info + "_" + timestamp + "_" + text`.
    pub fn signature(&self) -> Signature {
        let mut key = String::with_capacity(
            self.user_info.len() + self.timestamp.len() + self.text.len() + 2,
        );
        key.push_str(&self.user_info);
        key.push('_');
        key.push_str(&self.timestamp);
        key.push('_');
        key.push_str(&self.text);
        Signature(key)
    }
}

/// Derived dedup key for a [`Tweet`]. Compared by exact string equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Signature(String);

impl Signature {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}
