// ── tweetlog ────────────────────────────────────────────────────────────────
//
// Scrape a timeline, merge new tweets in front of the previously published
// log, and write the result back as a flat text file.

pub mod args;
pub mod auth;
pub mod baseline;
pub mod codec;
pub mod config;
pub mod error;
pub mod logging;
pub mod merge;
pub mod pipeline;
pub mod publish;
pub mod retry;
pub mod scraper;
pub mod theme;
pub mod tweet;

pub use error::{Result, TweetlogError};
pub use merge::{MergeOutcome, MergeState, merge};
pub use tweet::{Signature, Tweet};
