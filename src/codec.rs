//! Flat text log format.
//!
//! Each record is four lines; the separator line is the only record
//! boundary, so `Text:` may span several lines:
//!
//! ```text
//! User: <user_info>
//! Time: <timestamp>
//! Text: <text>
//! --------------------
//! ```
//!
//! Decoding is best-effort per record: a chunk missing any of the three
//! labelled fields is dropped and the rest of the log still decodes. A text
//! body containing a bare separator line cannot be represented; it is not
//! escaped.
//!
//! Decoded fields are trimmed, but signatures compare the raw values. A record
//! whose `user_info` or `text` has leading or trailing whitespace therefore
//! does not match its own persisted copy and is inserted again on every merge.

use crate::tweet::Tweet;
use tracing::debug;

/// Record boundary, without its trailing newline.
pub const SEPARATOR: &str = "--------------------";

const USER_PREFIX: &str = "User: ";
const TIME_PREFIX: &str = "Time: ";
const TEXT_PREFIX: &str = "Text: ";

/// Encode records in order. A separator follows every record, the last included.
pub fn encode(tweets: &[Tweet]) -> String {
    let mut out = String::new();
    for tweet in tweets {
        out.push_str(USER_PREFIX);
        out.push_str(tweet.user_info());
        out.push('\n');
        out.push_str(TIME_PREFIX);
        out.push_str(tweet.timestamp());
        out.push('\n');
        out.push_str(TEXT_PREFIX);
        out.push_str(tweet.text());
        out.push('\n');
        out.push_str(SEPARATOR);
        out.push('\n');
    }
    out
}

/// Result of [`decode_report`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Decoded {
    pub tweets: Vec<Tweet>,
    /// Non-blank chunks that were missing a field.
    pub dropped: usize,
}

/// Decode a log, silently skipping malformed entries.
pub fn decode(input: &str) -> Vec<Tweet> {
    decode_report(input).tweets
}

/// Decode a log and count the entries that had to be skipped.
pub fn decode_report(input: &str) -> Decoded {
    let mut decoded = Decoded::default();
    for chunk in split_chunks(input) {
        if chunk.trim().is_empty() {
            continue;
        }
        match parse_chunk(&chunk) {
            Some(tweet) => decoded.tweets.push(tweet),
            None => {
                debug!(chunk_len = chunk.len(), "Dropping malformed log entry");
                decoded.dropped += 1;
            }
        }
    }
    decoded
}

/// Split on standalone separator lines.
fn split_chunks(input: &str) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    for line in input.split_inclusive('\n') {
        let bare = line.trim_end_matches(['\n', '\r']);
        if bare == SEPARATOR {
            chunks.push(std::mem::take(&mut current));
        } else {
            current.push_str(line);
        }
    }
    chunks.push(current);
    chunks
}

fn parse_chunk(chunk: &str) -> Option<Tweet> {
    let mut user_info = None;
    let mut timestamp = None;
    let mut text = None;

    for (offset, line) in line_offsets(chunk) {
        let line = line.trim_end_matches(['\n', '\r']);
        if user_info.is_none() {
            if let Some(rest) = line.strip_prefix(USER_PREFIX) {
                user_info = Some(rest.trim());
                continue;
            }
        }
        if timestamp.is_none() {
            if let Some(rest) = line.strip_prefix(TIME_PREFIX) {
                timestamp = Some(rest.trim());
                continue;
            }
        }
        if line.starts_with(TEXT_PREFIX) {
            // Greedy: the body runs to the end of the chunk.
            text = Some(chunk[offset + TEXT_PREFIX.len()..].trim());
            break;
        }
    }

    Some(Tweet::new(user_info?, timestamp?, text?))
}

/// Lines paired with their byte offset into `chunk`.
fn line_offsets(chunk: &str) -> impl Iterator<Item = (usize, &str)> {
    chunk.split_inclusive('\n').scan(0usize, |pos, line| {
        let start = *pos;
        *pos += line.len();
        Some((start, line))
    })
}
