//! Retry with backoff for the baseline download.

mod policy;

pub use policy::RetryPolicy;

use std::future::Future;
use std::time::Duration;

/// Why an attempt is worth repeating.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryReason {
    Connect,
    Timeout,
    RateLimited,
    ServerError,
    RequestTimeout,
}

impl RetryReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Connect => "connect",
            Self::Timeout => "timeout",
            Self::RateLimited => "rate_limited",
            Self::ServerError => "server_error",
            Self::RequestTimeout => "request_timeout",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    Retry {
        reason: RetryReason,
        retry_after: Option<Duration>,
    },
    DoNotRetry,
}

/// A retry that is about to be slept on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryAttempt {
    pub attempt: u32,
    pub delay: Duration,
    pub reason: RetryReason,
}

/// Parse `Retry-After` as delta-seconds or an HTTP-date.
pub fn parse_retry_after(headers: &reqwest::header::HeaderMap) -> Option<Duration> {
    let raw = headers.get(reqwest::header::RETRY_AFTER)?.to_str().ok()?.trim();

    if let Ok(secs) = raw.parse::<u64>() {
        return Some(Duration::from_secs(secs));
    }

    let when = httpdate::parse_http_date(raw).ok()?;
    Some(
        when.duration_since(std::time::SystemTime::now())
            .unwrap_or(Duration::ZERO),
    )
}

/// Decide whether a GET against the baseline host should be repeated.
pub fn classify_reqwest_result(
    result: &std::result::Result<reqwest::Response, reqwest::Error>,
) -> RetryDecision {
    match result {
        Ok(resp) => {
            let status = resp.status();
            let reason = if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                RetryReason::RateLimited
            } else if status == reqwest::StatusCode::REQUEST_TIMEOUT {
                RetryReason::RequestTimeout
            } else if status.is_server_error() {
                RetryReason::ServerError
            } else {
                return RetryDecision::DoNotRetry;
            };
            RetryDecision::Retry {
                reason,
                retry_after: parse_retry_after(resp.headers()),
            }
        }
        Err(err) if err.is_timeout() => RetryDecision::Retry {
            reason: RetryReason::Timeout,
            retry_after: None,
        },
        Err(err) if err.is_connect() || err.is_request() => RetryDecision::Retry {
            reason: RetryReason::Connect,
            retry_after: None,
        },
        Err(_) => RetryDecision::DoNotRetry,
    }
}

/// Run `operation` until `classify` stops asking for a retry or attempts run out.
///
/// `operation` receives the 1-based attempt number; `on_retry` fires right
/// before each sleep. The last attempt's result is returned as-is.
pub async fn retry_with_backoff<T, E, Op, Fut, Classify, OnRetry>(
    policy: &RetryPolicy,
    mut operation: Op,
    mut classify: Classify,
    mut on_retry: OnRetry,
) -> std::result::Result<T, E>
where
    Op: FnMut(u32) -> Fut,
    Fut: Future<Output = std::result::Result<T, E>>,
    Classify: FnMut(&std::result::Result<T, E>) -> RetryDecision,
    OnRetry: FnMut(RetryAttempt),
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        let result = operation(attempt).await;
        if attempt >= max_attempts {
            return result;
        }

        match classify(&result) {
            RetryDecision::Retry {
                reason,
                retry_after,
            } => {
                let base = retry_after.unwrap_or_else(|| policy.backoff_delay(attempt));
                let delay = policy.with_jitter(base);
                on_retry(RetryAttempt {
                    attempt,
                    delay,
                    reason,
                });
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            RetryDecision::DoNotRetry => return result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::{HeaderMap, HeaderValue, RETRY_AFTER};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn instant_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            jitter_ratio: 0.0,
        }
    }

    fn retry_errors(r: &std::result::Result<&str, &str>) -> RetryDecision {
        match r {
            Err(_) => RetryDecision::Retry {
                reason: RetryReason::Connect,
                retry_after: None,
            },
            Ok(_) => RetryDecision::DoNotRetry,
        }
    }

    #[test]
    fn retry_after_delta_seconds() {
        let mut headers = HeaderMap::new();
        headers.insert(RETRY_AFTER, HeaderValue::from_static("7"));
        assert_eq!(parse_retry_after(&headers), Some(Duration::from_secs(7)));
    }

    #[test]
    fn retry_after_past_date_is_zero() {
        let mut headers = HeaderMap::new();
        headers.insert(
            RETRY_AFTER,
            HeaderValue::from_static("Wed, 21 Oct 2015 07:28:00 GMT"),
        );
        assert_eq!(parse_retry_after(&headers), Some(Duration::ZERO));
    }

    #[tokio::test]
    async fn retries_until_success() {
        let attempts = Arc::new(AtomicU32::new(0));
        let seen = attempts.clone();

        let result = retry_with_backoff(
            &instant_policy(3),
            move |_attempt| {
                let seen = seen.clone();
                async move {
                    if seen.fetch_add(1, Ordering::SeqCst) + 1 < 3 {
                        Err("transient")
                    } else {
                        Ok("ok")
                    }
                }
            },
            retry_errors,
            |_info| {},
        )
        .await;

        assert_eq!(result, Ok("ok"));
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let mut retries = Vec::new();
        let result: std::result::Result<&str, &str> = retry_with_backoff(
            &instant_policy(2),
            |_attempt| async { Err("down") },
            retry_errors,
            |info| retries.push(info.attempt),
        )
        .await;

        assert_eq!(result, Err("down"));
        assert_eq!(retries, vec![1]);
    }
}
