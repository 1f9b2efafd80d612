//! HTTP fetch of upstream roll-call documents
//!
//! Every fetch resolves to one of three outcomes so the discovery loop
//! can tell confirmed absence apart from transient upstream trouble.
//! Only network errors and server (5xx) responses are retried; a 404 or
//! a known "vote not available" placeholder is absence, not trouble.

use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

const USER_AGENT: &str = "rollcall-vi/0.1.0 (vote ingest)";

/// Substrings of a final (post-redirect) URL that identify the upstream
/// placeholder pages some boundary roll numbers redirect to.
const PLACEHOLDER_URL_MARKERS: &[&str] = &["vote_menu", "roll_call_lists"];

/// Body markers of the same placeholder pages when served without a
/// redirect. Only the head of the body is scanned.
const PLACEHOLDER_BODY_MARKERS: &[&str] = &["vote not available"];

/// Fetcher construction errors
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP client error: {0}")]
    Client(String),
}

/// Classified result of fetching one roll-call URL
#[derive(Debug, Clone)]
pub enum FetchOutcome {
    /// Document retrieved
    Success(Vec<u8>),
    /// Confirmed absence: 404 or a recognized placeholder page
    NotFound,
    /// Upstream or network trouble that persisted through the retry
    /// policy. Distinct from absence; the caller decides what it means.
    TransientFailure { attempts: u32, last_error: String },
}

/// Retry policy for transient fetch failures: bounded attempts with
/// exponential backoff, shared by both chamber scans.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, initial_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_delay,
            max_delay: Duration::from_secs(5),
        }
    }

    /// Backoff before retry number `retry` (1-based): doubles each time,
    /// capped at `max_delay`.
    fn delay_for(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry.saturating_sub(1));
        self.initial_delay.saturating_mul(factor).min(self.max_delay)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(500))
    }
}

/// Fetcher seam: the driver talks to this trait, tests script it.
#[async_trait::async_trait]
pub trait RollFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> FetchOutcome;
}

/// Result of one HTTP attempt
enum Attempt {
    Done(FetchOutcome),
    Retryable(String),
}

/// Production fetcher over reqwest
#[derive(Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    policy: RetryPolicy,
}

impl HttpFetcher {
    pub fn new(timeout: Duration, policy: RetryPolicy) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Client(e.to_string()))?;

        Ok(Self { client, policy })
    }

    async fn attempt(&self, url: &str) -> Attempt {
        let response = match self.client.get(url).send().await {
            Ok(response) => response,
            Err(e) => return Attempt::Retryable(e.to_string()),
        };

        let status = response.status();

        if status == reqwest::StatusCode::NOT_FOUND {
            return Attempt::Done(FetchOutcome::NotFound);
        }

        if status.is_server_error() {
            return Attempt::Retryable(format!("HTTP {}", status.as_u16()));
        }

        if !status.is_success() {
            // Neither confirmed absence nor server trouble (e.g. 403).
            // Not retryable; surfaced as a failed fetch.
            return Attempt::Done(FetchOutcome::TransientFailure {
                attempts: 1,
                last_error: format!("HTTP {}", status.as_u16()),
            });
        }

        let final_url = response.url().as_str().to_ascii_lowercase();
        if PLACEHOLDER_URL_MARKERS.iter().any(|m| final_url.contains(m)) {
            debug!(url, final_url = %final_url, "Redirected to placeholder page");
            return Attempt::Done(FetchOutcome::NotFound);
        }

        match response.bytes().await {
            Ok(bytes) => {
                if is_placeholder_body(&bytes) {
                    debug!(url, "Body is a vote-not-available placeholder");
                    Attempt::Done(FetchOutcome::NotFound)
                } else {
                    Attempt::Done(FetchOutcome::Success(bytes.to_vec()))
                }
            }
            Err(e) => Attempt::Retryable(e.to_string()),
        }
    }
}

#[async_trait::async_trait]
impl RollFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> FetchOutcome {
        let mut last_error = String::new();

        for attempt in 1..=self.policy.max_attempts {
            if attempt > 1 {
                let delay = self.policy.delay_for(attempt - 1);
                debug!(url, attempt, delay_ms = delay.as_millis() as u64, "Retrying fetch");
                tokio::time::sleep(delay).await;
            }

            match self.attempt(url).await {
                Attempt::Done(outcome) => return outcome,
                Attempt::Retryable(reason) => {
                    warn!(url, attempt, error = %reason, "Transient fetch failure");
                    last_error = reason;
                }
            }
        }

        FetchOutcome::TransientFailure {
            attempts: self.policy.max_attempts,
            last_error,
        }
    }
}

/// Scan the head of a body for placeholder markers
fn is_placeholder_body(bytes: &[u8]) -> bool {
    let head = &bytes[..bytes.len().min(4096)];
    let text = String::from_utf8_lossy(head).to_ascii_lowercase();
    PLACEHOLDER_BODY_MARKERS.iter().any(|m| text.contains(m))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_progression() {
        let policy = RetryPolicy::new(5, Duration::from_millis(500));
        assert_eq!(policy.delay_for(1), Duration::from_millis(500));
        assert_eq!(policy.delay_for(2), Duration::from_millis(1000));
        assert_eq!(policy.delay_for(3), Duration::from_millis(2000));
        // Capped at max_delay
        assert_eq!(policy.delay_for(10), Duration::from_secs(5));
    }

    #[test]
    fn test_at_least_one_attempt() {
        let policy = RetryPolicy::new(0, Duration::from_millis(10));
        assert_eq!(policy.max_attempts, 1);
    }

    #[test]
    fn test_placeholder_body_detection() {
        assert!(is_placeholder_body(b"<html>Vote Not Available yet</html>"));
        assert!(is_placeholder_body(b"<html>vote not available</html>"));
        assert!(!is_placeholder_body(b"<?xml version=\"1.0\"?><rollcall-vote/>"));
    }

    #[test]
    fn test_fetcher_creation() {
        let fetcher = HttpFetcher::new(Duration::from_secs(15), RetryPolicy::default());
        assert!(fetcher.is_ok());
    }
}
