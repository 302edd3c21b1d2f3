//! Bounded retry with exponential backoff for provider HTTP calls

use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

use crate::config::RetryConfig;

/// Failure of a single provider call attempt
#[derive(Debug, Clone, thiserror::Error)]
pub enum CallError {
    /// Worth retrying: transport failure, rate limit, server error
    #[error("{0}")]
    Transient(String),
    /// Not worth retrying: client error, malformed response
    #[error("{0}")]
    Permanent(String),
}

impl CallError {
    /// Classify a reqwest error
    pub fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Permanent(format!("invalid response body: {}", err))
        } else if err.is_timeout() {
            Self::Transient(format!("request timed out: {}", err))
        } else if err.is_connect() || err.is_request() || err.is_body() {
            Self::Transient(format!("request failed: {}", err))
        } else {
            Self::Permanent(format!("request failed: {}", err))
        }
    }

    /// Classify an unsuccessful HTTP status
    pub fn from_status(status: StatusCode, body: &str) -> Self {
        let message = if body.is_empty() {
            format!("HTTP {}", status)
        } else {
            format!("HTTP {} - {}", status, truncate(body, 500))
        };

        if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
            Self::Transient(message)
        } else {
            Self::Permanent(message)
        }
    }

    /// Whether another attempt may succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

fn truncate(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((i, _)) => &text[..i],
        None => text,
    }
}

/// Turn a non-success response into a classified error
pub async fn check_status(response: Response) -> Result<Response, CallError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(CallError::from_status(status, &body))
}

/// Check the status and decode a JSON body
pub async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, CallError> {
    check_status(response)
        .await?
        .json::<T>()
        .await
        .map_err(CallError::from_reqwest)
}

/// Exponential backoff policy: delay = base * 2^attempt, capped at `max_delay`
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_retries: u32,
    base_delay: Duration,
    max_delay: Duration,
}

impl RetryPolicy {
    /// Create a policy
    pub fn new(max_retries: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
            max_delay,
        }
    }

    /// Create a policy from configuration
    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(
            config.max_retries,
            Duration::from_millis(config.base_delay_ms),
            Duration::from_millis(config.max_delay_ms),
        )
    }

    /// A policy that never retries
    pub fn none() -> Self {
        Self::new(0, Duration::ZERO, Duration::ZERO)
    }

    /// Delay before retry number `attempt` (0-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }

    /// Run `operation`, retrying transient failures with backoff
    pub async fn run<F, Fut, T>(&self, what: &str, mut operation: F) -> Result<T, CallError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, CallError>>,
    {
        let mut attempt = 0;

        loop {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(e) if e.is_transient() && attempt < self.max_retries => {
                    let delay = self.delay_for(attempt);
                    tracing::warn!(
                        "{} failed (attempt {}/{}): {}, retrying in {:?}",
                        what,
                        attempt + 1,
                        self.max_retries + 1,
                        e,
                        delay
                    );
                    sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_backoff_is_capped() {
        let policy = RetryPolicy::new(10, Duration::from_millis(500), Duration::from_millis(8_000));
        assert_eq!(policy.delay_for(0), Duration::from_millis(500));
        assert_eq!(policy.delay_for(2), Duration::from_millis(2_000));
        assert_eq!(policy.delay_for(6), Duration::from_millis(8_000));
        assert_eq!(policy.delay_for(40), Duration::from_millis(8_000));
    }

    #[test]
    fn test_status_classification() {
        assert!(CallError::from_status(StatusCode::TOO_MANY_REQUESTS, "").is_transient());
        assert!(CallError::from_status(StatusCode::BAD_GATEWAY, "").is_transient());
        assert!(!CallError::from_status(StatusCode::UNAUTHORIZED, "bad key").is_transient());
    }

    #[tokio::test]
    async fn test_transient_errors_are_retried() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let policy = RetryPolicy::new(2, Duration::from_millis(1), Duration::from_millis(2));

        let result = policy
            .run("test call", move || async move {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(CallError::Transient("busy".to_string()))
                } else {
                    Ok(42)
                }
            })
            .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_permanent_errors_are_not_retried() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let policy = RetryPolicy::new(5, Duration::from_millis(1), Duration::from_millis(2));

        let result: Result<(), _> = policy
            .run("test call", move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(CallError::Permanent("HTTP 400".to_string()))
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retries_are_bounded() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let policy = RetryPolicy::new(2, Duration::from_millis(1), Duration::from_millis(2));

        let result: Result<(), _> = policy
            .run("test call", move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(CallError::Transient("down".to_string()))
            })
            .await;

        assert!(matches!(result, Err(CallError::Transient(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
