//! Bounded retry with exponential backoff for forecast requests.
//!
//! Timeouts, connection failures, 5xx, 408 and 429 are retried. Other 4xx
//! responses and request-building errors are returned immediately.

use std::future::Future;
use std::time::Duration;

use reqwest::{Response, StatusCode};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Delay before the first retry, doubled for each one after
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, initial_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_retries,
            initial_delay,
            max_delay,
        }
    }

    /// Backoff before retry number `retry` (zero-based), capped at `max_delay`.
    pub fn delay_for_retry(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry);
        self.initial_delay
            .saturating_mul(factor)
            .min(self.max_delay)
    }
}

pub fn is_retryable_status(status: StatusCode) -> bool {
    status.is_server_error()
        || status == StatusCode::TOO_MANY_REQUESTS
        || status == StatusCode::REQUEST_TIMEOUT
}

pub fn is_retryable_error(error: &reqwest::Error) -> bool {
    if error.is_timeout() || error.is_connect() {
        return true;
    }
    if error.is_request() || error.is_builder() {
        return false;
    }
    error.status().is_some_and(is_retryable_status)
}

/// Run `send` until it yields a non-retryable outcome or the policy is
/// exhausted. The last response is returned even if its status is still
/// retryable; the caller decides what a failing status means.
pub async fn with_retry<F, Fut>(policy: &RetryPolicy, send: F) -> Result<Response, reqwest::Error>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<Response, reqwest::Error>>,
{
    let mut retry = 0;

    loop {
        let outcome = send().await;
        let exhausted = retry >= policy.max_retries;

        match outcome {
            Ok(response) if !is_retryable_status(response.status()) || exhausted => {
                if retry > 0 {
                    tracing::info!("Forecast request settled after {} retries", retry);
                }
                return Ok(response);
            }
            Ok(response) => {
                tracing::warn!(
                    "Forecast request returned {}, retry {} of {}",
                    response.status(),
                    retry + 1,
                    policy.max_retries
                );
            }
            Err(e) if !is_retryable_error(&e) || exhausted => {
                tracing::debug!("Giving up on forecast request: {}", e);
                return Err(e);
            }
            Err(e) => {
                tracing::warn!(
                    "Forecast request failed ({}), retry {} of {}",
                    e,
                    retry + 1,
                    policy.max_retries
                );
            }
        }

        tokio::time::sleep(policy.delay_for_retry(retry)).await;
        retry += 1;
    }
}
