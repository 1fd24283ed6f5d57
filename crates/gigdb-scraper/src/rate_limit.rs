//! Retry and pacing for page loads.
//!
//! Transient failures (timeouts, transport errors, 429 and 5xx responses)
//! are retried with exponential backoff. Everything else is returned on the
//! first failure. Consecutive detail fetches are spaced by a [`Cooldown`].

use std::time::Duration;

use tokio::time::Instant;

use crate::error::SessionError;
use crate::session::{PageSession, PageSnapshot};

/// How many times, and how patiently, to retry a page load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Additional attempts after the first try.
    pub max_retries: u32,
    pub backoff_base_secs: u64,
}

impl RetryPolicy {
    /// Delay before retry number `attempt + 1`: `base * 2^attempt` seconds.
    ///
    /// | Attempt | Sleep before next attempt (`base = 2`) |
    /// |---------|----------------------------------------|
    /// | 0       | 2 s                                    |
    /// | 1       | 4 s                                    |
    /// | 2       | 8 s                                    |
    #[must_use]
    pub fn backoff(&self, attempt: u32) -> Duration {
        let delay_secs = self
            .backoff_base_secs
            .saturating_mul(1u64 << attempt.min(62));
        Duration::from_secs(delay_secs)
    }
}

/// Open `url`, wait `settle`, and snapshot it, retrying transient failures.
///
/// With `max_retries = 2` the page is attempted at most three times.
///
/// # Errors
///
/// Returns the last [`SessionError`] once retries are exhausted, or the first
/// non-retriable error immediately.
pub async fn load_with_retry<S: PageSession>(
    session: &mut S,
    url: &str,
    settle: Duration,
    policy: RetryPolicy,
) -> Result<PageSnapshot, SessionError> {
    let mut attempt = 0u32;

    loop {
        let err = match load_once(session, url, settle).await {
            Ok(snapshot) => return Ok(snapshot),
            Err(err) => err,
        };

        if !err.is_retriable() || attempt >= policy.max_retries {
            return Err(err);
        }

        let delay = policy.backoff(attempt);
        tracing::warn!(
            url,
            attempt,
            max_retries = policy.max_retries,
            delay_secs = delay.as_secs(),
            error = %err,
            "transient page load failure, retrying after backoff"
        );
        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}

async fn load_once<S: PageSession>(
    session: &mut S,
    url: &str,
    settle: Duration,
) -> Result<PageSnapshot, SessionError> {
    session.open(url).await?;
    if !settle.is_zero() {
        tokio::time::sleep(settle).await;
    }
    session.snapshot().await
}

/// Mandatory pause between consecutive detail-page fetches.
#[derive(Debug)]
pub struct Cooldown {
    interval: Duration,
    last: Option<Instant>,
}

impl Cooldown {
    #[must_use]
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: None,
        }
    }

    /// Wait until `interval` has passed since the previous call.
    ///
    /// The first call returns immediately.
    pub async fn wait(&mut self) {
        if let Some(last) = self.last {
            let ready_at = last + self.interval;
            if Instant::now() < ready_at {
                tokio::time::sleep_until(ready_at).await;
            }
        }
        self.last = Some(Instant::now());
    }
}
