//! Retry wrapper shared by every portal fetcher.
//!
//! # Retry contract
//!
//! | Failure                       | Behaviour                                 |
//! |-------------------------------|-------------------------------------------|
//! | `retryable` (driver crashed)  | retried up to `retries` times, backoff x2 |
//! | not retryable                 | returned immediately                      |
//! | `schema` (unknown header)     | returned immediately, never retried       |
//!
//! After the last retry the error is returned as non-retryable so an outer
//! caller does not loop again.

use std::thread;
use std::time::Duration;

use licita_engine::{FetchError, RangeFetcher, RangeQuery, ResultPage};
use tracing::warn;

// ── Constants ───────────────────────────────────────────────────────

pub const DEFAULT_RETRIES: u32 = 3;
pub const DEFAULT_BACKOFF: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts after the first one.
    pub retries: u32,
    /// Delay before the first retry; doubles each time.
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: DEFAULT_RETRIES,
            backoff: DEFAULT_BACKOFF,
        }
    }
}

/// Wraps a fetcher and retries its transient failures.
pub struct RetryingFetcher<F> {
    inner: F,
    policy: RetryPolicy,
    retried: usize,
}

impl<F: RangeFetcher> RetryingFetcher<F> {
    pub fn new(inner: F, policy: RetryPolicy) -> Self {
        Self { inner, policy, retried: 0 }
    }

    /// Retries performed so far, across all queries.
    pub fn retried(&self) -> usize {
        self.retried
    }

    pub fn into_inner(self) -> F {
        self.inner
    }
}

impl<F: RangeFetcher> RangeFetcher for RetryingFetcher<F> {
    fn fetch(&mut self, query: &RangeQuery) -> Result<ResultPage, FetchError> {
        let mut backoff = self.policy.backoff;
        let mut attempt = 0u32;

        loop {
            let err = match self.inner.fetch(query) {
                Ok(page) => return Ok(page),
                Err(err) => err,
            };

            if !err.retryable {
                return Err(err);
            }

            if attempt == self.policy.retries {
                return Err(FetchError::fatal(format!(
                    "{} (gave up after {} attempts)",
                    err.message,
                    attempt + 1,
                )));
            }

            attempt += 1;
            self.retried += 1;
            warn!(
                query = %query,
                error = %err.message,
                "retry {}/{} in {}ms",
                attempt,
                self.policy.retries,
                backoff.as_millis(),
            );
            thread::sleep(backoff);
            backoff *= 2;
        }
    }
}
