//! Resilient HTTP fetcher
//!
//! This module wraps a [`Transport`] with:
//! - Exponential backoff between attempts (1s, 2s, 4s, ...)
//! - A fixed attempt ceiling
//! - Cooperative cancellation checked before every wait
//! - Success-only request counting

use crate::config::RetryConfig;
use crate::fetch::counter::RequestCounter;
use crate::fetch::transport::{FetchRequest, FetchResponse, Transport};
use crate::state::CancellationToken;
use std::sync::Arc;
use std::time::Duration;

/// Retry ceiling and backoff seed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_backoff: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            initial_backoff: Duration::from_secs(config.initial_backoff_secs),
        }
    }

    /// Delays waited between consecutive failed attempts
    ///
    /// Yields `max_attempts - 1` values; there is no wait after the last attempt.
    pub fn delays(&self) -> impl Iterator<Item = Duration> {
        let initial = self.initial_backoff;
        (0..self.max_attempts.saturating_sub(1))
            .map(move |n| initial.saturating_mul(2u32.saturating_pow(n)))
    }
}

/// Result of one logical fetch
#[derive(Debug)]
pub enum FetchOutcome {
    /// A 2xx response was received
    Success(FetchResponse),

    /// Every attempt failed
    Exhausted {
        /// Number of attempts made
        attempts: u32,
        /// Description of the final failure
        last_error: String,
    },

    /// Cancellation was observed before a retry wait
    Cancelled {
        /// Number of attempts made before giving up
        attempts: u32,
    },
}

impl FetchOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Returns the response payload, treating every failure as "no data"
    pub fn into_response(self) -> Option<FetchResponse> {
        match self {
            Self::Success(response) => Some(response),
            _ => None,
        }
    }
}

/// Performs one logical request with backoff retry
///
/// # Retry Logic
///
/// | Condition | Action |
/// |-----------|--------|
/// | 2xx | Return payload, count one request |
/// | Any transport/HTTP failure, attempts left | Check cancellation, wait the next [`RetryPolicy::delays`] value |
/// | Any failure on the final attempt | Return `Exhausted` (no wait) |
/// | Token set before a wait | Return `Cancelled` immediately |
#[derive(Clone)]
pub struct ResilientFetcher {
    transport: Arc<dyn Transport>,
    policy: RetryPolicy,
}

impl ResilientFetcher {
    pub fn new(transport: Arc<dyn Transport>, policy: RetryPolicy) -> Self {
        Self { transport, policy }
    }

    /// Fetches `request`, retrying transient failures
    ///
    /// Exhaustion and cancellation are reported through [`FetchOutcome`],
    /// never as a panic or error; callers treat them as "no data".
    pub async fn fetch(
        &self,
        request: &FetchRequest,
        cancel: &CancellationToken,
        counter: Option<&dyn RequestCounter>,
    ) -> FetchOutcome {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut delays = self.policy.delays();
        let mut attempts = 0;

        loop {
            attempts += 1;
            tracing::debug!(
                "Fetching {} (attempt {}/{})",
                request.url,
                attempts,
                max_attempts
            );

            let error = match self.transport.send(request).await {
                Ok(response) => {
                    if let Some(counter) = counter {
                        counter.increment();
                    }
                    return FetchOutcome::Success(response);
                }
                Err(e) => e,
            };

            let Some(backoff) = delays.next() else {
                tracing::error!(
                    "Max attempts reached ({}) for {}: {}",
                    max_attempts,
                    request.url,
                    error
                );
                return FetchOutcome::Exhausted {
                    attempts,
                    last_error: error.to_string(),
                };
            };

            if cancel.is_cancelled() {
                tracing::info!("Fetch of {} cancelled after {} attempts", request.url, attempts);
                return FetchOutcome::Cancelled { attempts };
            }

            tracing::warn!(
                "Error fetching data: {}. Retrying in {} seconds...",
                error,
                backoff.as_secs_f64()
            );

            if !cancel.sleep(backoff).await {
                tracing::info!("Fetch of {} cancelled during backoff", request.url);
                return FetchOutcome::Cancelled { attempts };
            }
        }
    }
}

impl std::fmt::Debug for ResilientFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResilientFetcher")
            .field("policy", &self.policy)
            .finish()
    }
}
