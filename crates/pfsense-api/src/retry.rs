// Bounded retry executor
//
// Wraps a single HTTP exchange. Only failures that say nothing about the
// backend's decision are retried: transport errors, degenerate statuses
// and 5xx other than 501. Anything else is handed back untouched so an
// accepted form is never resubmitted.

use std::time::Duration;

use reqwest::StatusCode;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::Error;

pub const DEFAULT_RETRY_MIN_WAIT: Duration = Duration::from_secs(1);
pub const DEFAULT_RETRY_MAX_WAIT: Duration = Duration::from_secs(5);
pub const DEFAULT_MAX_ATTEMPTS: i32 = 3;

/// Retry bounds attached to a session at construction.
///
/// `max_attempts` counts retries after the first attempt. Negative values
/// are clamped to zero, so at least one attempt is always made.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub min_wait: Duration,
    pub max_wait: Duration,
    pub max_attempts: i32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            min_wait: DEFAULT_RETRY_MIN_WAIT,
            max_wait: DEFAULT_RETRY_MAX_WAIT,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl RetryPolicy {
    /// A policy with zero backoff, for tests and local tooling.
    pub fn immediate(max_attempts: i32) -> Self {
        Self {
            min_wait: Duration::ZERO,
            max_wait: Duration::ZERO,
            max_attempts,
        }
    }

    /// Total number of exchanges the executor may perform.
    pub fn total_attempts(&self) -> u32 {
        self.max_attempts.max(0).unsigned_abs().saturating_add(1)
    }

    /// Delay before retry number `retry` (1-based): exponential from
    /// `min_wait`, capped at `max_wait`.
    pub fn backoff(&self, retry: u32) -> Duration {
        let shift = retry.saturating_sub(1).min(16);
        let delay = self.min_wait.saturating_mul(1u32 << shift);
        delay.min(self.max_wait).max(self.min_wait)
    }
}

/// Whether a status means the exchange should be tried again.
///
/// Statuses outside the standard 100..=599 range are treated as absent.
pub fn is_retryable_status(status: StatusCode) -> bool {
    !has_usable_status(status)
        || (status.is_server_error() && status != StatusCode::NOT_IMPLEMENTED)
}

fn has_usable_status(status: StatusCode) -> bool {
    (100..600).contains(&status.as_u16())
}

/// Execute `request` under `policy`, honouring `cancel` throughout.
///
/// Returns the first response that is not retryable, or the final
/// attempt's response if it carries a usable (even 5xx) status. Fails
/// with [`Error::Cancelled`] as soon as the token fires, and with
/// [`Error::RetriesExhausted`] when no attempt produced a response.
pub async fn execute(
    http: &reqwest::Client,
    request: reqwest::Request,
    policy: &RetryPolicy,
    cancel: &CancellationToken,
) -> Result<reqwest::Response, Error> {
    let attempts = policy.total_attempts();
    let method = request.method().clone();
    let url = request.url().clone();
    let mut last_error: Option<String> = None;

    for attempt in 1..=attempts {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let Some(cloned) = request.try_clone() else {
            return Err(Error::Configuration {
                message: "request body cannot be cloned; buffer the body to enable retries".into(),
            });
        };

        debug!(attempt, %method, %url, "sending request");

        let outcome = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(Error::Cancelled),
            res = http.execute(cloned) => res,
        };

        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        match outcome {
            Ok(resp) => {
                let status = resp.status();
                if !is_retryable_status(status) {
                    debug!(attempt, %method, %url, %status, "received response");
                    return Ok(resp);
                }
                if attempt == attempts && has_usable_status(status) {
                    warn!(attempt, %method, %url, %status, "retries exhausted, returning last response");
                    return Ok(resp);
                }
                warn!(attempt, %method, %url, %status, "retryable status");
                last_error = Some(format!("HTTP {status}"));
            }
            Err(e) => {
                warn!(attempt, %method, %url, error = %e, "request failed");
                last_error = Some(e.to_string());
            }
        }

        if attempt < attempts {
            let delay = policy.backoff(attempt);
            if !delay.is_zero() {
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => return Err(Error::Cancelled),
                    () = tokio::time::sleep(delay) => {}
                }
            }
        }
    }

    Err(Error::RetriesExhausted {
        attempts,
        last_error,
    })
}
