//! Bounded-retry reconciliation polling.
//!
//! Actions submitted to the ledger complete asynchronously: the chain
//! record and the MSP backend index each converge on the outcome at their
//! own pace. [`poll_until`] repeatedly evaluates a status check against
//! one of them until a terminal outcome, a definitive failure, or
//! exhaustion of the attempt budget.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::constants::polling;

const LOG_TARGET: &str = "shs::poller";

/// Attempt budget and inter-attempt delay for one reconciliation loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    /// Total number of check evaluations before giving up.
    pub max_attempts: u32,
    /// Delay between attempts. Never applied before the first attempt or
    /// after the last one.
    pub interval: Duration,
}

impl PollConfig {
    pub fn new(max_attempts: u32, interval: Duration) -> Self {
        Self {
            // A budget of zero attempts would never evaluate the check.
            max_attempts: max_attempts.max(1),
            interval,
        }
    }

    /// Default budget for "backend record exists" checks (~20s ceiling).
    pub fn backend_lookup() -> Self {
        Self::new(
            polling::BACKEND_LOOKUP_ATTEMPTS,
            polling::BACKEND_LOOKUP_INTERVAL,
        )
    }

    /// Default budget for "full replication achieved" checks, matched to
    /// the protocol's replication deadline (~12 minutes).
    pub fn replication() -> Self {
        Self::new(polling::REPLICATION_ATTEMPTS, polling::REPLICATION_INTERVAL)
    }
}

/// Classified result of a single status check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollCheck<T, K> {
    /// The awaited condition holds; polling stops successfully.
    Ready(T),
    /// Expected transient condition (e.g. record not yet indexed);
    /// retried until the budget is exhausted.
    Pending,
    /// Definitively final negative outcome; polling aborts immediately.
    Abort(K),
}

/// Successful poll result with diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Polled<T> {
    pub value: T,
    /// Number of check evaluations performed, including the last.
    pub attempts: u32,
    pub elapsed: Duration,
}

/// Why a poll loop stopped without success.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PollError<K, E> {
    /// The check classified the outcome as final and negative.
    #[error("terminal failure: {0}")]
    Terminal(K),

    /// Attempt budget exhausted with no success and no terminal failure.
    #[error("timed out after {attempts} attempts ({elapsed:?})")]
    Timeout { attempts: u32, elapsed: Duration },

    /// The caller cancelled the loop between attempts.
    #[error("polling cancelled")]
    Cancelled,

    /// The check failed with an error it could not classify; propagated
    /// unchanged, it is not a polling condition.
    #[error("{0}")]
    Check(E),
}

/// Evaluates `check` until it reports [`PollCheck::Ready`], aborting on
/// [`PollCheck::Abort`], an unclassified error, cancellation, or after
/// `config.max_attempts` evaluations.
///
/// There is no sleep before the first attempt, after a `Ready`, after an
/// `Abort`, or after the final attempt.
pub async fn poll_until<T, K, E, C, Fut>(
    config: PollConfig,
    cancel: &CancellationToken,
    mut check: C,
) -> Result<Polled<T>, PollError<K, E>>
where
    C: FnMut() -> Fut,
    Fut: Future<Output = Result<PollCheck<T, K>, E>>,
    K: std::fmt::Debug,
{
    let start = tokio::time::Instant::now();
    let mut attempts = 0u32;

    loop {
        attempts += 1;
        debug!(
            target: LOG_TARGET,
            attempt = attempts,
            max_attempts = config.max_attempts,
            "evaluating status check"
        );

        match check().await.map_err(PollError::Check)? {
            PollCheck::Ready(value) => {
                debug!(target: LOG_TARGET, attempts, "check succeeded");
                return Ok(Polled {
                    value,
                    attempts,
                    elapsed: start.elapsed(),
                });
            }
            PollCheck::Abort(kind) => {
                warn!(target: LOG_TARGET, attempts, kind = ?kind, "check reported terminal failure");
                return Err(PollError::Terminal(kind));
            }
            PollCheck::Pending => {
                if attempts >= config.max_attempts {
                    let elapsed = start.elapsed();
                    warn!(
                        target: LOG_TARGET,
                        attempts,
                        elapsed_ms = elapsed.as_millis() as u64,
                        "attempt budget exhausted"
                    );
                    return Err(PollError::Timeout { attempts, elapsed });
                }

                tokio::select! {
                    _ = cancel.cancelled() => return Err(PollError::Cancelled),
                    _ = tokio::time::sleep(config.interval) => {}
                }
            }
        }
    }
}
