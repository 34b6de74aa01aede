//! Error taxonomy for the client.
//!
//! Only transient not-found conditions are ever retried, and only inside
//! the reconciliation poller. Every other kind propagates to the caller
//! unmodified, carrying the identifying keys involved so failures can be
//! debugged without re-deriving them.

use std::time::Duration;

use shs_core::poller::PollError;
use shs_core::types::FileKey;

use crate::ledger::connection::RpcConnectionError;

/// A transaction finalized but failed at the module level.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DispatchError {
    /// Decoded module error with its section, name and description.
    #[error("{section}.{method}: {description}")]
    Module {
        section: String,
        method: String,
        description: String,
    },

    /// Other, CannotLookup, BadOrigin... no extra info available.
    #[error("dispatch failed: {0}")]
    Other(String),
}

/// Authoritative negative outcome of a storage request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RequestFailure {
    #[error("rejected by the MSP")]
    Rejected,

    #[error("revoked by the user")]
    Revoked,

    #[error("expired: the required number of BSP replicas was not achieved within the deadline")]
    Expired,

    #[error("the storage request record no longer exists on chain")]
    Vanished,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Precondition failure detected before any network call.
    #[error("validation failed: {0}")]
    Validation(String),

    /// A submitted transaction finalized with a non-success status.
    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    /// Poll attempts exhausted with no success and no terminal failure.
    #[error("timed out waiting for {what} after {attempts} attempts ({elapsed:?})")]
    Timeout {
        what: String,
        attempts: u32,
        elapsed: Duration,
    },

    /// The ledger or backend reported a final negative outcome for a
    /// storage request.
    #[error("storage request for file {file_key} failed: {failure}")]
    RequestFailed {
        file_key: FileKey,
        failure: RequestFailure,
    },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Ledger state contradicts its own monotonicity guarantees (e.g. a
    /// price index below the last-charged snapshot).
    #[error("ledger inconsistency: {0}")]
    LedgerInconsistency(String),

    #[error("rpc: {0}")]
    Rpc(#[from] RpcConnectionError),

    #[error("backend: {0}")]
    Backend(String),

    /// Wallet signer refused or failed to sign.
    #[error("signer: {0}")]
    Signer(String),

    #[error("operation cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Collapses a poll failure whose terminal kind is already an
    /// [`Error`] into the crate error, labelling timeouts with `what`.
    pub(crate) fn from_poll(what: &str, err: PollError<Error, Error>) -> Error {
        match err {
            PollError::Terminal(e) | PollError::Check(e) => e,
            PollError::Timeout { attempts, elapsed } => Error::Timeout {
                what: what.to_string(),
                attempts,
                elapsed,
            },
            PollError::Cancelled => Error::Cancelled,
        }
    }
}
