//! StorageHub MSP client SDK.
//!
//! Client-side coordination between the two halves of the network a user
//! talks to: the ledger node (ground truth, via JSON-RPC) and an MSP's
//! backend service (eventually consistent index and auth, via REST).
//!
//! The main entry points:
//! - [`lifecycle::StorageRequestLifecycle`] drives storage requests from
//!   issuance through MSP confirmation and replication to readiness, and
//!   handles revocation and signed deletion.
//! - [`debt::DebtAccountant`] aggregates payment-stream debt and wraps
//!   settlement and insolvency calls.
//! - [`backend::session`] implements the nonce/sign/verify sign-in flow.
//! - [`ledger::queue::SubmissionQueue`] serializes transaction submission
//!   for a single signing account.

pub mod backend;
pub mod config;
pub mod debt;
pub mod error;
pub mod ledger;
pub mod lifecycle;
pub mod log;
pub mod ops;

pub use backend::http::HttpBackendGateway;
pub use backend::session::{sign_in, sign_out, Session};
pub use backend::BackendIndexGateway;
pub use config::Config;
pub use debt::DebtAccountant;
pub use error::{DispatchError, Error, RequestFailure, Result};
pub use ledger::queue::SubmissionQueue;
pub use ledger::rpc::RpcLedgerGateway;
pub use ledger::{LedgerCall, LedgerGateway, ReplicationTarget, TickClock, TxReceipt};
pub use lifecycle::{DeletionReceipt, IssueParams, RequestState, StorageRequestLifecycle};
