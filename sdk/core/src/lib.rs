//! Core types and algorithms for the StorageHub client SDK.
//!
//! This crate is transport-free: it holds the identifier and record types
//! shared by the ledger and backend gateways, the bounded-retry
//! reconciliation poller, the signed deletion wire format, and the
//! duration math used for balance runway estimates.

pub mod constants;
pub mod duration;
pub mod intention;
pub mod poller;
pub mod types;

pub use duration::{calculate_time_remaining, format_duration, TimeRemaining};
pub use intention::{FileOperation, FileOperationIntention, PersonalSigner, Signature};
pub use poller::{poll_until, PollCheck, PollConfig, PollError, Polled};
pub use types::*;
