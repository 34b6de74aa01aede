//! Ledger gateway: typed read/submit access to the chain node.
//!
//! All chain access goes through the [`LedgerGateway`] trait so flows can
//! be tested against `MockLedger` without a node. The production
//! implementation is [`rpc::RpcLedgerGateway`] over a WebSocket connection.

pub mod connection;
pub mod methods;
#[cfg(feature = "mocks")]
pub mod mock;
#[cfg(feature = "mocks")]
pub mod mock_connection;
pub mod queue;
pub mod rpc;
pub mod ws;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use shs_core::intention::{FileOperationIntention, Signature};
use shs_core::types::{
    AccountId, Balance, BlockHash, BucketId, BucketRecord, DynamicRatePaymentStream, FileKey,
    Fingerprint, FixedRatePaymentStream, LastChargeableInfo, ProviderId, StorageRequestMetadata,
    Tick, TxHash, ValuePropId,
};

use crate::error::Result;

/// Source of the ledger's logical clock.
#[async_trait]
pub trait TickClock: Send + Sync {
    /// The tick of the latest best block.
    async fn current_tick(&self) -> Result<Tick>;
}

/// Read and submit access to the ledger.
///
/// Reads return `Ok(None)` when the queried record does not exist; absence
/// is a normal answer, not an error.
#[async_trait]
pub trait LedgerGateway: TickClock {
    async fn bucket(&self, bucket_id: &BucketId) -> Result<Option<BucketRecord>>;

    async fn storage_request(
        &self,
        file_key: &FileKey,
    ) -> Result<Option<StorageRequestMetadata>>;

    async fn dynamic_rate_stream(
        &self,
        provider: &ProviderId,
        user: &AccountId,
    ) -> Result<Option<DynamicRatePaymentStream>>;

    async fn fixed_rate_stream(
        &self,
        provider: &ProviderId,
        user: &AccountId,
    ) -> Result<Option<FixedRatePaymentStream>>;

    async fn last_chargeable_info(
        &self,
        provider: &ProviderId,
    ) -> Result<Option<LastChargeableInfo>>;

    /// Number of file deletions currently queued for `user`.
    async fn pending_deletion_count(&self, user: &AccountId) -> Result<u32>;

    async fn free_balance(&self, account: &AccountId) -> Result<Balance>;

    /// Whether `user` has been flagged as out of funds by a provider.
    async fn is_insolvent(&self, user: &AccountId) -> Result<bool>;

    /// Submit a call, watch it to inclusion and surface any dispatch
    /// error as [`crate::error::Error::Dispatch`].
    async fn submit(&self, call: LedgerCall) -> Result<TxReceipt>;
}

/// How many BSP replicas a storage request asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "level", rename_all = "camelCase")]
pub enum ReplicationTarget {
    /// The network default replica count.
    Standard,
    /// An explicit replica count chosen by the user.
    Custom { replicas: u32 },
}

/// A call submitted to the ledger through [`LedgerGateway::submit`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "call", content = "params", rename_all = "camelCase")]
#[serde(rename_all_fields = "camelCase")]
pub enum LedgerCall {
    RequestBspSignUp {
        capacity: u64,
        multiaddresses: Vec<String>,
        payment_account: AccountId,
    },
    RequestMspSignUp {
        capacity: u64,
        multiaddresses: Vec<String>,
        value_prop_price_per_giga_unit: Balance,
        value_prop_bucket_data_limit: u64,
        payment_account: AccountId,
    },
    ConfirmSignUp {
        /// Confirm a sign-up on behalf of another account, or the
        /// signer's own when `None`.
        provider_account: Option<AccountId>,
    },
    IssueStorageRequest {
        bucket_id: BucketId,
        location: String,
        fingerprint: Fingerprint,
        size: u64,
        msp_id: ProviderId,
        peer_ids: Vec<String>,
        replication: ReplicationTarget,
    },
    RevokeStorageRequest {
        file_key: FileKey,
    },
    RequestDeleteFile {
        intention: FileOperationIntention,
        signature: Signature,
        bucket_id: BucketId,
        location: String,
        size: u64,
        fingerprint: Fingerprint,
    },
    CreateBucket {
        msp_id: ProviderId,
        name: String,
        private: bool,
        value_prop_id: ValuePropId,
    },
    DeleteBucket {
        bucket_id: BucketId,
    },
    PayOutstandingDebt {
        provider_ids: Vec<ProviderId>,
    },
    ClearInsolventFlag,
    Transfer {
        to: AccountId,
        amount: Balance,
    },
}

impl LedgerCall {
    /// Short name used in log events.
    pub fn name(&self) -> &'static str {
        match self {
            LedgerCall::RequestBspSignUp { .. } => "requestBspSignUp",
            LedgerCall::RequestMspSignUp { .. } => "requestMspSignUp",
            LedgerCall::ConfirmSignUp { .. } => "confirmSignUp",
            LedgerCall::IssueStorageRequest { .. } => "issueStorageRequest",
            LedgerCall::RevokeStorageRequest { .. } => "revokeStorageRequest",
            LedgerCall::RequestDeleteFile { .. } => "requestDeleteFile",
            LedgerCall::CreateBucket { .. } => "createBucket",
            LedgerCall::DeleteBucket { .. } => "deleteBucket",
            LedgerCall::PayOutstandingDebt { .. } => "payOutstandingDebt",
            LedgerCall::ClearInsolventFlag => "clearInsolventFlag",
            LedgerCall::Transfer { .. } => "transfer",
        }
    }
}

/// Proof that a submitted call was included in a finalized block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxReceipt {
    pub tx_hash: TxHash,
    pub block_hash: BlockHash,
}
