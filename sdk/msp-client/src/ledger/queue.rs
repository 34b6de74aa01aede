//! Serialized submission wrapper around a [`LedgerGateway`].
//!
//! A single account's transactions carry sequential nonces, so two calls
//! submitted concurrently from the same signer race each other and one
//! gets dropped by the node. The queue funnels submissions through one
//! async mutex while leaving reads fully concurrent.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use shs_core::types::{
    AccountId, Balance, BucketId, BucketRecord, DynamicRatePaymentStream, FileKey,
    FixedRatePaymentStream, LastChargeableInfo, ProviderId, StorageRequestMetadata, Tick,
};

use super::{LedgerCall, LedgerGateway, TickClock, TxReceipt};
use crate::error::Result;

const LOG_TARGET: &str = "shs::ledger::queue";

/// Wraps a gateway so that at most one [`submit`](LedgerGateway::submit)
/// is in flight at a time. Reads pass straight through.
#[derive(Debug)]
pub struct SubmissionQueue<L> {
    inner: Arc<L>,
    submit_lock: Mutex<()>,
}

impl<L> SubmissionQueue<L> {
    pub fn new(inner: Arc<L>) -> Self {
        Self {
            inner,
            submit_lock: Mutex::new(()),
        }
    }

    pub fn inner(&self) -> &Arc<L> {
        &self.inner
    }
}

#[async_trait]
impl<L: LedgerGateway> TickClock for SubmissionQueue<L> {
    async fn current_tick(&self) -> Result<Tick> {
        self.inner.current_tick().await
    }
}

#[async_trait]
impl<L: LedgerGateway> LedgerGateway for SubmissionQueue<L> {
    async fn bucket(&self, bucket_id: &BucketId) -> Result<Option<BucketRecord>> {
        self.inner.bucket(bucket_id).await
    }

    async fn storage_request(
        &self,
        file_key: &FileKey,
    ) -> Result<Option<StorageRequestMetadata>> {
        self.inner.storage_request(file_key).await
    }

    async fn dynamic_rate_stream(
        &self,
        provider: &ProviderId,
        user: &AccountId,
    ) -> Result<Option<DynamicRatePaymentStream>> {
        self.inner.dynamic_rate_stream(provider, user).await
    }

    async fn fixed_rate_stream(
        &self,
        provider: &ProviderId,
        user: &AccountId,
    ) -> Result<Option<FixedRatePaymentStream>> {
        self.inner.fixed_rate_stream(provider, user).await
    }

    async fn last_chargeable_info(
        &self,
        provider: &ProviderId,
    ) -> Result<Option<LastChargeableInfo>> {
        self.inner.last_chargeable_info(provider).await
    }

    async fn pending_deletion_count(&self, user: &AccountId) -> Result<u32> {
        self.inner.pending_deletion_count(user).await
    }

    async fn free_balance(&self, account: &AccountId) -> Result<Balance> {
        self.inner.free_balance(account).await
    }

    async fn is_insolvent(&self, user: &AccountId) -> Result<bool> {
        self.inner.is_insolvent(user).await
    }

    async fn submit(&self, call: LedgerCall) -> Result<TxReceipt> {
        let _guard = self.submit_lock.lock().await;
        tracing::trace!(target: LOG_TARGET, call = call.name(), "submission slot acquired");
        self.inner.submit(call).await
    }
}
