//! In-memory [`LedgerGateway`] for unit tests.
//!
//! Holds programmable chain state and applies the semantic effect of the
//! calls the flows under test actually submit.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use shs_core::types::{
    AccountId, Balance, BlockHash, BucketId, BucketRecord, DynamicRatePaymentStream, FileKey,
    FixedRatePaymentStream, LastChargeableInfo, ProviderId, StorageRequestMetadata, Tick, TxHash,
};

use super::{LedgerCall, LedgerGateway, TickClock, TxReceipt};
use crate::error::{DispatchError, Error, Result};

#[derive(Default)]
struct LedgerState {
    current_tick: Tick,
    buckets: HashMap<BucketId, BucketRecord>,
    storage_requests: HashMap<FileKey, StorageRequestMetadata>,
    /// One-shot scripted answers per file key, drained before the map.
    scripted_requests: HashMap<FileKey, VecDeque<Option<StorageRequestMetadata>>>,
    dynamic_streams: HashMap<(ProviderId, AccountId), DynamicRatePaymentStream>,
    fixed_streams: HashMap<(ProviderId, AccountId), FixedRatePaymentStream>,
    last_chargeable: HashMap<ProviderId, LastChargeableInfo>,
    pending_deletions: HashMap<AccountId, u32>,
    balances: HashMap<AccountId, Balance>,
    insolvent: HashSet<AccountId>,
    submissions: Vec<LedgerCall>,
    fail_next_submit: Option<DispatchError>,
    submit_delay: Option<Duration>,
    next_tx: u64,
}

/// Programmable fake chain.
#[derive(Default)]
pub struct MockLedger {
    state: Mutex<LedgerState>,
    submits_in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_current_tick(&self, tick: Tick) {
        self.state.lock().current_tick = tick;
    }

    pub fn insert_bucket(&self, record: BucketRecord) {
        self.state.lock().buckets.insert(record.bucket_id, record);
    }

    pub fn insert_storage_request(&self, file_key: FileKey, record: StorageRequestMetadata) {
        self.state.lock().storage_requests.insert(file_key, record);
    }

    pub fn remove_storage_request(&self, file_key: &FileKey) {
        self.state.lock().storage_requests.remove(file_key);
    }

    /// Queues a one-shot answer for `storage_request(file_key)`, consumed
    /// in FIFO order before the stored record.
    pub fn push_storage_request_response(
        &self,
        file_key: FileKey,
        response: Option<StorageRequestMetadata>,
    ) {
        self.state
            .lock()
            .scripted_requests
            .entry(file_key)
            .or_default()
            .push_back(response);
    }

    pub fn set_dynamic_stream(
        &self,
        provider: ProviderId,
        user: AccountId,
        stream: DynamicRatePaymentStream,
    ) {
        self.state
            .lock()
            .dynamic_streams
            .insert((provider, user), stream);
    }

    pub fn set_fixed_stream(
        &self,
        provider: ProviderId,
        user: AccountId,
        stream: FixedRatePaymentStream,
    ) {
        self.state
            .lock()
            .fixed_streams
            .insert((provider, user), stream);
    }

    pub fn set_last_chargeable(&self, provider: ProviderId, info: LastChargeableInfo) {
        self.state.lock().last_chargeable.insert(provider, info);
    }

    pub fn set_pending_deletions(&self, user: AccountId, count: u32) {
        self.state.lock().pending_deletions.insert(user, count);
    }

    pub fn set_free_balance(&self, account: AccountId, balance: Balance) {
        self.state.lock().balances.insert(account, balance);
    }

    pub fn set_insolvent(&self, user: AccountId) {
        self.state.lock().insolvent.insert(user);
    }

    /// Makes the next submit finalize with the given dispatch error.
    pub fn fail_next_submit(&self, error: DispatchError) {
        self.state.lock().fail_next_submit = Some(error);
    }

    /// Adds latency to every submit so overlap is observable.
    pub fn set_submit_delay(&self, delay: Duration) {
        self.state.lock().submit_delay = Some(delay);
    }

    /// Every call submitted so far, in order.
    pub fn submissions(&self) -> Vec<LedgerCall> {
        self.state.lock().submissions.clone()
    }

    /// Highest number of submits that were ever in flight at once.
    pub fn max_concurrent_submits(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn apply_effects(state: &mut LedgerState, call: &LedgerCall) {
        match call {
            LedgerCall::RevokeStorageRequest { file_key } => {
                state.storage_requests.remove(file_key);
            }
            LedgerCall::RequestDeleteFile { bucket_id, .. } => {
                // charge the deletion to the bucket owner when known
                if let Some(owner) = state.buckets.get(bucket_id).map(|b| b.owner) {
                    *state.pending_deletions.entry(owner).or_insert(0) += 1;
                }
            }
            LedgerCall::PayOutstandingDebt { provider_ids } => {
                let tick = state.current_tick;
                for provider in provider_ids {
                    let chargeable = state.last_chargeable.get(provider).copied();
                    for ((p, _), stream) in state.dynamic_streams.iter_mut() {
                        if p == provider {
                            if let Some(info) = chargeable {
                                stream.price_index_when_last_charged = info.price_index;
                            }
                        }
                    }
                    for ((p, _), stream) in state.fixed_streams.iter_mut() {
                        if p == provider {
                            stream.last_charged_tick = tick;
                        }
                    }
                }
            }
            LedgerCall::ClearInsolventFlag => {
                // single-signer harness: clears every flag
                state.insolvent.clear();
            }
            _ => {}
        }
    }
}

#[async_trait]
impl TickClock for MockLedger {
    async fn current_tick(&self) -> Result<Tick> {
        Ok(self.state.lock().current_tick)
    }
}

#[async_trait]
impl LedgerGateway for MockLedger {
    async fn bucket(&self, bucket_id: &BucketId) -> Result<Option<BucketRecord>> {
        Ok(self.state.lock().buckets.get(bucket_id).cloned())
    }

    async fn storage_request(
        &self,
        file_key: &FileKey,
    ) -> Result<Option<StorageRequestMetadata>> {
        let mut state = self.state.lock();
        if let Some(queue) = state.scripted_requests.get_mut(file_key) {
            if let Some(response) = queue.pop_front() {
                return Ok(response);
            }
        }
        Ok(state.storage_requests.get(file_key).cloned())
    }

    async fn dynamic_rate_stream(
        &self,
        provider: &ProviderId,
        user: &AccountId,
    ) -> Result<Option<DynamicRatePaymentStream>> {
        Ok(self
            .state
            .lock()
            .dynamic_streams
            .get(&(*provider, *user))
            .cloned())
    }

    async fn fixed_rate_stream(
        &self,
        provider: &ProviderId,
        user: &AccountId,
    ) -> Result<Option<FixedRatePaymentStream>> {
        Ok(self
            .state
            .lock()
            .fixed_streams
            .get(&(*provider, *user))
            .cloned())
    }

    async fn last_chargeable_info(
        &self,
        provider: &ProviderId,
    ) -> Result<Option<LastChargeableInfo>> {
        Ok(self.state.lock().last_chargeable.get(provider).copied())
    }

    async fn pending_deletion_count(&self, user: &AccountId) -> Result<u32> {
        Ok(self
            .state
            .lock()
            .pending_deletions
            .get(user)
            .copied()
            .unwrap_or(0))
    }

    async fn free_balance(&self, account: &AccountId) -> Result<Balance> {
        Ok(self.state.lock().balances.get(account).copied().unwrap_or(0))
    }

    async fn is_insolvent(&self, user: &AccountId) -> Result<bool> {
        Ok(self.state.lock().insolvent.contains(user))
    }

    async fn submit(&self, call: LedgerCall) -> Result<TxReceipt> {
        let in_flight = self.submits_in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(in_flight, Ordering::SeqCst);

        let delay = self.state.lock().submit_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let result = {
            let mut state = self.state.lock();
            state.submissions.push(call.clone());
            if let Some(error) = state.fail_next_submit.take() {
                Err(Error::Dispatch(error))
            } else {
                Self::apply_effects(&mut state, &call);
                state.next_tx += 1;
                let mut tx = [0u8; 32];
                tx[24..].copy_from_slice(&state.next_tx.to_be_bytes());
                Ok(TxReceipt {
                    tx_hash: TxHash::new(tx),
                    block_hash: BlockHash::new([0xbb; 32]),
                })
            }
        };

        self.submits_in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn scripted_responses_drain_before_stored_record() {
        let ledger = MockLedger::new();
        let key = FileKey::new([0x01; 32]);
        let record = StorageRequestMetadata {
            owner: AccountId::new([0x0a; 20]),
            bucket_id: BucketId::new([0x02; 32]),
            fingerprint: shs_core::types::Fingerprint::new([0x03; 32]),
            size: 1,
            msp: None,
            bsps_required: 1,
            bsps_confirmed: 0,
            expires_at: 100,
        };
        ledger.insert_storage_request(key, record.clone());
        ledger.push_storage_request_response(key, None);

        assert!(ledger.storage_request(&key).await.unwrap().is_none());
        assert_eq!(ledger.storage_request(&key).await.unwrap(), Some(record));
    }

    #[tokio::test]
    async fn pay_outstanding_debt_snaps_streams_forward() {
        let ledger = MockLedger::new();
        let provider = ProviderId::new([0x01; 32]);
        let user = AccountId::new([0x0a; 20]);
        ledger.set_current_tick(500);
        ledger.set_last_chargeable(
            provider,
            LastChargeableInfo {
                last_chargeable_tick: 480,
                price_index: 9_000,
            },
        );
        ledger.set_dynamic_stream(
            provider,
            user,
            DynamicRatePaymentStream {
                amount_provided: 10,
                price_index_when_last_charged: 1_000,
                user_deposit: 1_000_000,
            },
        );

        ledger
            .submit(LedgerCall::PayOutstandingDebt {
                provider_ids: vec![provider],
            })
            .await
            .unwrap();

        let stream = ledger
            .dynamic_rate_stream(&provider, &user)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stream.price_index_when_last_charged, 9_000);
    }
}
