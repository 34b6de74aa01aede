//! Payment stream debt accounting.
//!
//! Providers accrue debt against users continuously: BSPs through
//! dynamic-rate streams driven by the global price index, MSPs through
//! fixed-rate streams driven by elapsed ticks. This module aggregates a
//! user's outstanding debt across all streams against a single tick
//! snapshot, and wraps the settlement and insolvency calls.

use std::collections::HashSet;
use std::sync::Arc;

use num_bigint::BigUint;

use shs_core::constants::PRICE_INDEX_SCALE;
use shs_core::duration::{calculate_time_remaining, TimeRemaining};
use shs_core::types::{AccountId, DebtSnapshot, ProviderId, ProviderKind, StreamRef};

use crate::backend::session::Session;
use crate::backend::BackendIndexGateway;
use crate::error::{Error, Result};
use crate::ledger::{LedgerCall, LedgerGateway, TxReceipt};

const LOG_TARGET: &str = "shs::debt";

/// Aggregates and settles a user's payment stream debt.
pub struct DebtAccountant<L> {
    ledger: Arc<L>,
}

impl<L: LedgerGateway> DebtAccountant<L> {
    pub fn new(ledger: Arc<L>) -> Self {
        Self { ledger }
    }

    /// Sums outstanding debt across `streams`, deduplicated by provider.
    ///
    /// The current tick is read exactly once so every fixed-rate stream
    /// is measured against the same instant. Streams whose chain records
    /// are missing (already settled and closed, or not yet indexed) are
    /// skipped. Raw debt is what the billing model yields; effective debt
    /// caps each provider's share at the user's deposit, which is all a
    /// provider can actually charge.
    pub async fn compute_outstanding_debt(
        &self,
        user: &AccountId,
        streams: &[StreamRef],
    ) -> Result<DebtSnapshot> {
        let current_tick = self.ledger.current_tick().await?;

        let mut snapshot = DebtSnapshot::default();
        let mut seen = HashSet::new();
        for stream in streams {
            if !seen.insert(stream.provider) {
                continue;
            }

            let (raw, deposit) = match stream.kind {
                ProviderKind::Bsp => {
                    let Some(record) = self
                        .ledger
                        .dynamic_rate_stream(&stream.provider, user)
                        .await?
                    else {
                        continue;
                    };
                    let Some(chargeable) =
                        self.ledger.last_chargeable_info(&stream.provider).await?
                    else {
                        continue;
                    };
                    if chargeable.price_index < record.price_index_when_last_charged {
                        return Err(Error::LedgerInconsistency(format!(
                            "provider {}: price index {} below last-charged snapshot {}",
                            stream.provider,
                            chargeable.price_index,
                            record.price_index_when_last_charged
                        )));
                    }
                    let delta = BigUint::from(
                        chargeable.price_index - record.price_index_when_last_charged,
                    );
                    let raw = delta * BigUint::from(record.amount_provided)
                        / BigUint::from(PRICE_INDEX_SCALE);
                    (raw, record.user_deposit)
                }
                ProviderKind::Msp => {
                    let Some(record) = self
                        .ledger
                        .fixed_rate_stream(&stream.provider, user)
                        .await?
                    else {
                        continue;
                    };
                    if current_tick < record.last_charged_tick {
                        return Err(Error::LedgerInconsistency(format!(
                            "provider {}: current tick {} below last-charged tick {}",
                            stream.provider, current_tick, record.last_charged_tick
                        )));
                    }
                    let raw = BigUint::from(current_tick - record.last_charged_tick)
                        * BigUint::from(record.rate);
                    (raw, record.user_deposit)
                }
            };

            let effective = raw.clone().min(BigUint::from(deposit));
            snapshot.total_raw_debt += raw;
            snapshot.total_effective_debt += effective;
        }

        tracing::debug!(
            target: LOG_TARGET,
            %user,
            providers = seen.len(),
            raw = %snapshot.total_raw_debt,
            effective = %snapshot.total_effective_debt,
            "computed outstanding debt"
        );
        Ok(snapshot)
    }

    /// Settles the debt owed to the given providers in one transaction.
    pub async fn pay_outstanding_debt(&self, providers: &[ProviderId]) -> Result<TxReceipt> {
        let mut seen = HashSet::new();
        let provider_ids: Vec<ProviderId> = providers
            .iter()
            .copied()
            .filter(|p| seen.insert(*p))
            .collect();
        if provider_ids.is_empty() {
            return Err(Error::Validation("no providers to pay".to_string()));
        }

        let receipt = self
            .ledger
            .submit(LedgerCall::PayOutstandingDebt { provider_ids })
            .await?;
        tracing::info!(target: LOG_TARGET, tx_hash = %receipt.tx_hash, "outstanding debt paid");
        Ok(receipt)
    }

    /// Whether the network has flagged `user` as out of funds.
    pub async fn is_insolvent(&self, user: &AccountId) -> Result<bool> {
        self.ledger.is_insolvent(user).await
    }

    /// Clears the signer's own out-of-funds flag. Fails with a dispatch
    /// error unless all debts have been settled on chain.
    pub async fn clear_insolvent_flag(&self) -> Result<TxReceipt> {
        let receipt = self.ledger.submit(LedgerCall::ClearInsolventFlag).await?;
        tracing::info!(target: LOG_TARGET, tx_hash = %receipt.tx_hash, "insolvent flag cleared");
        Ok(receipt)
    }

    /// How long the user's free balance lasts at the current aggregate
    /// cost per tick of their payment streams.
    pub async fn time_remaining<B: BackendIndexGateway>(
        &self,
        backend: &B,
        session: &Session,
    ) -> Result<TimeRemaining> {
        let user = session.address();
        let balance = self.ledger.free_balance(&user).await?;
        let streams: Vec<StreamRef> = backend
            .payment_streams(session)
            .await?
            .into_iter()
            .map(Into::into)
            .collect();
        Ok(calculate_time_remaining(balance, &streams))
    }
}
