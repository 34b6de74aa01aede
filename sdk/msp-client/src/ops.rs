//! Thin one-shot submissions: provider sign-up, bucket management and
//! balance transfers. Validation happens before any network call.

use shs_core::types::{AccountId, Balance, BucketId, ProviderId, ValuePropId};

use crate::backend::BackendIndexGateway;
use crate::error::{Error, Result};
use crate::ledger::{LedgerCall, LedgerGateway, TxReceipt};

const LOG_TARGET: &str = "shs::ops";

/// Requests BSP sign-up with the given capacity and dialable addresses.
pub async fn request_bsp_sign_up<L: LedgerGateway>(
    ledger: &L,
    capacity: u64,
    multiaddresses: Vec<String>,
    payment_account: AccountId,
) -> Result<TxReceipt> {
    validate_sign_up(capacity, &multiaddresses)?;
    let receipt = ledger
        .submit(LedgerCall::RequestBspSignUp {
            capacity,
            multiaddresses,
            payment_account,
        })
        .await?;
    tracing::info!(target: LOG_TARGET, tx_hash = %receipt.tx_hash, "BSP sign-up requested");
    Ok(receipt)
}

/// Requests MSP sign-up, registering an initial value proposition.
pub async fn request_msp_sign_up<L: LedgerGateway>(
    ledger: &L,
    capacity: u64,
    multiaddresses: Vec<String>,
    value_prop_price_per_giga_unit: Balance,
    value_prop_bucket_data_limit: u64,
    payment_account: AccountId,
) -> Result<TxReceipt> {
    validate_sign_up(capacity, &multiaddresses)?;
    let receipt = ledger
        .submit(LedgerCall::RequestMspSignUp {
            capacity,
            multiaddresses,
            value_prop_price_per_giga_unit,
            value_prop_bucket_data_limit,
            payment_account,
        })
        .await?;
    tracing::info!(target: LOG_TARGET, tx_hash = %receipt.tx_hash, "MSP sign-up requested");
    Ok(receipt)
}

/// Confirms a previously requested sign-up, the signer's own when
/// `provider_account` is `None`.
pub async fn confirm_sign_up<L: LedgerGateway>(
    ledger: &L,
    provider_account: Option<AccountId>,
) -> Result<TxReceipt> {
    let receipt = ledger
        .submit(LedgerCall::ConfirmSignUp { provider_account })
        .await?;
    tracing::info!(target: LOG_TARGET, tx_hash = %receipt.tx_hash, "sign-up confirmed");
    Ok(receipt)
}

fn validate_sign_up(capacity: u64, multiaddresses: &[String]) -> Result<()> {
    if capacity == 0 {
        return Err(Error::Validation(
            "provider capacity must be non-zero".to_string(),
        ));
    }
    if multiaddresses.is_empty() {
        return Err(Error::Validation(
            "provider sign-up requires at least one multiaddress".to_string(),
        ));
    }
    Ok(())
}

/// Creates a bucket under the MSP behind `backend`, choosing the given
/// value proposition or the first available one.
pub async fn create_bucket<L, B>(
    ledger: &L,
    backend: &B,
    name: String,
    private: bool,
    value_prop_id: Option<ValuePropId>,
) -> Result<TxReceipt>
where
    L: LedgerGateway,
    B: BackendIndexGateway,
{
    if name.is_empty() {
        return Err(Error::Validation("bucket name must not be empty".to_string()));
    }

    let info = backend.info().await?;
    let props = backend.value_propositions().await?;
    let value_prop_id = match value_prop_id {
        Some(id) => {
            if !props.iter().any(|p| p.id == id && p.available) {
                return Err(Error::Validation(format!(
                    "value proposition {id} is not offered by MSP {}",
                    info.msp_id
                )));
            }
            id
        }
        None => {
            props
                .iter()
                .find(|p| p.available)
                .map(|p| p.id)
                .ok_or_else(|| {
                    Error::Validation(format!(
                        "MSP {} advertises no available value propositions",
                        info.msp_id
                    ))
                })?
        }
    };

    let receipt = ledger
        .submit(LedgerCall::CreateBucket {
            msp_id: info.msp_id,
            name,
            private,
            value_prop_id,
        })
        .await?;
    tracing::info!(target: LOG_TARGET, tx_hash = %receipt.tx_hash, "bucket created");
    Ok(receipt)
}

pub async fn delete_bucket<L: LedgerGateway>(ledger: &L, bucket_id: &BucketId) -> Result<TxReceipt> {
    let receipt = ledger
        .submit(LedgerCall::DeleteBucket {
            bucket_id: *bucket_id,
        })
        .await?;
    tracing::info!(target: LOG_TARGET, %bucket_id, tx_hash = %receipt.tx_hash, "bucket deleted");
    Ok(receipt)
}

pub async fn transfer<L: LedgerGateway>(
    ledger: &L,
    to: AccountId,
    amount: Balance,
) -> Result<TxReceipt> {
    if amount == 0 {
        return Err(Error::Validation("transfer amount must be non-zero".to_string()));
    }
    ledger.submit(LedgerCall::Transfer { to, amount }).await
}
