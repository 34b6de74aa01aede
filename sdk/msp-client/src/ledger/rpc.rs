//! [`LedgerGateway`] implementation over a JSON-RPC connection.

use std::sync::Arc;

use async_trait::async_trait;
use jsonrpsee::rpc_params;
use serde::Deserialize;

use shs_core::types::{
    AccountId, Balance, BlockHash, BucketId, BucketRecord, DynamicRatePaymentStream, FileKey,
    FixedRatePaymentStream, LastChargeableInfo, ProviderId, StorageRequestMetadata, Tick, TxHash,
};

use super::connection::{AnyRpcConnection, RpcConnection};
use super::{methods, LedgerCall, LedgerGateway, TickClock, TxReceipt};
use crate::error::{DispatchError, Error, Result};

const LOG_TARGET: &str = "shs::ledger::rpc";

/// Ledger gateway backed by the node's `storagehubclient_*` RPC methods.
#[derive(Debug, Clone)]
pub struct RpcLedgerGateway {
    connection: Arc<AnyRpcConnection>,
}

impl RpcLedgerGateway {
    pub fn new(connection: Arc<AnyRpcConnection>) -> Self {
        Self { connection }
    }
}

/// Wire shape of the submit-and-watch response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawReceipt {
    tx_hash: TxHash,
    block_hash: BlockHash,
    dispatch_error: Option<RawDispatchError>,
}

/// Dispatch errors arrive either decoded against the runtime metadata or
/// as an opaque string (BadOrigin, CannotLookup...).
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawDispatchError {
    Module {
        section: String,
        method: String,
        #[serde(default)]
        docs: Vec<String>,
    },
    Opaque(String),
}

impl From<RawDispatchError> for DispatchError {
    fn from(raw: RawDispatchError) -> Self {
        match raw {
            RawDispatchError::Module {
                section,
                method,
                docs,
            } => DispatchError::Module {
                section,
                method,
                description: docs.join(" "),
            },
            RawDispatchError::Opaque(s) => DispatchError::Other(s),
        }
    }
}

#[async_trait]
impl TickClock for RpcLedgerGateway {
    async fn current_tick(&self) -> Result<Tick> {
        let tick = self
            .connection
            .call_no_params(methods::CURRENT_TICK)
            .await?;
        Ok(tick)
    }
}

#[async_trait]
impl LedgerGateway for RpcLedgerGateway {
    async fn bucket(&self, bucket_id: &BucketId) -> Result<Option<BucketRecord>> {
        let record = self
            .connection
            .call(methods::BUCKET, rpc_params![bucket_id])
            .await?;
        Ok(record)
    }

    async fn storage_request(
        &self,
        file_key: &FileKey,
    ) -> Result<Option<StorageRequestMetadata>> {
        let record = self
            .connection
            .call(methods::STORAGE_REQUEST, rpc_params![file_key])
            .await?;
        Ok(record)
    }

    async fn dynamic_rate_stream(
        &self,
        provider: &ProviderId,
        user: &AccountId,
    ) -> Result<Option<DynamicRatePaymentStream>> {
        let stream = self
            .connection
            .call(methods::DYNAMIC_RATE_STREAM, rpc_params![provider, user])
            .await?;
        Ok(stream)
    }

    async fn fixed_rate_stream(
        &self,
        provider: &ProviderId,
        user: &AccountId,
    ) -> Result<Option<FixedRatePaymentStream>> {
        let stream = self
            .connection
            .call(methods::FIXED_RATE_STREAM, rpc_params![provider, user])
            .await?;
        Ok(stream)
    }

    async fn last_chargeable_info(
        &self,
        provider: &ProviderId,
    ) -> Result<Option<LastChargeableInfo>> {
        let info = self
            .connection
            .call(methods::LAST_CHARGEABLE_INFO, rpc_params![provider])
            .await?;
        Ok(info)
    }

    async fn pending_deletion_count(&self, user: &AccountId) -> Result<u32> {
        let count = self
            .connection
            .call(methods::PENDING_DELETION_COUNT, rpc_params![user])
            .await?;
        Ok(count)
    }

    async fn free_balance(&self, account: &AccountId) -> Result<Balance> {
        let balance = self
            .connection
            .call(methods::FREE_BALANCE, rpc_params![account])
            .await?;
        Ok(balance)
    }

    async fn is_insolvent(&self, user: &AccountId) -> Result<bool> {
        let insolvent = self
            .connection
            .call(methods::IS_INSOLVENT, rpc_params![user])
            .await?;
        Ok(insolvent)
    }

    async fn submit(&self, call: LedgerCall) -> Result<TxReceipt> {
        let name = call.name();
        tracing::debug!(target: LOG_TARGET, call = name, "submitting call");

        let receipt: RawReceipt = self
            .connection
            .call(methods::SUBMIT_CALL, rpc_params![call])
            .await?;

        if let Some(raw) = receipt.dispatch_error {
            let dispatch: DispatchError = raw.into();
            tracing::warn!(
                target: LOG_TARGET,
                call = name,
                tx_hash = %receipt.tx_hash,
                error = %dispatch,
                "call finalized with dispatch error"
            );
            return Err(Error::Dispatch(dispatch));
        }

        tracing::debug!(
            target: LOG_TARGET,
            call = name,
            tx_hash = %receipt.tx_hash,
            block_hash = %receipt.block_hash,
            "call finalized"
        );
        Ok(TxReceipt {
            tx_hash: receipt.tx_hash,
            block_hash: receipt.block_hash,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::mock_connection::MockConnection;
    use serde_json::json;

    fn gateway_with(mock: MockConnection) -> RpcLedgerGateway {
        RpcLedgerGateway::new(Arc::new(AnyRpcConnection::Mock(mock)))
    }

    #[tokio::test]
    async fn absent_storage_request_is_none() {
        let mock = MockConnection::new();
        mock.set_response(methods::STORAGE_REQUEST, json!(null));
        let gateway = gateway_with(mock);

        let record = gateway
            .storage_request(&FileKey::new([0x01; 32]))
            .await
            .unwrap();
        assert!(record.is_none());
    }

    #[tokio::test]
    async fn storage_request_deserializes_metadata() {
        let mock = MockConnection::new();
        mock.set_response(
            methods::STORAGE_REQUEST,
            json!({
                "owner": format!("0x{}", "ab".repeat(20)),
                "bucket_id": format!("0x{}", "01".repeat(32)),
                "fingerprint": format!("0x{}", "02".repeat(32)),
                "size": 2048,
                "msp": [format!("0x{}", "03".repeat(32)), true],
                "bsps_required": 3,
                "bsps_confirmed": 1,
                "expires_at": 10_500,
            }),
        );
        let gateway = gateway_with(mock);

        let record = gateway
            .storage_request(&FileKey::new([0x01; 32]))
            .await
            .unwrap()
            .unwrap();
        assert!(record.msp_confirmed());
        assert_eq!(record.bsps_required, 3);
        assert_eq!(record.expires_at, 10_500);
    }

    #[tokio::test]
    async fn submit_surfaces_decoded_dispatch_error() {
        let mock = MockConnection::new();
        mock.set_response(
            methods::SUBMIT_CALL,
            json!({
                "txHash": format!("0x{}", "aa".repeat(32)),
                "blockHash": format!("0x{}", "bb".repeat(32)),
                "dispatchError": {
                    "section": "fileSystem",
                    "method": "StorageRequestNotFound",
                    "docs": ["No storage request found for the given file key."],
                },
            }),
        );
        let gateway = gateway_with(mock);

        let err = gateway
            .submit(LedgerCall::RevokeStorageRequest {
                file_key: FileKey::new([0x01; 32]),
            })
            .await
            .unwrap_err();
        match err {
            Error::Dispatch(DispatchError::Module {
                section, method, ..
            }) => {
                assert_eq!(section, "fileSystem");
                assert_eq!(method, "StorageRequestNotFound");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn submit_returns_receipt_on_success() {
        let mock = MockConnection::new();
        mock.set_response(
            methods::SUBMIT_CALL,
            json!({
                "txHash": format!("0x{}", "aa".repeat(32)),
                "blockHash": format!("0x{}", "bb".repeat(32)),
                "dispatchError": null,
            }),
        );
        let gateway = gateway_with(mock);

        let receipt = gateway
            .submit(LedgerCall::ClearInsolventFlag)
            .await
            .unwrap();
        assert_eq!(receipt.tx_hash, TxHash::new([0xaa; 32]));
        assert_eq!(receipt.block_hash, BlockHash::new([0xbb; 32]));
    }

    #[tokio::test]
    async fn opaque_dispatch_error_maps_to_other() {
        let mock = MockConnection::new();
        mock.set_response(
            methods::SUBMIT_CALL,
            json!({
                "txHash": format!("0x{}", "aa".repeat(32)),
                "blockHash": format!("0x{}", "bb".repeat(32)),
                "dispatchError": "BadOrigin",
            }),
        );
        let gateway = gateway_with(mock);

        let err = gateway
            .submit(LedgerCall::ClearInsolventFlag)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Dispatch(DispatchError::Other(s)) if s == "BadOrigin"
        ));
    }
}
