//! Storage request lifecycle coordination.
//!
//! A storage request moves through three actors: the user submits it to
//! the ledger, the responsible MSP confirms it on chain, and BSPs
//! replicate the file until the backend index reports it ready. This
//! module drives a request through those stages, reconciling the chain
//! record (ground truth) with the backend index (eventually consistent).

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use shs_core::intention::{FileOperationIntention, PersonalSigner};
use shs_core::poller::{poll_until, PollCheck};
use shs_core::types::{
    BucketId, FileKey, FileStatus, Fingerprint, StorageRequestMetadata,
};

use crate::backend::models::FileInfo;
use crate::backend::session::Session;
use crate::backend::BackendIndexGateway;
use crate::config::PollingConfig;
use crate::error::{Error, RequestFailure, Result};
use crate::ledger::{LedgerCall, LedgerGateway, ReplicationTarget, TxReceipt};

const LOG_TARGET: &str = "shs::lifecycle";

/// Observable stage of a storage request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    /// On chain, awaiting MSP confirmation.
    Issued,
    /// The MSP confirmed; BSP replication in progress.
    MspConfirmed,
    Ready,
    Revoked,
    Rejected,
    Expired,
}

impl RequestState {
    /// Terminal states admit no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RequestState::Ready
                | RequestState::Revoked
                | RequestState::Rejected
                | RequestState::Expired
        )
    }

    /// Derives the state from the chain record and the backend status.
    /// `None` when neither side knows the request.
    pub fn classify(
        record: Option<&StorageRequestMetadata>,
        status: Option<FileStatus>,
    ) -> Option<RequestState> {
        match status {
            Some(FileStatus::Ready) => Some(RequestState::Ready),
            Some(FileStatus::Revoked) => Some(RequestState::Revoked),
            Some(FileStatus::Rejected) => Some(RequestState::Rejected),
            Some(FileStatus::Expired) => Some(RequestState::Expired),
            Some(FileStatus::Pending) | None => record.map(|r| {
                if r.msp_confirmed() {
                    RequestState::MspConfirmed
                } else {
                    RequestState::Issued
                }
            }),
        }
    }
}

/// Parameters for issuing a storage request.
///
/// The file key is derived during upload preparation (it commits to the
/// owner, bucket, location, size and fingerprint) and is the handle for
/// every later operation.
#[derive(Debug, Clone)]
pub struct IssueParams {
    pub file_key: FileKey,
    pub bucket_id: BucketId,
    pub location: String,
    pub fingerprint: Fingerprint,
    pub size: u64,
    pub replication: ReplicationTarget,
}

/// Receipt of a completed deletion request, carrying the pending-deletion
/// counter before and after so callers can see the queue advance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletionReceipt {
    pub file_key: FileKey,
    pub receipt: TxReceipt,
    pub pending_before: u32,
    pub pending_after: u32,
}

/// Drives storage requests from issuance to readiness or deletion.
pub struct StorageRequestLifecycle<L, B> {
    ledger: Arc<L>,
    backend: Arc<B>,
    polling: PollingConfig,
}

impl<L, B> StorageRequestLifecycle<L, B>
where
    L: LedgerGateway,
    B: BackendIndexGateway,
{
    pub fn new(ledger: Arc<L>, backend: Arc<B>, polling: PollingConfig) -> Self {
        Self {
            ledger,
            backend,
            polling,
        }
    }

    /// Issues a storage request towards the MSP behind the backend.
    ///
    /// The MSP's multiaddresses must contain at least one `/p2p/<peer-id>`
    /// segment; the peer ids are what BSPs dial to fetch the file.
    pub async fn issue(&self, params: IssueParams) -> Result<FileKey> {
        let info = self.backend.info().await?;
        let peer_ids = extract_peer_ids(&info.multiaddresses);
        if peer_ids.is_empty() {
            return Err(Error::Validation(format!(
                "MSP {} advertises no /p2p/<peer-id> multiaddress segments",
                info.msp_id
            )));
        }

        let file_key = params.file_key;
        self.ledger
            .submit(LedgerCall::IssueStorageRequest {
                bucket_id: params.bucket_id,
                location: params.location,
                fingerprint: params.fingerprint,
                size: params.size,
                msp_id: info.msp_id,
                peer_ids,
                replication: params.replication,
            })
            .await?;

        // the record must be readable in the same block it finalized in
        match self.ledger.storage_request(&file_key).await? {
            Some(_) => {
                tracing::info!(target: LOG_TARGET, %file_key, "storage request issued");
                Ok(file_key)
            }
            None => Err(Error::LedgerInconsistency(format!(
                "storage request {file_key} not readable after finalization"
            ))),
        }
    }

    /// Waits until the responsible MSP confirms the request on chain.
    ///
    /// A vanished record before confirmation means the request was swept
    /// (revoked elsewhere or expired); that is terminal.
    pub async fn await_msp_confirmation(
        &self,
        file_key: &FileKey,
        cancel: &CancellationToken,
    ) -> Result<StorageRequestMetadata> {
        let config = self.polling.backend_lookup();
        let polled = poll_until(config, cancel, move || async move {
            let record = self.ledger.storage_request(file_key).await?;
            Ok::<_, Error>(match record {
                None => PollCheck::Abort(Error::RequestFailed {
                    file_key: *file_key,
                    failure: RequestFailure::Vanished,
                }),
                Some(record) if record.msp_confirmed() => PollCheck::Ready(record),
                Some(_) => PollCheck::Pending,
            })
        })
        .await
        .map_err(|e| Error::from_poll("MSP confirmation", e))?;

        tracing::info!(
            target: LOG_TARGET,
            %file_key,
            attempts = polled.attempts,
            "MSP confirmed storage request"
        );
        Ok(polled.value)
    }

    /// Waits until the backend reports the file ready and the chain
    /// agrees.
    ///
    /// The backend index is not ground truth: a `ready` status only
    /// counts once the chain either shows the MSP confirmation flag or
    /// has already swept the fulfilled request. Until then the loop keeps
    /// polling, so persistent divergence surfaces as a plain timeout.
    pub async fn await_ready(
        &self,
        session: &Session,
        bucket_id: &BucketId,
        file_key: &FileKey,
        cancel: &CancellationToken,
    ) -> Result<FileInfo> {
        let config = self.polling.replication();
        let polled = poll_until(config, cancel, move || async move {
            let info = self.backend.file_info(session, bucket_id, file_key).await?;
            let Some(info) = info else {
                // not indexed yet
                return Ok::<_, Error>(PollCheck::Pending);
            };
            Ok(match info.status {
                FileStatus::Pending => PollCheck::Pending,
                FileStatus::Ready => {
                    match self.ledger.storage_request(file_key).await? {
                        // fulfilled requests are swept from chain state
                        None => PollCheck::Ready(info),
                        Some(record) if record.msp_confirmed() => PollCheck::Ready(info),
                        Some(_) => {
                            tracing::debug!(
                                target: LOG_TARGET,
                                %file_key,
                                "backend ready but chain unconfirmed, still polling"
                            );
                            PollCheck::Pending
                        }
                    }
                }
                FileStatus::Revoked => PollCheck::Abort(failed(*file_key, RequestFailure::Revoked)),
                FileStatus::Rejected => {
                    PollCheck::Abort(failed(*file_key, RequestFailure::Rejected))
                }
                FileStatus::Expired => PollCheck::Abort(failed(*file_key, RequestFailure::Expired)),
            })
        })
        .await
        .map_err(|e| Error::from_poll("file readiness", e))?;

        tracing::info!(
            target: LOG_TARGET,
            %file_key,
            attempts = polled.attempts,
            elapsed_ms = polled.elapsed.as_millis() as u64,
            "file ready"
        );
        Ok(polled.value)
    }

    /// Revokes a still-unconfirmed storage request.
    ///
    /// Once any provider has confirmed, the file is being stored and the
    /// way out is deletion, not revocation.
    pub async fn revoke(&self, file_key: &FileKey) -> Result<TxReceipt> {
        let record = self
            .ledger
            .storage_request(file_key)
            .await?
            .ok_or_else(|| Error::NotFound(format!("storage request {file_key}")))?;

        if record.has_confirmations() {
            return Err(Error::Validation(format!(
                "storage request {file_key} already has confirmations; delete the file instead"
            )));
        }

        let receipt = self
            .ledger
            .submit(LedgerCall::RevokeStorageRequest {
                file_key: *file_key,
            })
            .await?;
        tracing::info!(target: LOG_TARGET, %file_key, tx_hash = %receipt.tx_hash, "storage request revoked");
        Ok(receipt)
    }

    /// Requests deletion of a stored file.
    ///
    /// The user signs a 33-byte intention off-chain; the deletion is then
    /// queued on chain and the backend index drops the file once the MSP
    /// processes it. Returns once the backend no longer lists the file.
    pub async fn request_delete<S: PersonalSigner>(
        &self,
        session: &Session,
        bucket_id: &BucketId,
        file_key: &FileKey,
        signer: &S,
        cancel: &CancellationToken,
    ) -> Result<DeletionReceipt> {
        let info = self
            .backend
            .file_info(session, bucket_id, file_key)
            .await?
            .ok_or_else(|| Error::NotFound(format!("file {file_key} in bucket {bucket_id}")))?;

        let intention = FileOperationIntention::delete(*file_key);
        let signature = signer
            .sign_personal(&intention.encode())
            .await
            .map_err(|e| Error::Signer(e.to_string()))?;

        let user = session.address();
        let pending_before = self.ledger.pending_deletion_count(&user).await?;

        let receipt = self
            .ledger
            .submit(LedgerCall::RequestDeleteFile {
                intention,
                signature,
                bucket_id: *bucket_id,
                location: info.location,
                size: info.size,
                fingerprint: info.fingerprint,
            })
            .await?;

        // the backend unlists the file once the MSP applies the deletion
        let config = self.polling.backend_lookup();
        poll_until(config, cancel, move || async move {
            let listed = self.backend.file_info(session, bucket_id, file_key).await?;
            Ok::<_, Error>(match listed {
                None => PollCheck::<_, Error>::Ready(()),
                Some(_) => PollCheck::Pending,
            })
        })
        .await
        .map_err(|e| Error::from_poll("file deletion", e))?;

        let pending_after = self.ledger.pending_deletion_count(&user).await?;
        tracing::info!(
            target: LOG_TARGET,
            %file_key,
            pending_before,
            pending_after,
            "file deletion requested"
        );
        Ok(DeletionReceipt {
            file_key: *file_key,
            receipt,
            pending_before,
            pending_after,
        })
    }
}

fn failed(file_key: FileKey, failure: RequestFailure) -> Error {
    Error::RequestFailed { file_key, failure }
}

/// Pulls the `/p2p/<peer-id>` segments out of a provider's multiaddresses.
pub fn extract_peer_ids(multiaddresses: &[String]) -> Vec<String> {
    multiaddresses
        .iter()
        .filter_map(|addr| {
            let mut parts = addr.split('/');
            while let Some(part) = parts.next() {
                if part == "p2p" {
                    return parts.next().filter(|id| !id.is_empty()).map(str::to_string);
                }
            }
            None
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::mock::MockBackend;
    use crate::backend::models::{MspInfo, NonceRequest, VerifyRequest};
    use crate::error::DispatchError;
    use crate::ledger::mock::MockLedger;
    use shs_core::intention::Signature;
    use shs_core::types::{AccountId, BucketRecord, ProviderId, ValuePropId};

    struct FixedSigner;

    #[async_trait::async_trait]
    impl PersonalSigner for FixedSigner {
        type Error = std::convert::Infallible;

        async fn sign_personal(&self, _message: &[u8]) -> std::result::Result<Signature, Self::Error> {
            Ok(Signature([0x05; 65]))
        }
    }

    const USER: AccountId = AccountId([0x0a; 20]);
    const MSP: ProviderId = ProviderId([0xee; 32]);

    fn fast_polling() -> PollingConfig {
        PollingConfig {
            backend_lookup_attempts: 5,
            backend_lookup_interval_ms: 10,
            replication_attempts: 5,
            replication_interval_ms: 10,
        }
    }

    fn request(msp_confirmed: Option<bool>, bsps_confirmed: u32) -> StorageRequestMetadata {
        StorageRequestMetadata {
            owner: USER,
            bucket_id: BucketId::new([0x01; 32]),
            fingerprint: Fingerprint::new([0x02; 32]),
            size: 1024,
            msp: msp_confirmed.map(|c| (MSP, c)),
            bsps_required: 2,
            bsps_confirmed,
            expires_at: 1_000,
        }
    }

    fn file(bucket: BucketId, key: FileKey, status: FileStatus) -> FileInfo {
        FileInfo {
            file_key: key,
            bucket_id: bucket,
            location: "photos/cat.jpg".to_string(),
            fingerprint: Fingerprint::new([0x02; 32]),
            size: 1024,
            status,
        }
    }

    async fn session_for(backend: &MockBackend, address: AccountId) -> Session {
        backend.register_user(address);
        let nonce = backend
            .request_nonce(&NonceRequest {
                address,
                chain_id: 1,
                domain: "example.org".to_string(),
                uri: "https://example.org".to_string(),
            })
            .await
            .unwrap();
        let verified = backend
            .verify_signature(&VerifyRequest {
                message: nonce.message,
                signature: Signature([0u8; 65]),
            })
            .await
            .unwrap();
        Session::new(verified.token, verified.user)
    }

    fn lifecycle(
        ledger: &Arc<MockLedger>,
        backend: &Arc<MockBackend>,
    ) -> StorageRequestLifecycle<MockLedger, MockBackend> {
        StorageRequestLifecycle::new(Arc::clone(ledger), Arc::clone(backend), fast_polling())
    }

    #[test]
    fn peer_id_extraction() {
        let addrs = vec![
            "/ip4/10.0.0.1/tcp/30333/p2p/12D3KooWAlpha".to_string(),
            "/dns4/msp.example/tcp/443/wss".to_string(),
            "/ip4/10.0.0.2/tcp/30333/p2p/12D3KooWBeta".to_string(),
        ];
        assert_eq!(
            extract_peer_ids(&addrs),
            vec!["12D3KooWAlpha".to_string(), "12D3KooWBeta".to_string()]
        );
        assert!(extract_peer_ids(&["/ip4/1.2.3.4/tcp/1".to_string()]).is_empty());
    }

    #[test]
    fn state_classification_prefers_terminal_statuses() {
        let record = request(Some(true), 0);
        assert_eq!(
            RequestState::classify(Some(&record), Some(FileStatus::Ready)),
            Some(RequestState::Ready)
        );
        assert_eq!(
            RequestState::classify(Some(&record), Some(FileStatus::Pending)),
            Some(RequestState::MspConfirmed)
        );
        assert_eq!(
            RequestState::classify(Some(&request(Some(false), 0)), None),
            Some(RequestState::Issued)
        );
        assert_eq!(RequestState::classify(None, None), None);
        assert!(RequestState::Expired.is_terminal());
        assert!(!RequestState::MspConfirmed.is_terminal());
    }

    #[tokio::test]
    async fn issue_rejects_msp_without_peer_ids() {
        let ledger = Arc::new(MockLedger::new());
        let backend = Arc::new(MockBackend::new());
        backend.set_info(MspInfo {
            msp_id: MSP,
            multiaddresses: vec!["/dns4/msp.example/tcp/443/wss".to_string()],
            payment_account: None,
        });
        let lifecycle = lifecycle(&ledger, &backend);

        let err = lifecycle
            .issue(IssueParams {
                file_key: FileKey::new([0x07; 32]),
                bucket_id: BucketId::new([0x01; 32]),
                location: "a".to_string(),
                fingerprint: Fingerprint::new([0x02; 32]),
                size: 1,
                replication: ReplicationTarget::Standard,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert!(ledger.submissions().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn full_happy_path_issue_confirm_ready() {
        let ledger = Arc::new(MockLedger::new());
        let backend = Arc::new(MockBackend::new());
        let session = session_for(&backend, USER).await;
        let bucket = BucketId::new([0x01; 32]);
        let key = FileKey::new([0x07; 32]);
        let cancel = CancellationToken::new();

        // first scripted answer feeds issue()'s readability check, the
        // second feeds confirmation attempt 1; attempt 2 falls through to
        // the stored confirmed record
        ledger.insert_storage_request(key, request(Some(true), 1));
        ledger.push_storage_request_response(key, Some(request(Some(false), 0)));
        ledger.push_storage_request_response(key, Some(request(Some(false), 0)));
        let lifecycle = lifecycle(&ledger, &backend);

        let issued = lifecycle
            .issue(IssueParams {
                file_key: key,
                bucket_id: bucket,
                location: "photos/cat.jpg".to_string(),
                fingerprint: Fingerprint::new([0x02; 32]),
                size: 1024,
                replication: ReplicationTarget::Custom { replicas: 2 },
            })
            .await
            .unwrap();
        assert_eq!(issued, key);
        assert_eq!(ledger.submissions().len(), 1);

        let record = lifecycle.await_msp_confirmation(&key, &cancel).await.unwrap();
        assert!(record.msp_confirmed());

        // backend indexes the file as pending, then ready
        backend.push_file_info_response(bucket, key, Some(file(bucket, key, FileStatus::Pending)));
        backend.insert_file(file(bucket, key, FileStatus::Ready));
        let info = lifecycle
            .await_ready(&session, &bucket, &key, &cancel)
            .await
            .unwrap();
        assert_eq!(info.status, FileStatus::Ready);
    }

    #[tokio::test(start_paused = true)]
    async fn backend_ready_alone_is_not_ready() {
        let ledger = Arc::new(MockLedger::new());
        let backend = Arc::new(MockBackend::new());
        let session = session_for(&backend, USER).await;
        let bucket = BucketId::new([0x01; 32]);
        let key = FileKey::new([0x07; 32]);
        let cancel = CancellationToken::new();

        // backend says ready but the chain still shows an unconfirmed
        // record: the loop must keep polling and eventually time out
        backend.insert_file(file(bucket, key, FileStatus::Ready));
        ledger.insert_storage_request(key, request(Some(false), 0));
        let lifecycle = lifecycle(&ledger, &backend);

        let err = lifecycle
            .await_ready(&session, &bucket, &key, &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Timeout { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn swept_chain_record_with_backend_ready_is_success() {
        let ledger = Arc::new(MockLedger::new());
        let backend = Arc::new(MockBackend::new());
        let session = session_for(&backend, USER).await;
        let bucket = BucketId::new([0x01; 32]);
        let key = FileKey::new([0x07; 32]);

        backend.insert_file(file(bucket, key, FileStatus::Ready));
        // no chain record: the fulfilled request was swept
        let lifecycle = lifecycle(&ledger, &backend);

        let info = lifecycle
            .await_ready(&session, &bucket, &key, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(info.status, FileStatus::Ready);
    }

    #[tokio::test(start_paused = true)]
    async fn rejected_status_aborts_immediately() {
        let ledger = Arc::new(MockLedger::new());
        let backend = Arc::new(MockBackend::new());
        let session = session_for(&backend, USER).await;
        let bucket = BucketId::new([0x01; 32]);
        let key = FileKey::new([0x07; 32]);

        backend.insert_file(file(bucket, key, FileStatus::Rejected));
        let lifecycle = lifecycle(&ledger, &backend);

        let err = lifecycle
            .await_ready(&session, &bucket, &key, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::RequestFailed {
                failure: RequestFailure::Rejected,
                ..
            }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn vanished_record_before_confirmation_is_terminal() {
        let ledger = Arc::new(MockLedger::new());
        let backend = Arc::new(MockBackend::new());
        let key = FileKey::new([0x07; 32]);
        let lifecycle = lifecycle(&ledger, &backend);

        let err = lifecycle
            .await_msp_confirmation(&key, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::RequestFailed {
                failure: RequestFailure::Vanished,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn revoke_requires_zero_confirmations() {
        let ledger = Arc::new(MockLedger::new());
        let backend = Arc::new(MockBackend::new());
        let key = FileKey::new([0x07; 32]);
        ledger.insert_storage_request(key, request(Some(true), 0));
        let lifecycle = lifecycle(&ledger, &backend);

        let err = lifecycle.revoke(&key).await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));

        ledger.insert_storage_request(key, request(Some(false), 0));
        lifecycle.revoke(&key).await.unwrap();
        // the mock applies the revocation to its state
        assert!(ledger.storage_request(&key).await.unwrap().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn deletion_flow_signs_submits_and_waits_for_unlisting() {
        let ledger = Arc::new(MockLedger::new());
        let backend = Arc::new(MockBackend::new());
        let session = session_for(&backend, USER).await;
        let bucket = BucketId::new([0x01; 32]);
        let key = FileKey::new([0x07; 32]);
        let cancel = CancellationToken::new();

        ledger.insert_bucket(BucketRecord {
            bucket_id: bucket,
            owner: USER,
            msp_id: Some(MSP),
            private: false,
            value_prop_id: ValuePropId::new([0x09; 32]),
        });
        backend.insert_file(file(bucket, key, FileStatus::Ready));
        // listed once more right after submission, then gone
        backend.push_file_info_response(bucket, key, Some(file(bucket, key, FileStatus::Ready)));
        backend.push_file_info_response(bucket, key, Some(file(bucket, key, FileStatus::Ready)));
        backend.push_file_info_response(bucket, key, None);
        backend.remove_file(&bucket, &key);
        let lifecycle = lifecycle(&ledger, &backend);

        let receipt = lifecycle
            .request_delete(&session, &bucket, &key, &FixedSigner, &cancel)
            .await
            .unwrap();
        assert_eq!(receipt.pending_before, 0);
        assert_eq!(receipt.pending_after, 1);

        match &ledger.submissions()[0] {
            LedgerCall::RequestDeleteFile {
                intention,
                signature,
                ..
            } => {
                assert_eq!(intention.file_key, key);
                assert_eq!(signature, &Signature([0x05; 65]));
            }
            other => panic!("unexpected submission: {other:?}"),
        }
    }

    #[tokio::test]
    async fn dispatch_error_on_submit_is_fatal_and_not_retried() {
        let ledger = Arc::new(MockLedger::new());
        let backend = Arc::new(MockBackend::new());
        let key = FileKey::new([0x07; 32]);
        ledger.insert_storage_request(key, request(Some(false), 0));
        ledger.fail_next_submit(DispatchError::Module {
            section: "fileSystem".to_string(),
            method: "StorageRequestNotFound".to_string(),
            description: String::new(),
        });
        let lifecycle = lifecycle(&ledger, &backend);

        let err = lifecycle.revoke(&key).await.unwrap_err();
        assert!(matches!(err, Error::Dispatch(DispatchError::Module { .. })));
        assert_eq!(ledger.submissions().len(), 1);
    }
}
