//! End-to-end flows against the mock gateways: sign-in, storage request
//! lifecycle, deletion and debt settlement.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use shs_core::intention::{PersonalSigner, Signature};
use shs_core::poller::PollConfig;
use shs_core::types::{
    AccountId, BucketId, BucketRecord, FileKey, FileStatus, Fingerprint, FixedRatePaymentStream,
    ProviderId, ProviderKind, StorageRequestMetadata, ValuePropId,
};
use shs_msp_client::backend::mock::MockBackend;
use shs_msp_client::backend::models::{FileInfo, MspInfo, PaymentStreamInfo};
use shs_msp_client::backend::session::sign_in;
use shs_msp_client::config::PollingConfig;
use shs_msp_client::ledger::mock::MockLedger;
use shs_msp_client::{
    DebtAccountant, IssueParams, LedgerCall, ReplicationTarget, StorageRequestLifecycle,
    SubmissionQueue,
};

const USER: AccountId = AccountId([0x0a; 20]);
const MSP: ProviderId = ProviderId([0xee; 32]);
const BUCKET: BucketId = BucketId([0x01; 32]);
const KEY: FileKey = FileKey([0x07; 32]);

struct TestSigner;

#[async_trait::async_trait]
impl PersonalSigner for TestSigner {
    type Error = std::convert::Infallible;

    async fn sign_personal(&self, _message: &[u8]) -> Result<Signature, Self::Error> {
        Ok(Signature([0x42; 65]))
    }
}

fn fast_polling() -> PollingConfig {
    PollingConfig {
        backend_lookup_attempts: 10,
        backend_lookup_interval_ms: 5,
        replication_attempts: 20,
        replication_interval_ms: 5,
    }
}

fn request(confirmed: bool) -> StorageRequestMetadata {
    StorageRequestMetadata {
        owner: USER,
        bucket_id: BUCKET,
        fingerprint: Fingerprint::new([0x02; 32]),
        size: 4096,
        msp: Some((MSP, confirmed)),
        bsps_required: 2,
        bsps_confirmed: if confirmed { 2 } else { 0 },
        expires_at: 10_000,
    }
}

fn ready_file() -> FileInfo {
    FileInfo {
        file_key: KEY,
        bucket_id: BUCKET,
        location: "docs/report.pdf".to_string(),
        fingerprint: Fingerprint::new([0x02; 32]),
        size: 4096,
        status: FileStatus::Ready,
    }
}

#[tokio::test(start_paused = true)]
async fn storage_request_lifecycle_end_to_end() {
    let ledger = Arc::new(MockLedger::new());
    let backend = Arc::new(MockBackend::new());
    backend.register_user(USER);
    backend.set_info(MspInfo {
        msp_id: MSP,
        multiaddresses: vec!["/ip4/10.0.0.1/tcp/30333/p2p/12D3KooWMsp".to_string()],
        payment_account: None,
    });
    ledger.insert_bucket(BucketRecord {
        bucket_id: BUCKET,
        owner: USER,
        msp_id: Some(MSP),
        private: false,
        value_prop_id: ValuePropId::new([0x09; 32]),
    });

    let session = sign_in(
        backend.as_ref(),
        &TestSigner,
        USER,
        1,
        "example.org",
        "https://example.org",
    )
    .await
    .unwrap();

    let queue = Arc::new(SubmissionQueue::new(Arc::clone(&ledger)));
    let lifecycle = StorageRequestLifecycle::new(
        Arc::clone(&queue),
        Arc::clone(&backend),
        fast_polling(),
    );
    let cancel = CancellationToken::new();

    // issue: unconfirmed record visible right after finalization
    ledger.insert_storage_request(KEY, request(false));
    let file_key = lifecycle
        .issue(IssueParams {
            file_key: KEY,
            bucket_id: BUCKET,
            location: "docs/report.pdf".to_string(),
            fingerprint: Fingerprint::new([0x02; 32]),
            size: 4096,
            replication: ReplicationTarget::Standard,
        })
        .await
        .unwrap();
    assert_eq!(file_key, KEY);

    // MSP confirms after one pending attempt
    ledger.push_storage_request_response(KEY, Some(request(false)));
    ledger.insert_storage_request(KEY, request(true));
    lifecycle
        .await_msp_confirmation(&KEY, &cancel)
        .await
        .unwrap();

    // backend indexes the file pending, then ready; chain stays confirmed
    let pending = FileInfo {
        status: FileStatus::Pending,
        ..ready_file()
    };
    backend.push_file_info_response(BUCKET, KEY, Some(pending));
    backend.insert_file(ready_file());
    let info = lifecycle
        .await_ready(&session, &BUCKET, &KEY, &cancel)
        .await
        .unwrap();
    assert_eq!(info.status, FileStatus::Ready);

    // delete: signed intention, pending counter advances, file unlisted
    backend.push_file_info_response(BUCKET, KEY, Some(ready_file()));
    backend.remove_file(&BUCKET, &KEY);
    let receipt = lifecycle
        .request_delete(&session, &BUCKET, &KEY, &TestSigner, &cancel)
        .await
        .unwrap();
    assert_eq!(receipt.pending_after, receipt.pending_before + 1);

    let submissions = ledger.submissions();
    assert!(matches!(
        submissions[0],
        LedgerCall::IssueStorageRequest { .. }
    ));
    assert!(matches!(
        submissions[1],
        LedgerCall::RequestDeleteFile { .. }
    ));
}

#[tokio::test]
async fn debt_settlement_end_to_end() {
    let ledger = Arc::new(MockLedger::new());
    let backend = Arc::new(MockBackend::new());
    backend.register_user(USER);
    ledger.set_current_tick(1_000);
    ledger.set_free_balance(USER, 600);
    ledger.set_fixed_stream(
        MSP,
        USER,
        FixedRatePaymentStream {
            rate: 3,
            last_charged_tick: 900,
            user_deposit: 10_000,
        },
    );
    backend.set_payment_streams(
        USER,
        vec![PaymentStreamInfo {
            provider: MSP,
            provider_type: ProviderKind::Msp,
            cost_per_tick: 3,
        }],
    );

    let session = sign_in(
        backend.as_ref(),
        &TestSigner,
        USER,
        1,
        "example.org",
        "https://example.org",
    )
    .await
    .unwrap();

    let accountant = DebtAccountant::new(Arc::clone(&ledger));
    let streams = [shs_core::types::StreamRef {
        provider: MSP,
        kind: ProviderKind::Msp,
        cost_per_tick: 3,
    }];
    let snapshot = accountant
        .compute_outstanding_debt(&USER, &streams)
        .await
        .unwrap();
    // 100 elapsed ticks at rate 3
    assert_eq!(snapshot.total_effective_debt, 300u32.into());

    accountant.pay_outstanding_debt(&[MSP]).await.unwrap();
    let snapshot = accountant
        .compute_outstanding_debt(&USER, &streams)
        .await
        .unwrap();
    assert_eq!(snapshot.total_effective_debt, 0u32.into());

    // 600 / 3 = 200 ticks = 1200 seconds
    let remaining = accountant.time_remaining(backend.as_ref(), &session).await.unwrap();
    assert_eq!(remaining.ticks, 200);
    assert_eq!(remaining.seconds, 1_200);
}

#[tokio::test(start_paused = true)]
async fn default_poll_budgets_match_the_protocol() {
    assert_eq!(PollConfig::backend_lookup().max_attempts, 10);
    assert_eq!(PollConfig::replication().max_attempts, 144);
}
