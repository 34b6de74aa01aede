//! In-memory [`BackendIndexGateway`] for unit tests.
//!
//! Accepts any signature during verification; what it enforces is the
//! flow itself (nonce issued, token minted, token checked on every
//! authenticated call).

use std::collections::{HashMap, HashSet, VecDeque};

use async_trait::async_trait;
use parking_lot::Mutex;
use rand::Rng;

use shs_core::types::{AccountId, BucketId, FileKey, ProviderId};

use super::models::{
    BucketInfo, FileInfo, HealthStatus, MspInfo, NonceRequest, NonceResponse, PaymentStreamInfo,
    TokenResponse, UserProfile, ValueProp, VerifyRequest, VerifyResponse,
};
use super::session::Session;
use super::BackendIndexGateway;
use crate::error::{Error, Result};

#[derive(Default)]
struct BackendState {
    users: HashSet<AccountId>,
    /// Issued challenge messages, keyed by full message text.
    challenges: HashMap<String, AccountId>,
    /// Live bearer tokens.
    tokens: HashMap<String, AccountId>,
    next_token: u64,
    info: Option<MspInfo>,
    value_props: Vec<ValueProp>,
    buckets: HashMap<BucketId, BucketInfo>,
    files: HashMap<(BucketId, FileKey), FileInfo>,
    /// One-shot scripted answers for `file_info`, drained before `files`.
    scripted_file_info: HashMap<(BucketId, FileKey), VecDeque<Option<FileInfo>>>,
    payment_streams: HashMap<AccountId, Vec<PaymentStreamInfo>>,
}

/// Programmable fake backend.
#[derive(Default)]
pub struct MockBackend {
    state: Mutex<BackendState>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_user(&self, address: AccountId) {
        self.state.lock().users.insert(address);
    }

    pub fn set_info(&self, info: MspInfo) {
        self.state.lock().info = Some(info);
    }

    pub fn set_value_props(&self, props: Vec<ValueProp>) {
        self.state.lock().value_props = props;
    }

    pub fn insert_bucket(&self, bucket: BucketInfo) {
        self.state.lock().buckets.insert(bucket.bucket_id, bucket);
    }

    pub fn insert_file(&self, file: FileInfo) {
        self.state
            .lock()
            .files
            .insert((file.bucket_id, file.file_key), file);
    }

    pub fn remove_file(&self, bucket_id: &BucketId, file_key: &FileKey) {
        self.state.lock().files.remove(&(*bucket_id, *file_key));
    }

    /// Queues a one-shot answer for `file_info`, consumed in FIFO order
    /// before the stored file.
    pub fn push_file_info_response(
        &self,
        bucket_id: BucketId,
        file_key: FileKey,
        response: Option<FileInfo>,
    ) {
        self.state
            .lock()
            .scripted_file_info
            .entry((bucket_id, file_key))
            .or_default()
            .push_back(response);
    }

    pub fn set_payment_streams(&self, address: AccountId, streams: Vec<PaymentStreamInfo>) {
        self.state.lock().payment_streams.insert(address, streams);
    }

    fn authenticate(&self, session: &Session) -> Result<AccountId> {
        if !session.is_valid() {
            return Err(Error::Unauthorized("session has been invalidated".to_string()));
        }
        let token = session
            .bearer()
            .strip_prefix("Bearer ")
            .map(str::to_string)
            .unwrap_or_default();
        self.state
            .lock()
            .tokens
            .get(&token)
            .copied()
            .ok_or_else(|| Error::Unauthorized("unknown or expired token".to_string()))
    }

    fn mint_token(state: &mut BackendState, address: AccountId) -> String {
        state.next_token += 1;
        let token = format!("token-{}", state.next_token);
        state.tokens.insert(token.clone(), address);
        token
    }
}

#[async_trait]
impl BackendIndexGateway for MockBackend {
    async fn info(&self) -> Result<MspInfo> {
        Ok(self.state.lock().info.clone().unwrap_or(MspInfo {
            msp_id: ProviderId::new([0xee; 32]),
            multiaddresses: vec!["/ip4/127.0.0.1/tcp/30333/p2p/12D3KooWMock".to_string()],
            payment_account: None,
        }))
    }

    async fn health(&self) -> Result<HealthStatus> {
        Ok(HealthStatus {
            status: "healthy".to_string(),
        })
    }

    async fn value_propositions(&self) -> Result<Vec<ValueProp>> {
        Ok(self.state.lock().value_props.clone())
    }

    async fn request_nonce(&self, request: &NonceRequest) -> Result<NonceResponse> {
        let mut state = self.state.lock();
        if !state.users.contains(&request.address) {
            return Err(Error::NotFound(format!("unknown user {}", request.address)));
        }
        let nonce: u64 = rand::thread_rng().gen();
        let nonce = format!("{nonce:016x}");
        let message = format!(
            "{} wants you to sign in with your account:\n{}\nURI: {}\nChain ID: {}\nNonce: {}",
            request.domain, request.address, request.uri, request.chain_id, nonce
        );
        state.challenges.insert(message.clone(), request.address);
        Ok(NonceResponse { message, nonce })
    }

    async fn verify_signature(&self, request: &VerifyRequest) -> Result<VerifyResponse> {
        let mut state = self.state.lock();
        let address = state
            .challenges
            .remove(&request.message)
            .ok_or_else(|| Error::Unauthorized("unknown challenge".to_string()))?;
        let token = Self::mint_token(&mut state, address);
        Ok(VerifyResponse {
            token,
            user: UserProfile { address },
        })
    }

    async fn refresh_token(&self, session: &Session) -> Result<TokenResponse> {
        let address = self.authenticate(session)?;
        let mut state = self.state.lock();
        let old = session
            .bearer()
            .strip_prefix("Bearer ")
            .map(str::to_string)
            .unwrap_or_default();
        state.tokens.remove(&old);
        let token = Self::mint_token(&mut state, address);
        Ok(TokenResponse { token })
    }

    async fn profile(&self, session: &Session) -> Result<UserProfile> {
        let address = self.authenticate(session)?;
        Ok(UserProfile { address })
    }

    async fn logout(&self, session: &Session) -> Result<()> {
        self.authenticate(session)?;
        let token = session
            .bearer()
            .strip_prefix("Bearer ")
            .map(str::to_string)
            .unwrap_or_default();
        self.state.lock().tokens.remove(&token);
        Ok(())
    }

    async fn bucket(&self, session: &Session, bucket_id: &BucketId) -> Result<BucketInfo> {
        self.authenticate(session)?;
        self.state
            .lock()
            .buckets
            .get(bucket_id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("bucket {bucket_id}")))
    }

    async fn bucket_files(
        &self,
        session: &Session,
        bucket_id: &BucketId,
    ) -> Result<Vec<FileInfo>> {
        self.authenticate(session)?;
        Ok(self
            .state
            .lock()
            .files
            .values()
            .filter(|f| f.bucket_id == *bucket_id)
            .cloned()
            .collect())
    }

    async fn file_info(
        &self,
        session: &Session,
        bucket_id: &BucketId,
        file_key: &FileKey,
    ) -> Result<Option<FileInfo>> {
        self.authenticate(session)?;
        let mut state = self.state.lock();
        if let Some(queue) = state.scripted_file_info.get_mut(&(*bucket_id, *file_key)) {
            if let Some(response) = queue.pop_front() {
                return Ok(response);
            }
        }
        Ok(state.files.get(&(*bucket_id, *file_key)).cloned())
    }

    async fn payment_streams(&self, session: &Session) -> Result<Vec<PaymentStreamInfo>> {
        let address = self.authenticate(session)?;
        Ok(self
            .state
            .lock()
            .payment_streams
            .get(&address)
            .cloned()
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shs_core::types::{FileStatus, Fingerprint};

    fn file(bucket: BucketId, key: FileKey, status: FileStatus) -> FileInfo {
        FileInfo {
            file_key: key,
            bucket_id: bucket,
            location: "a/b".to_string(),
            fingerprint: Fingerprint::new([0x03; 32]),
            size: 1,
            status,
        }
    }

    #[tokio::test]
    async fn unauthenticated_calls_are_rejected() {
        let backend = MockBackend::new();
        let session = Session::new("token-999".to_string(), UserProfile {
            address: AccountId::new([0x0a; 20]),
        });
        let err = backend.profile(&session).await.unwrap_err();
        assert!(matches!(err, Error::Unauthorized(_)));
    }

    #[tokio::test]
    async fn scripted_file_info_drains_before_stored_state() {
        let backend = MockBackend::new();
        let address = AccountId::new([0x0a; 20]);
        backend.register_user(address);
        let bucket = BucketId::new([0x01; 32]);
        let key = FileKey::new([0x02; 32]);
        backend.insert_file(file(bucket, key, FileStatus::Ready));
        backend.push_file_info_response(bucket, key, None);
        backend.push_file_info_response(bucket, key, Some(file(bucket, key, FileStatus::Pending)));

        // forge a session through the real flow
        let nonce = backend
            .request_nonce(&NonceRequest {
                address,
                chain_id: 1,
                domain: "x".to_string(),
                uri: "y".to_string(),
            })
            .await
            .unwrap();
        let verified = backend
            .verify_signature(&VerifyRequest {
                message: nonce.message,
                signature: shs_core::intention::Signature([0u8; 65]),
            })
            .await
            .unwrap();
        let session = Session::new(verified.token, verified.user);

        assert!(backend.file_info(&session, &bucket, &key).await.unwrap().is_none());
        assert_eq!(
            backend
                .file_info(&session, &bucket, &key)
                .await
                .unwrap()
                .unwrap()
                .status,
            FileStatus::Pending
        );
        assert_eq!(
            backend
                .file_info(&session, &bucket, &key)
                .await
                .unwrap()
                .unwrap()
                .status,
            FileStatus::Ready
        );
    }
}
