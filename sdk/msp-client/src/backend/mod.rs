//! MSP backend gateway: the provider's off-chain index and auth service.
//!
//! The backend is eventually consistent with the chain. Flows treat its
//! answers as hints and re-check the ledger where correctness depends on
//! on-chain state.

pub mod http;
#[cfg(feature = "mocks")]
pub mod mock;
pub mod models;
pub mod session;

use async_trait::async_trait;

use shs_core::types::{BucketId, FileKey};

use crate::error::Result;
use models::{
    BucketInfo, FileInfo, HealthStatus, MspInfo, NonceRequest, NonceResponse, PaymentStreamInfo,
    TokenResponse, UserProfile, ValueProp, VerifyRequest, VerifyResponse,
};
use session::Session;

/// Read access to the MSP backend index and its SIWE-style auth endpoints.
#[async_trait]
pub trait BackendIndexGateway: Send + Sync {
    async fn info(&self) -> Result<MspInfo>;

    async fn health(&self) -> Result<HealthStatus>;

    async fn value_propositions(&self) -> Result<Vec<ValueProp>>;

    /// Request a sign-in challenge for an address.
    async fn request_nonce(&self, request: &NonceRequest) -> Result<NonceResponse>;

    /// Exchange a signed challenge for a bearer token.
    async fn verify_signature(&self, request: &VerifyRequest) -> Result<VerifyResponse>;

    async fn refresh_token(&self, session: &Session) -> Result<TokenResponse>;

    async fn profile(&self, session: &Session) -> Result<UserProfile>;

    async fn logout(&self, session: &Session) -> Result<()>;

    async fn bucket(&self, session: &Session, bucket_id: &BucketId) -> Result<BucketInfo>;

    async fn bucket_files(
        &self,
        session: &Session,
        bucket_id: &BucketId,
    ) -> Result<Vec<FileInfo>>;

    /// A single file's index entry, or `None` while the backend has not
    /// indexed it (or no longer lists it).
    async fn file_info(
        &self,
        session: &Session,
        bucket_id: &BucketId,
        file_key: &FileKey,
    ) -> Result<Option<FileInfo>>;

    /// The authenticated user's payment streams.
    async fn payment_streams(&self, session: &Session) -> Result<Vec<PaymentStreamInfo>>;
}
