//! Wire models for the MSP backend REST API.
//!
//! The backend speaks camelCase JSON and serializes balances as decimal
//! strings, since they do not fit in a JSON number.

use serde::{Deserialize, Serialize};

use shs_core::intention::Signature;
use shs_core::types::{
    AccountId, Balance, BucketId, FileKey, FileStatus, Fingerprint, ProviderId, ProviderKind,
    StreamRef, ValuePropId,
};

/// Balances as decimal strings on the wire.
pub(crate) mod balance_string {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &u128, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u128, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// A file as listed by the backend index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileInfo {
    pub file_key: FileKey,
    pub bucket_id: BucketId,
    pub location: String,
    pub fingerprint: Fingerprint,
    pub size: u64,
    pub status: FileStatus,
}

/// A bucket as listed by the backend index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BucketInfo {
    pub bucket_id: BucketId,
    pub name: String,
    pub private: bool,
    pub size: u64,
    pub file_count: u64,
}

/// Identity of the MSP behind the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MspInfo {
    pub msp_id: ProviderId,
    pub multiaddresses: Vec<String>,
    pub payment_account: Option<AccountId>,
}

/// A value proposition offered by the MSP.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValueProp {
    pub id: ValuePropId,
    #[serde(with = "balance_string")]
    pub price_per_giga_unit: Balance,
    pub bucket_data_limit: u64,
    pub available: bool,
}

/// Backend liveness report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        self.status == "healthy"
    }
}

/// A payment stream of the authenticated user, as indexed by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentStreamInfo {
    pub provider: ProviderId,
    pub provider_type: ProviderKind,
    #[serde(with = "balance_string")]
    pub cost_per_tick: Balance,
}

impl From<PaymentStreamInfo> for StreamRef {
    fn from(info: PaymentStreamInfo) -> Self {
        StreamRef {
            provider: info.provider,
            kind: info.provider_type,
            cost_per_tick: info.cost_per_tick,
        }
    }
}

/// Request body for `/auth/nonce`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NonceRequest {
    pub address: AccountId,
    pub chain_id: u64,
    pub domain: String,
    pub uri: String,
}

/// Challenge returned by `/auth/nonce`. `message` is the full text the
/// wallet must sign.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NonceResponse {
    pub message: String,
    pub nonce: String,
}

/// Request body for `/auth/verify`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyRequest {
    pub message: String,
    pub signature: Signature,
}

/// Successful verification: a bearer token and the resolved profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyResponse {
    pub token: String,
    pub user: UserProfile,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub address: AccountId,
}

/// Response of `/auth/refresh`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenResponse {
    pub token: String,
}
