//! Shared types for the StorageHub client SDK.
//!
//! On-chain identifiers are 32-byte hashes and accounts are 20-byte
//! EVM-style addresses (solochain-evm runtime). Everything crosses the
//! wire as `0x`-prefixed hex.

use std::fmt;
use std::str::FromStr;

use num_bigint::BigUint;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

/// The network's discrete time unit. Advances roughly every 6 seconds.
pub type Tick = u64;

/// Native currency amount, in the smallest unit (18 decimals).
pub type Balance = u128;

/// Error returned when parsing a hex-encoded identifier fails.
#[derive(Debug, thiserror::Error)]
#[error("invalid {kind}: expected 0x-prefixed hex of {expected} bytes")]
pub struct ParseIdError {
    kind: &'static str,
    expected: usize,
}

fn parse_fixed_hex<const N: usize>(kind: &'static str, s: &str) -> Result<[u8; N], ParseIdError> {
    let err = || ParseIdError { kind, expected: N };
    let stripped = s.strip_prefix("0x").ok_or_else(err)?;
    let bytes = hex::decode(stripped).map_err(|_| err())?;
    bytes.try_into().map_err(|_| err())
}

macro_rules! fixed_bytes_id {
    ($(#[$docs:meta])* $name:ident, $len:expr) => {
        $(#[$docs])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub [u8; $len]);

        impl $name {
            pub const fn new(bytes: [u8; $len]) -> Self {
                Self(bytes)
            }

            pub fn as_bytes(&self) -> &[u8; $len] {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "0x{}", hex::encode(self.0))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self)
            }
        }

        impl FromStr for $name {
            type Err = ParseIdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                parse_fixed_hex::<$len>(stringify!($name), s).map(Self)
            }
        }

        impl From<[u8; $len]> for $name {
            fn from(bytes: [u8; $len]) -> Self {
                Self(bytes)
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.to_string())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                s.parse().map_err(de::Error::custom)
            }
        }
    };
}

fixed_bytes_id!(
    /// Content-addressed identifier of a file: the hash of its metadata.
    FileKey,
    32
);
fixed_bytes_id!(
    /// On-chain identifier of a bucket.
    BucketId,
    32
);
fixed_bytes_id!(
    /// On-chain identifier of a storage provider (MSP or BSP).
    ProviderId,
    32
);
fixed_bytes_id!(
    /// Root Merkle hash of a file's chunk trie.
    Fingerprint,
    32
);
fixed_bytes_id!(
    /// Identifier of an MSP value proposition.
    ValuePropId,
    32
);
fixed_bytes_id!(
    /// Hash of a submitted transaction.
    TxHash,
    32
);
fixed_bytes_id!(
    /// Hash of a finalized block.
    BlockHash,
    32
);
fixed_bytes_id!(
    /// 20-byte EVM-style account address.
    AccountId,
    20
);

/// Status of a file as reported by the MSP backend index.
///
/// The backend derives this from replication activity, so it is
/// eventually consistent; the on-chain storage request record is the
/// ground truth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Pending,
    Ready,
    Revoked,
    Rejected,
    Expired,
}

impl FromStr for FileStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "ready" => Ok(Self::Ready),
            "revoked" => Ok(Self::Revoked),
            "rejected" => Ok(Self::Rejected),
            "expired" => Ok(Self::Expired),
            other => Err(format!("unknown file status: {other}")),
        }
    }
}

impl fmt::Display for FileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Ready => "ready",
            Self::Revoked => "revoked",
            Self::Rejected => "rejected",
            Self::Expired => "expired",
        };
        f.write_str(s)
    }
}

/// The kind of provider behind a payment stream.
///
/// BSPs bill through dynamic-rate streams (price-index based), MSPs
/// through fixed-rate streams (flat amount per tick). Closed enum so the
/// debt computation can match exhaustively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Bsp,
    Msp,
}

/// On-chain record of a pending storage request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageRequestMetadata {
    pub owner: AccountId,
    pub bucket_id: BucketId,
    pub fingerprint: Fingerprint,
    pub size: u64,
    /// The responsible MSP and whether it has confirmed the request.
    pub msp: Option<(ProviderId, bool)>,
    /// Number of BSP replicas required before the request completes.
    pub bsps_required: u32,
    /// Number of BSPs that have volunteered and confirmed so far.
    pub bsps_confirmed: u32,
    /// Tick at which the request expires if replication is not achieved.
    pub expires_at: Tick,
}

impl StorageRequestMetadata {
    /// Whether the responsible MSP has confirmed the request on chain.
    pub fn msp_confirmed(&self) -> bool {
        matches!(self.msp, Some((_, true)))
    }

    /// Whether any provider (MSP or BSP) has confirmed yet. Revocation is
    /// only permitted while this is false.
    pub fn has_confirmations(&self) -> bool {
        self.msp_confirmed() || self.bsps_confirmed > 0
    }
}

/// On-chain record of a bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketRecord {
    pub bucket_id: BucketId,
    pub owner: AccountId,
    pub msp_id: Option<ProviderId>,
    pub private: bool,
    pub value_prop_id: ValuePropId,
}

/// A dynamic-rate payment stream between a BSP and a user.
///
/// Billed proportionally to the growth of the global price index and the
/// amount of capacity provided.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DynamicRatePaymentStream {
    /// Capacity provided to the user, in units.
    pub amount_provided: u64,
    /// Snapshot of the accumulated price index at the last charge.
    pub price_index_when_last_charged: Balance,
    /// Deposit held from the user for this stream; caps effective debt.
    pub user_deposit: Balance,
}

/// A fixed-rate payment stream between an MSP and a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixedRatePaymentStream {
    /// Flat amount charged per elapsed tick.
    pub rate: Balance,
    /// Tick at which the stream was last charged.
    pub last_charged_tick: Tick,
    /// Deposit held from the user for this stream; caps effective debt.
    pub user_deposit: Balance,
}

/// Per-provider snapshot of how far a BSP is allowed to charge, updated
/// whenever the provider submits a proof of service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastChargeableInfo {
    pub last_chargeable_tick: Tick,
    /// Accumulated global price index at the last chargeable tick.
    pub price_index: Balance,
}

/// A user's payment stream as listed by the backend index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamRef {
    pub provider: ProviderId,
    pub kind: ProviderKind,
    pub cost_per_tick: Balance,
}

/// Aggregate outstanding debt across all of a user's payment streams,
/// computed against a single tick/price-index snapshot.
///
/// Accumulated in arbitrary precision so the totals can never wrap.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DebtSnapshot {
    /// Debt accrued under each stream's billing model, uncapped.
    pub total_raw_debt: BigUint,
    /// Raw debt capped per provider at the user's deposit.
    pub total_effective_debt: BigUint,
}

impl DebtSnapshot {
    /// `effective <= raw` holds for every well-formed snapshot.
    pub fn is_consistent(&self) -> bool {
        self.total_effective_debt <= self.total_raw_debt
    }
}
