//! Signed file-operation intentions.
//!
//! File deletion is authorized off-chain: the user signs a fixed 33-byte
//! message (32-byte file key followed by a 1-byte operation code) with a
//! personal/prefixed message signing scheme, and the signature is
//! submitted alongside the deletion call.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::types::FileKey;

/// Length of the encoded intention: 32-byte file key + 1 operation byte.
pub const INTENTION_LEN: usize = 33;

/// Operation requested over a file. Only deletion exists today; the code
/// is part of the wire format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum FileOperation {
    Delete = 0,
}

impl FileOperation {
    pub const fn code(self) -> u8 {
        self as u8
    }
}

/// An intention to perform an operation on a file, to be signed by the
/// file's owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileOperationIntention {
    pub file_key: FileKey,
    pub operation: FileOperation,
}

impl FileOperationIntention {
    pub fn delete(file_key: FileKey) -> Self {
        Self {
            file_key,
            operation: FileOperation::Delete,
        }
    }

    /// Raw message to sign: exactly 33 bytes, file key first.
    pub fn encode(&self) -> [u8; INTENTION_LEN] {
        let mut out = [0u8; INTENTION_LEN];
        out[..32].copy_from_slice(self.file_key.as_bytes());
        out[32] = self.operation.code();
        out
    }
}

/// A 65-byte ECDSA signature produced by a personal-message signer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature(pub [u8; 65]);

impl Signature {
    pub fn as_bytes(&self) -> &[u8; 65] {
        &self.0
    }
}

impl std::fmt::Display for Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl Serialize for Signature {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Signature {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        let stripped = s
            .strip_prefix("0x")
            .ok_or_else(|| serde::de::Error::custom("signature must be 0x-prefixed hex"))?;
        let bytes = hex::decode(stripped).map_err(serde::de::Error::custom)?;
        let bytes: [u8; 65] = bytes
            .try_into()
            .map_err(|_| serde::de::Error::custom("signature must be 65 bytes"))?;
        Ok(Self(bytes))
    }
}

/// Seam for wallet integrations. Implementations apply the personal
/// message prefix and sign with the account's key; the SDK never sees key
/// material.
///
/// Used both for deletion intentions (raw 33 bytes) and for backend
/// sign-in challenges (UTF-8 message text).
#[async_trait]
pub trait PersonalSigner: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Sign an arbitrary message with the personal message prefix.
    async fn sign_personal(&self, message: &[u8]) -> Result<Signature, Self::Error>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intention_encodes_33_bytes_key_first() {
        let key = FileKey::new([0x11; 32]);
        let encoded = FileOperationIntention::delete(key).encode();

        assert_eq!(encoded.len(), INTENTION_LEN);
        assert_eq!(&encoded[..32], key.as_bytes());
        assert_eq!(encoded[32], 0);
    }

    #[test]
    fn delete_operation_code_is_zero() {
        assert_eq!(FileOperation::Delete.code(), 0);
    }
}
