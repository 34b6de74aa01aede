//! RPC connection abstraction for the ledger node.

use std::fmt::Debug;

use async_trait::async_trait;
use jsonrpsee::core::client::Error;
use jsonrpsee::core::traits::ToRpcParams;
use serde::de::DeserializeOwned;

#[cfg(feature = "mocks")]
use super::mock_connection::MockConnection;
use super::ws::WsConnection;
use crate::config::LedgerConfig;

/// Error type for RPC operations
#[derive(Debug, thiserror::Error)]
pub enum RpcConnectionError {
    /// Network or transport-related errors
    #[error("transport error: {0}")]
    Transport(String),

    /// JSON-RPC protocol errors
    #[error("rpc error: {0}")]
    Rpc(String),

    /// Serialization/deserialization errors
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Request timeout errors
    #[error("request timeout")]
    Timeout,

    /// Connection closed or unavailable
    #[error("connection closed")]
    ConnectionClosed,

    /// Other errors
    #[error("other error: {0}")]
    Other(String),
}

/// Result type for RPC operations
pub type RpcResult<T> = Result<T, RpcConnectionError>;

/// Configuration for RPC connections
#[derive(Debug, Clone)]
pub struct RpcConfig {
    /// The RPC endpoint URL
    pub url: String,

    /// Request timeout in seconds
    pub timeout_secs: Option<u64>,

    /// Maximum number of concurrent requests
    pub max_concurrent_requests: Option<usize>,

    /// Whether to verify TLS certificates (for WSS)
    pub verify_tls: bool,
}

impl From<&LedgerConfig> for RpcConfig {
    fn from(config: &LedgerConfig) -> Self {
        Self {
            url: config.rpc_url.clone(),
            timeout_secs: config.timeout_secs,
            max_concurrent_requests: config.max_concurrent_requests,
            verify_tls: config.verify_tls,
        }
    }
}

/// Trait for types that can be converted to RPC errors
pub trait IntoRpcError {
    fn into_rpc_error(self) -> RpcConnectionError;
}

impl IntoRpcError for jsonrpsee::core::client::Error {
    fn into_rpc_error(self) -> RpcConnectionError {
        match self {
            Error::Call(e) => RpcConnectionError::Rpc(e.to_string()),
            Error::Transport(e) => RpcConnectionError::Transport(e.to_string()),
            Error::RestartNeeded(_) => RpcConnectionError::ConnectionClosed,
            Error::ParseError(e) => RpcConnectionError::Serialization(e.to_string()),
            Error::InvalidSubscriptionId => {
                RpcConnectionError::Rpc("Invalid subscription ID".to_string())
            }
            Error::InvalidRequestId(e) => {
                RpcConnectionError::Rpc(format!("Invalid request ID: {}", e))
            }
            Error::RequestTimeout => RpcConnectionError::Timeout,
            Error::HttpNotImplemented => {
                RpcConnectionError::Other("HTTP not implemented".to_string())
            }
            Error::EmptyBatchRequest(_) => {
                RpcConnectionError::Rpc("Empty batch request".to_string())
            }
            Error::RegisterMethod(e) => {
                RpcConnectionError::Rpc(format!("Failed to register method: {}", e))
            }
            other => RpcConnectionError::Other(other.to_string()),
        }
    }
}

/// Trait for RPC connections
#[async_trait]
pub trait RpcConnection: Send + Sync {
    /// Execute a JSON-RPC method call
    async fn call<P, R>(&self, method: &str, params: P) -> RpcResult<R>
    where
        P: ToRpcParams + Send,
        R: DeserializeOwned;

    /// Execute a JSON-RPC method call without parameters
    async fn call_no_params<R>(&self, method: &str) -> RpcResult<R>
    where
        R: DeserializeOwned,
    {
        self.call::<_, R>(method, jsonrpsee::rpc_params![]).await
    }

    /// Check if the connection is currently active
    async fn is_connected(&self) -> bool;

    /// Close the connection gracefully
    async fn close(&self) -> RpcResult<()>;
}

/// Enum wrapper for different RPC connection implementations
///
/// This enum allows using concrete types instead of trait objects,
/// solving trait object safety issues while maintaining flexibility
/// between real and mock connections.
pub enum AnyRpcConnection {
    /// Real WebSocket connection
    Ws(WsConnection),

    /// Mock connection for testing
    #[cfg(feature = "mocks")]
    Mock(MockConnection),
}

impl Debug for AnyRpcConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AnyRpcConnection::Ws(_) => write!(f, "AnyRpcConnection::Ws(WsConnection)"),
            #[cfg(feature = "mocks")]
            AnyRpcConnection::Mock(_) => write!(f, "AnyRpcConnection::Mock(MockConnection)"),
        }
    }
}

#[async_trait]
impl RpcConnection for AnyRpcConnection {
    async fn call<P, R>(&self, method: &str, params: P) -> RpcResult<R>
    where
        P: ToRpcParams + Send,
        R: DeserializeOwned,
    {
        match self {
            AnyRpcConnection::Ws(conn) => conn.call(method, params).await,
            #[cfg(feature = "mocks")]
            AnyRpcConnection::Mock(conn) => conn.call(method, params).await,
        }
    }

    async fn is_connected(&self) -> bool {
        match self {
            AnyRpcConnection::Ws(conn) => conn.is_connected().await,
            #[cfg(feature = "mocks")]
            AnyRpcConnection::Mock(conn) => conn.is_connected().await,
        }
    }

    async fn close(&self) -> RpcResult<()> {
        match self {
            AnyRpcConnection::Ws(conn) => conn.close().await,
            #[cfg(feature = "mocks")]
            AnyRpcConnection::Mock(conn) => conn.close().await,
        }
    }
}
