//! WebSocket implementation of [`RpcConnection`] backed by jsonrpsee.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use jsonrpsee::core::client::ClientT;
use jsonrpsee::core::traits::ToRpcParams;
use jsonrpsee::ws_client::{WsClient, WsClientBuilder};
use serde::de::DeserializeOwned;
use tokio::sync::RwLock;

use super::connection::{IntoRpcError, RpcConfig, RpcConnection, RpcResult};

const LOG_TARGET: &str = "shs::ledger::ws";

const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_MAX_CONCURRENT_REQUESTS: usize = 100;

/// WebSocket connection to the ledger node.
///
/// The underlying client is lazily (re)built on first use and after a
/// detected disconnect, so a transient node restart does not permanently
/// poison the gateway.
pub struct WsConnection {
    config: RpcConfig,
    client: RwLock<Option<Arc<WsClient>>>,
}

impl WsConnection {
    /// Create a new connection and establish the initial WebSocket session.
    pub async fn connect(config: RpcConfig) -> RpcResult<Self> {
        let conn = Self {
            config,
            client: RwLock::new(None),
        };
        conn.ensure_connected().await?;
        Ok(conn)
    }

    /// Create a connection without dialing; the first call will connect.
    pub fn new_lazy(config: RpcConfig) -> Self {
        Self {
            config,
            client: RwLock::new(None),
        }
    }

    async fn build_client(&self) -> RpcResult<Arc<WsClient>> {
        let timeout = Duration::from_secs(
            self.config
                .timeout_secs
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
        );
        let max_concurrent = self
            .config
            .max_concurrent_requests
            .unwrap_or(DEFAULT_MAX_CONCURRENT_REQUESTS);

        tracing::debug!(target: LOG_TARGET, url = %self.config.url, "dialing ledger node");

        let client = WsClientBuilder::default()
            .request_timeout(timeout)
            .max_concurrent_requests(max_concurrent)
            .build(&self.config.url)
            .await
            .map_err(|e| e.into_rpc_error())?;

        Ok(Arc::new(client))
    }

    /// Returns a live client, reconnecting if the previous session died.
    async fn get_client(&self) -> RpcResult<Arc<WsClient>> {
        {
            let guard = self.client.read().await;
            if let Some(client) = guard.as_ref() {
                if client.is_connected() {
                    return Ok(Arc::clone(client));
                }
            }
        }

        let mut guard = self.client.write().await;
        // another task may have reconnected while we waited for the lock
        if let Some(client) = guard.as_ref() {
            if client.is_connected() {
                return Ok(Arc::clone(client));
            }
        }

        let client = self.build_client().await?;
        *guard = Some(Arc::clone(&client));
        Ok(client)
    }

    async fn ensure_connected(&self) -> RpcResult<()> {
        self.get_client().await.map(|_| ())
    }
}

#[async_trait]
impl RpcConnection for WsConnection {
    async fn call<P, R>(&self, method: &str, params: P) -> RpcResult<R>
    where
        P: ToRpcParams + Send,
        R: DeserializeOwned,
    {
        let client = self.get_client().await?;
        tracing::trace!(target: LOG_TARGET, method, "rpc call");
        client
            .request(method, params)
            .await
            .map_err(|e| e.into_rpc_error())
    }

    async fn is_connected(&self) -> bool {
        let guard = self.client.read().await;
        guard.as_ref().is_some_and(|client| client.is_connected())
    }

    async fn close(&self) -> RpcResult<()> {
        let mut guard = self.client.write().await;
        // dropping the client tears down the socket
        guard.take();
        Ok(())
    }
}
