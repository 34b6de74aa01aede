//! Scripted in-memory [`RpcConnection`] used by unit tests.

use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use jsonrpsee::core::traits::ToRpcParams;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::connection::{RpcConnection, RpcConnectionError, RpcResult};

/// A recorded request, kept for assertions.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub method: String,
    pub params: Option<Value>,
}

#[derive(Default)]
struct MockState {
    /// Fixed response per method; consulted when no queued response exists.
    responses: HashMap<String, Value>,
    /// FIFO of one-shot responses per method, drained before `responses`.
    queued: HashMap<String, VecDeque<Value>>,
    /// Methods that fail with the given error on their next call.
    failures: HashMap<String, RpcConnectionError>,
    calls: Vec<RecordedCall>,
    connected: bool,
}

/// Mock connection with scripted responses keyed by method name.
pub struct MockConnection {
    state: Mutex<MockState>,
}

impl Default for MockConnection {
    fn default() -> Self {
        Self::new()
    }
}

impl MockConnection {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockState {
                connected: true,
                ..Default::default()
            }),
        }
    }

    /// Sets the response returned for every call to `method`.
    pub fn set_response(&self, method: &str, response: Value) {
        self.state.lock().responses.insert(method.to_string(), response);
    }

    /// Queues a one-shot response for `method`, consumed in FIFO order
    /// before any fixed response.
    pub fn push_response(&self, method: &str, response: Value) {
        self.state
            .lock()
            .queued
            .entry(method.to_string())
            .or_default()
            .push_back(response);
    }

    /// Makes the next call to `method` fail with `error`.
    pub fn fail_next(&self, method: &str, error: RpcConnectionError) {
        self.state.lock().failures.insert(method.to_string(), error);
    }

    /// All calls made so far, in order.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.state.lock().calls.clone()
    }

    /// Number of calls made to `method`.
    pub fn call_count(&self, method: &str) -> usize {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|c| c.method == method)
            .count()
    }

    pub fn set_connected(&self, connected: bool) {
        self.state.lock().connected = connected;
    }
}

#[async_trait]
impl RpcConnection for MockConnection {
    async fn call<P, R>(&self, method: &str, params: P) -> RpcResult<R>
    where
        P: ToRpcParams + Send,
        R: DeserializeOwned,
    {
        let raw_params = params
            .to_rpc_params()
            .map_err(|e| RpcConnectionError::Serialization(e.to_string()))?;
        let params_value = match raw_params {
            Some(raw) => Some(
                serde_json::from_str(raw.get())
                    .map_err(|e| RpcConnectionError::Serialization(e.to_string()))?,
            ),
            None => None,
        };

        let response = {
            let mut state = self.state.lock();
            if !state.connected {
                return Err(RpcConnectionError::ConnectionClosed);
            }
            state.calls.push(RecordedCall {
                method: method.to_string(),
                params: params_value,
            });

            if let Some(error) = state.failures.remove(method) {
                return Err(error);
            }

            let queued = state
                .queued
                .get_mut(method)
                .and_then(|queue| queue.pop_front());
            match queued.or_else(|| state.responses.get(method).cloned()) {
                Some(response) => response,
                None => {
                    return Err(RpcConnectionError::Rpc(format!(
                        "no mock response configured for method: {method}"
                    )))
                }
            }
        };

        serde_json::from_value(response)
            .map_err(|e| RpcConnectionError::Serialization(e.to_string()))
    }

    async fn is_connected(&self) -> bool {
        self.state.lock().connected
    }

    async fn close(&self) -> RpcResult<()> {
        self.state.lock().connected = false;
        Ok(())
    }
}
