//! Client configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use shs_core::constants::polling;
use shs_core::poller::PollConfig;

const DEFAULT_MSP_URL: &str = "http://127.0.0.1:8080/";
const DEFAULT_RPC_URL: &str = "ws://127.0.0.1:9944";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_MAX_CONCURRENT_REQUESTS: usize = 100;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub msp: MspConfig,
    pub ledger: LedgerConfig,
    pub polling: PollingConfig,
}

/// MSP backend REST endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MspConfig {
    pub base_url: String,
    pub timeout_secs: Option<u64>,
}

/// Ledger node RPC endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    pub rpc_url: String,
    pub timeout_secs: Option<u64>,
    pub max_concurrent_requests: Option<usize>,
    pub verify_tls: bool,
}

/// Attempt budgets for the two reconciliation phases. The defaults match
/// the protocol's expectations; both are tunable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingConfig {
    pub backend_lookup_attempts: u32,
    pub backend_lookup_interval_ms: u64,
    pub replication_attempts: u32,
    pub replication_interval_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        // these are just some sane defaults, most likely we will
        // have them overridden
        Self {
            msp: MspConfig {
                base_url: DEFAULT_MSP_URL.to_string(),
                timeout_secs: Some(DEFAULT_TIMEOUT_SECS),
            },
            ledger: LedgerConfig {
                rpc_url: DEFAULT_RPC_URL.to_string(),
                timeout_secs: Some(DEFAULT_TIMEOUT_SECS),
                max_concurrent_requests: Some(DEFAULT_MAX_CONCURRENT_REQUESTS),
                verify_tls: true,
            },
            polling: PollingConfig::default(),
        }
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            backend_lookup_attempts: polling::BACKEND_LOOKUP_ATTEMPTS,
            backend_lookup_interval_ms: polling::BACKEND_LOOKUP_INTERVAL.as_millis() as u64,
            replication_attempts: polling::REPLICATION_ATTEMPTS,
            replication_interval_ms: polling::REPLICATION_INTERVAL.as_millis() as u64,
        }
    }
}

impl PollingConfig {
    pub fn backend_lookup(&self) -> PollConfig {
        PollConfig::new(
            self.backend_lookup_attempts,
            Duration::from_millis(self.backend_lookup_interval_ms),
        )
    }

    pub fn replication(&self) -> PollConfig {
        PollConfig::new(
            self.replication_attempts,
            Duration::from_millis(self.replication_interval_ms),
        )
    }
}

impl Config {
    pub fn from_file(path: &str) -> std::io::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        toml::from_str(&contents)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_protocol_budgets() {
        let config = Config::default();
        assert_eq!(config.polling.backend_lookup().max_attempts, 10);
        assert_eq!(
            config.polling.backend_lookup().interval,
            Duration::from_secs(2)
        );
        assert_eq!(config.polling.replication().max_attempts, 144);
        assert_eq!(
            config.polling.replication().interval,
            Duration::from_secs(5)
        );
    }

    #[test]
    fn parses_partial_overrides_from_toml() {
        let toml_text = r#"
            [msp]
            base_url = "https://deo-dh-backend.testnet.example/"

            [ledger]
            rpc_url = "wss://services.testnet.example/"
            verify_tls = true

            [polling]
            backend_lookup_attempts = 5
            backend_lookup_interval_ms = 500
            replication_attempts = 20
            replication_interval_ms = 1000
        "#;
        let config: Config = toml::from_str(toml_text).unwrap();
        assert_eq!(config.msp.base_url, "https://deo-dh-backend.testnet.example/");
        assert_eq!(config.polling.backend_lookup().max_attempts, 5);
        assert_eq!(config.ledger.timeout_secs, None);
    }
}
