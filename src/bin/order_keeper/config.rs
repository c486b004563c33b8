//! Configuration for the order keeper.
//!
//! Configuration comes from two sources:
//! - Environment variables (via .env file or shell): connection details, keys
//! - CLI arguments: keeper behavior

use std::{path::PathBuf, time::Duration};

use alloy::primitives::Address;
use clap::Parser;
use trigger_order_sdk::types::IndexId;

/// Environment configuration (connection details, credentials).
#[derive(Debug, serde::Deserialize)]
pub struct EnvConfig {
    /// Chain ID (e.g., 10143 for Monad testnet)
    pub chain_id: u64,

    /// Index oracle contract address
    pub index_oracle_address: String,

    /// Order protocol contract address
    pub order_protocol_address: String,

    /// Private key for signing transactions
    pub private_key: String,

    /// RPC URL for the node
    pub node_rpc_url: String,

    /// Base URL of the order book API
    pub order_api_url: String,

    /// Path of the order ledger file (default: orders.json)
    pub ledger_path: Option<PathBuf>,

    /// Optional timeout for order book calls (default: 30s)
    pub timeout_seconds: Option<u64>,
}

impl EnvConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, envy::Error> {
        envy::from_env()
    }

    /// Parse the index oracle address.
    pub fn index_oracle_address(&self) -> Result<Address, alloy::primitives::hex::FromHexError> {
        self.index_oracle_address.parse()
    }

    /// Parse the order protocol address.
    pub fn order_protocol_address(&self) -> Result<Address, alloy::primitives::hex::FromHexError> {
        self.order_protocol_address.parse()
    }

    /// Ledger file path, defaulting next to the working directory.
    pub fn ledger_path(&self) -> PathBuf {
        self.ledger_path
            .clone()
            .unwrap_or_else(|| PathBuf::from("orders.json"))
    }
}

/// CLI arguments for keeper behavior.
#[derive(Debug, Parser)]
#[command(name = "order-keeper")]
#[command(about = "Keeps the local order ledger in sync with the order book")]
pub struct CliConfig {
    /// Seconds between ledger reconcile sweeps
    #[arg(long, default_value_t = 60)]
    pub reconcile_interval: u64,

    /// Index feed to watch between sweeps (logs every published point)
    #[arg(long)]
    pub watch_index: Option<IndexId>,

    /// Poll interval of the watched index feed, milliseconds
    #[arg(long, default_value_t = 5000)]
    pub poll_interval_ms: u64,
}

impl CliConfig {
    /// Validate and convert to the keeper's runtime config.
    pub fn to_keeper_config(&self) -> Result<KeeperConfig, ConfigError> {
        if self.reconcile_interval == 0 {
            return Err(ConfigError::ZeroReconcileInterval);
        }

        if self.poll_interval_ms == 0 {
            return Err(ConfigError::ZeroPollInterval);
        }

        Ok(KeeperConfig {
            reconcile_interval: Duration::from_secs(self.reconcile_interval),
            watch_index: self.watch_index,
            poll_interval: Duration::from_millis(self.poll_interval_ms),
        })
    }
}

/// Validated keeper behavior.
#[derive(Clone, Copy, Debug)]
pub struct KeeperConfig {
    pub reconcile_interval: Duration,
    pub watch_index: Option<IndexId>,
    pub poll_interval: Duration,
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("reconcile-interval must be greater than zero")]
    ZeroReconcileInterval,

    #[error("poll-interval-ms must be greater than zero")]
    ZeroPollInterval,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_config_to_keeper_config() {
        let cli = CliConfig {
            reconcile_interval: 30,
            watch_index: Some(2),
            poll_interval_ms: 1000,
        };

        let config = cli.to_keeper_config().unwrap();
        assert_eq!(config.reconcile_interval, Duration::from_secs(30));
        assert_eq!(config.watch_index, Some(2));
        assert_eq!(config.poll_interval, Duration::from_millis(1000));
    }

    #[test]
    fn test_zero_reconcile_interval() {
        let cli = CliConfig {
            reconcile_interval: 0,
            watch_index: None,
            poll_interval_ms: 1000,
        };

        assert!(matches!(
            cli.to_keeper_config(),
            Err(ConfigError::ZeroReconcileInterval)
        ));
    }

    #[test]
    fn test_zero_poll_interval() {
        let cli = CliConfig {
            reconcile_interval: 60,
            watch_index: None,
            poll_interval_ms: 0,
        };

        assert!(matches!(
            cli.to_keeper_config(),
            Err(ConfigError::ZeroPollInterval)
        ));
    }
}
