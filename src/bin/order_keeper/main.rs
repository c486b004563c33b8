//! Order keeper daemon.
//!
//! Long-running process that keeps the local order ledger honest: it
//! periodically reconciles every open entry against the order book (fills,
//! remote cancellations, local expiry) and can watch one index feed for
//! context while orders wait on it.

mod config;
mod error;
mod keeper;

use std::{process::exit, time::Duration};

use alloy::signers::local::PrivateKeySigner;
use clap::Parser;
use tracing::error;
use trigger_order_sdk::Chain;
use url::Url;

use config::{CliConfig, EnvConfig};
use keeper::OrderKeeper;

#[tokio::main]
async fn main() {
    // Load .env file
    if let Err(e) = dotenvy::dotenv() {
        eprintln!("Warning: Failed to load .env file: {}", e);
    }

    // Parse environment configuration
    let env_config = match EnvConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to parse environment configuration: {}", e);
            exit(1);
        }
    };

    // Parse CLI arguments
    let cli_config = CliConfig::parse();

    let keeper_config = match cli_config.to_keeper_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {}", e);
            exit(1);
        }
    };

    // Set up logging
    if std::env::var("RUST_LOG").is_err() {
        unsafe {
            std::env::set_var("RUST_LOG", "info");
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Parse addresses
    let index_oracle = match env_config.index_oracle_address() {
        Ok(addr) => addr,
        Err(e) => {
            eprintln!("Invalid index oracle address: {}", e);
            exit(1);
        }
    };

    let order_protocol = match env_config.order_protocol_address() {
        Ok(addr) => addr,
        Err(e) => {
            eprintln!("Invalid order protocol address: {}", e);
            exit(1);
        }
    };

    // Parse private key
    let private_key: PrivateKeySigner = match env_config.private_key.parse() {
        Ok(key) => key,
        Err(e) => {
            eprintln!("Invalid private key: {}", e);
            exit(1);
        }
    };

    // Parse URLs
    let node_url = match Url::parse(&env_config.node_rpc_url) {
        Ok(url) => url,
        Err(e) => {
            eprintln!("Invalid RPC URL: {}", e);
            exit(1);
        }
    };

    let api_url = match Url::parse(&env_config.order_api_url) {
        Ok(url) => url,
        Err(e) => {
            eprintln!("Invalid order API URL: {}", e);
            exit(1);
        }
    };

    // Create chain configuration
    let chain = Chain::custom(env_config.chain_id, index_oracle, order_protocol);

    // Default timeout is 30 seconds
    let timeout = Duration::from_secs(env_config.timeout_seconds.unwrap_or(30));

    // Create and run the keeper
    let keeper = match OrderKeeper::try_new(
        node_url,
        api_url,
        private_key,
        chain,
        env_config.ledger_path(),
        timeout,
        keeper_config,
    ) {
        Ok(keeper) => keeper,
        Err(e) => {
            eprintln!("Failed to create order keeper: {}", e);
            exit(1);
        }
    };

    if let Err(e) = keeper.run().await {
        error!(%e, "Order keeper encountered an error, shutting down");
        exit(1);
    }
}
