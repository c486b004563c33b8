//! Index watch binary - streams an index feed on testnet and prints every
//! published point, optionally checking it against thresholds.

use std::time::Duration;

use alloy::{
    primitives::{Address, U256},
    providers::ProviderBuilder,
    rpc::client::RpcClient,
    transports::layers::RetryBackoffLayer,
};
use clap::Parser;
use futures::StreamExt;
use trigger_order_sdk::{Chain, stream, types::IndexId};

#[derive(Parser, Debug)]
#[command(name = "index_watch")]
#[command(about = "Stream an index feed's published values and check thresholds")]
struct Args {
    /// RPC URL to connect to
    #[arg(short, long)]
    rpc_url: String,

    /// Index feed ID to watch
    #[arg(short, long)]
    index: IndexId,

    /// Index oracle address (defaults to the testnet deployment)
    #[arg(long)]
    oracle: Option<Address>,

    /// Poll interval in milliseconds
    #[arg(short, long, default_value = "5000")]
    poll_interval: u64,

    /// Report whether each value is above this threshold
    #[arg(long)]
    above: Option<U256>,

    /// Report whether each value is below this threshold
    #[arg(long)]
    below: Option<U256>,
}

fn threshold_note(label: &str, threshold: U256, met: bool) -> String {
    format!(
        " | {} {}: {}",
        label,
        threshold,
        if met { "MET" } else { "unmet" }
    )
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // The oracle override keeps the testnet chain ID and protocol address;
    // only the oracle matters for a read-only watch.
    let mut chain = Chain::testnet();
    if let Some(oracle) = args.oracle {
        chain = Chain::custom(chain.chain_id(), oracle, chain.order_protocol());
    }

    println!("Connecting to {} ...", args.rpc_url);

    // Build RPC client with retry layer
    let client = RpcClient::builder()
        .layer(RetryBackoffLayer::new(10, 100, 200))
        .connect(&args.rpc_url)
        .await?;
    client.set_poll_interval(Duration::from_millis(args.poll_interval));
    let provider = ProviderBuilder::new().connect_client(client);

    println!(
        "Watching index #{} on oracle {} (poll every {} ms, Ctrl+C to stop)",
        args.index,
        chain.index_oracle(),
        args.poll_interval
    );

    let mut points = Box::pin(stream::values(
        &chain,
        provider,
        args.index,
        Duration::from_millis(args.poll_interval),
        tokio::time::sleep,
    ));

    while let Some(result) = points.next().await {
        match result {
            Ok(point) => {
                let mut line = format!(
                    "[ts {}] index #{} = {}",
                    point.timestamp(),
                    args.index,
                    point.value()
                );
                if let Some(above) = args.above {
                    line.push_str(&threshold_note("above", above, point.value() > above));
                }
                if let Some(below) = args.below {
                    line.push_str(&threshold_note("below", below, point.value() < below));
                }
                println!("{line}");
            }
            Err(e) => {
                eprintln!("Error reading index: {:?}", e);
            }
        }
    }

    Ok(())
}
