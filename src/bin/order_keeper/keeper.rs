//! Keeper orchestration and main loop.
//!
//! The keeper owns one [`OrderService`] and runs an endless loop: every
//! reconcile interval it sweeps the ledger against the order book, and when
//! an index feed is being watched it logs every published point alongside
//! the orders still waiting on it.

use std::{path::PathBuf, pin::pin, time::Duration};

use alloy::{
    network::EthereumWallet,
    providers::{DynProvider, ProviderBuilder},
    rpc::client::RpcClient,
    signers::local::PrivateKeySigner,
};
use futures::StreamExt;
use tracing::{debug, error, info, warn};
use trigger_order_sdk::{
    Chain,
    ledger::OrderLedger,
    orders::{HttpOrderApi, OrderService},
    stream,
    types::{IndexId, IndexPoint},
    wallet::Wallet,
};
use url::Url;

use crate::{
    config::KeeperConfig,
    error::{Error, Result},
};

/// Order keeper: periodic ledger reconciliation plus an optional index watch.
pub struct OrderKeeper {
    service: OrderService<DynProvider, HttpOrderApi>,
    provider: DynProvider,
    chain: Chain,
    config: KeeperConfig,
}

impl OrderKeeper {
    /// Create a new order keeper.
    pub fn try_new(
        node_url: Url,
        api_url: Url,
        private_key: PrivateKeySigner,
        chain: Chain,
        ledger_path: PathBuf,
        timeout: Duration,
        config: KeeperConfig,
    ) -> Result<Self> {
        let wallet_address = private_key.address();
        info!(
            %wallet_address,
            ledger_path = %ledger_path.display(),
            reconcile_interval = ?config.reconcile_interval,
            watch_index = ?config.watch_index,
            "Initializing order keeper"
        );

        let rpc_client = RpcClient::new_http(node_url);
        let provider = DynProvider::new(
            ProviderBuilder::new()
                .wallet(EthereumWallet::new(private_key.clone()))
                .connect_client(rpc_client),
        );

        let http = reqwest::Client::builder().timeout(timeout).build()?;
        let api = HttpOrderApi::with_client(http, api_url);
        let wallet = Wallet::new(private_key, chain.clone());
        let ledger = OrderLedger::new(ledger_path);
        let service = OrderService::new(provider.clone(), wallet, api, ledger);

        Ok(Self {
            service,
            provider,
            chain,
            config,
        })
    }

    /// Run the keeper's main loop.
    pub async fn run(&self) -> Result<()> {
        match self.config.watch_index {
            Some(index_id) => self.reconcile_and_watch(index_id).await,
            None => self.reconcile_forever().await,
        }
    }

    async fn reconcile_forever(&self) -> Result<()> {
        let mut interval = tokio::time::interval(self.config.reconcile_interval);
        loop {
            interval.tick().await;
            self.reconcile_once().await;
        }
    }

    async fn reconcile_and_watch(&self, index_id: IndexId) -> Result<()> {
        let mut interval = tokio::time::interval(self.config.reconcile_interval);
        let mut points = pin!(stream::values(
            &self.chain,
            self.provider.clone(),
            index_id,
            self.config.poll_interval,
            tokio::time::sleep,
        ));

        loop {
            tokio::select! {
                point = points.next() => {
                    let Some(point) = point else {
                        error!("Index stream closed unexpectedly");
                        return Err(Error::StreamClosed);
                    };

                    match point {
                        Ok(point) => self.report_point(index_id, point).await,
                        Err(err) => warn!(%err, index_id, "Index read failed, stream will retry"),
                    }
                }
                _ = interval.tick() => {
                    self.reconcile_once().await;
                }
            }
        }
    }

    /// One ledger-vs-book sweep. Failures are logged and retried on the
    /// next tick; the keeper never dies over a bad sweep.
    async fn reconcile_once(&self) {
        match self.service.reconcile().await {
            Ok(summary) => info!(
                scanned = summary.scanned,
                updated = summary.updated,
                expired = summary.expired,
                "Reconcile sweep finished"
            ),
            Err(err) => error!(%err, "Reconcile sweep failed"),
        }
    }

    /// Logs a published point together with the orders still waiting in the
    /// ledger, so operators can eyeball how close the feed is to triggering
    /// them.
    async fn report_point(&self, index_id: IndexId, point: IndexPoint) {
        let entries = self.service.ledger().load().await;
        let waiting: Vec<_> = entries
            .iter()
            .filter(|entry| !entry.status.is_terminal())
            .collect();

        info!(
            index_id,
            value = %point.value(),
            timestamp = point.timestamp(),
            open_orders = waiting.len(),
            "Index point published"
        );

        for entry in waiting {
            debug!(
                order_hash = %entry.order_hash,
                status = %entry.status,
                description = %entry.description,
                "Waiting order"
            );
        }
    }
}
