//! Order lifecycle: build, sign, submit, cancel, reconcile.
//!
//! [`OrderService`] glues the chain adapters to the off-chain order book and
//! the persistent [`OrderLedger`]. Creating an order resolves token metadata,
//! converts the human amounts, encodes the index predicate, signs the result
//! under the protocol's EIP-712 domain, records it locally as `pending`, and
//! only then submits it, so a submission lost to the network still leaves a
//! durable record. Fills and remote cancellations are picked up later by
//! [`OrderService::reconcile`].

mod api;

pub use api::{
    ApiError, HttpOrderApi, OrderApi, OrderData, OrderRecord, SignedOrderPayload, SubmitReceipt,
};

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use alloy::{
    primitives::{Address, B256, TxHash, U256},
    providers::Provider,
};
use rand::Rng;
use tracing::{info, warn};

use crate::{
    abi::protocol::{
        IOrderProtocol::{self, IOrderProtocolInstance},
        LimitOrder,
    },
    cache::TtlCache,
    error::{ChainError, OrderError},
    ledger::OrderLedger,
    num::{self, AmountError},
    predicate,
    retry::{self, RetryPolicy},
    token::TokenClient,
    types::{LimitOrderData, OrderKind, OrderRequest, OrderStatus, SavedOrder, TokenAmount, TokenInfo},
    wallet::Wallet,
};

/// Receipt polls after a cancel transaction before giving up.
pub const CONFIRM_ATTEMPTS: u32 = 30;

/// Pause between receipt polls.
pub const CONFIRM_INTERVAL: Duration = Duration::from_secs(10);

/// What a cancel actually did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CancelOutcome {
    /// The book no longer tracks the order. It was marked cancelled locally
    /// and no transaction was sent.
    NotLive,
    /// On-chain cancellation confirmed.
    Confirmed { tx_hash: TxHash },
}

/// Counts from one [`OrderService::reconcile`] sweep.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReconcileSummary {
    /// Non-terminal ledger entries examined.
    pub scanned: usize,
    /// Entries advanced to the book's status.
    pub updated: usize,
    /// Entries expired by their local deadline.
    pub expired: usize,
}

/// Creates, submits, cancels, and reconciles conditional orders.
///
/// Every collaborator is injected: construct one service per wallet and
/// chain, nothing in here is global. The remote order listing is cached; all
/// other reads and every write go straight through.
pub struct OrderService<P, A> {
    protocol: IOrderProtocolInstance<P>,
    provider: P,
    wallet: Wallet,
    api: A,
    ledger: OrderLedger,
    retry: RetryPolicy,
    remote_orders: TtlCache<Address, Vec<OrderRecord>>,
}

impl<P, A> OrderService<P, A>
where
    P: Provider + Clone,
    A: OrderApi + Clone + Send + 'static,
{
    pub fn new(provider: P, wallet: Wallet, api: A, ledger: OrderLedger) -> Self {
        Self {
            protocol: IOrderProtocol::new(wallet.chain().order_protocol(), provider.clone()),
            provider,
            wallet,
            api,
            ledger,
            retry: RetryPolicy::default(),
            remote_orders: TtlCache::default(),
        }
    }

    /// Replaces the submission retry policy (defaults to 3 retries, 1s base).
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn wallet(&self) -> &Wallet {
        &self.wallet
    }

    pub fn ledger(&self) -> &OrderLedger {
        &self.ledger
    }

    /// Builds, signs, records, and submits the order described by `request`.
    ///
    /// Both tokens' metadata is resolved from the chain and the protocol's
    /// allowance is topped up when short. The ledger entry is written as
    /// `pending` before the book sees the order; acceptance flips it to
    /// `submitted`. When submission fails after the retry budget the
    /// `pending` entry stays behind as the local record of the attempt.
    pub async fn create(&self, request: &OrderRequest) -> Result<SavedOrder, OrderError> {
        let from = TokenClient::new(request.from_token(), self.provider.clone());
        let to = TokenClient::new(request.to_token(), self.provider.clone());
        let (from_info, to_info) = futures::try_join!(from.metadata(), to.metadata())?;

        let making_amount = num::to_base_units(request.from_amount(), from_info.decimals)?;
        let spender = self.wallet.chain().order_protocol();
        from.ensure_allowance(self.wallet.address(), spender, making_amount)
            .await?;

        self.create_with_tokens(request, from_info, to_info).await
    }

    /// Same lifecycle as [`Self::create`] for callers that already hold both
    /// tokens' metadata and manage the protocol allowance themselves. Does
    /// not touch the chain.
    pub async fn create_with_tokens(
        &self,
        request: &OrderRequest,
        from_info: TokenInfo,
        to_info: TokenInfo,
    ) -> Result<SavedOrder, OrderError> {
        let making_amount = num::to_base_units(request.from_amount(), from_info.decimals)?;
        let taking_amount = num::to_base_units(request.to_amount(), to_info.decimals)?;
        if making_amount.is_zero() || taking_amount.is_zero() {
            return Err(AmountError::Zero.into());
        }

        let condition = request.condition();
        let now = unix_now();
        let valid_until = request.expiry_seconds().map(|secs| now + secs);
        let order = LimitOrder {
            salt: U256::from(rand::thread_rng().r#gen::<u64>()),
            maker: self.wallet.address(),
            receiver: self.wallet.address(),
            makerAsset: request.from_token(),
            takerAsset: request.to_token(),
            makingAmount: making_amount,
            takingAmount: taking_amount,
            expiry: U256::from(valid_until.unwrap_or(0)),
            predicate: predicate::encode(self.wallet.chain().index_oracle(), &condition),
        };

        let order_hash = self.wallet.order_hash(&order);
        let signature = self.wallet.sign_order(&order)?;

        let from_amount = TokenAmount::from_units(making_amount, from_info.decimals);
        let to_amount = TokenAmount::from_units(taking_amount, to_info.decimals);
        let mut saved = SavedOrder {
            order_hash,
            kind: OrderKind::Limit,
            timestamp: now,
            status: OrderStatus::Pending,
            description: request.description().to_string(),
            from_token: from_info,
            to_token: to_info,
            from_amount,
            to_amount,
            wallet_address: self.wallet.address(),
            chain_id: self.wallet.chain().chain_id(),
            valid_until,
            limit_order_data: Some(LimitOrderData {
                maker: order.maker,
                receiver: order.receiver,
                maker_asset: order.makerAsset,
                taker_asset: order.takerAsset,
                making_amount: order.makingAmount,
                taking_amount: order.takingAmount,
                salt: order.salt,
            }),
        };
        self.ledger.upsert(saved.clone()).await?;
        info!(%order_hash, condition = %condition, "order signed and recorded");

        let payload = SignedOrderPayload {
            order_hash,
            chain_id: self.wallet.chain().chain_id(),
            order: OrderData::from(&order),
            signature: signature.as_bytes().to_vec().into(),
        };
        let receipt = retry::with_backoff(self.retry, retry::transient, tokio::time::sleep, || {
            self.api.submit(&payload)
        })
        .await?;

        self.ledger
            .set_status(order_hash, OrderStatus::Submitted)
            .await?;
        saved.status = OrderStatus::Submitted;
        self.remote_orders.invalidate(&self.wallet.address());
        info!(%order_hash, status = %receipt.status, "order accepted by the book");
        Ok(saved)
    }

    /// Cancels an order, on-chain when the book still tracks it.
    ///
    /// The book is consulted first (with retries): an order it does not know
    /// is already dead, so it is only marked cancelled locally and no
    /// transaction is sent. An order made by a different wallet is refused
    /// before any transaction. Otherwise `cancelOrder` goes out and the
    /// receipt is polled for up to
    /// `CONFIRM_ATTEMPTS * CONFIRM_INTERVAL` (5 minutes); a receipt that
    /// arrives reverted is an error and leaves the ledger untouched.
    pub async fn cancel(&self, order_hash: B256) -> Result<CancelOutcome, OrderError> {
        let record = retry::with_backoff(self.retry, retry::transient, tokio::time::sleep, || {
            self.api.fetch(order_hash)
        })
        .await?;

        let Some(record) = record else {
            self.ledger
                .set_status(order_hash, OrderStatus::Cancelled)
                .await?;
            self.remote_orders.invalidate(&self.wallet.address());
            info!(%order_hash, "order unknown to the book, cancelled locally");
            return Ok(CancelOutcome::NotLive);
        };

        if record.maker != self.wallet.address() {
            return Err(OrderError::Unauthorized {
                order_hash,
                wallet: self.wallet.address(),
            });
        }

        let pending = self
            .protocol
            .cancelOrder(order_hash)
            .send()
            .await
            .map_err(ChainError::from)?;
        let tx_hash = *pending.tx_hash();
        info!(%order_hash, %tx_hash, "cancel transaction sent");

        for _ in 0..CONFIRM_ATTEMPTS {
            tokio::time::sleep(CONFIRM_INTERVAL).await;
            match self.provider.get_transaction_receipt(tx_hash).await {
                Ok(Some(receipt)) => {
                    if !receipt.status() {
                        return Err(ChainError::reverted_in_receipt().into());
                    }
                    self.ledger
                        .set_status(order_hash, OrderStatus::Cancelled)
                        .await?;
                    self.remote_orders.invalidate(&self.wallet.address());
                    info!(%order_hash, %tx_hash, "cancel confirmed");
                    return Ok(CancelOutcome::Confirmed { tx_hash });
                }
                Ok(None) => {}
                Err(err) => warn!(%err, %tx_hash, "receipt poll failed"),
            }
        }
        Err(OrderError::ConfirmationTimeout(tx_hash))
    }

    /// Orders the book currently tracks for this wallet, served through the
    /// TTL cache. Book failures are absorbed into the last listing (or an
    /// empty one), so this never fails.
    pub async fn open_orders(&self) -> Vec<OrderRecord> {
        let maker = self.wallet.address();
        let api = self.api.clone();
        self.remote_orders
            .get_with(maker, move || async move { api.list_by_maker(maker).await })
            .await
    }

    /// The local ledger entry for `order_hash`.
    pub async fn tracked(&self, order_hash: B256) -> Result<SavedOrder, OrderError> {
        self.ledger
            .get(order_hash)
            .await
            .ok_or(OrderError::NotInLedger(order_hash))
    }

    /// One ledger-vs-book sweep: expires entries past their deadline, then
    /// pulls the book's view of the rest and applies recognized forward
    /// transitions. Terminal entries are never touched and never resurrected;
    /// a failed lookup is retried on the next sweep.
    pub async fn reconcile(&self) -> Result<ReconcileSummary, OrderError> {
        let now = unix_now();
        let mut summary = ReconcileSummary::default();

        for entry in self.ledger.load().await {
            if entry.status.is_terminal() {
                continue;
            }
            summary.scanned += 1;

            if let Some(deadline) = entry.valid_until
                && deadline <= now
            {
                self.ledger
                    .set_status(entry.order_hash, OrderStatus::Expired)
                    .await?;
                summary.expired += 1;
                info!(order_hash = %entry.order_hash, "order past its deadline, expired");
                continue;
            }

            let record = match self.api.fetch(entry.order_hash).await {
                Ok(record) => record,
                Err(err) => {
                    warn!(order_hash = %entry.order_hash, %err, "book lookup failed");
                    continue;
                }
            };
            let Some(record) = record else {
                continue;
            };
            let Ok(remote) = record.status.parse::<OrderStatus>() else {
                warn!(
                    order_hash = %entry.order_hash,
                    status = %record.status,
                    "unrecognized book status"
                );
                continue;
            };

            let forward = remote.is_terminal()
                || (remote == OrderStatus::Active
                    && matches!(entry.status, OrderStatus::Pending | OrderStatus::Submitted));
            if forward && remote != entry.status {
                self.ledger.set_status(entry.order_hash, remote).await?;
                summary.updated += 1;
                info!(
                    order_hash = %entry.order_hash,
                    from = %entry.status,
                    to = %remote,
                    "order status advanced"
                );
            }
        }

        Ok(summary)
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or_default()
}
