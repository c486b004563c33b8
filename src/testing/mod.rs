//! Offline test fixtures and doubles.
//!
//! [`MockOrderApi`] is an in-memory stand-in for the order book: it counts
//! every call, serves whatever records were planted into it, and can be
//! flipped into a rejecting mode to exercise retry handling.
//!
//! [`offline_provider`] builds a provider pointed at a local port nothing
//! listens on, for code paths that must fail fast instead of reaching a
//! chain. [`SavedOrderBuilder`] produces ledger entries with controlled
//! values for ledger and reconciliation tests.

use std::{
    path::PathBuf,
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicU32, Ordering},
    },
};

use alloy::{
    primitives::{Address, B256, U256},
    providers::{Provider, ProviderBuilder},
    rpc::client::RpcClient,
    signers::local::PrivateKeySigner,
};
use dashmap::DashMap;
use rand::Rng;

use crate::{
    Chain,
    orders::{ApiError, OrderApi, OrderRecord, SignedOrderPayload, SubmitReceipt},
    types::{OrderKind, OrderStatus, SavedOrder, TokenAmount, TokenInfo},
    wallet::Wallet,
};

/// In-memory order book double.
///
/// Clones share state, so a test can keep one handle for assertions while
/// the service under test owns another.
#[derive(Clone, Debug, Default)]
pub struct MockOrderApi {
    inner: Arc<MockInner>,
}

#[derive(Debug, Default)]
struct MockInner {
    records: DashMap<B256, OrderRecord>,
    submits: AtomicU32,
    fetches: AtomicU32,
    listings: AtomicU32,
    reject_submits: AtomicBool,
}

impl MockOrderApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Plants a record as if the book already tracked it.
    pub fn insert(&self, record: OrderRecord) {
        self.inner.records.insert(record.order_hash, record);
    }

    /// Drops a record, as if the book had purged the order.
    pub fn remove(&self, order_hash: B256) {
        self.inner.records.remove(&order_hash);
    }

    /// While set, `submit` fails with a retryable 429.
    pub fn set_reject_submits(&self, reject: bool) {
        self.inner.reject_submits.store(reject, Ordering::SeqCst);
    }

    pub fn submit_calls(&self) -> u32 {
        self.inner.submits.load(Ordering::SeqCst)
    }

    pub fn fetch_calls(&self) -> u32 {
        self.inner.fetches.load(Ordering::SeqCst)
    }

    pub fn list_calls(&self) -> u32 {
        self.inner.listings.load(Ordering::SeqCst)
    }
}

impl OrderApi for MockOrderApi {
    async fn submit(&self, payload: &SignedOrderPayload) -> Result<SubmitReceipt, ApiError> {
        self.inner.submits.fetch_add(1, Ordering::SeqCst);
        if self.inner.reject_submits.load(Ordering::SeqCst) {
            return Err(ApiError::Status {
                status: 429,
                body: "rate limit exceeded".to_string(),
            });
        }
        self.inner.records.insert(
            payload.order_hash,
            OrderRecord {
                order_hash: payload.order_hash,
                maker: payload.order.maker,
                status: "active".to_string(),
                remaining_making_amount: Some(payload.order.making_amount),
                created_at: None,
            },
        );
        Ok(SubmitReceipt {
            order_hash: payload.order_hash,
            status: "accepted".to_string(),
            message: None,
        })
    }

    async fn fetch(&self, order_hash: B256) -> Result<Option<OrderRecord>, ApiError> {
        self.inner.fetches.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .inner
            .records
            .get(&order_hash)
            .map(|record| record.value().clone()))
    }

    async fn list_by_maker(&self, maker: Address) -> Result<Vec<OrderRecord>, ApiError> {
        self.inner.listings.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .inner
            .records
            .iter()
            .filter(|record| record.value().maker == maker)
            .map(|record| record.value().clone())
            .collect())
    }
}

/// Provider pointed at a closed local port. Every request fails fast
/// without leaving the machine.
pub fn offline_provider() -> impl Provider + Clone {
    let client = RpcClient::new_http("http://127.0.0.1:9".parse().unwrap());
    ProviderBuilder::new().connect_client(client)
}

/// Wallet with a throwaway key on the testnet deployment.
pub fn test_wallet() -> Wallet {
    Wallet::new(PrivateKeySigner::random(), Chain::testnet())
}

/// Token metadata fixture. `seed` fills the address bytes.
pub fn token_info(symbol: &str, decimals: u8, seed: u8) -> TokenInfo {
    TokenInfo {
        address: Address::repeat_byte(seed),
        symbol: symbol.to_string(),
        name: format!("{symbol} Token"),
        decimals,
    }
}

/// Unique path for a throwaway JSON store under the system temp dir.
pub fn temp_store_path(tag: &str) -> PathBuf {
    let nonce: u64 = rand::thread_rng().r#gen();
    std::env::temp_dir().join(format!("{tag}_{nonce}.json"))
}

/// Builder for ledger entries with controlled values.
///
/// # Example
///
/// ```ignore
/// use trigger_order_sdk::testing::SavedOrderBuilder;
/// use trigger_order_sdk::types::OrderStatus;
///
/// let order = SavedOrderBuilder::new()
///     .timestamp(1_760_000_100)
///     .status(OrderStatus::Submitted)
///     .build();
/// ```
#[derive(Clone, Debug)]
pub struct SavedOrderBuilder {
    order_hash: B256,
    timestamp: u64,
    status: OrderStatus,
    description: String,
    wallet_address: Address,
    valid_until: Option<u64>,
}

impl Default for SavedOrderBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SavedOrderBuilder {
    /// Create a new builder with default values.
    pub fn new() -> Self {
        Self {
            order_hash: B256::repeat_byte(0x42),
            timestamp: 1_760_000_000,
            status: OrderStatus::Pending,
            description: "index #2 above 18000".to_string(),
            wallet_address: Address::repeat_byte(0x42),
            valid_until: None,
        }
    }

    /// Set the order hash.
    pub fn order_hash(mut self, order_hash: B256) -> Self {
        self.order_hash = order_hash;
        self
    }

    /// Set the creation time (unix seconds).
    pub fn timestamp(mut self, timestamp: u64) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Set the ledger status.
    pub fn status(mut self, status: OrderStatus) -> Self {
        self.status = status;
        self
    }

    /// Set the human-readable condition description.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the maker wallet address.
    pub fn wallet_address(mut self, wallet_address: Address) -> Self {
        self.wallet_address = wallet_address;
        self
    }

    /// Set the expiry deadline (unix seconds).
    pub fn valid_until(mut self, deadline: u64) -> Self {
        self.valid_until = Some(deadline);
        self
    }

    /// Build the entry with the configured values.
    pub fn build(self) -> SavedOrder {
        SavedOrder {
            order_hash: self.order_hash,
            kind: OrderKind::Limit,
            timestamp: self.timestamp,
            status: self.status,
            description: self.description,
            from_token: token_info("USDC", 6, 0x22),
            to_token: token_info("WETH", 18, 0x33),
            from_amount: TokenAmount::from_units(U256::from(100_000_000u64), 6),
            to_amount: TokenAmount::from_units(U256::from(30_000_000_000_000_000u64), 18),
            wallet_address: self.wallet_address,
            chain_id: Chain::testnet().chain_id(),
            valid_until: self.valid_until,
            limit_order_data: None,
        }
    }
}

#[cfg(test)]
mod mock_api_tests {
    use alloy::primitives::Bytes;

    use super::*;
    use crate::{orders::OrderData, retry};

    fn payload(maker: Address) -> SignedOrderPayload {
        SignedOrderPayload {
            order_hash: B256::repeat_byte(0x77),
            chain_id: Chain::testnet().chain_id(),
            order: OrderData {
                salt: U256::from(7u64),
                maker,
                receiver: maker,
                maker_asset: Address::repeat_byte(0x22),
                taker_asset: Address::repeat_byte(0x33),
                making_amount: U256::from(100_000_000u64),
                taking_amount: U256::from(30_000_000_000_000_000u64),
                expiry: U256::ZERO,
                predicate: Bytes::new(),
            },
            signature: Bytes::from(vec![0u8; 65]),
        }
    }

    #[tokio::test]
    async fn test_submit_plants_a_live_record() {
        let api = MockOrderApi::new();
        let maker = Address::repeat_byte(0x11);

        let receipt = api.submit(&payload(maker)).await.unwrap();
        assert_eq!(receipt.status, "accepted");
        assert_eq!(api.submit_calls(), 1);

        let record = api.fetch(B256::repeat_byte(0x77)).await.unwrap().unwrap();
        assert_eq!(record.maker, maker);
        assert_eq!(record.status, "active");
        assert_eq!(
            record.remaining_making_amount,
            Some(U256::from(100_000_000u64))
        );

        assert_eq!(api.list_by_maker(maker).await.unwrap().len(), 1);
        assert!(
            api.list_by_maker(Address::repeat_byte(0x99))
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn test_rejection_mode_is_a_transient_error() {
        let api = MockOrderApi::new();
        api.set_reject_submits(true);

        let err = api
            .submit(&payload(Address::repeat_byte(0x11)))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Status { status: 429, .. }));
        assert!(retry::transient(&err));

        api.set_reject_submits(false);
        assert!(api.submit(&payload(Address::repeat_byte(0x11))).await.is_ok());
        assert_eq!(api.submit_calls(), 2);
    }
}
