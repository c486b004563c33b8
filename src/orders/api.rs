use alloy::primitives::{Address, B256, Bytes, U256};
use reqwest::{Client, StatusCode, Url};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::abi::protocol::LimitOrder;

/// Failure talking to the order book service.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("network error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("order book returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("undecodable order book response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Protocol order fields in their JSON wire shape.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderData {
    pub salt: U256,
    pub maker: Address,
    pub receiver: Address,
    pub maker_asset: Address,
    pub taker_asset: Address,
    pub making_amount: U256,
    pub taking_amount: U256,
    pub expiry: U256,
    pub predicate: Bytes,
}

impl From<&LimitOrder> for OrderData {
    fn from(order: &LimitOrder) -> Self {
        Self {
            salt: order.salt,
            maker: order.maker,
            receiver: order.receiver,
            maker_asset: order.makerAsset,
            taker_asset: order.takerAsset,
            making_amount: order.makingAmount,
            taking_amount: order.takingAmount,
            expiry: order.expiry,
            predicate: order.predicate.clone(),
        }
    }
}

/// Submission body: the order, its EIP-712 hash, and the maker signature.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedOrderPayload {
    pub order_hash: B256,
    pub chain_id: u64,
    pub order: OrderData,
    /// Compact 65-byte maker signature.
    pub signature: Bytes,
}

/// Acknowledgement returned by the order book on submission.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitReceipt {
    pub order_hash: B256,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// One order row as the book reports it.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRecord {
    pub order_hash: B256,
    pub maker: Address,
    /// Book-side lifecycle word, mapped onto [`crate::types::OrderStatus`]
    /// where recognized.
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remaining_making_amount: Option<U256>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<u64>,
}

/// Boundary to the off-chain order book.
///
/// [`HttpOrderApi`] talks to the real service; [`crate::testing::MockOrderApi`]
/// replaces it in tests. Methods return `impl Future + Send` so callers can
/// route them through shared caches and retry loops.
pub trait OrderApi {
    /// Submits a signed order for matching.
    fn submit(
        &self,
        payload: &SignedOrderPayload,
    ) -> impl Future<Output = Result<SubmitReceipt, ApiError>> + Send;

    /// Looks one order up by hash. `None` when the book does not know it.
    fn fetch(
        &self,
        order_hash: B256,
    ) -> impl Future<Output = Result<Option<OrderRecord>, ApiError>> + Send;

    /// All orders the book tracks for `maker`.
    fn list_by_maker(
        &self,
        maker: Address,
    ) -> impl Future<Output = Result<Vec<OrderRecord>, ApiError>> + Send;
}

/// [`OrderApi`] over the book's REST endpoints.
#[derive(Clone, Debug)]
pub struct HttpOrderApi {
    client: Client,
    base: Url,
}

impl HttpOrderApi {
    pub fn new(base: Url) -> Self {
        Self::with_client(Client::new(), base)
    }

    /// Uses a preconfigured client (timeouts, proxies, connection pools).
    pub fn with_client(client: Client, base: Url) -> Self {
        Self { client, base }
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base.as_str().trim_end_matches('/'))
    }
}

impl OrderApi for HttpOrderApi {
    async fn submit(&self, payload: &SignedOrderPayload) -> Result<SubmitReceipt, ApiError> {
        debug!(order_hash = %payload.order_hash, "submitting order to the book");
        let resp = self
            .client
            .post(self.endpoint("/v1/orders"))
            .json(payload)
            .send()
            .await?;
        decode_body(resp).await
    }

    async fn fetch(&self, order_hash: B256) -> Result<Option<OrderRecord>, ApiError> {
        let resp = self
            .client
            .get(self.endpoint(&format!("/v1/orders/{order_hash:#x}")))
            .send()
            .await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        decode_body(resp).await.map(Some)
    }

    async fn list_by_maker(&self, maker: Address) -> Result<Vec<OrderRecord>, ApiError> {
        let resp = self
            .client
            .get(self.endpoint("/v1/orders"))
            .query(&[("maker", format!("{maker:#x}"))])
            .send()
            .await?;
        decode_body(resp).await
    }
}

/// Reads the body as text first so a failed decode can report what the
/// service actually sent.
async fn decode_body<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, ApiError> {
    let status = resp.status();
    let body = resp.text().await?;
    if !status.is_success() {
        return Err(ApiError::Status {
            status: status.as_u16(),
            body,
        });
    }
    Ok(serde_json::from_str(&body)?)
}
