use std::{path::Path, time::Duration};

use alloy::{
    primitives::{Address, B256, U256},
    providers::DynProvider,
};
use tempfile::tempdir;
use tokio_test::assert_ok;
use trigger_order_sdk::{
    error::OrderError,
    ledger::OrderLedger,
    orders::{CancelOutcome, OrderApi, OrderRecord, OrderService},
    retry::RetryPolicy,
    testing::{self, MockOrderApi, SavedOrderBuilder},
    types::{Operator, OrderRequest, OrderStatus},
};

fn service(api: MockOrderApi, path: &Path) -> OrderService<DynProvider, MockOrderApi> {
    let provider = DynProvider::new(testing::offline_provider());
    OrderService::new(provider, testing::test_wallet(), api, OrderLedger::new(path))
}

fn request() -> OrderRequest {
    OrderRequest::new(
        2,
        Operator::Gt,
        U256::from(18000u64),
        "index #2 gt 18000",
        Address::repeat_byte(0x22),
        Address::repeat_byte(0x33),
        "0.1",
        "0.00003",
        Some(3600),
    )
}

fn remote_record(order_hash: B256, maker: Address, status: &str) -> OrderRecord {
    OrderRecord {
        order_hash,
        maker,
        status: status.to_string(),
        remaining_making_amount: None,
        created_at: None,
    }
}

/// Creating an order writes the ledger entry before submission and flips it
/// to submitted once the book accepts it.
#[tokio::test]
async fn test_create_records_pending_then_submitted() {
    let dir = tempdir().unwrap();
    let api = MockOrderApi::new();
    let service = service(api.clone(), &dir.path().join("orders.json"));

    let saved = service
        .create_with_tokens(
            &request(),
            testing::token_info("USDC", 6, 0x22),
            testing::token_info("WETH", 18, 0x33),
        )
        .await
        .unwrap();

    assert_eq!(saved.status, OrderStatus::Submitted);
    assert_eq!(saved.wallet_address, service.wallet().address());
    assert_eq!(saved.from_amount.raw, "100000");
    assert_eq!(saved.from_amount.formatted, "0.1");
    assert_eq!(saved.to_amount.raw, "30000000000000");
    assert_eq!(saved.to_amount.formatted, "0.00003");
    assert!(saved.valid_until.is_some());

    let stored = service.tracked(saved.order_hash).await.unwrap();
    assert_eq!(stored.status, OrderStatus::Submitted);
    let data = stored.limit_order_data.unwrap();
    assert_eq!(data.making_amount, U256::from(100_000u64));
    assert_eq!(data.maker, service.wallet().address());

    assert_eq!(api.submit_calls(), 1);
    let record = api.fetch(saved.order_hash).await.unwrap().unwrap();
    assert_eq!(record.maker, service.wallet().address());
}

/// An amount that converts to zero smallest units is rejected before
/// anything is signed, stored, or submitted.
#[tokio::test]
async fn test_create_rejects_zero_amounts() {
    let dir = tempdir().unwrap();
    let api = MockOrderApi::new();
    let service = service(api.clone(), &dir.path().join("orders.json"));

    let zero = OrderRequest::new(
        2,
        Operator::Gt,
        U256::from(18000u64),
        "index #2 gt 18000",
        Address::repeat_byte(0x22),
        Address::repeat_byte(0x33),
        "0.0000001",
        "0.03",
        None,
    );

    let err = service
        .create_with_tokens(
            &zero,
            testing::token_info("USDC", 6, 0x22),
            testing::token_info("WETH", 18, 0x33),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, OrderError::Amount(_)));
    assert!(service.ledger().load().await.is_empty());
    assert_eq!(api.submit_calls(), 0);
}

/// A submission that keeps getting rejected burns the whole retry budget,
/// then leaves the pending ledger entry behind as the record of the attempt.
#[tokio::test]
async fn test_failed_submission_leaves_pending_entry() {
    let dir = tempdir().unwrap();
    let api = MockOrderApi::new();
    api.set_reject_submits(true);
    let service =
        service(api.clone(), &dir.path().join("orders.json")).with_retry_policy(RetryPolicy {
            max_retries: 2,
            base_delay: Duration::from_millis(1),
        });

    let err = service
        .create_with_tokens(
            &request(),
            testing::token_info("USDC", 6, 0x22),
            testing::token_info("WETH", 18, 0x33),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, OrderError::Api(_)));
    assert_eq!(api.submit_calls(), 3);

    let entries = service.ledger().load().await;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].status, OrderStatus::Pending);
}

/// Cancelling an order the book no longer tracks marks it cancelled locally
/// without touching the chain.
#[tokio::test]
async fn test_cancel_unknown_to_book_skips_the_chain() {
    let dir = tempdir().unwrap();
    let api = MockOrderApi::new();
    let service = service(api.clone(), &dir.path().join("orders.json"));

    let order_hash = B256::repeat_byte(0x55);
    assert_ok!(
        service
            .ledger()
            .upsert(
                SavedOrderBuilder::new()
                    .order_hash(order_hash)
                    .status(OrderStatus::Submitted)
                    .build()
            )
            .await
    );

    let outcome = service.cancel(order_hash).await.unwrap();
    assert_eq!(outcome, CancelOutcome::NotLive);
    assert_eq!(api.fetch_calls(), 1);
    assert_eq!(
        service.tracked(order_hash).await.unwrap().status,
        OrderStatus::Cancelled
    );
}

/// Cancelling someone else's live order is refused before any transaction.
#[tokio::test]
async fn test_cancel_refuses_foreign_orders() {
    let dir = tempdir().unwrap();
    let api = MockOrderApi::new();
    let order_hash = B256::repeat_byte(0x66);
    api.insert(remote_record(order_hash, Address::repeat_byte(0xaa), "active"));
    let service = service(api.clone(), &dir.path().join("orders.json"));

    let err = service.cancel(order_hash).await.unwrap_err();
    assert!(matches!(err, OrderError::Unauthorized { .. }));
}

/// A live order owned by this wallet does go to the chain: with no node
/// reachable the chain error surfaces and the ledger entry is untouched.
#[tokio::test]
async fn test_cancel_own_live_order_requires_the_chain() {
    let dir = tempdir().unwrap();
    let api = MockOrderApi::new();
    let service = service(api.clone(), &dir.path().join("orders.json"));

    let order_hash = B256::repeat_byte(0x77);
    api.insert(remote_record(order_hash, service.wallet().address(), "active"));
    assert_ok!(
        service
            .ledger()
            .upsert(
                SavedOrderBuilder::new()
                    .order_hash(order_hash)
                    .status(OrderStatus::Submitted)
                    .build()
            )
            .await
    );

    let err = service.cancel(order_hash).await.unwrap_err();
    assert!(matches!(err, OrderError::Chain(_)));
    assert_eq!(
        service.tracked(order_hash).await.unwrap().status,
        OrderStatus::Submitted
    );
}

/// A burst of open-order reads costs one book call; the listing comes from
/// the cache until it is invalidated or expires.
#[tokio::test]
async fn test_open_orders_listing_is_cached() {
    let dir = tempdir().unwrap();
    let api = MockOrderApi::new();
    let service = service(api.clone(), &dir.path().join("orders.json"));
    api.insert(remote_record(
        B256::repeat_byte(0x01),
        service.wallet().address(),
        "active",
    ));

    assert_eq!(service.open_orders().await.len(), 1);
    assert_eq!(service.open_orders().await.len(), 1);
    assert_eq!(api.list_calls(), 1);
}

/// One reconcile sweep: remote terminal states and activations are applied,
/// local deadlines expire entries, terminal entries stay untouched, and
/// nothing ever moves backwards.
#[tokio::test]
async fn test_reconcile_applies_forward_transitions_only() {
    let dir = tempdir().unwrap();
    let api = MockOrderApi::new();
    let service = service(api.clone(), &dir.path().join("orders.json"));
    let maker = service.wallet().address();

    let filled = B256::repeat_byte(0x01);
    let activated = B256::repeat_byte(0x02);
    let stuck = B256::repeat_byte(0x03);
    let expired = B256::repeat_byte(0x04);
    let done = B256::repeat_byte(0x05);
    let unknown = B256::repeat_byte(0x06);

    let seed = [
        (filled, OrderStatus::Submitted, None),
        (activated, OrderStatus::Submitted, None),
        (stuck, OrderStatus::Active, None),
        (expired, OrderStatus::Pending, Some(1u64)),
        (done, OrderStatus::Cancelled, None),
        (unknown, OrderStatus::Submitted, None),
    ];
    for (n, (order_hash, status, deadline)) in seed.into_iter().enumerate() {
        let mut builder = SavedOrderBuilder::new()
            .order_hash(order_hash)
            .status(status)
            .timestamp(1_760_000_000 + n as u64);
        if let Some(deadline) = deadline {
            builder = builder.valid_until(deadline);
        }
        assert_ok!(service.ledger().upsert(builder.build()).await);
    }

    api.insert(remote_record(filled, maker, "filled"));
    api.insert(remote_record(activated, maker, "active"));
    api.insert(remote_record(stuck, maker, "submitted"));

    let summary = service.reconcile().await.unwrap();
    assert_eq!(summary.scanned, 5);
    assert_eq!(summary.updated, 2);
    assert_eq!(summary.expired, 1);
    assert_eq!(api.fetch_calls(), 4);

    assert_eq!(service.tracked(filled).await.unwrap().status, OrderStatus::Filled);
    assert_eq!(service.tracked(activated).await.unwrap().status, OrderStatus::Active);
    assert_eq!(service.tracked(stuck).await.unwrap().status, OrderStatus::Active);
    assert_eq!(service.tracked(expired).await.unwrap().status, OrderStatus::Expired);
    assert_eq!(service.tracked(done).await.unwrap().status, OrderStatus::Cancelled);
    assert_eq!(service.tracked(unknown).await.unwrap().status, OrderStatus::Submitted);

    // A second sweep finds the terminal entries settled and changes nothing.
    let again = service.reconcile().await.unwrap();
    assert_eq!(again.scanned, 3);
    assert_eq!(again.updated, 0);
    assert_eq!(again.expired, 0);
}
