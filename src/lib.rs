//! Index-conditional order SDK.
//!
//! # Overview
//!
//! Client library for conditional token swaps: limit orders that become
//! fillable once an index feed published through an on-chain oracle crosses
//! a threshold (e.g. "swap when index #2 > 18000").
//!
//! Use [`oracle::IndexClient`] to read and manage index feeds,
//! [`types::OrderRequest`] with [`orders::OrderService`] to build, sign,
//! submit, and cancel orders, and [`stream::values`] to follow a feed.
//! Orders are tracked locally in a [`ledger::OrderLedger`] file that
//! survives restarts.
//!
//! See `./tests` for examples.
//!
//! # Limitations/follow-ups
//!
//! * Fills and remote cancellations are observed by polling the order book
//!   API (see the `order_keeper` binary). Push notifications would cut the
//!   reconcile latency.
//!
//! * The order ledger file is last-write-wins across processes; run a single
//!   keeper per ledger file.
//!
//! * Inclusive threshold operators are approximated by the strict
//!   comparators the protocol exposes, see [`types::Operator`].
//!
//! # Testing
//!
//! [`testing`] module provides an in-memory order book double and an
//! offline provider for tests that must prove no transaction was sent.

pub mod abi;
pub mod cache;
pub mod error;
pub mod ledger;
pub mod market;
pub mod num;
pub mod oracle;
pub mod orders;
pub mod predicate;
pub mod retry;
pub mod stream;
pub mod testing;
pub mod token;
pub mod types;
pub mod wallet;

use alloy::primitives::{Address, address};

#[derive(Clone, Debug)]
/// Chain the index oracle and the order protocol are deployed on.
pub struct Chain {
    chain_id: u64,
    index_oracle: Address,
    order_protocol: Address,
}

impl Chain {
    pub fn testnet() -> Self {
        Self {
            chain_id: 10143,
            index_oracle: address!("0x4fe9b2c8a31b473d51ac029e1b0e2ffb4c37e981"),
            order_protocol: address!("0x87c3f6d4cab4cb1fa0d0ee29dbcbd9e2751d2fb3"),
        }
    }

    pub fn custom(chain_id: u64, index_oracle: Address, order_protocol: Address) -> Self {
        Self {
            chain_id,
            index_oracle,
            order_protocol,
        }
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    pub fn index_oracle(&self) -> Address {
        self.index_oracle
    }

    pub fn order_protocol(&self) -> Address {
        self.order_protocol
    }
}
