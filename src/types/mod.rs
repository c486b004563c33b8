mod condition;
mod order;
mod request;

pub use condition::{Operator, OrderCondition, ParseOperatorError};
pub use order::{
    LimitOrderData, OrderKind, OrderStatus, ParseStatusError, SavedOrder, TokenAmount, TokenInfo,
};
pub use request::OrderRequest;

use alloy::primitives::{Address, U256};

/// ID of an index feed on the oracle contract.
pub type IndexId = u64;

/// Single oracle read: the index value and the timestamp the oracle
/// recorded for it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct IndexPoint {
    value: U256,
    timestamp: u64,
}

impl IndexPoint {
    pub fn new(value: U256, timestamp: u64) -> Self {
        Self { value, timestamp }
    }

    pub fn value(&self) -> U256 {
        self.value
    }

    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }
}

/// Index feed state as listed by the oracle. Snapshots are read-only views:
/// a newer read supersedes an older one, nothing is ever mutated in place.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IndexSnapshot {
    id: IndexId,
    value: U256,
    timestamp: u64,
    active: bool,
    name: Option<String>,
    description: Option<String>,
    creator: Option<Address>,
    created_at: Option<u64>,
}

impl IndexSnapshot {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: IndexId,
        value: U256,
        timestamp: u64,
        active: bool,
        name: Option<String>,
        description: Option<String>,
        creator: Option<Address>,
        created_at: Option<u64>,
    ) -> Self {
        Self {
            id,
            value,
            timestamp,
            active,
            name,
            description,
            creator,
            created_at,
        }
    }

    /// Snapshot carrying only the live value, as produced by the per-id
    /// fallback scan when the metadata batch is unavailable.
    pub fn from_value(id: IndexId, value: U256, timestamp: u64) -> Self {
        Self::new(id, value, timestamp, true, None, None, None, None)
    }

    pub fn id(&self) -> IndexId {
        self.id
    }

    pub fn value(&self) -> U256 {
        self.value
    }

    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    pub fn active(&self) -> bool {
        self.active
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn creator(&self) -> Option<Address> {
        self.creator
    }

    pub fn created_at(&self) -> Option<u64> {
        self.created_at
    }

    pub fn point(&self) -> IndexPoint {
        IndexPoint::new(self.value, self.timestamp)
    }
}
