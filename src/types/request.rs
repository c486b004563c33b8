use alloy::primitives::{Address, U256};

use super::*;

/// Request to create a conditional order: swap `from_amount` of `from_token`
/// into at least `to_amount` of `to_token` once the condition holds.
///
/// Amounts are human decimal strings ("1.5"); they are converted to smallest
/// units against the live token metadata when the order is built.
#[derive(Clone, Debug)]
pub struct OrderRequest {
    index_id: IndexId,
    operator: Operator,
    threshold: U256,
    description: String,
    from_token: Address,
    to_token: Address,
    from_amount: String,
    to_amount: String,
    expiry_seconds: Option<u64>,
}

impl OrderRequest {
    /// Create a new order request with provided parameters.
    ///
    /// Use [`crate::orders::OrderService::create`] to sign and submit it.
    /// `expiry_seconds` counts from submission time; `None` never expires.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        index_id: IndexId,
        operator: Operator,
        threshold: U256,
        description: impl Into<String>,
        from_token: Address,
        to_token: Address,
        from_amount: impl Into<String>,
        to_amount: impl Into<String>,
        expiry_seconds: Option<u64>,
    ) -> Self {
        Self {
            index_id,
            operator,
            threshold,
            description: description.into(),
            from_token,
            to_token,
            from_amount: from_amount.into(),
            to_amount: to_amount.into(),
            expiry_seconds,
        }
    }

    pub fn condition(&self) -> OrderCondition {
        OrderCondition::new(self.index_id, self.operator, self.threshold)
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn from_token(&self) -> Address {
        self.from_token
    }

    pub fn to_token(&self) -> Address {
        self.to_token
    }

    pub fn from_amount(&self) -> &str {
        &self.from_amount
    }

    pub fn to_amount(&self) -> &str {
        &self.to_amount
    }

    pub fn expiry_seconds(&self) -> Option<u64> {
        self.expiry_seconds
    }
}
