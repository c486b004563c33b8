use std::{fmt, str::FromStr};

use alloy::primitives::{Address, B256, U256};

use crate::num;

/// Lifecycle state of a tracked order.
///
/// Transitions are one-way: pending → submitted → active, then one of the
/// terminal states. A terminal entry never changes again.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Submitted,
    Active,
    Filled,
    Completed,
    Cancelled,
    Expired,
}

impl OrderStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Filled
                | OrderStatus::Completed
                | OrderStatus::Cancelled
                | OrderStatus::Expired
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Submitted => "submitted",
            OrderStatus::Active => "active",
            OrderStatus::Filled => "filled",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Expired => "expired",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown order status: {0:?}")]
pub struct ParseStatusError(String);

impl FromStr for OrderStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pending" => Ok(OrderStatus::Pending),
            "submitted" => Ok(OrderStatus::Submitted),
            "active" | "open" => Ok(OrderStatus::Active),
            "filled" => Ok(OrderStatus::Filled),
            "completed" | "executed" => Ok(OrderStatus::Completed),
            "cancelled" | "canceled" => Ok(OrderStatus::Cancelled),
            "expired" => Ok(OrderStatus::Expired),
            other => Err(ParseStatusError(other.to_string())),
        }
    }
}

/// Product family the order belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderKind {
    Limit,
    Swap,
    Fusion,
}

/// Token identity captured when the order was created.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenInfo {
    pub address: Address,
    pub symbol: String,
    pub name: String,
    pub decimals: u8,
}

/// Token amount in raw smallest units together with its human rendering.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenAmount {
    pub raw: String,
    pub formatted: String,
}

impl TokenAmount {
    pub fn from_units(raw: U256, decimals: u8) -> Self {
        Self {
            raw: raw.to_string(),
            formatted: num::format_base_units(raw, decimals),
        }
    }
}

/// Protocol-level fields of the signed order, mirrored into the ledger so a
/// cancel or a fill inspection does not need the protocol API.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LimitOrderData {
    pub maker: Address,
    pub receiver: Address,
    pub maker_asset: Address,
    pub taker_asset: Address,
    pub making_amount: U256,
    pub taking_amount: U256,
    pub salt: U256,
}

/// One entry of the persistent order ledger.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedOrder {
    pub order_hash: B256,
    #[serde(rename = "type")]
    pub kind: OrderKind,
    /// Creation time, unix seconds.
    pub timestamp: u64,
    pub status: OrderStatus,
    pub description: String,
    pub from_token: TokenInfo,
    pub to_token: TokenInfo,
    pub from_amount: TokenAmount,
    pub to_amount: TokenAmount,
    pub wallet_address: Address,
    pub chain_id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valid_until: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit_order_data: Option<LimitOrderData>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_terminality() {
        assert!(!OrderStatus::Pending.is_terminal());
        assert!(!OrderStatus::Submitted.is_terminal());
        assert!(!OrderStatus::Active.is_terminal());
        assert!(OrderStatus::Filled.is_terminal());
        assert!(OrderStatus::Completed.is_terminal());
        assert!(OrderStatus::Cancelled.is_terminal());
        assert!(OrderStatus::Expired.is_terminal());
    }

    #[test]
    fn test_status_parses_remote_vocabulary() {
        assert_eq!("Filled".parse::<OrderStatus>().unwrap(), OrderStatus::Filled);
        assert_eq!("open".parse::<OrderStatus>().unwrap(), OrderStatus::Active);
        assert_eq!(
            "canceled".parse::<OrderStatus>().unwrap(),
            OrderStatus::Cancelled
        );
        assert!("unknown".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn test_saved_order_json_field_names() {
        let order = SavedOrder {
            order_hash: B256::repeat_byte(0x11),
            kind: OrderKind::Limit,
            timestamp: 1_760_000_000,
            status: OrderStatus::Pending,
            description: "index #2 gt 18000".to_string(),
            from_token: TokenInfo {
                address: Address::repeat_byte(0x22),
                symbol: "USDC".to_string(),
                name: "USD Coin".to_string(),
                decimals: 6,
            },
            to_token: TokenInfo {
                address: Address::repeat_byte(0x33),
                symbol: "WETH".to_string(),
                name: "Wrapped Ether".to_string(),
                decimals: 18,
            },
            from_amount: TokenAmount::from_units(U256::from(100000u64), 6),
            to_amount: TokenAmount::from_units(U256::from(30000000000000u64), 18),
            wallet_address: Address::repeat_byte(0x44),
            chain_id: 31337,
            valid_until: None,
            limit_order_data: None,
        };

        let json = serde_json::to_value(&order).unwrap();
        assert_eq!(json["type"], "limit");
        assert_eq!(json["status"], "pending");
        assert_eq!(json["orderHash"], format!("{:#x}", order.order_hash));
        assert_eq!(json["fromAmount"]["raw"], "100000");
        assert_eq!(json["fromAmount"]["formatted"], "0.1");
        assert_eq!(json["toAmount"]["formatted"], "0.00003");
        assert_eq!(json["fromToken"]["decimals"], 6);
        assert!(json.get("validUntil").is_none());

        let back: SavedOrder = serde_json::from_value(json).unwrap();
        assert_eq!(back, order);
    }
}
