//! Order (purchase transaction) types

use super::identifier::{AccountId, ItemId, OrderId};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::fmt;

/// Order lifecycle status
///
/// Purchases always create `Paid` orders. A seller may mark a paid order
/// `Completed`; `Canceled` only arrives through persisted data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderStatus {
    Paid,
    Completed,
    Canceled,
}

impl OrderStatus {
    /// Numeric code used in the transactions snapshot file
    pub fn code(self) -> u8 {
        match self {
            OrderStatus::Paid => 0,
            OrderStatus::Completed => 1,
            OrderStatus::Canceled => 2,
        }
    }

    /// Inverse of [`OrderStatus::code`]
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(OrderStatus::Paid),
            1 => Some(OrderStatus::Completed),
            2 => Some(OrderStatus::Canceled),
            _ => None,
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            OrderStatus::Paid => "PAID",
            OrderStatus::Completed => "COMPLETED",
            OrderStatus::Canceled => "CANCELED",
        };
        f.write_str(label)
    }
}

/// Record of one purchase
///
/// Buyer, seller, and item are referenced by identifier, and the item name is
/// snapshotted, so the order stays meaningful after later catalog changes.
#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub id: OrderId,
    pub date: NaiveDate,
    pub buyer: AccountId,
    pub seller: AccountId,
    pub item: ItemId,
    pub item_name: String,
    pub quantity: u32,
    /// Price paid for the whole order (unit price × quantity)
    pub total: Decimal,
    pub status: OrderStatus,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(OrderStatus::Paid, 0, "PAID")]
    #[case(OrderStatus::Completed, 1, "COMPLETED")]
    #[case(OrderStatus::Canceled, 2, "CANCELED")]
    fn test_status_codes(#[case] status: OrderStatus, #[case] code: u8, #[case] label: &str) {
        assert_eq!(status.code(), code);
        assert_eq!(OrderStatus::from_code(code), Some(status));
        assert_eq!(status.to_string(), label);
    }

    #[test]
    fn test_unknown_status_code() {
        assert_eq!(OrderStatus::from_code(3), None);
    }
}
