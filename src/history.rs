//! Append-only account history.
//!
//! Trade and cash records are immutable facts once created. They are kept for
//! audit and display; none of the ledger's numeric logic reads them back.

use crate::position::Fill;
use crate::types::{AccountId, Amount, AssetId, Leverage, OrderType, Price, Side, Timestamp, TradeAction, TradeId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub id: TradeId,
    pub account_id: AccountId,
    pub asset_id: AssetId,
    pub ticker: String,
    pub side: Side,
    pub action: TradeAction,
    pub order_type: OrderType,
    pub leverage: Leverage,
    pub quantity: Decimal,
    pub price: Price,
    pub total_value: Amount,
    pub margin: Amount,
    pub timestamp: Timestamp,
}

impl TradeRecord {
    pub fn new(
        id: TradeId,
        account_id: AccountId,
        ticker: String,
        order_type: OrderType,
        fill: &Fill,
        timestamp: Timestamp,
    ) -> Self {
        Self {
            id,
            account_id,
            asset_id: fill.asset_id,
            ticker,
            side: fill.side,
            action: fill.side.action(),
            order_type,
            leverage: fill.leverage,
            quantity: fill.quantity,
            price: fill.price,
            total_value: fill.notional,
            margin: fill.margin,
            timestamp,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CashKind {
    Deposit,
    Withdrawal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CashStatus {
    Success,
    Pending,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashRecord {
    pub id: u64,
    pub kind: CashKind,
    pub amount: Amount,
    /// Payment method for deposits, destination for withdrawals.
    pub method: String,
    pub status: CashStatus,
    pub timestamp: Timestamp,
}
