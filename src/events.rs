// 11.0: every state change produces an event. used for the audit trail and for
// notifying whatever sits in front of the engine. EventPayload lists all event types.

use crate::history::CashRecord;
use crate::types::{AccountId, Amount, AssetId, KycLevel, Leverage, OrderType, Price, Side, Timestamp, TradeId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventId(pub u64);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub timestamp: Timestamp,
    pub payload: EventPayload,
}

impl Event {
    pub fn new(id: EventId, timestamp: Timestamp, payload: EventPayload) -> Self {
        Self {
            id,
            timestamp,
            payload,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EventPayload {
    // Market data events
    AssetListed(AssetListedEvent),
    QuotesTicked(QuotesTickedEvent),

    // Trade events
    TradeExecuted(TradeExecutedEvent),
    TradeRejected(TradeRejectedEvent),

    // Cash events
    Deposit(CashEvent),
    WithdrawalRequested(CashEvent),
    WithdrawalRejected(WithdrawalRejectedEvent),

    // Account events
    KycChanged(KycChangedEvent),
}

impl EventPayload {
    pub fn account_id(&self) -> Option<AccountId> {
        match self {
            EventPayload::AssetListed(_) | EventPayload::QuotesTicked(_) => None,
            EventPayload::TradeExecuted(e) => Some(e.account_id),
            EventPayload::TradeRejected(e) => Some(e.account_id),
            EventPayload::Deposit(e) | EventPayload::WithdrawalRequested(e) => Some(e.account_id),
            EventPayload::WithdrawalRejected(e) => Some(e.account_id),
            EventPayload::KycChanged(e) => Some(e.account_id),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetListedEvent {
    pub asset_id: AssetId,
    pub ticker: String,
    pub initial_price: Price,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotesTickedEvent {
    pub version: u64,
    pub assets: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeExecutedEvent {
    pub trade_id: TradeId,
    pub account_id: AccountId,
    pub asset_id: AssetId,
    pub side: Side,
    pub order_type: OrderType,
    pub quantity: Decimal,
    pub price: Price,
    pub leverage: Leverage,
    pub margin: Amount,
    pub new_cash_balance: Amount,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeRejectedEvent {
    pub account_id: AccountId,
    pub asset_id: AssetId,
    pub side: Side,
    pub quantity: Decimal,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CashEvent {
    pub account_id: AccountId,
    pub record: CashRecord,
    pub new_balance: Amount,
}

/// Carries a Failed record; rejected withdrawals never reach cash history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WithdrawalRejectedEvent {
    pub account_id: AccountId,
    pub record: CashRecord,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KycChangedEvent {
    pub account_id: AccountId,
    pub from: KycLevel,
    pub to: KycLevel,
}
