//! Account cash and collateral ledger.
//!
//! An account holds free cash, an informational mirror of collateral locked by
//! shorts, a set of positions keyed by asset, and append-only trade and cash
//! history. Bookkeeping here is unconditional: callers validate funds first.

use crate::history::{CashKind, CashRecord, CashStatus, TradeRecord};
use crate::position::{LedgerError, Position, PositionUpdate};
use crate::quote_book::QuoteSnapshot;
use crate::types::{AccountId, Amount, AssetId, KycLevel, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

pub const CASH_ALLOCATION_LABEL: &str = "Cash";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub cash_balance: Amount,
    /// Sum of `short_collateral` across positions.
    pub locked_cash: Amount,
    pub unsettled_balance: Amount,
    pub kyc_level: KycLevel,
    pub positions: HashMap<AssetId, Position>,
    pub trade_history: Vec<TradeRecord>,
    pub cash_history: Vec<CashRecord>,
    pub total_deposited: Amount,
    pub total_withdrawn: Amount,
    pub created_at: Timestamp,
}

impl Account {
    pub fn new(id: AccountId, kyc_level: KycLevel, timestamp: Timestamp) -> Self {
        Self {
            id,
            cash_balance: Amount::zero(),
            locked_cash: Amount::zero(),
            unsettled_balance: Amount::zero(),
            kyc_level,
            positions: HashMap::new(),
            trade_history: Vec::new(),
            cash_history: Vec::new(),
            total_deposited: Amount::zero(),
            total_withdrawn: Amount::zero(),
            created_at: timestamp,
        }
    }

    pub fn apply_trade(&mut self, margin_debit: Amount, collateral_credit: Amount) {
        self.cash_balance = self.cash_balance.sub(margin_debit);
        self.locked_cash = self.locked_cash.add(collateral_credit);
    }

    /// Locked cash once `update` is applied.
    pub fn locked_after(&self, update: &PositionUpdate) -> Result<Amount, LedgerError> {
        self.locked_cash
            .checked_add(update.collateral_credit)
            .ok_or(LedgerError::NotionalOutOfRange {
                asset_id: update.position.asset_id,
            })
    }

    /// Apply a computed position update and its record in one step.
    /// Fails before touching anything if locked cash would leave the decimal range.
    pub fn commit_trade(&mut self, update: PositionUpdate, record: TradeRecord) -> Result<(), LedgerError> {
        self.locked_after(&update)?;
        self.apply_trade(update.margin_debit, update.collateral_credit);
        self.set_position(update.position);
        self.trade_history.push(record);
        Ok(())
    }

    pub fn deposit(&mut self, amount: Amount, method: impl Into<String>, timestamp: Timestamp) -> Result<CashRecord, AccountError> {
        if !amount.is_positive() {
            return Err(AccountError::InvalidAmount(amount));
        }
        let (Some(cash_balance), Some(total_deposited)) =
            (self.cash_balance.checked_add(amount), self.total_deposited.checked_add(amount))
        else {
            return Err(AccountError::BalanceOutOfRange(amount));
        };
        self.cash_balance = cash_balance;
        self.total_deposited = total_deposited;
        Ok(self.push_cash(CashKind::Deposit, amount, method.into(), CashStatus::Success, timestamp))
    }

    /// Debits immediately; the record stays Pending until settled elsewhere.
    pub fn withdrawal(&mut self, amount: Amount, destination: impl Into<String>, timestamp: Timestamp) -> Result<CashRecord, AccountError> {
        if !amount.is_positive() {
            return Err(AccountError::InvalidAmount(amount));
        }
        let total_withdrawn = self
            .total_withdrawn
            .checked_add(amount)
            .ok_or(AccountError::BalanceOutOfRange(amount))?;
        self.cash_balance = self.cash_balance.sub(amount);
        self.total_withdrawn = total_withdrawn;
        Ok(self.push_cash(CashKind::Withdrawal, amount, destination.into(), CashStatus::Pending, timestamp))
    }

    fn push_cash(&mut self, kind: CashKind, amount: Amount, method: String, status: CashStatus, timestamp: Timestamp) -> CashRecord {
        let record = CashRecord {
            id: self.cash_history.len() as u64 + 1,
            kind,
            amount,
            method,
            status,
            timestamp,
        };
        self.cash_history.push(record.clone());
        record
    }

    pub fn get_position(&self, asset_id: AssetId) -> Option<&Position> {
        self.positions.get(&asset_id)
    }

    // zero quantity means the position is gone
    pub fn set_position(&mut self, position: Position) {
        if position.is_empty() {
            self.positions.remove(&position.asset_id);
        } else {
            self.positions.insert(position.asset_id, position);
        }
    }

    pub fn upgrade_kyc(&mut self) -> KycLevel {
        self.kyc_level = self.kyc_level.next();
        self.kyc_level
    }

    pub fn total_short_collateral(&self) -> Amount {
        self.positions.values().map(|p| p.short_collateral).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NetWorth {
    pub cash: Amount,
    pub locked: Amount,
    pub unsettled: Amount,
    pub positions_equity: Amount,
    pub total: Amount,
    /// Positions skipped because their asset has no quote.
    pub unpriced: Vec<AssetId>,
}

// cash + locked + unsettled + sum of per-position equity at current prices
pub fn calculate_net_worth(account: &Account, quotes: &QuoteSnapshot) -> NetWorth {
    let mut positions_equity = Amount::zero();
    let mut unpriced = Vec::new();

    for (asset_id, position) in &account.positions {
        match quotes.get(*asset_id) {
            Ok(quote) => positions_equity = positions_equity.add(position.equity_contribution(quote.price)),
            Err(_) => unpriced.push(*asset_id),
        }
    }
    unpriced.sort();

    let total = account
        .cash_balance
        .add(account.locked_cash)
        .add(account.unsettled_balance)
        .add(positions_equity);

    NetWorth {
        cash: account.cash_balance,
        locked: account.locked_cash,
        unsettled: account.unsettled_balance,
        positions_equity,
        total,
        unpriced,
    }
}

/// Free cash plus gross exposure per asset category.
pub fn portfolio_allocation(account: &Account, quotes: &QuoteSnapshot) -> BTreeMap<String, Amount> {
    let mut allocation = BTreeMap::new();
    allocation.insert(CASH_ALLOCATION_LABEL.to_string(), account.cash_balance);

    for (asset_id, position) in &account.positions {
        if let Ok(quote) = quotes.get(*asset_id) {
            let entry = allocation
                .entry(quote.category.label().to_string())
                .or_insert_with(Amount::zero);
            *entry = entry.add(position.notional_value(quote.price));
        }
    }

    allocation
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AccountError {
    #[error("Amount must be positive, got {0}")]
    InvalidAmount(Amount),

    #[error("Insufficient funds: requested {requested}, available {available}")]
    InsufficientFunds { requested: Amount, available: Amount },

    #[error("Amount {0} would push the balance out of range")]
    BalanceOutOfRange(Amount),
}
