//! Deposits and withdrawals.

use super::core::Engine;
use super::results::EngineError;
use crate::account::AccountError;
use crate::events::{CashEvent, EventPayload, WithdrawalRejectedEvent};
use crate::history::{CashKind, CashRecord, CashStatus};
use crate::types::{AccountId, Amount};

impl Engine {
    pub fn deposit(&self, account_id: AccountId, amount: Amount, method: &str) -> Result<CashRecord, EngineError> {
        let handle = self.require_account(account_id)?;
        let now = self.time();

        let (record, new_balance) = {
            let mut account = handle.lock();
            let record = account.deposit(amount, method, now)?;
            (record, account.cash_balance)
        };

        tracing::info!(account = %account_id, %amount, %new_balance, method, "deposit");
        self.emit_event(EventPayload::Deposit(CashEvent {
            account_id,
            record: record.clone(),
            new_balance,
        }));
        Ok(record)
    }

    // funds are checked here; the account ledger debits unconditionally
    pub fn withdraw(&self, account_id: AccountId, amount: Amount, destination: &str) -> Result<CashRecord, EngineError> {
        let handle = self.require_account(account_id)?;
        let now = self.time();

        let outcome = {
            let mut account = handle.lock();
            if !amount.is_positive() {
                Err(AccountError::InvalidAmount(amount))
            } else if amount > account.cash_balance {
                Err(AccountError::InsufficientFunds {
                    requested: amount,
                    available: account.cash_balance,
                })
            } else {
                account
                    .withdrawal(amount, destination, now)
                    .map(|record| (record, account.cash_balance))
            }
        };

        match outcome {
            Ok((record, new_balance)) => {
                tracing::info!(account = %account_id, %amount, %new_balance, destination, "withdrawal requested");
                self.emit_event(EventPayload::WithdrawalRequested(CashEvent {
                    account_id,
                    record: record.clone(),
                    new_balance,
                }));
                Ok(record)
            }
            Err(e) => {
                tracing::warn!(account = %account_id, %amount, reason = %e, "withdrawal rejected");
                // emit rejection event for audit
                self.emit_event(EventPayload::WithdrawalRejected(WithdrawalRejectedEvent {
                    account_id,
                    record: CashRecord {
                        id: 0,
                        kind: CashKind::Withdrawal,
                        amount,
                        method: destination.to_string(),
                        status: CashStatus::Failed,
                        timestamp: now,
                    },
                    reason: e.to_string(),
                }));
                Err(EngineError::Account(e))
            }
        }
    }
}
