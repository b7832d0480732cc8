//! Trade submission: authorize, compute the position change, commit.

use super::core::Engine;
use super::results::{TradePreview, TradeRejection};
use crate::authorizer::TradeRequest;
use crate::events::{EventPayload, TradeExecutedEvent, TradeRejectedEvent};
use crate::history::TradeRecord;
use crate::position::{apply_fill, Fill};
use crate::types::TradeId;
use std::sync::atomic::Ordering;

impl Engine {
    /// Execute a trade against the live quote. On rejection nothing changes.
    pub fn submit_trade(&self, request: TradeRequest) -> Result<TradeRecord, TradeRejection> {
        match self.execute_trade(&request) {
            Ok(record) => Ok(record),
            Err(rejection) => {
                tracing::warn!(
                    account = %request.account_id,
                    asset = %request.asset_id,
                    side = %request.side,
                    quantity = %request.quantity,
                    reason = %rejection,
                    "trade rejected"
                );
                self.emit_event(EventPayload::TradeRejected(TradeRejectedEvent {
                    account_id: request.account_id,
                    asset_id: request.asset_id,
                    side: request.side,
                    quantity: request.quantity,
                    reason: rejection.to_string(),
                }));
                Err(rejection)
            }
        }
    }

    fn execute_trade(&self, request: &TradeRequest) -> Result<TradeRecord, TradeRejection> {
        let handle = self
            .account_handle(request.account_id)
            .ok_or(TradeRejection::AccountNotFound(request.account_id))?;
        let quote = self.quotes.get(request.asset_id)?;
        let now = self.time();

        // checks and commit under one lock so no other mutation can slip between them
        let mut account = handle.lock();
        let authorization = self.authorizer.authorize(&account, &quote, request)?;
        let fill = Fill::new(request, &authorization);
        let update = apply_fill(account.get_position(request.asset_id), &fill, now)?;
        // checked before an id is drawn so rejected trades leave no gap
        account.locked_after(&update)?;

        let trade_id = TradeId(self.next_trade_id.fetch_add(1, Ordering::Relaxed));
        let record = TradeRecord::new(trade_id, request.account_id, quote.ticker.clone(), request.order_type, &fill, now);
        account.commit_trade(update, record.clone())?;
        let new_cash_balance = account.cash_balance;
        drop(account);

        if let Err(err) = self.quotes.record_volume(request.asset_id, fill.notional) {
            tracing::warn!(error = %err, "volume not recorded");
        }

        tracing::info!(
            trade = trade_id.0,
            account = %request.account_id,
            ticker = %record.ticker,
            side = %record.side,
            quantity = %record.quantity,
            price = %record.price,
            leverage = %record.leverage,
            margin = %record.margin,
            "trade executed"
        );

        self.emit_event(EventPayload::TradeExecuted(TradeExecutedEvent {
            trade_id,
            account_id: request.account_id,
            asset_id: request.asset_id,
            side: request.side,
            order_type: request.order_type,
            quantity: request.quantity,
            price: fill.price,
            leverage: fill.leverage,
            margin: fill.margin,
            new_cash_balance,
        }));

        Ok(record)
    }

    /// Run every check and compute the outcome without committing it.
    pub fn preview_trade(&self, request: &TradeRequest) -> Result<TradePreview, TradeRejection> {
        let handle = self
            .account_handle(request.account_id)
            .ok_or(TradeRejection::AccountNotFound(request.account_id))?;
        let quote = self.quotes.get(request.asset_id)?;
        let now = self.time();

        let account = handle.lock();
        let authorization = self.authorizer.authorize(&account, &quote, request)?;
        let fill = Fill::new(request, &authorization);
        let update = apply_fill(account.get_position(request.asset_id), &fill, now)?;

        Ok(TradePreview {
            authorization,
            cash_after: account.cash_balance.sub(update.margin_debit),
            locked_after: account.locked_after(&update)?,
            position_after: update.position,
        })
    }
}
