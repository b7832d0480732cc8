// 4.0: open position tracking. quantity is signed, cost basis is a weighted average.
// longs carry borrowed cash, shorts carry locked collateral. never both.
// 4.1 has open/increase logic, 4.2 the equity math used for net worth.

use crate::authorizer::{Authorization, TradeRequest};
use crate::types::{Amount, AssetId, Leverage, Price, Side, SignedSize, Timestamp};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub asset_id: AssetId,
    pub quantity: SignedSize,
    /// Cost basis for longs, average proceeds price for shorts.
    pub average_price: Price,
    /// Fixed at first open.
    pub leverage: Leverage,
    pub borrowed_cash: Amount,
    pub short_collateral: Amount,
    pub opened_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Position {
    pub fn is_empty(&self) -> bool {
        self.quantity.is_zero()
    }

    pub fn side(&self) -> Option<Side> {
        self.quantity.side()
    }

    // valuation saturates: a mark can drift past what the fill itself could hold
    pub fn notional_value(&self, price: Price) -> Amount {
        Amount::new(self.quantity.abs().saturating_mul(price.value()))
    }

    // 4.2: long = market value - debt. short = collateral - exposure (quantity is negative)
    pub fn equity_contribution(&self, price: Price) -> Amount {
        let exposure = Amount::new(self.quantity.value().saturating_mul(price.value()));
        if self.quantity.is_long() {
            exposure.sub(self.borrowed_cash)
        } else if self.quantity.is_short() {
            exposure.add(self.short_collateral)
        } else {
            Amount::zero()
        }
    }

    // size * (mark - entry). informational only
    pub fn unrealized_pnl(&self, price: Price) -> Amount {
        let move_per_unit = price.value().saturating_sub(self.average_price.value());
        Amount::new(self.quantity.value().saturating_mul(move_per_unit))
    }
}

/// An authorized trade, reduced to what the ledger needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fill {
    pub asset_id: AssetId,
    pub side: Side,
    pub quantity: Decimal,
    pub price: Price,
    pub leverage: Leverage,
    pub notional: Amount,
    pub margin: Amount,
}

impl Fill {
    pub fn new(request: &TradeRequest, authorization: &Authorization) -> Self {
        Self {
            asset_id: request.asset_id,
            side: request.side,
            quantity: request.quantity,
            price: authorization.execution_price,
            leverage: request.leverage,
            notional: authorization.notional,
            margin: authorization.margin,
        }
    }

    // longs finance everything above the margin
    pub fn borrowed(&self) -> Amount {
        match self.side {
            Side::Long => self.notional.sub(self.margin),
            Side::Short => Amount::zero(),
        }
    }

    // shorts lock margin plus the full proceeds
    pub fn collateral(&self) -> Result<Amount, LedgerError> {
        match self.side {
            Side::Long => Ok(Amount::zero()),
            Side::Short => self
                .margin
                .checked_add(self.notional)
                .ok_or(LedgerError::NotionalOutOfRange { asset_id: self.asset_id }),
        }
    }
}

/// New position state plus the cash movements the account ledger must apply.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionUpdate {
    pub position: Position,
    pub margin_debit: Amount,
    pub collateral_credit: Amount,
}

// 4.1: first trade against an asset
pub fn open_position(fill: &Fill, timestamp: Timestamp) -> Result<PositionUpdate, LedgerError> {
    let collateral = fill.collateral()?;
    let position = Position {
        asset_id: fill.asset_id,
        quantity: SignedSize::from_side(fill.side, fill.quantity),
        average_price: fill.price,
        leverage: fill.leverage,
        borrowed_cash: fill.borrowed(),
        short_collateral: collateral,
        opened_at: timestamp,
        updated_at: timestamp,
    };

    Ok(PositionUpdate {
        position,
        margin_debit: fill.margin,
        collateral_credit: collateral,
    })
}

// adds to an existing same-direction position. averages the price.
// every sum is checked so an oversized add is rejected instead of stored
pub fn increase_position(position: &Position, fill: &Fill, timestamp: Timestamp) -> Result<PositionUpdate, LedgerError> {
    debug_assert!(position.side() == Some(fill.side), "increase must match position direction");

    let out_of_range = LedgerError::NotionalOutOfRange { asset_id: fill.asset_id };
    let old_abs = position.quantity.abs();
    let new_abs = old_abs.checked_add(fill.quantity).ok_or(out_of_range.clone())?;
    let weighted_sum = old_abs
        .checked_mul(position.average_price.value())
        .and_then(|cost| cost.checked_add(fill.notional.value()))
        .ok_or(out_of_range.clone())?;
    let average_price = weighted_sum
        .checked_div(new_abs)
        .and_then(Price::new)
        .unwrap_or(position.average_price);

    let collateral = fill.collateral()?;
    let borrowed_cash = position.borrowed_cash.checked_add(fill.borrowed()).ok_or(out_of_range.clone())?;
    let short_collateral = position.short_collateral.checked_add(collateral).ok_or(out_of_range)?;

    let updated = Position {
        asset_id: position.asset_id,
        quantity: SignedSize::from_side(fill.side, new_abs),
        average_price,
        leverage: position.leverage,
        borrowed_cash,
        short_collateral,
        opened_at: position.opened_at,
        updated_at: timestamp,
    };

    Ok(PositionUpdate {
        position: updated,
        margin_debit: fill.margin,
        collateral_credit: collateral,
    })
}

/// Compute the effect of a fill without touching any state.
pub fn apply_fill(existing: Option<&Position>, fill: &Fill, timestamp: Timestamp) -> Result<PositionUpdate, LedgerError> {
    let Some(position) = existing.filter(|p| !p.is_empty()) else {
        return open_position(fill, timestamp);
    };

    if let Some(current) = position.side() {
        if current != fill.side {
            return Err(LedgerError::UnsupportedDirectionFlip {
                asset_id: fill.asset_id,
                current,
                requested: fill.side,
            });
        }
    }

    if position.leverage != fill.leverage {
        return Err(LedgerError::LeverageMismatch {
            asset_id: fill.asset_id,
            existing: position.leverage,
            requested: fill.leverage,
        });
    }

    increase_position(position, fill, timestamp)
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("Leverage mismatch on {asset_id}: position is {existing}, trade requested {requested}")]
    LeverageMismatch {
        asset_id: AssetId,
        existing: Leverage,
        requested: Leverage,
    },

    #[error("Cannot trade {requested} against an open {current} position on {asset_id}")]
    UnsupportedDirectionFlip {
        asset_id: AssetId,
        current: Side,
        requested: Side,
    },

    #[error("Invalid trade: position on {asset_id} would grow out of range")]
    NotionalOutOfRange { asset_id: AssetId },
}
