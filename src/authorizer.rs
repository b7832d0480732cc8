//! Pre-trade checks.
//!
//! Every proposed trade passes three gates in order before the ledger sees it:
//! a positive notional, the account tier's notional ceiling, and enough free
//! cash to post the margin. The first failure short-circuits. Nothing here
//! mutates state, so a check can run speculatively to pre-validate a form.

use crate::account::Account;
use crate::config::TradeLimits;
use crate::quote::AssetQuote;
use crate::types::{AccountId, Amount, AssetId, KycLevel, Leverage, OrderType, Price, Side};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeRequest {
    pub account_id: AccountId,
    pub asset_id: AssetId,
    pub side: Side,
    /// Always positive. Direction comes from `side`.
    pub quantity: Decimal,
    pub leverage: Leverage,
    pub order_type: OrderType,
    pub limit_price: Option<Price>,
}

impl TradeRequest {
    pub fn market(account_id: AccountId, asset_id: AssetId, side: Side, quantity: Decimal, leverage: Leverage) -> Self {
        Self {
            account_id,
            asset_id,
            side,
            quantity,
            leverage,
            order_type: OrderType::Market,
            limit_price: None,
        }
    }

    pub fn limit(
        account_id: AccountId,
        asset_id: AssetId,
        side: Side,
        quantity: Decimal,
        leverage: Leverage,
        limit_price: Price,
    ) -> Self {
        Self {
            account_id,
            asset_id,
            side,
            quantity,
            leverage,
            order_type: OrderType::Limit,
            limit_price: Some(limit_price),
        }
    }
}

/// The numbers a passed check commits to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Authorization {
    pub execution_price: Price,
    pub notional: Amount,
    pub margin: Amount,
}

// None when the product leaves the decimal range
pub fn notional_value(quantity: Decimal, price: Price) -> Option<Amount> {
    quantity.checked_mul(price.value()).map(Amount::new)
}

// margin = notional / leverage. the rest is financed
pub fn margin_required(notional: Amount, leverage: Leverage) -> Amount {
    notional.div(leverage.as_decimal())
}

#[derive(Debug, Clone)]
pub struct TradeAuthorizer {
    limits: TradeLimits,
    max_leverage: Leverage,
}

impl TradeAuthorizer {
    pub fn new(limits: TradeLimits, max_leverage: Leverage) -> Self {
        Self { limits, max_leverage }
    }

    pub fn limits(&self) -> &TradeLimits {
        &self.limits
    }

    /// MARKET fills at the live quote, LIMIT at the caller's price.
    pub fn execution_price(&self, request: &TradeRequest, quote: &AssetQuote) -> Result<Price, AuthorizationError> {
        match request.order_type {
            OrderType::Market => Ok(quote.price),
            OrderType::Limit => request.limit_price.ok_or_else(|| AuthorizationError::InvalidTrade {
                reason: "limit order requires a limit price".to_string(),
            }),
        }
    }

    pub fn authorize(
        &self,
        account: &Account,
        quote: &AssetQuote,
        request: &TradeRequest,
    ) -> Result<Authorization, AuthorizationError> {
        // 1: positive notional and a permitted leverage
        if request.quantity <= Decimal::ZERO {
            return Err(AuthorizationError::InvalidTrade {
                reason: format!("quantity must be positive, got {}", request.quantity),
            });
        }
        if request.leverage > self.max_leverage {
            return Err(AuthorizationError::InvalidTrade {
                reason: format!("leverage {} exceeds maximum {}", request.leverage, self.max_leverage),
            });
        }

        let execution_price = self.execution_price(request, quote)?;
        let notional = notional_value(request.quantity, execution_price).ok_or_else(|| {
            AuthorizationError::InvalidTrade {
                reason: format!("notional of {} at {} is out of range", request.quantity, execution_price),
            }
        })?;
        if !notional.is_positive() {
            return Err(AuthorizationError::InvalidTrade {
                reason: "trade resolves to zero notional".to_string(),
            });
        }

        // 2: tier ceiling, independent of margin
        if let Some(ceiling) = self.limits.ceiling(account.kyc_level) {
            if notional > ceiling {
                return Err(AuthorizationError::LimitExceeded {
                    level: account.kyc_level,
                    notional,
                    ceiling,
                });
            }
        }

        // 3: margin comes out of free cash
        let margin = margin_required(notional, request.leverage);
        if account.cash_balance < margin {
            return Err(AuthorizationError::InsufficientMargin {
                required: margin,
                available: account.cash_balance,
                shortfall: margin.sub(account.cash_balance),
            });
        }

        Ok(Authorization {
            execution_price,
            notional,
            margin,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthorizationError {
    #[error("Invalid trade: {reason}")]
    InvalidTrade { reason: String },

    #[error("{level} limit exceeded: notional {notional} is above {ceiling}. Upgrade KYC to trade larger size")]
    LimitExceeded {
        level: KycLevel,
        notional: Amount,
        ceiling: Amount,
    },

    #[error("Insufficient funds: margin {required} required, {available} available (short {shortfall})")]
    InsufficientMargin {
        required: Amount,
        available: Amount,
        shortfall: Amount,
    },
}
