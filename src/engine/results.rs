// 8.0.2: result types and errors for engine operations.

use crate::account::AccountError;
use crate::authorizer::{Authorization, AuthorizationError};
use crate::config::ConfigError;
use crate::position::{LedgerError, Position};
use crate::quote_book::QuoteError;
use crate::types::{AccountId, Amount, AssetId};
use serde::Serialize;

/// Why a submitted trade did not execute. Nothing was mutated.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TradeRejection {
    #[error("Account {0} not found")]
    AccountNotFound(AccountId),

    #[error("No quote for {0}")]
    QuoteNotFound(AssetId),

    #[error(transparent)]
    Authorization(#[from] AuthorizationError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl From<QuoteError> for TradeRejection {
    fn from(err: QuoteError) -> Self {
        match err {
            QuoteError::NotFound(asset_id) => TradeRejection::QuoteNotFound(asset_id),
        }
    }
}

/// What a trade would do if submitted now.
#[derive(Debug, Clone, Serialize)]
pub struct TradePreview {
    pub authorization: Authorization,
    pub position_after: Position,
    pub cash_after: Amount,
    pub locked_after: Amount,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum EngineError {
    #[error("Account {0} not found")]
    AccountNotFound(AccountId),

    #[error("Account error: {0}")]
    Account(#[from] AccountError),

    #[error("Quote error: {0}")]
    Quote(#[from] QuoteError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}
