//! Asset quotes.
//!
//! A quote is the current tradable state of one listed asset: last price,
//! bid/ask around it, running session extrema, cumulative drift and volume.
//! Quotes are created at listing time and only ever replaced, never deleted.

use crate::types::{Amount, AssetCategory, AssetId, Price, RiskTier, Timestamp};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// What the listing side supplies when a new asset is put on the platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetListing {
    pub ticker: String,
    pub name: String,
    pub category: AssetCategory,
    pub risk_tier: RiskTier,
    pub initial_price: Price,
}

impl AssetListing {
    pub fn new(
        ticker: impl Into<String>,
        name: impl Into<String>,
        category: AssetCategory,
        risk_tier: RiskTier,
        initial_price: Price,
    ) -> Self {
        Self {
            ticker: ticker.into().to_uppercase(),
            name: name.into(),
            category,
            risk_tier,
            initial_price,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetQuote {
    pub id: AssetId,
    pub ticker: String,
    pub name: String,
    pub category: AssetCategory,
    pub risk_tier: RiskTier,
    pub price: Price,
    pub bid: Price,
    pub ask: Price,
    pub day_high: Price,
    pub day_low: Price,
    /// Session-cumulative drift in percent. A running sum of per-tick moves,
    /// not a trailing 24 hour return.
    pub change_24h: Decimal,
    /// Session-cumulative traded notional.
    pub volume_24h: Amount,
    pub last_update: Timestamp,
}

impl AssetQuote {
    /// Build the first quote for a freshly listed asset.
    pub fn list(id: AssetId, listing: &AssetListing, spread_fraction: Decimal, timestamp: Timestamp) -> Self {
        let price = listing.initial_price;
        let (bid, ask) = spread_around(price, spread_fraction);
        Self {
            id,
            ticker: listing.ticker.clone(),
            name: listing.name.clone(),
            category: listing.category,
            risk_tier: listing.risk_tier,
            price,
            bid,
            ask,
            day_high: price,
            day_low: price,
            change_24h: Decimal::ZERO,
            volume_24h: Amount::zero(),
            last_update: timestamp,
        }
    }

    pub fn spread(&self) -> Decimal {
        self.ask.value() - self.bid.value()
    }

    pub fn mid(&self) -> Decimal {
        self.bid.value() + (self.ask.value() - self.bid.value()) / dec!(2)
    }

    /// bid <= price <= ask and day_low <= price <= day_high
    pub fn is_consistent(&self) -> bool {
        self.bid <= self.price
            && self.price <= self.ask
            && self.day_low <= self.price
            && self.price <= self.day_high
    }
}

/// Symmetric bid/ask: `spread = price * fraction`, half on each side.
/// Near the top of the decimal range the ask collapses onto the price.
pub fn spread_around(price: Price, spread_fraction: Decimal) -> (Price, Price) {
    let half = price.value().saturating_mul(spread_fraction) / dec!(2);
    // fraction < 1 keeps the bid strictly positive
    let bid = Price::new(price.value() - half).unwrap_or(price);
    let ask = price
        .value()
        .checked_add(half)
        .map(Price::new_unchecked)
        .unwrap_or(price);
    (bid, ask)
}
