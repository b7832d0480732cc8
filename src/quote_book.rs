//! Authoritative quote store.
//!
//! Holds the current quote for every listed asset behind a copy-on-write
//! snapshot. Writers build a fresh map and swap it in under the write lock,
//! readers clone the `Arc` and never observe a half-applied tick.

use crate::quote::AssetQuote;
use crate::types::{Amount, AssetCategory, AssetId};
use parking_lot::RwLock;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Immutable view of all quotes at one version.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuoteSnapshot {
    pub version: u64,
    pub quotes: BTreeMap<AssetId, AssetQuote>,
}

impl QuoteSnapshot {
    pub fn get(&self, asset_id: AssetId) -> Result<&AssetQuote, QuoteError> {
        self.quotes.get(&asset_id).ok_or(QuoteError::NotFound(asset_id))
    }

    pub fn iter(&self) -> impl Iterator<Item = &AssetQuote> {
        self.quotes.values()
    }

    pub fn len(&self) -> usize {
        self.quotes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct QuoteBook {
    current: RwLock<Arc<QuoteSnapshot>>,
}

impl QuoteBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cheap consistent view. Holds the read lock only long enough to clone the `Arc`.
    pub fn snapshot(&self) -> Arc<QuoteSnapshot> {
        Arc::clone(&self.current.read())
    }

    pub fn version(&self) -> u64 {
        self.current.read().version
    }

    pub fn get(&self, asset_id: AssetId) -> Result<AssetQuote, QuoteError> {
        self.snapshot().get(asset_id).cloned()
    }

    pub fn contains(&self, asset_id: AssetId) -> bool {
        self.current.read().quotes.contains_key(&asset_id)
    }

    pub fn len(&self) -> usize {
        self.current.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.current.read().is_empty()
    }

    pub fn upsert(&self, quote: AssetQuote) {
        self.apply(|_| vec![quote]);
    }

    /// Single-writer update. `f` sees the current snapshot and returns the quotes
    /// to replace; the result is published as one new version.
    pub fn apply<F>(&self, f: F) -> u64
    where
        F: FnOnce(&QuoteSnapshot) -> Vec<AssetQuote>,
    {
        let mut guard = self.current.write();
        let updates = f(&guard);

        let mut quotes = guard.quotes.clone();
        for quote in updates {
            quotes.insert(quote.id, quote);
        }

        let version = guard.version + 1;
        *guard = Arc::new(QuoteSnapshot { version, quotes });
        version
    }

    /// Add traded notional to an asset's running volume.
    pub fn record_volume(&self, asset_id: AssetId, notional: Amount) -> Result<(), QuoteError> {
        let mut missing = false;
        self.apply(|snapshot| match snapshot.quotes.get(&asset_id) {
            Some(quote) => {
                let mut updated = quote.clone();
                updated.volume_24h = updated.volume_24h.add(notional);
                vec![updated]
            }
            None => {
                missing = true;
                Vec::new()
            }
        });

        if missing {
            Err(QuoteError::NotFound(asset_id))
        } else {
            Ok(())
        }
    }

    pub fn summary(&self) -> MarketSummary {
        MarketSummary::from_snapshot(&self.snapshot())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QuoteError {
    #[error("Quote not found for {0}")]
    NotFound(AssetId),
}

// how many movers each side of the summary lists
const MOVERS: usize = 3;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketSummary {
    pub total_volume: Amount,
    pub average_change: Decimal,
    pub top_gainers: Vec<AssetId>,
    pub top_losers: Vec<AssetId>,
    pub category_change: BTreeMap<AssetCategory, Decimal>,
}

impl MarketSummary {
    pub fn from_snapshot(snapshot: &QuoteSnapshot) -> Self {
        let total_volume: Amount = snapshot.iter().map(|q| q.volume_24h).sum();
        let average_change = average(snapshot.iter().map(|q| q.change_24h));

        let mut by_change: Vec<&AssetQuote> = snapshot.iter().collect();
        by_change.sort_by(|a, b| b.change_24h.cmp(&a.change_24h).then(a.id.cmp(&b.id)));

        let top_gainers = by_change.iter().take(MOVERS).map(|q| q.id).collect();
        let top_losers = by_change.iter().rev().take(MOVERS).map(|q| q.id).collect();

        let mut grouped: BTreeMap<AssetCategory, Vec<Decimal>> = BTreeMap::new();
        for quote in snapshot.iter() {
            grouped.entry(quote.category).or_default().push(quote.change_24h);
        }
        let category_change = grouped
            .into_iter()
            .map(|(category, changes)| (category, average(changes.into_iter())))
            .collect();

        Self {
            total_volume,
            average_change,
            top_gainers,
            top_losers,
            category_change,
        }
    }
}

fn average(values: impl Iterator<Item = Decimal>) -> Decimal {
    let (sum, count) = values.fold((Decimal::ZERO, 0u32), |(s, n), v| (s.saturating_add(v), n + 1));
    if count == 0 {
        Decimal::ZERO
    } else {
        sum / Decimal::from(count)
    }
}
