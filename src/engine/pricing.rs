//! Listing and quote update operations.

use super::core::Engine;
use super::results::EngineError;
use crate::events::{AssetListedEvent, EventPayload, QuotesTickedEvent};
use crate::quote::{AssetListing, AssetQuote};
use crate::quote_book::{MarketSummary, QuoteError, QuoteSnapshot};
use crate::simulator::PricePoint;
use crate::types::{AssetId, Timestamp};
use std::sync::atomic::Ordering;
use std::sync::Arc;

impl Engine {
    /// Put a new asset on the book at its initial price.
    pub fn list_asset(&self, listing: AssetListing) -> AssetId {
        let asset_id = AssetId(self.next_asset_id.fetch_add(1, Ordering::Relaxed));
        let quote = AssetQuote::list(asset_id, &listing, self.config.simulator.spread_fraction, self.time());
        self.quotes.upsert(quote);

        tracing::info!(
            asset = %asset_id,
            ticker = %listing.ticker,
            price = %listing.initial_price,
            tier = ?listing.risk_tier,
            "asset listed"
        );

        self.emit_event(EventPayload::AssetListed(AssetListedEvent {
            asset_id,
            ticker: listing.ticker,
            initial_price: listing.initial_price,
        }));

        asset_id
    }

    pub fn get_quote(&self, asset_id: AssetId) -> Result<AssetQuote, QuoteError> {
        self.quotes.get(asset_id)
    }

    pub fn quote_snapshot(&self) -> Arc<QuoteSnapshot> {
        self.quotes.snapshot()
    }

    pub fn tick(&self) -> u64 {
        self.tick_at(self.time())
    }

    /// Advance every listed quote by one step. All quotes move in one published
    /// version; a reader sees either the whole tick or none of it.
    pub fn tick_at(&self, now: Timestamp) -> u64 {
        let mut assets = 0;
        let version = self.quotes.apply(|snapshot| {
            let mut simulator = self.simulator.lock();
            let updated = simulator.step_all(snapshot.iter(), now);
            assets = updated.len();
            updated
        });

        tracing::debug!(version, assets, "quotes ticked");
        self.emit_event(EventPayload::QuotesTicked(QuotesTickedEvent { version, assets }));
        version
    }

    pub fn market_summary(&self) -> MarketSummary {
        self.quotes.summary()
    }

    /// Daily chart history for an asset, ending today at its live price.
    pub fn backfill_history(&self, asset_id: AssetId, days: usize) -> Result<Vec<PricePoint>, EngineError> {
        let quote = self.quotes.get(asset_id)?;
        let now = self.time();
        let today = now
            .date()
            .unwrap_or_else(|| chrono::Utc::now().date_naive());

        let history = self.simulator.lock().backfill_history(quote.price, days, today);
        Ok(history)
    }
}
