// 9.0: synthetic market data. each tick moves every quote by a bounded random step.
// step size comes from the asset's risk tier, direction from a slightly biased coin.
// the rng is injected so a seeded generator replays the exact same session.

use crate::config::SimulatorParams;
use crate::quote::{spread_around, AssetQuote};
use crate::types::{Price, Timestamp};
use chrono::{Duration, NaiveDate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

// daily volatility used when backfilling chart history
const HISTORY_VOLATILITY: Decimal = dec!(0.02);

// uniform draws are integers in [0, 10^9) scaled down, so no floats touch prices
const FRACTION_SCALE: u32 = 9;
const FRACTION_RANGE: i64 = 1_000_000_000;

/// Uniform value in `[0, 1)` with nine decimal places.
pub fn uniform_fraction<R: Rng + ?Sized>(rng: &mut R) -> Decimal {
    Decimal::new(rng.gen_range(0..FRACTION_RANGE), FRACTION_SCALE)
}

/// Signed fractional move for one tick: magnitude uniform in `[0, volatility)`.
pub fn draw_drift<R: Rng + ?Sized>(rng: &mut R, volatility: Decimal, up_probability: f64) -> Decimal {
    let magnitude = uniform_fraction(rng) * volatility;
    if rng.gen_bool(up_probability) {
        magnitude
    } else {
        -magnitude
    }
}

/// Apply an already drawn drift to a quote. Pure; total over any valid quote.
/// A move that would leave the decimal range holds the previous price.
pub fn apply_drift(quote: &AssetQuote, drift: Decimal, params: &SimulatorParams, now: Timestamp) -> AssetQuote {
    let new_price = quote
        .price
        .value()
        .checked_mul(Decimal::ONE + drift)
        .map(|raw| raw.round_dp(params.price_dp).max(params.price_floor))
        .and_then(Price::new)
        .unwrap_or(quote.price);
    let (bid, ask) = spread_around(new_price, params.spread_fraction);

    AssetQuote {
        price: new_price,
        bid,
        ask,
        day_high: quote.day_high.max(new_price),
        day_low: quote.day_low.min(new_price),
        change_24h: quote.change_24h.saturating_add(drift * dec!(100)),
        last_update: now.max(quote.last_update),
        ..quote.clone()
    }
}

/// One dated point of backfilled history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub price: Price,
}

pub struct PriceSimulator<R: Rng = StdRng> {
    params: SimulatorParams,
    rng: R,
}

impl PriceSimulator<StdRng> {
    pub fn seeded(params: SimulatorParams, seed: u64) -> Self {
        Self::new(params, StdRng::seed_from_u64(seed))
    }

    pub fn from_entropy(params: SimulatorParams) -> Self {
        Self::new(params, StdRng::from_entropy())
    }
}

impl<R: Rng> PriceSimulator<R> {
    pub fn new(params: SimulatorParams, rng: R) -> Self {
        Self { params, rng }
    }

    pub fn params(&self) -> &SimulatorParams {
        &self.params
    }

    /// Advance a single quote by one tick.
    pub fn step(&mut self, quote: &AssetQuote, now: Timestamp) -> AssetQuote {
        let volatility = self.params.volatility(quote.risk_tier);
        let drift = draw_drift(&mut self.rng, volatility, self.params.up_probability);
        apply_drift(quote, drift, &self.params, now)
    }

    /// Advance a whole set of quotes with one shared tick time.
    /// Iteration order decides which draw each asset gets, so callers pass a stable order.
    pub fn step_all<'a, I>(&mut self, quotes: I, now: Timestamp) -> Vec<AssetQuote>
    where
        I: IntoIterator<Item = &'a AssetQuote>,
    {
        quotes.into_iter().map(|q| self.step(q, now)).collect()
    }

    // 9.1: chart history ending today at `current`. walks backwards with a symmetric
    // daily move so the newest point always equals the live price.
    pub fn backfill_history(&mut self, current: Price, days: usize, today: NaiveDate) -> Vec<PricePoint> {
        let mut history = Vec::with_capacity(days);
        let mut price = current.value();

        for offset in 0..days {
            let date = today - Duration::days(offset as i64);
            history.push(PricePoint {
                date,
                price: Price::new_unchecked(price),
            });

            let swing = (uniform_fraction(&mut self.rng) - dec!(0.5)) * dec!(2);
            let change = swing * price * HISTORY_VOLATILITY;
            price = price
                .saturating_sub(change)
                .round_dp(self.params.price_dp)
                .max(self.params.price_floor);
        }

        history.reverse();
        history
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quote::AssetListing;
    use crate::types::{AssetCategory, AssetId, RiskTier};

    fn quote(tier: RiskTier, price: Decimal) -> AssetQuote {
        let listing = AssetListing::new("TEST", "Test Asset", AssetCategory::Equity, tier, Price::new_unchecked(price));
        AssetQuote::list(AssetId(1), &listing, dec!(0.005), Timestamp::from_millis(0))
    }

    #[test]
    fn drift_bounded_by_tier() {
        let params = SimulatorParams::default();
        let mut sim = PriceSimulator::seeded(params, 7);

        for tier in [RiskTier::Low, RiskTier::Medium, RiskTier::High] {
            let start = quote(tier, dec!(100));
            let vol = sim.params().volatility(tier);
            for i in 0..200 {
                let next = sim.step(&start, Timestamp::from_millis(i));
                let moved = ((next.price.value() - dec!(100)) / dec!(100)).abs();
                assert!(moved <= vol, "{:?} moved {} > {}", tier, moved, vol);
            }
        }
    }

    #[test]
    fn upward_drift_updates_extrema_and_change() {
        let params = SimulatorParams::default();
        let start = quote(RiskTier::High, dec!(100));

        let next = apply_drift(&start, dec!(0.01), &params, Timestamp::from_millis(5));
        assert_eq!(next.price.value(), dec!(101));
        assert_eq!(next.day_high.value(), dec!(101));
        assert_eq!(next.day_low.value(), dec!(100));
        assert_eq!(next.change_24h, dec!(1));
        assert_eq!(next.bid.value(), dec!(100.7475));
        assert_eq!(next.ask.value(), dec!(101.2525));
        assert_eq!(next.last_update, Timestamp::from_millis(5));
    }

    #[test]
    fn change_accumulates_additively() {
        let params = SimulatorParams::default();
        let start = quote(RiskTier::High, dec!(100));

        let up = apply_drift(&start, dec!(0.01), &params, Timestamp::from_millis(1));
        let down = apply_drift(&up, dec!(-0.01), &params, Timestamp::from_millis(2));

        // +1% then -1% nets to zero drift even though price is below 100
        assert_eq!(down.change_24h, Decimal::ZERO);
        assert_eq!(down.price.value(), dec!(99.99));
        assert_eq!(down.day_low.value(), dec!(99.99));
        assert_eq!(down.day_high.value(), dec!(101));
    }

    #[test]
    fn price_clamped_to_floor() {
        let params = SimulatorParams::default();
        let start = quote(RiskTier::High, dec!(0.01));

        let next = apply_drift(&start, dec!(-0.015), &params, Timestamp::from_millis(1));
        assert_eq!(next.price.value(), dec!(0.01));
        assert!(next.is_consistent());
    }

    #[test]
    fn price_at_decimal_ceiling_holds() {
        let params = SimulatorParams::default();
        let start = quote(RiskTier::High, Decimal::MAX);

        let next = apply_drift(&start, dec!(0.015), &params, Timestamp::from_millis(1));
        assert_eq!(next.price, start.price);
        assert!(next.is_consistent());

        let down = apply_drift(&next, dec!(-0.015), &params, Timestamp::from_millis(2));
        assert!(down.price < start.price);
        assert!(down.is_consistent());
    }

    #[test]
    fn last_update_never_goes_backwards() {
        let params = SimulatorParams::default();
        let mut start = quote(RiskTier::Low, dec!(50));
        start.last_update = Timestamp::from_millis(1_000);

        let next = apply_drift(&start, dec!(0.001), &params, Timestamp::from_millis(500));
        assert_eq!(next.last_update, Timestamp::from_millis(1_000));
    }

    #[test]
    fn seeded_runs_are_reproducible() {
        let start = quote(RiskTier::Medium, dec!(42));
        let mut a = PriceSimulator::seeded(SimulatorParams::default(), 99);
        let mut b = PriceSimulator::seeded(SimulatorParams::default(), 99);

        let mut qa = start.clone();
        let mut qb = start;
        for i in 0..50 {
            qa = a.step(&qa, Timestamp::from_millis(i));
            qb = b.step(&qb, Timestamp::from_millis(i));
        }
        assert_eq!(qa, qb);
    }

    #[test]
    fn backfill_ends_at_current_price() {
        let mut sim = PriceSimulator::seeded(SimulatorParams::default(), 3);
        let today = NaiveDate::from_ymd_opt(2024, 6, 30).unwrap();
        let current = Price::new_unchecked(dec!(250));

        let history = sim.backfill_history(current, 365, today);

        assert_eq!(history.len(), 365);
        assert_eq!(history.last().unwrap().price, current);
        assert_eq!(history.last().unwrap().date, today);
        assert!(history.windows(2).all(|w| w[0].date < w[1].date));
        assert!(history.iter().all(|p| p.price.value() >= dec!(0.01)));
    }
}
