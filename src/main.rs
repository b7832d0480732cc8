//! Ledger simulation.
//!
//! Runs scripted sessions against the engine: listing and ticking a market,
//! leveraged longs and shorts, tier limits, cash flows and a live ticker.

use rust_decimal_macros::dec;
use std::error::Error;
use std::sync::Arc;
use trade_ledger::*;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

type DemoResult = Result<(), Box<dyn Error>>;

#[tokio::main]
async fn main() -> DemoResult {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "trade_ledger=info,ledger_sim=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    println!("Leveraged Ledger Simulation");
    println!("Synthetic Quotes, Tiered Limits, Cash and Collateral\n");

    scenario_1_market_ticks()?;
    scenario_2_leveraged_long()?;
    scenario_3_short_collateral()?;
    scenario_4_tier_limits()?;
    scenario_5_rejections()?;
    scenario_6_cash_flows()?;
    scenario_7_market_overview()?;
    scenario_8_live_ticker().await?;

    println!("\nAll simulations completed successfully.");
    Ok(())
}

fn sandbox() -> Result<Engine, EngineError> {
    let engine = Engine::new(Environment::Sandbox.config())?;
    engine.set_time(Timestamp::from_millis(1_717_200_000_000));
    Ok(engine)
}

fn price(value: rust_decimal::Decimal) -> Price {
    Price::new_unchecked(value)
}

fn list_market(engine: &Engine) -> Vec<AssetId> {
    let listings = [
        AssetListing::new("dangcem", "Dangote Cement", AssetCategory::Equity, RiskTier::Medium, price(dec!(480))),
        AssetListing::new("fgn2034", "FGN Bond 2034", AssetCategory::FixedIncome, RiskTier::Low, price(dec!(98.5))),
        AssetListing::new("lekki", "Lekki Residential REIT", AssetCategory::RealEstate, RiskTier::Medium, price(dec!(25))),
        AssetListing::new("agrifund", "Agri Growth Fund II", AssetCategory::PrivateMarket, RiskTier::High, price(dec!(12))),
    ];
    listings.into_iter().map(|l| engine.list_asset(l)).collect()
}

fn lev(value: u32) -> Result<Leverage, Box<dyn Error>> {
    Leverage::new(value).ok_or_else(|| format!("invalid leverage {}", value).into())
}

/// Four assets across every risk tier, ticked for a simulated minute.
fn scenario_1_market_ticks() -> DemoResult {
    println!("Scenario 1: Market Ticks\n");

    let engine = sandbox()?;
    let assets = list_market(&engine);

    for _ in 0..24 {
        engine.advance_time(2_500);
        engine.tick();
    }

    for id in &assets {
        let q = engine.get_quote(*id)?;
        println!(
            "  {:<9} {:>12}  bid {:>12} ask {:>12}  range {}..{}  drift {:.3}%",
            q.ticker,
            q.price,
            q.bid,
            q.ask,
            q.day_low,
            q.day_high,
            q.change_24h
        );
    }
    println!("  Quote book version: {}\n", engine.quote_book().version());
    Ok(())
}

/// A 5x long, added to at a higher price, marked through several ticks.
fn scenario_2_leveraged_long() -> DemoResult {
    println!("Scenario 2: Leveraged Long\n");

    let engine = sandbox()?;
    let assets = list_market(&engine);
    let cement = assets[0];

    let alice = engine.create_account(KycLevel::Tier2);
    engine.deposit(alice, Amount::new(dec!(20000)), "card")?;
    println!("  Alice deposits 20,000 at Tier 2");

    let first = engine.submit_trade(TradeRequest::market(alice, cement, Side::Long, dec!(50), lev(5)?))?;
    println!("  BUY {} {} @ {} (5x), margin {}", first.quantity, first.ticker, first.price, first.margin);

    for _ in 0..10 {
        engine.advance_time(2_500);
        engine.tick();
    }

    let second = engine.submit_trade(TradeRequest::market(alice, cement, Side::Long, dec!(20), lev(5)?))?;
    println!("  BUY {} more @ {}, margin {}", second.quantity, second.price, second.margin);

    let account = engine.account_snapshot(alice)?;
    if let Some(pos) = account.get_position(cement) {
        let mark = engine.get_quote(cement)?.price;
        println!(
            "  Position: {} @ avg {}, borrowed {}, unrealized {}",
            pos.quantity,
            pos.average_price.value().round_dp(4),
            pos.borrowed_cash,
            pos.unrealized_pnl(mark).value().round_dp(2)
        );
    }

    let worth = engine.net_worth_breakdown(alice)?;
    println!("  Cash {}, position equity {}", worth.cash, worth.positions_equity.value().round_dp(2));
    println!("  Net worth: {}\n", worth.total.value().round_dp(2));
    Ok(())
}

/// Shorts lock margin plus proceeds; equity moves opposite to price.
fn scenario_3_short_collateral() -> DemoResult {
    println!("Scenario 3: Short Collateral\n");

    let engine = sandbox()?;
    let assets = list_market(&engine);
    let reit = assets[2];

    let bob = engine.create_account(KycLevel::Tier1);
    engine.deposit(bob, Amount::new(dec!(5000)), "bank transfer")?;

    let trade = engine.submit_trade(TradeRequest::market(bob, reit, Side::Short, dec!(100), lev(2)?))?;
    let account = engine.account_snapshot(bob)?;
    println!("  SELL {} {} @ {} (2x)", trade.quantity, trade.ticker, trade.price);
    println!("  Cash {}, locked collateral {}", account.cash_balance, account.locked_cash);

    let before = engine.net_worth(bob)?;
    for _ in 0..20 {
        engine.advance_time(2_500);
        engine.tick();
    }
    let after = engine.net_worth(bob)?;
    let quote = engine.get_quote(reit)?;
    println!("  {} moved to {} ({:.3}% drift)", quote.ticker, quote.price, quote.change_24h);
    println!("  Net worth {} -> {}\n", before.value().round_dp(2), after.value().round_dp(2));
    Ok(())
}

/// Tier 1 caps single-trade notional at 5,000; upgrading lifts the cap.
fn scenario_4_tier_limits() -> DemoResult {
    println!("Scenario 4: Tier Limits\n");

    let engine = sandbox()?;
    let bond = engine.list_asset(AssetListing::new(
        "tbill",
        "Treasury Bill 364D",
        AssetCategory::FixedIncome,
        RiskTier::Low,
        price(dec!(10)),
    ));

    let carol = engine.create_account(KycLevel::Tier1);
    engine.deposit(carol, Amount::new(dec!(100000)), "card")?;

    let request = TradeRequest::market(carol, bond, Side::Long, dec!(600), lev(1)?);
    match engine.submit_trade(request.clone()) {
        Ok(_) => println!("  Unexpected fill at Tier 1"),
        Err(reason) => println!("  Tier 1: {}", reason),
    }

    let level = engine.upgrade_kyc(carol)?;
    let record = engine.submit_trade(request)?;
    println!("  Upgraded to {}, filled {} for {}\n", level, record.ticker, record.total_value);
    Ok(())
}

/// Every rejection path leaves the account untouched.
fn scenario_5_rejections() -> DemoResult {
    println!("Scenario 5: Rejections\n");

    let engine = sandbox()?;
    let assets = list_market(&engine);
    let fund = assets[3];

    let dave = engine.create_account(KycLevel::Tier3);
    engine.deposit(dave, Amount::new(dec!(1000)), "card")?;
    engine.submit_trade(TradeRequest::market(dave, fund, Side::Long, dec!(50), lev(2)?))?;
    let before = engine.account_snapshot(dave)?;

    let attempts = [
        ("oversized", TradeRequest::market(dave, fund, Side::Long, dec!(500), lev(1)?)),
        ("flip", TradeRequest::market(dave, fund, Side::Short, dec!(10), lev(2)?)),
        ("leverage change", TradeRequest::market(dave, fund, Side::Long, dec!(10), lev(5)?)),
        ("unlisted", TradeRequest::market(dave, AssetId(99), Side::Long, dec!(1), lev(1)?)),
    ];

    for (label, request) in attempts {
        if let Err(reason) = engine.submit_trade(request) {
            println!("  {:<16} {}", label, reason);
        }
    }

    let after = engine.account_snapshot(dave)?;
    println!("  Account unchanged: {}\n", before == after);
    Ok(())
}

/// Deposits settle immediately, withdrawals debit at once and stay pending.
fn scenario_6_cash_flows() -> DemoResult {
    println!("Scenario 6: Cash Flows\n");

    let engine = sandbox()?;
    let erin = engine.create_account(KycLevel::Tier1);

    engine.deposit(erin, Amount::new(dec!(2500)), "card")?;
    let pending = engine.withdraw(erin, Amount::new(dec!(1000)), "GTBank - 0123")?;
    println!("  Withdrawal of {} is {:?}", pending.amount, pending.status);

    if let Err(e) = engine.withdraw(erin, Amount::new(dec!(5000)), "GTBank - 0123") {
        println!("  Oversized withdrawal: {}", e);
    }

    let account = engine.account_snapshot(erin)?;
    println!("  Balance {}, {} cash records", account.cash_balance, account.cash_history.len());
    println!("  Audit events for Erin: {}\n", engine.events_for(erin).len());
    Ok(())
}

/// Summary, allocation and chart backfill after a busy session.
fn scenario_7_market_overview() -> DemoResult {
    println!("Scenario 7: Market Overview\n");

    let engine = sandbox()?;
    let assets = list_market(&engine);
    let frank = engine.create_account(KycLevel::Tier3);
    engine.deposit(frank, Amount::new(dec!(50000)), "card")?;

    engine.submit_trade(TradeRequest::market(frank, assets[0], Side::Long, dec!(20), lev(2)?))?;
    engine.submit_trade(TradeRequest::market(frank, assets[1], Side::Long, dec!(100), lev(1)?))?;
    engine.submit_trade(TradeRequest::market(frank, assets[2], Side::Short, dec!(200), lev(1)?))?;

    for _ in 0..40 {
        engine.advance_time(2_500);
        engine.tick();
    }

    let summary = engine.market_summary();
    println!("  Total volume {}, average drift {:.3}%", summary.total_volume, summary.average_change);
    println!("  Top gainers {:?}", summary.top_gainers);
    println!("  Top losers  {:?}", summary.top_losers);

    for (bucket, amount) in engine.portfolio_allocation(frank)? {
        println!("  {:<15} {}", bucket, amount.value().round_dp(2));
    }

    let history = engine.backfill_history(assets[0], 30)?;
    if let (Some(first), Some(last)) = (history.first(), history.last()) {
        println!("  30d history {} {} -> {} {}\n", first.date, first.price, last.date, last.price);
    }
    Ok(())
}

/// Background ticker on the tokio runtime while a reader samples quotes.
async fn scenario_8_live_ticker() -> DemoResult {
    println!("Scenario 8: Live Ticker\n");

    let engine = Arc::new(Engine::new(Environment::Sandbox.config())?);
    let assets = list_market(&engine);
    let period = engine.tick_interval();

    let handle = spawn_ticker(Arc::clone(&engine), period);
    for _ in 0..4 {
        tokio::time::sleep(period).await;
        let q = engine.get_quote(assets[3])?;
        info!(version = engine.quote_book().version(), price = %q.price, "sampled");
        println!("  v{} {} {}", engine.quote_book().version(), q.ticker, q.price);
    }
    handle.abort();
    Ok(())
}
