//! End-to-end ledger scenarios.
//!
//! Each module drives the engine through one business flow and checks the
//! resulting cash, collateral and position state against hand-computed values.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use trade_ledger::*;

fn engine() -> Engine {
    let engine = Engine::new(EngineConfig::sandbox(7)).unwrap();
    engine.set_time(Timestamp::from_millis(1_000_000));
    engine
}

fn list(engine: &Engine, ticker: &str, category: AssetCategory, price: Decimal) -> AssetId {
    engine.list_asset(AssetListing::new(
        ticker,
        ticker,
        category,
        RiskTier::Medium,
        Price::new_unchecked(price),
    ))
}

fn funded(engine: &Engine, kyc: KycLevel, cash: Decimal) -> AccountId {
    let id = engine.create_account(kyc);
    engine.deposit(id, Amount::new(cash), "card").unwrap();
    id
}

fn lev(x: u32) -> Leverage {
    Leverage::new(x).unwrap()
}

mod long_positions {
    use super::*;

    #[test]
    fn open_long_debits_margin_only() {
        let engine = engine();
        let asset = list(&engine, "LONG", AssetCategory::Equity, dec!(50));
        let trader = funded(&engine, KycLevel::Tier1, dec!(1000));

        let record = engine
            .submit_trade(TradeRequest::market(trader, asset, Side::Long, dec!(10), lev(5)))
            .unwrap();

        assert_eq!(record.total_value.value(), dec!(500));
        assert_eq!(record.margin.value(), dec!(100));
        assert_eq!(record.action, TradeAction::Buy);

        let account = engine.account_snapshot(trader).unwrap();
        assert_eq!(account.cash_balance.value(), dec!(900));
        assert!(account.locked_cash.is_zero());

        let position = account.get_position(asset).unwrap();
        assert_eq!(position.borrowed_cash.value(), dec!(400));
        assert_eq!(position.average_price.value(), dec!(50));
    }

    #[test]
    fn adding_to_long_averages_cost_at_new_quote() {
        let engine = engine();
        let asset = list(&engine, "AVG", AssetCategory::Equity, dec!(100));
        let trader = funded(&engine, KycLevel::Tier3, dec!(10000));

        engine
            .submit_trade(TradeRequest::market(trader, asset, Side::Long, dec!(10), lev(2)))
            .unwrap();

        // move the quote by hand so the second fill lands at a known price
        let mut quote = engine.get_quote(asset).unwrap();
        quote.price = Price::new_unchecked(dec!(120));
        engine.quote_book().upsert(quote);

        engine
            .submit_trade(TradeRequest::market(trader, asset, Side::Long, dec!(30), lev(2)))
            .unwrap();

        let account = engine.account_snapshot(trader).unwrap();
        let position = account.get_position(asset).unwrap();
        assert_eq!(position.quantity.value(), dec!(40));
        assert_eq!(position.average_price.value(), dec!(115));
        // 500 + 1800 margin
        assert_eq!(account.cash_balance.value(), dec!(7700));
        assert_eq!(position.borrowed_cash.value(), dec!(2300));
        assert_eq!(account.trade_history.len(), 2);
    }

    #[test]
    fn limit_order_fills_at_limit_price() {
        let engine = engine();
        let asset = list(&engine, "LMT", AssetCategory::Equity, dec!(10));
        let trader = funded(&engine, KycLevel::Tier1, dec!(1000));

        let record = engine
            .submit_trade(TradeRequest::limit(
                trader,
                asset,
                Side::Long,
                dec!(10),
                lev(1),
                Price::new_unchecked(dec!(9.5)),
            ))
            .unwrap();

        assert_eq!(record.order_type, OrderType::Limit);
        assert_eq!(record.price.value(), dec!(9.5));
        assert_eq!(engine.account_snapshot(trader).unwrap().cash_balance.value(), dec!(905));
    }
}

mod short_positions {
    use super::*;

    #[test]
    fn short_locks_margin_plus_notional() {
        let engine = engine();
        let asset = list(&engine, "SHRT", AssetCategory::RealEstate, dec!(20));
        let trader = funded(&engine, KycLevel::Tier1, dec!(1000));

        let record = engine
            .submit_trade(TradeRequest::market(trader, asset, Side::Short, dec!(10), lev(2)))
            .unwrap();
        assert_eq!(record.action, TradeAction::Sell);

        let account = engine.account_snapshot(trader).unwrap();
        assert_eq!(account.cash_balance.value(), dec!(900));
        assert_eq!(account.locked_cash.value(), dec!(300));

        let position = account.get_position(asset).unwrap();
        assert_eq!(position.quantity.value(), dec!(-10));
        assert_eq!(position.short_collateral.value(), dec!(300));
        assert!(position.borrowed_cash.is_zero());
        assert_eq!(account.locked_cash, account.total_short_collateral());
    }

    #[test]
    fn short_equity_rises_when_price_falls() {
        let engine = engine();
        let asset = list(&engine, "FALL", AssetCategory::Equity, dec!(20));
        let trader = funded(&engine, KycLevel::Tier1, dec!(1000));
        engine
            .submit_trade(TradeRequest::market(trader, asset, Side::Short, dec!(10), lev(2)))
            .unwrap();

        let mut quote = engine.get_quote(asset).unwrap();
        quote.price = Price::new_unchecked(dec!(15));
        engine.quote_book().upsert(quote);

        let worth = engine.net_worth_breakdown(trader).unwrap();
        // -10 * 15 + 300
        assert_eq!(worth.positions_equity.value(), dec!(150));
        // 900 cash + 300 locked + 150 equity
        assert_eq!(worth.total.value(), dec!(1350));
    }
}

mod rejections {
    use super::*;

    #[test]
    fn tier_one_rejects_six_thousand_notional() {
        let engine = engine();
        let asset = list(&engine, "TIER", AssetCategory::FixedIncome, dec!(10));
        let trader = funded(&engine, KycLevel::Tier1, dec!(100000));
        let request = TradeRequest::market(trader, asset, Side::Long, dec!(600), lev(1));

        let err = engine.submit_trade(request.clone()).unwrap_err();
        assert!(matches!(
            err,
            TradeRejection::Authorization(AuthorizationError::LimitExceeded { level: KycLevel::Tier1, .. })
        ));

        assert_eq!(engine.upgrade_kyc(trader).unwrap(), KycLevel::Tier2);
        assert!(engine.submit_trade(request).is_ok());
    }

    #[test]
    fn insufficient_margin_reports_shortfall() {
        let engine = engine();
        let asset = list(&engine, "MRGN", AssetCategory::Equity, dec!(5));
        let trader = funded(&engine, KycLevel::Tier1, dec!(100));

        let err = engine
            .submit_trade(TradeRequest::market(trader, asset, Side::Long, dec!(100), lev(1)))
            .unwrap_err();
        assert_eq!(
            err,
            TradeRejection::Authorization(AuthorizationError::InsufficientMargin {
                required: Amount::new(dec!(500)),
                available: Amount::new(dec!(100)),
                shortfall: Amount::new(dec!(400)),
            })
        );

        let ok = engine
            .submit_trade(TradeRequest::market(trader, asset, Side::Long, dec!(100), lev(10)))
            .unwrap();
        assert_eq!(ok.margin.value(), dec!(50));
    }

    #[test]
    fn unknown_asset_and_account() {
        let engine = engine();
        let asset = list(&engine, "KNOWN", AssetCategory::Equity, dec!(5));
        let trader = funded(&engine, KycLevel::Tier1, dec!(100));

        let err = engine
            .submit_trade(TradeRequest::market(trader, AssetId(404), Side::Long, dec!(1), lev(1)))
            .unwrap_err();
        assert_eq!(err, TradeRejection::QuoteNotFound(AssetId(404)));

        let err = engine
            .submit_trade(TradeRequest::market(AccountId(404), asset, Side::Long, dec!(1), lev(1)))
            .unwrap_err();
        assert_eq!(err, TradeRejection::AccountNotFound(AccountId(404)));
    }

    #[test]
    fn rejected_trades_leave_account_untouched() {
        let engine = engine();
        let asset = list(&engine, "SAFE", AssetCategory::Equity, dec!(10));
        let trader = funded(&engine, KycLevel::Tier1, dec!(1000));
        engine
            .submit_trade(TradeRequest::market(trader, asset, Side::Long, dec!(10), lev(2)))
            .unwrap();
        let before = engine.account_snapshot(trader).unwrap();

        let flip = engine.submit_trade(TradeRequest::market(trader, asset, Side::Short, dec!(5), lev(2)));
        assert!(matches!(
            flip,
            Err(TradeRejection::Ledger(LedgerError::UnsupportedDirectionFlip { .. }))
        ));

        let relever = engine.submit_trade(TradeRequest::market(trader, asset, Side::Long, dec!(5), lev(5)));
        assert!(matches!(
            relever,
            Err(TradeRejection::Ledger(LedgerError::LeverageMismatch { .. }))
        ));

        let zero = engine.submit_trade(TradeRequest::market(trader, asset, Side::Long, dec!(0), lev(2)));
        assert!(matches!(
            zero,
            Err(TradeRejection::Authorization(AuthorizationError::InvalidTrade { .. }))
        ));

        assert_eq!(engine.account_snapshot(trader).unwrap(), before);

        let rejected = engine
            .events_for(trader)
            .iter()
            .filter(|e| matches!(e.payload, EventPayload::TradeRejected(_)))
            .count();
        assert_eq!(rejected, 3);
    }

    #[test]
    fn unrepresentable_quantity_is_rejected_not_fatal() {
        let engine = engine();
        let asset = list(&engine, "HUGE", AssetCategory::Equity, dec!(10));
        let trader = funded(&engine, KycLevel::Tier3, dec!(1000));
        let before = engine.account_snapshot(trader).unwrap();
        let request = TradeRequest::market(trader, asset, Side::Long, Decimal::MAX, Leverage::one());

        let preview = engine.preview_trade(&request);
        assert!(matches!(
            preview,
            Err(TradeRejection::Authorization(AuthorizationError::InvalidTrade { .. }))
        ));

        let err = engine.submit_trade(request).unwrap_err();
        assert!(matches!(
            err,
            TradeRejection::Authorization(AuthorizationError::InvalidTrade { .. })
        ));
        assert_eq!(engine.account_snapshot(trader).unwrap(), before);
        assert!(engine.get_quote(asset).unwrap().volume_24h.is_zero());

        // the account lock was released and the account still trades
        engine
            .submit_trade(TradeRequest::market(trader, asset, Side::Long, dec!(1), Leverage::one()))
            .unwrap();
    }

    #[test]
    fn add_that_outgrows_cost_basis_is_rejected() {
        let engine = engine();
        let asset = list(&engine, "BIG", AssetCategory::Equity, dec!(1));
        let trader = funded(&engine, KycLevel::Tier3, Decimal::MAX / dec!(2));

        engine
            .submit_trade(TradeRequest::market(trader, asset, Side::Long, Decimal::MAX / dec!(4), lev(10)))
            .unwrap();
        let before = engine.account_snapshot(trader).unwrap();

        // fits as a single notional, overflows once added to the open position
        let err = engine
            .submit_trade(TradeRequest::market(trader, asset, Side::Long, Decimal::MAX / dec!(1.25), lev(10)))
            .unwrap_err();
        assert_eq!(
            err,
            TradeRejection::Ledger(LedgerError::NotionalOutOfRange { asset_id: asset })
        );
        assert_eq!(engine.account_snapshot(trader).unwrap(), before);
    }

    #[test]
    fn rejected_trade_does_not_consume_volume() {
        let engine = engine();
        let asset = list(&engine, "VOL", AssetCategory::Equity, dec!(10));
        let trader = funded(&engine, KycLevel::Tier1, dec!(10));

        let _ = engine.submit_trade(TradeRequest::market(trader, asset, Side::Long, dec!(100), lev(1)));
        assert!(engine.get_quote(asset).unwrap().volume_24h.is_zero());

        engine
            .submit_trade(TradeRequest::market(trader, asset, Side::Long, dec!(1), lev(1)))
            .unwrap();
        assert_eq!(engine.get_quote(asset).unwrap().volume_24h.value(), dec!(10));
    }
}

mod cash {
    use super::*;

    #[test]
    fn withdrawal_pending_and_debited() {
        let engine = engine();
        let id = funded(&engine, KycLevel::Tier1, dec!(2500));

        let record = engine.withdraw(id, Amount::new(dec!(1000)), "GTBank - 0123").unwrap();
        assert_eq!(record.status, CashStatus::Pending);
        assert_eq!(record.method, "GTBank - 0123");

        let account = engine.account_snapshot(id).unwrap();
        assert_eq!(account.cash_balance.value(), dec!(1500));
        assert_eq!(account.cash_history.len(), 2);
    }

    #[test]
    fn oversized_withdrawal_rejected_and_audited() {
        let engine = engine();
        let id = funded(&engine, KycLevel::Tier1, dec!(100));

        let err = engine.withdraw(id, Amount::new(dec!(150)), "bank").unwrap_err();
        assert!(matches!(
            err,
            EngineError::Account(AccountError::InsufficientFunds { .. })
        ));

        let account = engine.account_snapshot(id).unwrap();
        assert_eq!(account.cash_balance.value(), dec!(100));
        assert_eq!(account.cash_history.len(), 1);

        let failed: Vec<_> = engine
            .events_for(id)
            .into_iter()
            .filter_map(|e| match e.payload {
                EventPayload::WithdrawalRejected(r) => Some(r.record.status),
                _ => None,
            })
            .collect();
        assert_eq!(failed, vec![CashStatus::Failed]);
    }

    #[test]
    fn deposit_past_decimal_range_rejected() {
        let engine = engine();
        let id = funded(&engine, KycLevel::Tier1, dec!(100));

        let err = engine.deposit(id, Amount::new(Decimal::MAX), "card").unwrap_err();
        assert!(matches!(err, EngineError::Account(AccountError::BalanceOutOfRange(_))));
        assert_eq!(engine.account_snapshot(id).unwrap().cash_balance.value(), dec!(100));
    }

    #[test]
    fn withdraw_entire_balance() {
        let engine = engine();
        let id = funded(&engine, KycLevel::Tier1, dec!(100));
        engine.withdraw(id, Amount::new(dec!(100)), "bank").unwrap();
        assert!(engine.account_snapshot(id).unwrap().cash_balance.is_zero());
    }

    #[test]
    fn unknown_account() {
        let engine = engine();
        let err = engine.deposit(AccountId(9), Amount::new(dec!(1)), "card").unwrap_err();
        assert!(matches!(err, EngineError::AccountNotFound(AccountId(9))));
    }
}

mod net_worth {
    use super::*;

    #[test]
    fn zero_positions_is_sum_of_balances() {
        let engine = engine();
        let id = funded(&engine, KycLevel::Tier1, dec!(1234.56));
        let mut account = engine.account_snapshot(id).unwrap();
        account.unsettled_balance = Amount::new(dec!(10));
        account.locked_cash = Amount::new(dec!(5));
        engine.restore_account(account);

        assert_eq!(engine.net_worth(id).unwrap().value(), dec!(1249.56));
    }

    #[test]
    fn restored_snapshot_values_identically() {
        let engine = engine();
        let a = list(&engine, "AAA", AssetCategory::Equity, dec!(40));
        let b = list(&engine, "BBB", AssetCategory::PrivateMarket, dec!(7));
        let id = funded(&engine, KycLevel::Tier3, dec!(50000));

        engine.submit_trade(TradeRequest::market(id, a, Side::Long, dec!(100), lev(5))).unwrap();
        engine.submit_trade(TradeRequest::market(id, b, Side::Short, dec!(300), lev(2))).unwrap();
        for _ in 0..5 {
            engine.tick();
        }

        let expected = engine.net_worth(id).unwrap();
        let json = serde_json::to_string(&engine.account_snapshot(id).unwrap()).unwrap();

        let fresh = Engine::new(EngineConfig::sandbox(7)).unwrap();
        fresh.quote_book().apply(|_| engine.quote_snapshot().iter().cloned().collect());
        fresh.restore_account(serde_json::from_str(&json).unwrap());

        assert_eq!(fresh.net_worth(id).unwrap(), expected);
        // restored ids are never handed out again
        assert!(fresh.create_account(KycLevel::Tier1) > id);
    }

    #[test]
    fn restoring_highest_account_id_is_safe() {
        let engine = engine();
        let first = engine.create_account(KycLevel::Tier1);
        let top = Account::new(AccountId(u64::MAX), KycLevel::Tier2, Timestamp::from_millis(0));

        engine.restore_account(top);
        assert_eq!(engine.account_ids(), vec![first, AccountId(u64::MAX)]);
        assert_eq!(engine.account_snapshot(AccountId(u64::MAX)).unwrap().kyc_level, KycLevel::Tier2);
    }

    #[test]
    fn allocation_by_category() {
        let engine = engine();
        let a = list(&engine, "EQ", AssetCategory::Equity, dec!(10));
        let b = list(&engine, "RE", AssetCategory::RealEstate, dec!(20));
        let id = funded(&engine, KycLevel::Tier3, dec!(10000));

        engine.submit_trade(TradeRequest::market(id, a, Side::Long, dec!(100), lev(1))).unwrap();
        engine.submit_trade(TradeRequest::market(id, b, Side::Short, dec!(10), lev(1))).unwrap();

        let allocation = engine.portfolio_allocation(id).unwrap();
        // 10000 - 1000 - 200
        assert_eq!(allocation["Cash"].value(), dec!(8800));
        assert_eq!(allocation["Equity"].value(), dec!(1000));
        assert_eq!(allocation["Real Estate"].value(), dec!(200));
    }
}

mod market_data {
    use super::*;

    #[test]
    fn listing_initializes_quote() {
        let engine = engine();
        let id = list(&engine, "dangcem", AssetCategory::Equity, dec!(480));
        let quote = engine.get_quote(id).unwrap();

        assert_eq!(quote.ticker, "DANGCEM");
        assert_eq!(quote.day_high, quote.price);
        assert_eq!(quote.day_low, quote.price);
        assert_eq!(quote.bid.value(), dec!(478.8));
        assert_eq!(quote.ask.value(), dec!(481.2));
        assert_eq!(quote.last_update, Timestamp::from_millis(1_000_000));
    }

    #[test]
    fn tick_bumps_version_and_moves_every_quote_together() {
        let engine = engine();
        for i in 0..5 {
            list(&engine, &format!("T{}", i), AssetCategory::Equity, dec!(100));
        }
        let listed_version = engine.quote_book().version();

        engine.advance_time(2_500);
        let version = engine.tick();

        assert_eq!(version, listed_version + 1);
        let snapshot = engine.quote_snapshot();
        assert!(snapshot.iter().all(|q| q.last_update == Timestamp::from_millis(1_002_500)));
        assert!(snapshot.iter().all(|q| q.is_consistent()));
    }

    #[test]
    fn listing_at_decimal_ceiling_ticks_without_fault() {
        let engine = engine();
        let id = list(&engine, "CEIL", AssetCategory::Equity, Decimal::MAX);
        assert!(engine.get_quote(id).unwrap().is_consistent());

        for _ in 0..50 {
            engine.tick();
        }
        let quote = engine.get_quote(id).unwrap();
        assert!(quote.is_consistent());
        assert!(quote.price.value() <= Decimal::MAX);
        assert_eq!(quote.day_high.value(), Decimal::MAX);
    }

    #[test]
    fn recent_events_returns_newest_tail() {
        let engine = engine();
        list(&engine, "EV1", AssetCategory::Equity, dec!(10));
        list(&engine, "EV2", AssetCategory::Equity, dec!(20));
        engine.tick();
        engine.tick();

        let tail = engine.recent_events(2);
        assert_eq!(tail.len(), 2);
        assert!(tail.iter().all(|e| matches!(e.payload, EventPayload::QuotesTicked(_))));
        assert!(tail[0].id < tail[1].id);
        let all: Vec<EventId> = engine.events().iter().map(|e| e.id).collect();
        let capped: Vec<EventId> = engine.recent_events(100).iter().map(|e| e.id).collect();
        assert_eq!(capped, all);
        assert_eq!(all.len(), 4);
    }

    #[test]
    fn releasing_the_pinned_clock_follows_wall_time() {
        let engine = engine();
        assert_eq!(engine.time(), Timestamp::from_millis(1_000_000));

        let before = Timestamp::now();
        engine.use_system_clock();
        let id = list(&engine, "WALL", AssetCategory::Equity, dec!(10));

        assert!(engine.time() >= before);
        assert!(engine.get_quote(id).unwrap().last_update >= before);
    }

    #[test]
    fn same_seed_same_session() {
        let run = || {
            let engine = engine();
            let id = list(&engine, "SEED", AssetCategory::Equity, dec!(100));
            for _ in 0..100 {
                engine.tick();
            }
            engine.get_quote(id).unwrap().price
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn summary_counts_traded_volume() {
        let engine = engine();
        let a = list(&engine, "A", AssetCategory::Equity, dec!(10));
        let id = funded(&engine, KycLevel::Tier1, dec!(1000));
        engine.submit_trade(TradeRequest::market(id, a, Side::Long, dec!(20), lev(2))).unwrap();

        assert_eq!(engine.market_summary().total_volume.value(), dec!(200));
    }

    #[test]
    fn backfill_ends_at_live_price() {
        let engine = engine();
        let a = list(&engine, "HIST", AssetCategory::Equity, dec!(75));

        let history = engine.backfill_history(a, 30).unwrap();
        assert_eq!(history.len(), 30);
        assert_eq!(history.last().unwrap().price.value(), dec!(75));

        assert!(matches!(
            engine.backfill_history(AssetId(77), 30),
            Err(EngineError::Quote(QuoteError::NotFound(_)))
        ));
    }
}

mod kyc {
    use super::*;

    #[test]
    fn upgrade_caps_and_set_assigns() {
        let engine = engine();
        let id = engine.create_account(KycLevel::Tier1);

        assert_eq!(engine.upgrade_kyc(id).unwrap(), KycLevel::Tier2);
        assert_eq!(engine.upgrade_kyc(id).unwrap(), KycLevel::Tier3);
        assert_eq!(engine.upgrade_kyc(id).unwrap(), KycLevel::Tier3);
        assert_eq!(engine.set_kyc_level(id, KycLevel::Tier1).unwrap(), KycLevel::Tier1);

        // the capped upgrade is not a change
        let changes = engine
            .events_for(id)
            .iter()
            .filter(|e| matches!(e.payload, EventPayload::KycChanged(_)))
            .count();
        assert_eq!(changes, 3);
    }
}

mod previews {
    use super::*;

    #[test]
    fn preview_matches_submission_without_committing() {
        let engine = engine();
        let asset = list(&engine, "PRV", AssetCategory::Equity, dec!(20));
        let id = funded(&engine, KycLevel::Tier1, dec!(1000));
        let request = TradeRequest::market(id, asset, Side::Short, dec!(10), lev(2));

        let preview = engine.preview_trade(&request).unwrap();
        assert_eq!(preview.cash_after.value(), dec!(900));
        assert_eq!(preview.locked_after.value(), dec!(300));
        assert_eq!(engine.account_snapshot(id).unwrap().cash_balance.value(), dec!(1000));

        engine.submit_trade(request).unwrap();
        let account = engine.account_snapshot(id).unwrap();
        assert_eq!(account.cash_balance, preview.cash_after);
        assert_eq!(account.get_position(asset), Some(&preview.position_after));
    }
}
