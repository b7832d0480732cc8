// 8.0 engine/core.rs: main engine. holds the quote book, the simulator and all accounts.

use super::results::EngineError;
use crate::account::{calculate_net_worth, portfolio_allocation, Account, NetWorth};
use crate::authorizer::TradeAuthorizer;
use crate::config::EngineConfig;
use crate::events::{Event, EventId, EventPayload, KycChangedEvent};
use crate::quote_book::QuoteBook;
use crate::simulator::PriceSimulator;
use crate::types::{AccountId, Amount, KycLevel, Timestamp};
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;

pub(super) type AccountHandle = Arc<Mutex<Account>>;

#[derive(Debug)]
pub(super) struct EventLog {
    pub(super) events: Vec<Event>,
    pub(super) next_id: u64,
}

/** 8.1: main engine struct. shared behind an Arc, every operation takes &self */
pub struct Engine {
    pub(super) config: EngineConfig,
    pub(super) quotes: QuoteBook,
    pub(super) simulator: Mutex<PriceSimulator>,
    pub(super) authorizer: TradeAuthorizer,
    pub(super) accounts: RwLock<HashMap<AccountId, AccountHandle>>,
    pub(super) events: Mutex<EventLog>,
    pub(super) next_account_id: AtomicU64,
    pub(super) next_asset_id: AtomicU32,
    pub(super) next_trade_id: AtomicU64,
    // None follows the wall clock
    pub(super) pinned_time: RwLock<Option<Timestamp>>,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        config.validate()?;

        let simulator = match config.rng_seed {
            Some(seed) => PriceSimulator::seeded(config.simulator.clone(), seed),
            None => PriceSimulator::from_entropy(config.simulator.clone()),
        };
        let authorizer = TradeAuthorizer::new(config.limits.clone(), config.max_leverage);

        tracing::info!(
            max_leverage = %config.max_leverage,
            seeded = config.rng_seed.is_some(),
            "engine started"
        );

        Ok(Self {
            config,
            quotes: QuoteBook::new(),
            simulator: Mutex::new(simulator),
            authorizer,
            accounts: RwLock::new(HashMap::new()),
            events: Mutex::new(EventLog {
                events: Vec::new(),
                next_id: 1,
            }),
            next_account_id: AtomicU64::new(1),
            next_asset_id: AtomicU32::new(1),
            next_trade_id: AtomicU64::new(1),
            pinned_time: RwLock::new(None),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn quote_book(&self) -> &QuoteBook {
        &self.quotes
    }

    // pinning the clock makes timestamps deterministic
    pub fn set_time(&self, timestamp: Timestamp) {
        *self.pinned_time.write() = Some(timestamp);
    }

    pub fn advance_time(&self, millis: i64) {
        let mut pinned = self.pinned_time.write();
        let base = pinned.unwrap_or_else(Timestamp::now);
        *pinned = Some(base.plus_millis(millis));
    }

    pub fn use_system_clock(&self) {
        *self.pinned_time.write() = None;
    }

    pub fn time(&self) -> Timestamp {
        self.pinned_time.read().unwrap_or_else(Timestamp::now)
    }

    pub fn create_account(&self, kyc_level: KycLevel) -> AccountId {
        let id = AccountId(self.next_account_id.fetch_add(1, Ordering::Relaxed));
        let account = Account::new(id, kyc_level, self.time());
        self.accounts.write().insert(id, Arc::new(Mutex::new(account)));
        tracing::info!(account = %id, kyc = %kyc_level, "account created");
        id
    }

    pub(super) fn account_handle(&self, account_id: AccountId) -> Option<AccountHandle> {
        self.accounts.read().get(&account_id).cloned()
    }

    pub(super) fn require_account(&self, account_id: AccountId) -> Result<AccountHandle, EngineError> {
        self.account_handle(account_id)
            .ok_or(EngineError::AccountNotFound(account_id))
    }

    pub fn account_ids(&self) -> Vec<AccountId> {
        let mut ids: Vec<AccountId> = self.accounts.read().keys().copied().collect();
        ids.sort();
        ids
    }

    /// Consistent copy of one account, taken under its lock.
    pub fn account_snapshot(&self, account_id: AccountId) -> Result<Account, EngineError> {
        let handle = self.require_account(account_id)?;
        let account = handle.lock().clone();
        Ok(account)
    }

    /// Load a previously snapshotted account, replacing any live one with the same id.
    pub fn restore_account(&self, account: Account) {
        let id = account.id;
        self.next_account_id.fetch_max(id.0.saturating_add(1), Ordering::Relaxed);
        self.accounts.write().insert(id, Arc::new(Mutex::new(account)));
        tracing::info!(account = %id, "account restored");
    }

    pub fn set_kyc_level(&self, account_id: AccountId, level: KycLevel) -> Result<KycLevel, EngineError> {
        self.change_kyc(account_id, |_| level)
    }

    // one tier up, capped at tier 3
    pub fn upgrade_kyc(&self, account_id: AccountId) -> Result<KycLevel, EngineError> {
        self.change_kyc(account_id, |current| current.next())
    }

    fn change_kyc(&self, account_id: AccountId, f: impl FnOnce(KycLevel) -> KycLevel) -> Result<KycLevel, EngineError> {
        let handle = self.require_account(account_id)?;
        let (from, to) = {
            let mut account = handle.lock();
            let from = account.kyc_level;
            account.kyc_level = f(from);
            (from, account.kyc_level)
        };

        if from != to {
            tracing::info!(account = %account_id, %from, %to, "kyc level changed");
            self.emit_event(EventPayload::KycChanged(KycChangedEvent {
                account_id,
                from,
                to,
            }));
        }
        Ok(to)
    }

    pub fn net_worth(&self, account_id: AccountId) -> Result<Amount, EngineError> {
        Ok(self.net_worth_breakdown(account_id)?.total)
    }

    pub fn net_worth_breakdown(&self, account_id: AccountId) -> Result<NetWorth, EngineError> {
        let handle = self.require_account(account_id)?;
        let snapshot = self.quotes.snapshot();
        let worth = calculate_net_worth(&handle.lock(), &snapshot);
        if !worth.unpriced.is_empty() {
            tracing::warn!(account = %account_id, unpriced = ?worth.unpriced, "positions without a quote left out of net worth");
        }
        Ok(worth)
    }

    pub fn portfolio_allocation(&self, account_id: AccountId) -> Result<BTreeMap<String, Amount>, EngineError> {
        let handle = self.require_account(account_id)?;
        let snapshot = self.quotes.snapshot();
        let allocation = portfolio_allocation(&handle.lock(), &snapshot);
        Ok(allocation)
    }

    pub fn recent_events(&self, count: usize) -> Vec<Event> {
        let log = self.events.lock();
        let start = log.events.len().saturating_sub(count);
        log.events[start..].to_vec()
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().events.clone()
    }

    pub fn events_for(&self, account_id: AccountId) -> Vec<Event> {
        self.events
            .lock()
            .events
            .iter()
            .filter(|e| e.payload.account_id() == Some(account_id))
            .cloned()
            .collect()
    }

    pub(super) fn emit_event(&self, payload: EventPayload) {
        let timestamp = self.time();
        let mut log = self.events.lock();
        let event = Event::new(EventId(log.next_id), timestamp, payload);
        log.next_id += 1;

        tracing::trace!(event_id = event.id.0, payload = ?event.payload, "event");

        log.events.push(event);

        if log.events.len() > self.config.max_events {
            let drain_count = log.events.len() - self.config.max_events;
            log.events.drain(0..drain_count);
        }
    }
}
