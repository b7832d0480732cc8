// trade-ledger: leveraged position and cash ledger over a synthetic market.
// the simulator writes quotes, the engine reads them to authorize and book trades.
// all money math is decimal; randomness is injected so sessions replay under a seed.
//
// file map (search X.0 for structs, X.1+ for logic):
//   1.x  types.rs: primitives: AssetId, Side, Price, Amount, Leverage, KycLevel
//   2.x  quote.rs: asset listing and quote shape, bid/ask spread
//   3.x  quote_book.rs: copy-on-write quote store, market summary
//   4.x  position.rs: position struct, open/increase, equity contribution
//   5.x  authorizer.rs: pre-trade checks: tier ceiling, margin
//   6.x  history.rs: trade and cash records
//   7.x  config.rs: limits, simulator params, env presets
//   8.x  engine/: coordinator: pricing, trading, cash, ticker
//   9.x  simulator.rs: random-walk price ticks, history backfill
//   10.x account.rs: cash/collateral ledger, net worth, allocation
//   11.x events.rs: state transition events for audit

// core ledger modules
pub mod account;
pub mod authorizer;
pub mod engine;
pub mod events;
pub mod history;
pub mod position;
pub mod types;

// market data modules
pub mod quote;
pub mod quote_book;
pub mod simulator;

pub mod config;

// re exports for convenience
pub use account::*;
pub use authorizer::*;
pub use engine::*;
pub use events::*;
pub use history::*;
pub use position::*;
pub use quote::*;
pub use quote_book::*;
pub use simulator::*;
pub use types::*;
pub use config::{ConfigError, EngineConfig, Environment, SimulatorParams, TradeLimits};
