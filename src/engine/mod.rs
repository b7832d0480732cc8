// 8.0: ledger engine. coordinates listings, quote ticks, trade submission,
// cash movements and KYC changes. safe to share across threads behind an Arc.

mod cash;
mod core;
mod pricing;
mod results;
mod ticker;
mod trading;

pub use core::Engine;
pub use results::{EngineError, TradePreview, TradeRejection};
pub use ticker::spawn_ticker;
