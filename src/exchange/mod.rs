//! Trade Settlement Engine
//!
//! Validates trade intents against a simulated liquidity ledger and returns
//! an executed or failed `Trade`.

pub mod factory;
mod simulated;
mod traits;

pub use factory::SettlementFactory;
pub use simulated::{LiquidityLedger, SettlementDelay, SettlementStats, SimulatedExchange};
pub use traits::{SettlementEngine, TradeSequence};
