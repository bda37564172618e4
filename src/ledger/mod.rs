//! Portfolio Ledger - per-agent accounting
//!
//! Cash, signed positions, weighted-average cost basis and realized /
//! unrealized P&L for each agent in the arena.

mod portfolio;

pub use portfolio::{AgentState, AppliedTrade};
