pub mod agents;
pub mod arena;
pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod exchange;
pub mod ledger;
pub mod logging;
pub mod market_data;
pub mod snapshot;

pub use agents::{AgentRegistry, DecisionContext, DecisionProvider, LlmAgent, MomentumAgent};
pub use arena::{Arena, CycleReport, RunSummary, StopHandle, StopReason};
pub use config::{AppConfig, SettlementMode};
pub use error::{ArenaError, LedgerRejection, Result};
pub use exchange::{SettlementEngine, SettlementFactory, SimulatedExchange};
pub use ledger::AgentState;
pub use market_data::{build_market_data, MarketDataSource};
pub use snapshot::{ArenaSnapshot, InMemorySink, JsonFileSink, SnapshotSink};
