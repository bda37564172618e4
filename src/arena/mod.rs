//! Cycle Orchestrator
//!
//! Drives the repeating protocol: refresh quotes once, fan out decisions
//! concurrently, settle and apply each intent, snapshot, sleep, repeat.

mod leaderboard;
mod orchestrator;
mod report;
mod stop;

pub use leaderboard::{leaderboard, render as render_leaderboard, LeaderboardRow};
pub use orchestrator::{Arena, RunSummary};
pub use report::{AgentCycleOutcome, AgentOutcome, CycleReport};
pub use stop::{install_signal_handlers, StopHandle, StopReason};
