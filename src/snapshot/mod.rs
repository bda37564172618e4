//! State Snapshot Sink
//!
//! The arena hands a full `ArenaSnapshot` to the sink after every cycle.
//! Sinks are best-effort: a write error is logged by the caller and never
//! affects ledger state.

mod json_file;
mod memory;
mod model;

pub use json_file::JsonFileSink;
pub use memory::InMemorySink;
pub use model::{AgentSnapshot, ArenaSnapshot, CyclePoint, PositionSnapshot, TradeSnapshot};

use async_trait::async_trait;

use crate::error::Result;

#[async_trait]
pub trait SnapshotSink: Send + Sync {
    async fn write(&self, snapshot: &ArenaSnapshot) -> Result<()>;
}
