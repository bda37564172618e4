use async_trait::async_trait;
use rust_decimal::Decimal;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::domain::{ExecutionVenue, Trade, TradeIntent};
use crate::error::Result;

/// Settlement capability used by the arena.
///
/// Business-rule violations (insufficient funds or holdings) come back as a
/// `FAILED` trade. `Err` is reserved for transport faults.
#[async_trait]
pub trait SettlementEngine: Send + Sync {
    fn venue(&self) -> ExecutionVenue;

    async fn settle(&self, intent: TradeIntent) -> Result<Trade>;

    async fn balance_of(&self, asset: &str) -> Decimal;
}

/// Monotonically increasing trade id source, shared by every engine of a run
#[derive(Debug, Clone, Default)]
pub struct TradeSequence {
    next: Arc<AtomicU64>,
}

impl TradeSequence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&self) -> u64 {
        self.next.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Last id handed out (0 before the first trade)
    pub fn current(&self) -> u64 {
        self.next.load(Ordering::SeqCst)
    }
}
