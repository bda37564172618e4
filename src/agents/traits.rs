//! DecisionProvider trait: the per-cycle agent interface
//!
//! The orchestrator owns every provider and calls `decide()` once per cycle
//! with a read-only view of that agent's portfolio and the cycle's quotes.

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::{Position, QuoteBook, TradeIntent};
use crate::error::Result;

/// Everything an agent may look at when deciding
#[derive(Debug, Clone)]
pub struct DecisionContext {
    pub cycle: u64,
    /// Identical for every agent in the cycle
    pub quotes: Arc<QuoteBook>,
    pub portfolio_value: Decimal,
    pub cash_balance: Decimal,
    pub positions: HashMap<String, Position>,
}

impl DecisionContext {
    pub fn position(&self, symbol: &str) -> Option<&Position> {
        self.positions.get(symbol)
    }
}

/// A participant in the arena.
///
/// Implementations may be slow, fail, or decline to trade. Returning
/// `Ok(None)` means hold; an `Err` is logged and treated as hold.
#[async_trait]
pub trait DecisionProvider: Send + Sync {
    fn id(&self) -> &str;

    fn name(&self) -> &str;

    /// Strategy kind tag (momentum, openai, deepseek, ...)
    fn kind(&self) -> &str;

    async fn decide(&mut self, ctx: &DecisionContext) -> Result<Option<TradeIntent>>;

    /// Explanation for the most recent decision
    fn reasoning(&self) -> String;
}
