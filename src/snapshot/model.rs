//! Dashboard-facing snapshot document
//!
//! Monetary values are emitted as JSON numbers.

use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::domain::{Position, Trade, TradeDirection};
use crate::ledger::AgentState;

fn num(value: Decimal) -> f64 {
    value.to_f64().unwrap_or(0.0)
}

/// One point of an agent's per-cycle time series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CyclePoint {
    pub cycle: u64,
    pub timestamp: DateTime<Utc>,
    pub portfolio_value: f64,
    pub cash_balance: f64,
    pub total_return: f64,
    pub total_trades: u32,
    pub win_rate: f64,
    pub num_positions: usize,
}

impl CyclePoint {
    pub fn capture(cycle: u64, state: &AgentState) -> Self {
        Self {
            cycle,
            timestamp: Utc::now(),
            portfolio_value: num(state.total_portfolio_value()),
            cash_balance: num(state.cash_balance),
            total_return: num(state.total_return()),
            total_trades: state.total_trades,
            win_rate: num(state.win_rate()),
            num_positions: state.positions.len(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionSnapshot {
    pub quantity: f64,
    pub avg_price: f64,
    pub current_price: f64,
    pub value: f64,
    pub pnl: f64,
}

impl From<&Position> for PositionSnapshot {
    fn from(position: &Position) -> Self {
        Self {
            quantity: num(position.quantity),
            avg_price: num(position.average_entry_price),
            current_price: num(position.current_price),
            value: num(position.current_value()),
            pnl: num(position.unrealized_pnl()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeSnapshot {
    pub id: u64,
    pub symbol: String,
    #[serde(rename = "type")]
    pub direction: TradeDirection,
    pub quantity: f64,
    pub price: f64,
    pub timestamp: DateTime<Utc>,
    pub reasoning: String,
}

impl From<&Trade> for TradeSnapshot {
    fn from(trade: &Trade) -> Self {
        Self {
            id: trade.id,
            symbol: trade.symbol.clone(),
            direction: trade.direction,
            quantity: num(trade.quantity),
            price: num(trade.price),
            timestamp: trade.timestamp,
            reasoning: trade.reasoning.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentSnapshot {
    pub agent_id: String,
    pub agent_name: String,
    pub kind: String,
    pub portfolio_value: f64,
    pub cash_balance: f64,
    pub total_return: f64,
    pub realized_pnl: f64,
    pub total_trades: u32,
    pub win_rate: f64,
    pub positions: BTreeMap<String, PositionSnapshot>,
    pub recent_trades: Vec<TradeSnapshot>,
    pub cycle_history: Vec<CyclePoint>,
}

impl AgentSnapshot {
    pub fn capture(
        state: &AgentState,
        kind: &str,
        history: &[CyclePoint],
        recent_trades: usize,
    ) -> Self {
        Self {
            agent_id: state.agent_id.clone(),
            agent_name: state.agent_name.clone(),
            kind: kind.to_string(),
            portfolio_value: num(state.total_portfolio_value()),
            cash_balance: num(state.cash_balance),
            total_return: num(state.total_return()),
            realized_pnl: num(state.realized_pnl),
            total_trades: state.total_trades,
            win_rate: num(state.win_rate()),
            positions: state
                .positions
                .iter()
                .map(|(symbol, position)| (symbol.clone(), PositionSnapshot::from(position)))
                .collect(),
            recent_trades: state
                .recent_trades(recent_trades)
                .iter()
                .map(TradeSnapshot::from)
                .collect(),
            cycle_history: history.to_vec(),
        }
    }
}

/// Whole-arena document written once per cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArenaSnapshot {
    pub timestamp: DateTime<Utc>,
    pub current_cycle: u64,
    pub total_cycles: u64,
    /// Sorted by portfolio value, highest first
    pub agents: Vec<AgentSnapshot>,
}

impl ArenaSnapshot {
    pub fn new(current_cycle: u64, total_cycles: u64, mut agents: Vec<AgentSnapshot>) -> Self {
        agents.sort_by(|a, b| b.portfolio_value.total_cmp(&a.portfolio_value));
        Self {
            timestamp: Utc::now(),
            current_cycle,
            total_cycles,
            agents,
        }
    }

    pub fn agent(&self, agent_id: &str) -> Option<&AgentSnapshot> {
        self.agents.iter().find(|a| a.agent_id == agent_id)
    }
}
