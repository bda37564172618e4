//! Ranked agent table

use rust_decimal::Decimal;
use serde::Serialize;
use tabled::{Table, Tabled};

use crate::ledger::AgentState;

#[derive(Debug, Clone, Serialize, Tabled)]
pub struct LeaderboardRow {
    #[tabled(rename = "#")]
    pub rank: usize,
    #[tabled(rename = "Agent")]
    pub agent: String,
    #[tabled(rename = "Portfolio")]
    pub portfolio_value: String,
    #[tabled(rename = "Return")]
    pub total_return: String,
    #[tabled(rename = "Cash")]
    pub cash: String,
    #[tabled(rename = "Positions")]
    pub positions: usize,
    #[tabled(rename = "Trades")]
    pub trades: u32,
    #[tabled(rename = "Win Rate")]
    pub win_rate: String,
}

/// Rows sorted by portfolio value, highest first
pub fn leaderboard<'a>(states: impl IntoIterator<Item = &'a AgentState>) -> Vec<LeaderboardRow> {
    let mut ranked: Vec<(Decimal, &AgentState)> = states
        .into_iter()
        .map(|s| (s.total_portfolio_value(), s))
        .collect();
    ranked.sort_by(|a, b| b.0.cmp(&a.0));

    ranked
        .into_iter()
        .enumerate()
        .map(|(i, (value, state))| LeaderboardRow {
            rank: i + 1,
            agent: state.agent_name.clone(),
            portfolio_value: format!("${:.2}", value),
            total_return: signed_pct(state.total_return()),
            cash: format!("${:.2}", state.cash_balance),
            positions: state.positions.len(),
            trades: state.total_trades,
            win_rate: format!("{:.1}%", state.win_rate()),
        })
        .collect()
}

fn signed_pct(value: Decimal) -> String {
    if value < Decimal::ZERO {
        format!("{:.2}%", value)
    } else {
        format!("+{:.2}%", value)
    }
}

pub fn render(rows: &[LeaderboardRow]) -> String {
    if rows.is_empty() {
        return "(no agents)".to_string();
    }
    Table::new(rows).to_string()
}
