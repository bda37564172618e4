//! Per-cycle outcome summary

use rust_decimal::Decimal;
use std::time::Duration;

use crate::domain::TradeDirection;
use crate::error::LedgerRejection;

/// What happened to one agent during one cycle
#[derive(Debug, Clone, PartialEq)]
pub enum AgentOutcome {
    /// Provider proposed nothing
    Held,
    /// Settled and applied to the ledger
    Executed {
        trade_id: u64,
        symbol: String,
        direction: TradeDirection,
        realized_pnl: Option<Decimal>,
    },
    /// Settlement engine returned FAILED
    SettlementFailed {
        trade_id: u64,
        symbol: String,
        direction: TradeDirection,
    },
    /// Suppressed by the ledger before settlement
    Rejected(LedgerRejection),
    /// Provider exceeded the decision timeout
    TimedOut,
    /// Provider returned an error or panicked
    ProviderError(String),
    /// Settlement transport error
    SettlementError(String),
}

impl AgentOutcome {
    /// Whether the provider produced an intent this cycle
    pub fn proposed_trade(&self) -> bool {
        matches!(
            self,
            AgentOutcome::Executed { .. }
                | AgentOutcome::SettlementFailed { .. }
                | AgentOutcome::Rejected(_)
                | AgentOutcome::SettlementError(_)
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AgentCycleOutcome {
    pub agent_id: String,
    pub agent_name: String,
    pub outcome: AgentOutcome,
    /// Provider rationale after the decision
    pub reasoning: String,
}

#[derive(Debug, Clone)]
pub struct CycleReport {
    pub cycle: u64,
    pub quotes: usize,
    pub outcomes: Vec<AgentCycleOutcome>,
    pub snapshot_written: bool,
    pub elapsed: Duration,
}

impl CycleReport {
    fn count(&self, pred: impl Fn(&AgentOutcome) -> bool) -> usize {
        self.outcomes.iter().filter(|o| pred(&o.outcome)).count()
    }

    pub fn decisions(&self) -> usize {
        self.count(AgentOutcome::proposed_trade)
    }

    pub fn executed(&self) -> usize {
        self.count(|o| matches!(o, AgentOutcome::Executed { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, AgentOutcome::SettlementFailed { .. }))
    }

    pub fn rejected(&self) -> usize {
        self.count(|o| matches!(o, AgentOutcome::Rejected(_)))
    }

    pub fn timeouts(&self) -> usize {
        self.count(|o| matches!(o, AgentOutcome::TimedOut))
    }

    pub fn errors(&self) -> usize {
        self.count(|o| {
            matches!(
                o,
                AgentOutcome::ProviderError(_) | AgentOutcome::SettlementError(_)
            )
        })
    }

    pub fn outcome_for(&self, agent_id: &str) -> Option<&AgentOutcome> {
        self.outcomes
            .iter()
            .find(|o| o.agent_id == agent_id)
            .map(|o| &o.outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(agent_id: &str, outcome: AgentOutcome) -> AgentCycleOutcome {
        AgentCycleOutcome {
            agent_id: agent_id.to_string(),
            agent_name: agent_id.to_string(),
            outcome,
            reasoning: String::new(),
        }
    }

    #[test]
    fn counters_partition_outcomes() {
        let report = CycleReport {
            cycle: 1,
            quotes: 4,
            outcomes: vec![
                outcome("a", AgentOutcome::Held),
                outcome(
                    "b",
                    AgentOutcome::Executed {
                        trade_id: 1,
                        symbol: "BTC/USDT".into(),
                        direction: TradeDirection::OpenLong,
                        realized_pnl: None,
                    },
                ),
                outcome(
                    "c",
                    AgentOutcome::Rejected(LedgerRejection::NoPosition {
                        symbol: "ETH/USDT".into(),
                    }),
                ),
                outcome("d", AgentOutcome::TimedOut),
                outcome("e", AgentOutcome::ProviderError("boom".into())),
            ],
            snapshot_written: true,
            elapsed: Duration::from_millis(5),
        };

        assert_eq!(report.decisions(), 2);
        assert_eq!(report.executed(), 1);
        assert_eq!(report.failed(), 0);
        assert_eq!(report.rejected(), 1);
        assert_eq!(report.timeouts(), 1);
        assert_eq!(report.errors(), 1);
        assert_eq!(report.outcome_for("d"), Some(&AgentOutcome::TimedOut));
    }
}
