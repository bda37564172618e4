use futures::future::join_all;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::agents::{DecisionContext, DecisionProvider};
use crate::config::AppConfig;
use crate::domain::{QuoteBook, TradeIntent, TradeStatus};
use crate::error::{ArenaError, LedgerRejection, Result};
use crate::exchange::{SettlementEngine, SettlementFactory};
use crate::ledger::AgentState;
use crate::market_data::MarketDataSource;
use crate::snapshot::{AgentSnapshot, ArenaSnapshot, CyclePoint, SnapshotSink};

use super::leaderboard::{leaderboard, LeaderboardRow};
use super::report::{AgentCycleOutcome, AgentOutcome, CycleReport};
use super::stop::{StopHandle, StopReason};

/// Extra time granted to a decision task before the arena abandons it
const DECISION_GRACE: Duration = Duration::from_millis(250);

/// Result of one provider call
enum Decision {
    Hold,
    Intent(TradeIntent),
    TimedOut,
    Failed(String),
}

/// Everything the arena owns for one registered agent
struct AgentSlot {
    agent_id: String,
    agent_name: String,
    kind: String,
    provider: Arc<Mutex<Box<dyn DecisionProvider>>>,
    ledger: AgentState,
    engine: Arc<dyn SettlementEngine>,
    history: Vec<CyclePoint>,
}

/// How a run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub cycles_completed: u64,
    pub stop_reason: Option<StopReason>,
}

pub struct Arena {
    config: Arc<AppConfig>,
    market_data: Arc<dyn MarketDataSource>,
    settlement: SettlementFactory,
    sink: Arc<dyn SnapshotSink>,
    agents: Vec<AgentSlot>,
    cycle: u64,
    last_quotes: Option<Arc<QuoteBook>>,
}

impl Arena {
    pub fn new(
        config: Arc<AppConfig>,
        market_data: Arc<dyn MarketDataSource>,
        settlement: SettlementFactory,
        sink: Arc<dyn SnapshotSink>,
    ) -> Self {
        Self {
            config,
            market_data,
            settlement,
            sink,
            agents: Vec::new(),
            cycle: 0,
            last_quotes: None,
        }
    }

    /// Register a provider with a fresh ledger funded with the starting capital
    pub async fn register_agent(&mut self, provider: Box<dyn DecisionProvider>) -> Result<String> {
        let agent_id = provider.id().to_string();
        if self.agents.iter().any(|slot| slot.agent_id == agent_id) {
            return Err(ArenaError::InvalidConfig(format!(
                "duplicate agent id '{}'",
                agent_id
            )));
        }

        let capital = self.config.trading.starting_capital;
        let engine = self.settlement.engine_for(&agent_id, capital).await;
        let slot = AgentSlot {
            agent_name: provider.name().to_string(),
            kind: provider.kind().to_string(),
            ledger: AgentState::new(&agent_id, provider.name(), capital),
            agent_id: agent_id.clone(),
            provider: Arc::new(Mutex::new(provider)),
            engine,
            history: Vec::new(),
        };

        info!(
            agent_id = %slot.agent_id,
            name = %slot.agent_name,
            kind = %slot.kind,
            %capital,
            "agent registered"
        );
        self.agents.push(slot);
        Ok(agent_id)
    }

    pub fn agent_count(&self) -> usize {
        self.agents.len()
    }

    pub fn current_cycle(&self) -> u64 {
        self.cycle
    }

    pub fn states(&self) -> impl Iterator<Item = &AgentState> {
        self.agents.iter().map(|slot| &slot.ledger)
    }

    pub fn state(&self, agent_id: &str) -> Option<&AgentState> {
        self.states().find(|s| s.agent_id == agent_id)
    }

    pub fn leaderboard(&self) -> Vec<LeaderboardRow> {
        leaderboard(self.states())
    }

    /// Snapshot of every agent, highest portfolio value first
    pub fn snapshot(&self) -> ArenaSnapshot {
        let recent = self.config.arena.recent_trades_limit;
        let agents = self
            .agents
            .iter()
            .map(|slot| AgentSnapshot::capture(&slot.ledger, &slot.kind, &slot.history, recent))
            .collect();
        ArenaSnapshot::new(
            self.cycle,
            u64::from(self.config.competition.cycles),
            agents,
        )
    }

    /// Run the configured number of cycles or until `stop` fires
    pub async fn run(&mut self, stop: &StopHandle) -> Result<RunSummary> {
        self.run_with(stop, |_, _| {}).await
    }

    /// Like `run`, calling `on_cycle` after every completed cycle
    pub async fn run_with<F>(&mut self, stop: &StopHandle, mut on_cycle: F) -> Result<RunSummary>
    where
        F: FnMut(&CycleReport, &Arena),
    {
        self.config.validate()?;
        if self.agents.is_empty() {
            return Err(ArenaError::NoAgents);
        }

        let total = u64::from(self.config.competition.cycles);
        let interval = self.config.cycle_interval();
        let mut completed = 0;

        info!(
            agents = self.agents.len(),
            cycles = total,
            interval_secs = interval.as_secs(),
            settlement_mode = %self.settlement.mode(),
            "arena starting"
        );

        for n in 1..=total {
            if stop.is_stop_requested() {
                break;
            }

            let report = self.run_cycle().await;
            completed += 1;
            on_cycle(&report, &*self);

            if n == total {
                break;
            }
            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                _ = stop.stopped() => {
                    info!(cycle = self.cycle, "stop received between cycles");
                    break;
                }
            }
        }

        let summary = RunSummary {
            cycles_completed: completed,
            stop_reason: stop.reason(),
        };
        info!(
            cycles = summary.cycles_completed,
            stopped = summary.stop_reason.is_some(),
            "arena finished"
        );
        Ok(summary)
    }

    /// Execute one full cycle: quotes, decisions, settlement, snapshot
    pub async fn run_cycle(&mut self) -> CycleReport {
        self.cycle += 1;
        let cycle = self.cycle;
        let started = Instant::now();
        debug!(cycle, "cycle starting");

        // Phase 1: quote refresh
        let book = Arc::new(self.refresh_quotes(cycle).await);
        let prices = book.prices();
        for slot in &mut self.agents {
            slot.ledger.mark_to_market(&prices);
        }
        self.last_quotes = Some(Arc::clone(&book));

        // Phase 2: decision fan-out, joined before any settlement
        let timeout = self.config.decision_timeout();
        let handles: Vec<_> = self
            .agents
            .iter()
            .map(|slot| {
                let ctx = DecisionContext {
                    cycle,
                    quotes: Arc::clone(&book),
                    portfolio_value: slot.ledger.total_portfolio_value(),
                    cash_balance: slot.ledger.cash_balance,
                    positions: slot.ledger.positions.clone(),
                };
                tokio::spawn(request_decision(Arc::clone(&slot.provider), ctx, timeout))
            })
            .collect();

        let deadline = timeout + DECISION_GRACE;
        let decisions: Vec<(Decision, String)> =
            join_all(handles.into_iter().map(|handle| await_decision(handle, deadline))).await;

        // Phase 3: settlement, concurrent across agents (disjoint ledgers)
        let quotes: &QuoteBook = &book;
        let settlements = self
            .agents
            .iter_mut()
            .zip(decisions)
            .map(move |(slot, (decision, reasoning))| {
                settle_decision(slot, decision, reasoning, quotes)
            });
        let outcomes = join_all(settlements).await;

        // Phase 4: snapshot
        for slot in &mut self.agents {
            slot.history.push(CyclePoint::capture(cycle, &slot.ledger));
        }
        let snapshot = self.snapshot();
        let snapshot_written = match self.sink.write(&snapshot).await {
            Ok(()) => true,
            Err(e) => {
                error!(cycle, error = %e, "snapshot write failed");
                false
            }
        };

        let report = CycleReport {
            cycle,
            quotes: book.len(),
            outcomes,
            snapshot_written,
            elapsed: started.elapsed(),
        };
        info!(
            cycle,
            quotes = report.quotes,
            decisions = report.decisions(),
            executed = report.executed(),
            failed = report.failed(),
            rejected = report.rejected(),
            timeouts = report.timeouts(),
            errors = report.errors(),
            elapsed_ms = report.elapsed.as_millis() as u64,
            "cycle complete"
        );
        report
    }

    /// Fetch the cycle's quote set, filling gaps from the previous cycle
    async fn refresh_quotes(&self, cycle: u64) -> QuoteBook {
        let symbols = &self.config.trading.trading_pairs;
        let mut quotes = match self.market_data.fetch_quotes(symbols).await {
            Ok(quotes) => quotes,
            Err(e) => {
                warn!(cycle, source = self.market_data.name(), error = %e, "quote refresh failed");
                HashMap::new()
            }
        };
        quotes.retain(|symbol, quote| {
            symbols.contains(symbol) && quote.price > Decimal::ZERO
        });

        if let Some(previous) = &self.last_quotes {
            for symbol in symbols {
                if quotes.contains_key(symbol) {
                    continue;
                }
                if let Some(quote) = previous.get(symbol) {
                    quotes.insert(symbol.clone(), quote.clone().into_cached());
                }
            }
        }

        if quotes.len() < symbols.len() {
            let missing: Vec<&String> = symbols.iter().filter(|s| !quotes.contains_key(*s)).collect();
            warn!(cycle, ?missing, "no quote available for some symbols");
        }
        QuoteBook::new(cycle, quotes)
    }
}

/// Ask one provider for its decision, bounded by `timeout`.
///
/// A provider still locked by an abandoned call from an earlier cycle
/// counts as timed out without being called.
async fn request_decision(
    provider: Arc<Mutex<Box<dyn DecisionProvider>>>,
    ctx: DecisionContext,
    timeout: Duration,
) -> (Decision, String) {
    let mut guard = match provider.try_lock() {
        Ok(guard) => guard,
        Err(_) => {
            return (
                Decision::TimedOut,
                "still busy with an earlier decision".to_string(),
            )
        }
    };
    let decision = match tokio::time::timeout(timeout, guard.decide(&ctx)).await {
        Err(_) => Decision::TimedOut,
        Ok(Err(e)) => Decision::Failed(e.to_string()),
        Ok(Ok(None)) => Decision::Hold,
        Ok(Ok(Some(intent))) => Decision::Intent(intent),
    };
    (decision, guard.reasoning())
}

/// Wait for a decision task from the arena's side.
///
/// The in-task timeout cannot fire while a provider blocks its worker
/// thread, so the task is abandoned once `deadline` passes.
async fn await_decision(
    mut handle: JoinHandle<(Decision, String)>,
    deadline: Duration,
) -> (Decision, String) {
    match tokio::time::timeout(deadline, &mut handle).await {
        Ok(Ok(decision)) => decision,
        Ok(Err(e)) if e.is_panic() => (
            Decision::Failed(format!("provider panicked: {}", e)),
            String::new(),
        ),
        Ok(Err(e)) => (
            Decision::Failed(format!("decision task failed: {}", e)),
            String::new(),
        ),
        Err(_) => {
            handle.abort();
            (Decision::TimedOut, String::new())
        }
    }
}

async fn settle_decision(
    slot: &mut AgentSlot,
    decision: Decision,
    reasoning: String,
    book: &QuoteBook,
) -> AgentCycleOutcome {
    let outcome = match decision {
        Decision::Hold => {
            debug!(agent_id = %slot.agent_id, %reasoning, "holding");
            AgentOutcome::Held
        }
        Decision::TimedOut => {
            warn!(agent_id = %slot.agent_id, "decision timed out, treating as hold");
            AgentOutcome::TimedOut
        }
        Decision::Failed(reason) => {
            warn!(agent_id = %slot.agent_id, %reason, "decision failed, treating as hold");
            AgentOutcome::ProviderError(reason)
        }
        Decision::Intent(intent) => settle_intent(slot, intent, book).await,
    };

    AgentCycleOutcome {
        agent_id: slot.agent_id.clone(),
        agent_name: slot.agent_name.clone(),
        outcome,
        reasoning,
    }
}

async fn settle_intent(slot: &mut AgentSlot, intent: TradeIntent, book: &QuoteBook) -> AgentOutcome {
    let checked = if book.contains(&intent.symbol) {
        slot.ledger.precheck(&intent)
    } else {
        Err(LedgerRejection::UnknownSymbol(intent.symbol.clone()))
    };
    if let Err(rejection) = checked {
        info!(
            agent_id = %slot.agent_id,
            direction = %intent.direction,
            symbol = %intent.symbol,
            %rejection,
            "intent rejected by ledger"
        );
        return AgentOutcome::Rejected(rejection);
    }

    let trade = match slot.engine.settle(intent).await {
        Ok(trade) => trade,
        Err(e) => {
            error!(agent_id = %slot.agent_id, error = %e, "settlement error");
            return AgentOutcome::SettlementError(e.to_string());
        }
    };

    if trade.status == TradeStatus::Failed {
        warn!(
            agent_id = %slot.agent_id,
            trade_id = trade.id,
            direction = %trade.direction,
            symbol = %trade.symbol,
            "settlement failed"
        );
        return AgentOutcome::SettlementFailed {
            trade_id: trade.id,
            symbol: trade.symbol,
            direction: trade.direction,
        };
    }

    match slot.ledger.apply(&trade) {
        Ok(applied) => {
            info!(
                agent_id = %slot.agent_id,
                trade_id = trade.id,
                direction = %trade.direction,
                symbol = %trade.symbol,
                quantity = %trade.quantity,
                price = %trade.price,
                realized_pnl = ?applied.realized_pnl,
                reasoning = %trade.reasoning,
                "trade executed"
            );
            AgentOutcome::Executed {
                trade_id: trade.id,
                symbol: trade.symbol,
                direction: trade.direction,
                realized_pnl: applied.realized_pnl,
            }
        }
        Err(rejection) => {
            // The ledger was checked moments ago and nothing else touches it
            error!(
                agent_id = %slot.agent_id,
                trade_id = trade.id,
                %rejection,
                "executed trade could not be applied to ledger"
            );
            AgentOutcome::Rejected(rejection)
        }
    }
}
