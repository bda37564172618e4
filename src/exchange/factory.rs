use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::info;

use crate::config::{AppConfig, SettlementMode};
use crate::error::{ArenaError, Result};

use super::simulated::{SettlementDelay, SimulatedExchange};
use super::traits::{SettlementEngine, TradeSequence};

/// Builds the settlement engine each registered agent settles against.
///
/// - `isolated`: a fresh liquidity ledger per agent, seeded with that agent's
///   starting capital, so admissibility mirrors the agent's own funds.
/// - `shared`: one ledger for the whole arena; every registration deposits
///   the agent's starting capital into the common pool.
pub struct SettlementFactory {
    mode: SettlementMode,
    quote_asset: String,
    delay: SettlementDelay,
    sequence: TradeSequence,
    shared: Option<Arc<SimulatedExchange>>,
}

impl SettlementFactory {
    pub fn new(config: &AppConfig) -> Result<Self> {
        if !config.trading.mock_trading {
            return Err(ArenaError::Unsupported(
                "live settlement venue is not available".to_string(),
            ));
        }

        Ok(Self {
            mode: config.arena.settlement_mode,
            quote_asset: config.exchange.quote_asset.clone(),
            delay: SettlementDelay {
                min_ms: config.exchange.settlement_delay_min_ms,
                max_ms: config.exchange.settlement_delay_max_ms,
            },
            sequence: TradeSequence::new(),
            shared: None,
        })
    }

    /// Override the simulated latency (tests use `SettlementDelay::none()`)
    pub fn with_delay(mut self, delay: SettlementDelay) -> Self {
        self.delay = delay;
        self
    }

    pub fn mode(&self) -> SettlementMode {
        self.mode
    }

    /// Engine for a newly registered agent with `capital` to trade
    pub async fn engine_for(
        &mut self,
        agent_id: &str,
        capital: Decimal,
    ) -> Arc<dyn SettlementEngine> {
        match self.mode {
            SettlementMode::Isolated => {
                info!(%agent_id, %capital, "created isolated settlement ledger");
                Arc::new(SimulatedExchange::new(
                    &self.quote_asset,
                    capital,
                    self.sequence.clone(),
                    self.delay,
                ))
            }
            SettlementMode::Shared => {
                let engine = match self.shared.clone() {
                    Some(engine) => {
                        engine.deposit(&self.quote_asset, capital).await;
                        engine
                    }
                    None => {
                        let engine = Arc::new(SimulatedExchange::new(
                            &self.quote_asset,
                            capital,
                            self.sequence.clone(),
                            self.delay,
                        ));
                        self.shared = Some(Arc::clone(&engine));
                        engine
                    }
                };
                info!(%agent_id, %capital, "joined shared settlement ledger");
                engine
            }
        }
    }
}
