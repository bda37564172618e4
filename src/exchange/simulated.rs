//! Simulated exchange for paper trading
//!
//! Holds the liquidity ledger (one cash balance plus base-asset holdings)
//! that decides whether an intent is admissible. Concurrent settles are
//! serialized through a single mutex so no update is lost.

use async_trait::async_trait;
use rand::Rng;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::config::base_asset;
use crate::domain::{ExecutionVenue, Trade, TradeDirection, TradeIntent, TradeStatus};
use crate::error::Result;

use super::traits::{SettlementEngine, TradeSequence};

/// Uniform random latency applied before each settle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SettlementDelay {
    pub min_ms: u64,
    pub max_ms: u64,
}

impl SettlementDelay {
    pub fn none() -> Self {
        Self { min_ms: 0, max_ms: 0 }
    }

    fn sample(&self) -> Duration {
        if self.max_ms == 0 {
            return Duration::ZERO;
        }
        let ms = if self.min_ms >= self.max_ms {
            self.max_ms
        } else {
            rand::thread_rng().gen_range(self.min_ms..=self.max_ms)
        };
        Duration::from_millis(ms)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SettlementStats {
    pub executed: u64,
    pub failed: u64,
}

/// Engine-wide cash and holdings table
#[derive(Debug, Clone)]
pub struct LiquidityLedger {
    quote_asset: String,
    balances: HashMap<String, Decimal>,
    stats: SettlementStats,
}

impl LiquidityLedger {
    pub fn new(quote_asset: &str, cash: Decimal) -> Self {
        let mut balances = HashMap::new();
        balances.insert(quote_asset.to_string(), cash);
        Self {
            quote_asset: quote_asset.to_string(),
            balances,
            stats: SettlementStats::default(),
        }
    }

    pub fn cash(&self) -> Decimal {
        self.balance(&self.quote_asset)
    }

    pub fn balance(&self, asset: &str) -> Decimal {
        self.balances.get(asset).copied().unwrap_or(Decimal::ZERO)
    }

    /// Credit (or, with a negative amount, debit) an asset. Saturates at the
    /// representable range.
    pub fn deposit(&mut self, asset: &str, amount: Decimal) {
        let balance = self.balances.entry(asset.to_string()).or_insert(Decimal::ZERO);
        *balance = balance.saturating_add(amount);
    }

    /// Validate the intent and, if admissible, apply it. Returns whether it executed.
    ///
    /// An intent whose notional or resulting balances overflow is not admissible.
    pub fn settle(&mut self, intent: &TradeIntent) -> bool {
        let base = base_asset(&intent.symbol).to_string();
        let cash = self.cash();
        let holdings = self.balance(&base);

        let admissible = intent.total_value().filter(|&total_value| match intent.direction {
            TradeDirection::OpenLong => total_value <= cash,
            TradeDirection::CloseLong => holdings >= intent.quantity,
            // Unlimited borrow
            TradeDirection::OpenShort => true,
            TradeDirection::CloseShort => {
                holdings < Decimal::ZERO && holdings.abs() >= intent.quantity && cash >= total_value
            }
        });

        let balances = admissible.and_then(|total_value| {
            if intent.direction.pays_cash() {
                Some((
                    cash.checked_sub(total_value)?,
                    holdings.checked_add(intent.quantity)?,
                ))
            } else {
                Some((
                    cash.checked_add(total_value)?,
                    holdings.checked_sub(intent.quantity)?,
                ))
            }
        });

        match balances {
            Some((cash, holdings)) => {
                self.balances.insert(self.quote_asset.clone(), cash);
                self.balances.insert(base, holdings);
                self.stats.executed += 1;
                true
            }
            None => {
                self.stats.failed += 1;
                false
            }
        }
    }

    pub fn stats(&self) -> SettlementStats {
        self.stats
    }
}

/// Paper-trading settlement engine
pub struct SimulatedExchange {
    ledger: Mutex<LiquidityLedger>,
    sequence: TradeSequence,
    delay: SettlementDelay,
}

impl SimulatedExchange {
    pub fn new(
        quote_asset: &str,
        cash: Decimal,
        sequence: TradeSequence,
        delay: SettlementDelay,
    ) -> Self {
        Self {
            ledger: Mutex::new(LiquidityLedger::new(quote_asset, cash)),
            sequence,
            delay,
        }
    }

    /// Add funds to the liquidity ledger
    pub async fn deposit(&self, asset: &str, amount: Decimal) {
        self.ledger.lock().await.deposit(asset, amount);
    }

    pub async fn stats(&self) -> SettlementStats {
        self.ledger.lock().await.stats()
    }
}

#[async_trait]
impl SettlementEngine for SimulatedExchange {
    fn venue(&self) -> ExecutionVenue {
        ExecutionVenue::Simulated
    }

    async fn settle(&self, intent: TradeIntent) -> Result<Trade> {
        // Latency is modeled outside the lock and never changes the outcome
        let delay = self.delay.sample();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let executed = self.ledger.lock().await.settle(&intent);
        let status = if executed {
            TradeStatus::Executed
        } else {
            TradeStatus::Failed
        };
        let trade = Trade::settled(self.sequence.next_id(), intent, status, self.venue());

        if executed {
            debug!(
                trade_id = trade.id,
                direction = %trade.direction,
                symbol = %trade.symbol,
                quantity = %trade.quantity,
                price = %trade.price,
                "simulated settlement executed"
            );
        } else {
            warn!(
                trade_id = trade.id,
                direction = %trade.direction,
                symbol = %trade.symbol,
                total_value = %trade.total_value,
                "simulated settlement failed: insufficient liquidity"
            );
        }

        Ok(trade)
    }

    async fn balance_of(&self, asset: &str) -> Decimal {
        self.ledger.lock().await.balance(asset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    fn engine(cash: Decimal) -> SimulatedExchange {
        SimulatedExchange::new("USDT", cash, TradeSequence::new(), SettlementDelay::none())
    }

    fn intent(direction: TradeDirection, qty: Decimal, price: Decimal) -> TradeIntent {
        TradeIntent::new("BTC/USDT", direction, qty, price, "test")
    }

    #[tokio::test]
    async fn buy_requires_cash() {
        let exchange = engine(dec!(1000));
        let trade = exchange
            .settle(intent(TradeDirection::OpenLong, dec!(0.1), dec!(50000)))
            .await
            .unwrap();
        assert_eq!(trade.status, TradeStatus::Failed);
        assert_eq!(exchange.balance_of("USDT").await, dec!(1000));
        assert_eq!(exchange.balance_of("BTC").await, dec!(0));

        let trade = exchange
            .settle(intent(TradeDirection::OpenLong, dec!(0.01), dec!(50000)))
            .await
            .unwrap();
        assert_eq!(trade.status, TradeStatus::Executed);
        assert_eq!(exchange.balance_of("USDT").await, dec!(500));
        assert_eq!(exchange.balance_of("BTC").await, dec!(0.01));
    }

    #[tokio::test]
    async fn sell_requires_holdings() {
        let exchange = engine(dec!(10000));
        let trade = exchange
            .settle(intent(TradeDirection::CloseLong, dec!(0.1), dec!(50000)))
            .await
            .unwrap();
        assert_eq!(trade.status, TradeStatus::Failed);

        exchange
            .settle(intent(TradeDirection::OpenLong, dec!(0.1), dec!(50000)))
            .await
            .unwrap();
        let trade = exchange
            .settle(intent(TradeDirection::CloseLong, dec!(0.1), dec!(51000)))
            .await
            .unwrap();
        assert!(trade.is_executed());
        assert_eq!(exchange.balance_of("USDT").await, dec!(10100));
    }

    #[tokio::test]
    async fn short_always_admitted_and_cover_needs_short() {
        let exchange = engine(dec!(0));
        let cover = exchange
            .settle(intent(TradeDirection::CloseShort, dec!(0.1), dec!(49000)))
            .await
            .unwrap();
        assert_eq!(cover.status, TradeStatus::Failed);

        let short = exchange
            .settle(intent(TradeDirection::OpenShort, dec!(0.1), dec!(50000)))
            .await
            .unwrap();
        assert!(short.is_executed());
        assert_eq!(exchange.balance_of("BTC").await, dec!(-0.1));
        assert_eq!(exchange.balance_of("USDT").await, dec!(5000));

        let too_much = exchange
            .settle(intent(TradeDirection::CloseShort, dec!(0.2), dec!(49000)))
            .await
            .unwrap();
        assert_eq!(too_much.status, TradeStatus::Failed);

        let cover = exchange
            .settle(intent(TradeDirection::CloseShort, dec!(0.1), dec!(49000)))
            .await
            .unwrap();
        assert!(cover.is_executed());
        assert_eq!(exchange.balance_of("BTC").await, dec!(0));
        assert_eq!(exchange.balance_of("USDT").await, dec!(100));
    }

    #[tokio::test]
    async fn cover_requires_cash() {
        let exchange = engine(dec!(0));
        exchange
            .settle(intent(TradeDirection::OpenShort, dec!(0.1), dec!(50000)))
            .await
            .unwrap();
        let cover = exchange
            .settle(intent(TradeDirection::CloseShort, dec!(0.1), dec!(60000)))
            .await
            .unwrap();
        assert_eq!(cover.status, TradeStatus::Failed);
        assert_eq!(exchange.stats().await, SettlementStats { executed: 1, failed: 1 });
    }

    #[tokio::test]
    async fn overflowing_intent_fails_without_touching_balances() {
        let exchange = engine(dec!(1000));
        let short = exchange
            .settle(intent(TradeDirection::OpenShort, Decimal::MAX, dec!(2)))
            .await
            .unwrap();
        assert_eq!(short.status, TradeStatus::Failed);

        // The notional fits but the cash credit does not
        let short = exchange
            .settle(intent(TradeDirection::OpenShort, Decimal::MAX, dec!(1)))
            .await
            .unwrap();
        assert_eq!(short.status, TradeStatus::Failed);
        assert_eq!(exchange.balance_of("USDT").await, dec!(1000));
        assert_eq!(exchange.balance_of("BTC").await, dec!(0));
        assert_eq!(exchange.stats().await, SettlementStats { executed: 0, failed: 2 });
    }

    #[tokio::test]
    async fn concurrent_settles_do_not_lose_updates() {
        let exchange = Arc::new(SimulatedExchange::new(
            "USDT",
            dec!(100000),
            TradeSequence::new(),
            SettlementDelay { min_ms: 0, max_ms: 5 },
        ));

        let handles: Vec<_> = (0..20)
            .map(|_| {
                let exchange = Arc::clone(&exchange);
                tokio::spawn(async move {
                    exchange
                        .settle(intent(TradeDirection::OpenLong, dec!(0.01), dec!(50000)))
                        .await
                })
            })
            .collect();

        let mut ids = Vec::new();
        for handle in handles {
            let trade = handle.await.unwrap().unwrap();
            assert!(trade.is_executed());
            ids.push(trade.id);
        }
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 20);
        assert_eq!(exchange.balance_of("USDT").await, dec!(90000));
        assert_eq!(exchange.balance_of("BTC").await, dec!(0.2));
    }
}
