//! Randomized momentum heuristic
//!
//! Trades on the 24h change of one randomly picked symbol, and on held
//! symbols may first take profit (> +5%) or cut losses (< -3%).

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;

use crate::domain::{Position, Quote, TradeDirection, TradeIntent};
use crate::error::Result;

use super::traits::{DecisionContext, DecisionProvider};

const ACT_PROBABILITY: f64 = 0.3;
const EXIT_REVIEW_PROBABILITY: f64 = 0.5;
const SHORT_PROBABILITY: f64 = 0.4;
const DIP_BUY_PROBABILITY: f64 = 0.5;

const TAKE_PROFIT_PCT: Decimal = dec!(5);
const STOP_LOSS_PCT: Decimal = dec!(-3);
const MOMENTUM_PCT: Decimal = dec!(2);

/// Quantities are truncated to this many decimal places
const QUANTITY_DP: u32 = 8;

pub struct MomentumAgent {
    id: String,
    name: String,
    rng: StdRng,
    last_reasoning: String,
}

impl MomentumAgent {
    pub fn new(id: &str, name: &str) -> Self {
        Self::with_rng(id, name, StdRng::from_entropy())
    }

    /// Reproducible agent
    pub fn seeded(id: &str, name: &str, seed: u64) -> Self {
        Self::with_rng(id, name, StdRng::seed_from_u64(seed))
    }

    fn with_rng(id: &str, name: &str, rng: StdRng) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            rng,
            last_reasoning: String::new(),
        }
    }

    fn fraction(&mut self, low: f64, high: f64) -> Decimal {
        Decimal::from_f64(self.rng.gen_range(low..high)).unwrap_or(Decimal::ZERO)
    }

    fn hold(&mut self, reasoning: &str) -> Option<TradeIntent> {
        self.last_reasoning = reasoning.to_string();
        None
    }

    fn intent(
        &mut self,
        quote: &Quote,
        direction: TradeDirection,
        quantity: Decimal,
        price: Decimal,
        reasoning: String,
    ) -> Option<TradeIntent> {
        if quantity <= Decimal::ZERO {
            return self.hold("Computed quantity too small to trade");
        }
        self.last_reasoning = reasoning.clone();
        Some(TradeIntent::new(&quote.symbol, direction, quantity, price, reasoning))
    }

    /// Take-profit / stop-loss review of a held position. `None` falls
    /// through to the momentum rules.
    fn review_exit(&mut self, quote: &Quote, position: &Position) -> Option<TradeIntent> {
        let entry = position.average_entry_price;
        if entry <= Decimal::ZERO {
            return None;
        }

        if position.is_long() {
            let price = quote.bid;
            let pnl_pct = (price - entry) / entry * dec!(100);
            if pnl_pct > TAKE_PROFIT_PCT {
                let quantity = truncate(position.quantity * self.fraction(0.5, 1.0))
                    .min(position.quantity);
                let reasoning = format!(
                    "Taking profit: {:.2}% gain. Selling {} {} at ${:.2} (bid)",
                    pnl_pct, quantity, quote.symbol, price
                );
                return self.intent(quote, TradeDirection::CloseLong, quantity, price, reasoning);
            }
            if pnl_pct < STOP_LOSS_PCT {
                let quantity = position.quantity;
                let reasoning = format!(
                    "Cutting losses: {:.2}% loss. Selling {} {} at ${:.2} (bid)",
                    pnl_pct, quantity, quote.symbol, price
                );
                return self.intent(quote, TradeDirection::CloseLong, quantity, price, reasoning);
            }
        } else if position.is_short() {
            let price = quote.ask;
            let held = position.quantity.abs();
            let pnl_pct = (entry - price) / entry * dec!(100);
            if pnl_pct > TAKE_PROFIT_PCT {
                let quantity = truncate(held * self.fraction(0.5, 1.0)).min(held);
                let reasoning = format!(
                    "Taking profit on short: {:.2}% gain. Covering {} {} at ${:.2} (ask)",
                    pnl_pct, quantity, quote.symbol, price
                );
                return self.intent(quote, TradeDirection::CloseShort, quantity, price, reasoning);
            }
            if pnl_pct < STOP_LOSS_PCT {
                let reasoning = format!(
                    "Cutting losses on short: {:.2}% loss. Covering {} {} at ${:.2} (ask)",
                    pnl_pct, held, quote.symbol, price
                );
                return self.intent(quote, TradeDirection::CloseShort, held, price, reasoning);
            }
        }
        None
    }

    fn follow_momentum(&mut self, quote: &Quote, ctx: &DecisionContext) -> Option<TradeIntent> {
        let change = quote.change_percent_24h;

        if change > MOMENTUM_PCT {
            let trade_value = ctx.portfolio_value * self.fraction(0.02, 0.05);
            if trade_value > ctx.cash_balance {
                return self.hold("Insufficient cash for buy order");
            }
            let price = quote.ask;
            let quantity = truncate(trade_value / price);
            let reasoning = format!(
                "Positive momentum detected: {:.2}% gain. Buying {} {} at ${:.2} (ask)",
                change, quantity, quote.symbol, price
            );
            return self.intent(quote, TradeDirection::OpenLong, quantity, price, reasoning);
        }

        if change < -MOMENTUM_PCT {
            if self.rng.gen_bool(SHORT_PROBABILITY) {
                let trade_value = ctx.portfolio_value * self.fraction(0.02, 0.04);
                let price = quote.bid;
                let quantity = truncate(trade_value / price);
                let reasoning = format!(
                    "Strong negative momentum: {:.2}% drop. Shorting {} {} at ${:.2} (bid)",
                    change, quantity, quote.symbol, price
                );
                return self.intent(quote, TradeDirection::OpenShort, quantity, price, reasoning);
            }
            if self.rng.gen_bool(DIP_BUY_PROBABILITY) {
                let trade_value = ctx.portfolio_value * self.fraction(0.01, 0.03);
                if trade_value > ctx.cash_balance {
                    return self.hold("Insufficient cash for buy order");
                }
                let price = quote.ask;
                let quantity = truncate(trade_value / price);
                let reasoning = format!(
                    "Dip detected: {:.2}% drop. Buying the dip - {} {} at ${:.2} (ask)",
                    change, quantity, quote.symbol, price
                );
                return self.intent(quote, TradeDirection::OpenLong, quantity, price, reasoning);
            }
            return self.hold("Negative momentum, avoiding this asset");
        }

        self.hold("No strong momentum signal")
    }
}

fn truncate(quantity: Decimal) -> Decimal {
    quantity.round_dp_with_strategy(QUANTITY_DP, RoundingStrategy::ToZero)
}

#[async_trait]
impl DecisionProvider for MomentumAgent {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &str {
        "momentum"
    }

    async fn decide(&mut self, ctx: &DecisionContext) -> Result<Option<TradeIntent>> {
        if !self.rng.gen_bool(ACT_PROBABILITY) {
            return Ok(self.hold("No strong signal detected, holding position"));
        }

        let quotes: Vec<&Quote> = ctx.quotes.quotes().collect();
        let quote = match quotes.choose(&mut self.rng) {
            Some(quote) => (*quote).clone(),
            None => return Ok(self.hold("No market data")),
        };

        if let Some(position) = ctx.position(&quote.symbol) {
            if self.rng.gen_bool(EXIT_REVIEW_PROBABILITY) {
                if let Some(intent) = self.review_exit(&quote, position) {
                    return Ok(Some(intent));
                }
            }
        }

        Ok(self.follow_momentum(&quote, ctx))
    }

    fn reasoning(&self) -> String {
        self.last_reasoning.clone()
    }
}
