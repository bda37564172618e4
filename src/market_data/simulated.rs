//! Random-walk quote feed for offline runs and live-feed fallback

use async_trait::async_trait;
use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::config::base_asset;
use crate::domain::{Quote, QuoteSource};
use crate::error::{ArenaError, Result};

use super::MarketDataSource;

/// Largest single-step move, as a fraction of price
const STEP_VOLATILITY: f64 = 0.02;
/// Half spread around the mid price
const HALF_SPREAD: Decimal = dec!(0.0005);

/// Seed price for a base asset
fn seed_price(base: &str) -> Decimal {
    match base {
        "BTC" => dec!(67000),
        "ETH" => dec!(3500),
        "SOL" => dec!(170),
        "BNB" => dec!(600),
        _ => dec!(100),
    }
}

struct WalkState {
    rng: StdRng,
    prices: HashMap<String, Decimal>,
}

/// Each fetch moves every symbol by up to ±2% and reports a random 24h
/// change in ±5%.
pub struct SimulatedQuoteSource {
    state: Mutex<WalkState>,
}

impl SimulatedQuoteSource {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Deterministic feed
    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            state: Mutex::new(WalkState {
                rng,
                prices: HashMap::new(),
            }),
        }
    }

    fn step(state: &mut WalkState, symbol: &str) -> Quote {
        let step = state.rng.gen_range(-STEP_VOLATILITY..=STEP_VOLATILITY);
        let change_pct = state.rng.gen_range(-5.0..=5.0);
        let volume = state.rng.gen_range(1_000_000.0..5_000_000.0);

        let previous = state
            .prices
            .get(symbol)
            .copied()
            .unwrap_or_else(|| seed_price(base_asset(symbol)));
        let factor = Decimal::from_f64(1.0 + step).unwrap_or(Decimal::ONE);
        let price = (previous * factor).round_dp(8).max(dec!(0.00000001));
        state.prices.insert(symbol.to_string(), price);

        let change_percent = Decimal::from_f64(change_pct)
            .unwrap_or(Decimal::ZERO)
            .round_dp(2);

        Quote {
            symbol: symbol.to_string(),
            price,
            bid: price * (Decimal::ONE - HALF_SPREAD),
            ask: price * (Decimal::ONE + HALF_SPREAD),
            high_24h: price * dec!(1.05),
            low_24h: price * dec!(0.95),
            change_24h: (price * change_percent / dec!(100)).round_dp(8),
            change_percent_24h: change_percent,
            volume_24h: Decimal::from_f64(volume).unwrap_or(Decimal::ZERO).round_dp(2),
            source: QuoteSource::Simulated,
            timestamp: Utc::now(),
        }
    }
}

impl Default for SimulatedQuoteSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MarketDataSource for SimulatedQuoteSource {
    fn name(&self) -> &'static str {
        "simulated"
    }

    async fn fetch_quotes(&self, symbols: &[String]) -> Result<HashMap<String, Quote>> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| ArenaError::Internal("simulated feed lock poisoned".to_string()))?;

        Ok(symbols
            .iter()
            .map(|symbol| (symbol.clone(), Self::step(&mut state, symbol)))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs() -> Vec<String> {
        vec!["BTC/USDT".to_string(), "DOGE/USDT".to_string()]
    }

    #[tokio::test]
    async fn first_quotes_start_near_seed_prices() {
        let feed = SimulatedQuoteSource::seeded(7);
        let quotes = feed.fetch_quotes(&pairs()).await.unwrap();

        let btc = &quotes["BTC/USDT"];
        assert!(btc.price >= dec!(65660) && btc.price <= dec!(68340));
        assert!(btc.bid < btc.price && btc.price < btc.ask);
        assert_eq!(btc.source, QuoteSource::Simulated);
        assert!(btc.change_percent_24h.abs() <= dec!(5));

        let doge = &quotes["DOGE/USDT"];
        assert!(doge.price >= dec!(98) && doge.price <= dec!(102));
    }

    #[tokio::test]
    async fn walk_moves_from_previous_price() {
        let feed = SimulatedQuoteSource::seeded(11);
        let first = feed.fetch_quotes(&pairs()).await.unwrap()["BTC/USDT"].price;
        let second = feed.fetch_quotes(&pairs()).await.unwrap()["BTC/USDT"].price;
        let bound = first * dec!(0.0201);
        assert!((second - first).abs() <= bound);
    }

    #[tokio::test]
    async fn same_seed_same_path() {
        let a = SimulatedQuoteSource::seeded(3);
        let b = SimulatedQuoteSource::seeded(3);
        for _ in 0..3 {
            let qa = a.fetch_quotes(&pairs()).await.unwrap();
            let qb = b.fetch_quotes(&pairs()).await.unwrap();
            assert_eq!(qa["BTC/USDT"].price, qb["BTC/USDT"].price);
        }
    }
}
