use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::collections::HashMap;

/// Where a quote came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuoteSource {
    /// Fetched from the exchange ticker this cycle
    Live,
    /// Last known good quote, reused because the live fetch failed
    Cached,
    /// Synthetic price from the random-walk feed
    Simulated,
}

impl QuoteSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuoteSource::Live => "live",
            QuoteSource::Cached => "cached",
            QuoteSource::Simulated => "simulated",
        }
    }
}

impl std::fmt::Display for QuoteSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Price snapshot for one symbol
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub symbol: String,
    pub price: Decimal,
    pub bid: Decimal,
    pub ask: Decimal,
    pub high_24h: Decimal,
    pub low_24h: Decimal,
    pub change_24h: Decimal,
    pub change_percent_24h: Decimal,
    pub volume_24h: Decimal,
    pub source: QuoteSource,
    pub timestamp: DateTime<Utc>,
}

impl Quote {
    /// Quote with a symmetric spread around `price` and flat 24h stats
    pub fn flat(symbol: &str, price: Decimal, spread: Decimal) -> Self {
        Self {
            symbol: symbol.to_string(),
            price,
            bid: price * (Decimal::ONE - spread),
            ask: price * (Decimal::ONE + spread),
            high_24h: price,
            low_24h: price,
            change_24h: Decimal::ZERO,
            change_percent_24h: Decimal::ZERO,
            volume_24h: Decimal::ZERO,
            source: QuoteSource::Simulated,
            timestamp: Utc::now(),
        }
    }

    pub fn spread(&self) -> Decimal {
        self.ask - self.bid
    }

    /// Same quote re-labelled as a stale fallback
    pub fn into_cached(mut self) -> Self {
        self.source = QuoteSource::Cached;
        self
    }
}

/// The quote set every agent observes during one cycle.
///
/// Fetched once before fan-out and shared behind an `Arc`, so no agent can
/// see a fresher or staler price than another.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuoteBook {
    pub cycle: u64,
    pub fetched_at: DateTime<Utc>,
    quotes: BTreeMap<String, Quote>,
}

impl QuoteBook {
    pub fn new(cycle: u64, quotes: HashMap<String, Quote>) -> Self {
        Self {
            cycle,
            fetched_at: Utc::now(),
            quotes: quotes.into_iter().collect(),
        }
    }

    pub fn get(&self, symbol: &str) -> Option<&Quote> {
        self.quotes.get(symbol)
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.quotes.contains_key(symbol)
    }

    /// Quotes in symbol order
    pub fn quotes(&self) -> impl Iterator<Item = &Quote> {
        self.quotes.values()
    }

    /// Last price per symbol
    pub fn prices(&self) -> HashMap<String, Decimal> {
        self.quotes
            .iter()
            .map(|(symbol, quote)| (symbol.clone(), quote.price))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.quotes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }
}
