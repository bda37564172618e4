//! Binance 24h ticker REST client
//!
//! One request per cycle fetches every ticker; tracked pairs are filtered
//! locally and mapped back to arena symbols (`BTCUSDT` -> `BTC/USDT`).

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};

use crate::domain::{Quote, QuoteSource};
use crate::error::{ArenaError, Result};

use super::MarketDataSource;

/// Spread applied when the venue reports an empty book side
const FALLBACK_SPREAD: Decimal = dec!(0.0005);

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Ticker24h {
    symbol: String,
    #[serde(with = "rust_decimal::serde::str")]
    last_price: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    price_change: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    price_change_percent: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    high_price: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    low_price: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    volume: Decimal,
    #[serde(default, with = "rust_decimal::serde::str_option")]
    bid_price: Option<Decimal>,
    #[serde(default, with = "rust_decimal::serde::str_option")]
    ask_price: Option<Decimal>,
}

/// Venue symbol for an arena pair
pub fn venue_symbol(pair: &str) -> String {
    pair.replace('/', "").to_ascii_uppercase()
}

fn to_quote(pair: &str, ticker: &Ticker24h) -> Option<Quote> {
    if ticker.last_price <= Decimal::ZERO {
        return None;
    }
    let price = ticker.last_price;
    let bid = ticker
        .bid_price
        .filter(|bid| *bid > Decimal::ZERO)
        .unwrap_or(price * (Decimal::ONE - FALLBACK_SPREAD));
    let ask = ticker
        .ask_price
        .filter(|ask| *ask > Decimal::ZERO)
        .unwrap_or(price * (Decimal::ONE + FALLBACK_SPREAD));

    Some(Quote {
        symbol: pair.to_string(),
        price,
        bid,
        ask,
        high_24h: ticker.high_price,
        low_24h: ticker.low_price,
        change_24h: ticker.price_change,
        change_percent_24h: ticker.price_change_percent,
        volume_24h: ticker.volume,
        source: QuoteSource::Live,
        timestamp: Utc::now(),
    })
}

fn select_quotes(symbols: &[String], tickers: &[Ticker24h]) -> HashMap<String, Quote> {
    let by_venue: HashMap<&str, &Ticker24h> =
        tickers.iter().map(|t| (t.symbol.as_str(), t)).collect();

    let mut quotes = HashMap::new();
    for pair in symbols {
        let venue = venue_symbol(pair);
        match by_venue.get(venue.as_str()).and_then(|t| to_quote(pair, t)) {
            Some(quote) => {
                quotes.insert(pair.clone(), quote);
            }
            None => warn!(symbol = %pair, "no usable ticker returned"),
        }
    }
    quotes
}

/// Live quotes from the Binance public ticker endpoint
pub struct BinanceTickerSource {
    client: reqwest::Client,
    base_url: String,
}

impl BinanceTickerSource {
    pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs.max(1)))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl MarketDataSource for BinanceTickerSource {
    fn name(&self) -> &'static str {
        "binance"
    }

    async fn fetch_quotes(&self, symbols: &[String]) -> Result<HashMap<String, Quote>> {
        let url = format!("{}/ticker/24hr", self.base_url);
        debug!("Fetching tickers: {}", url);

        let response = self.client.get(&url).send().await.map_err(|e| {
            ArenaError::MarketDataUnavailable(format!("ticker request failed: {}", e))
        })?;

        if !response.status().is_success() {
            return Err(ArenaError::MarketDataUnavailable(format!(
                "ticker API error: {}",
                response.status()
            )));
        }

        let tickers: Vec<Ticker24h> = response
            .json()
            .await
            .map_err(|e| ArenaError::InvalidMarketData(format!("ticker parse error: {}", e)))?;

        let quotes = select_quotes(symbols, &tickers);
        debug!("Fetched {} of {} live quotes", quotes.len(), symbols.len());
        Ok(quotes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"[
        {"symbol":"BTCUSDT","priceChange":"1200.00","priceChangePercent":"1.82",
         "lastPrice":"67000.00","bidPrice":"66990.00","askPrice":"67010.00",
         "highPrice":"68000.00","lowPrice":"65000.00","volume":"1234.5"},
        {"symbol":"ETHUSDT","priceChange":"-50.00","priceChangePercent":"-1.40",
         "lastPrice":"3500.00","bidPrice":"0.00","askPrice":"0.00",
         "highPrice":"3600.00","lowPrice":"3400.00","volume":"9000"},
        {"symbol":"DOGEUSDT","priceChange":"0","priceChangePercent":"0",
         "lastPrice":"0.00","highPrice":"0","lowPrice":"0","volume":"0"}
    ]"#;

    #[test]
    fn maps_pairs_to_venue_symbols() {
        assert_eq!(venue_symbol("BTC/USDT"), "BTCUSDT");
        assert_eq!(venue_symbol("eth/usdt"), "ETHUSDT");
    }

    #[test]
    fn selects_tracked_tickers() {
        let tickers: Vec<Ticker24h> = serde_json::from_str(SAMPLE).unwrap();
        let symbols = vec![
            "BTC/USDT".to_string(),
            "ETH/USDT".to_string(),
            "DOGE/USDT".to_string(),
            "SOL/USDT".to_string(),
        ];
        let quotes = select_quotes(&symbols, &tickers);

        assert_eq!(quotes.len(), 2);
        let btc = &quotes["BTC/USDT"];
        assert_eq!(btc.price, dec!(67000));
        assert_eq!(btc.bid, dec!(66990));
        assert_eq!(btc.ask, dec!(67010));
        assert_eq!(btc.change_percent_24h, dec!(1.82));
        assert_eq!(btc.source, QuoteSource::Live);

        // Empty book sides fall back to a synthetic spread
        let eth = &quotes["ETH/USDT"];
        assert_eq!(eth.bid, dec!(3498.25));
        assert_eq!(eth.ask, dec!(3501.75));

        // Zero price is unusable
        assert!(!quotes.contains_key("DOGE/USDT"));
    }
}
