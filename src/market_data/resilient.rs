//! Live feed with caching and degraded fallbacks
//!
//! Per symbol: a fresh cached live quote, else a live quote, else the last
//! known good quote (labelled `cached`), else a synthetic quote.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::domain::Quote;
use crate::error::{ArenaError, Result};

use super::MarketDataSource;

struct CacheEntry {
    fetched_at: Instant,
    quotes: HashMap<String, Quote>,
}

pub struct ResilientQuoteSource {
    primary: Arc<dyn MarketDataSource>,
    fallback: Arc<dyn MarketDataSource>,
    ttl: Duration,
    cache: Mutex<Option<CacheEntry>>,
    last_known: Mutex<HashMap<String, Quote>>,
}

impl ResilientQuoteSource {
    pub fn new(
        primary: Arc<dyn MarketDataSource>,
        fallback: Arc<dyn MarketDataSource>,
        ttl: Duration,
    ) -> Self {
        Self {
            primary,
            fallback,
            ttl,
            cache: Mutex::new(None),
            last_known: Mutex::new(HashMap::new()),
        }
    }

    async fn cached(&self, symbols: &[String]) -> Option<HashMap<String, Quote>> {
        let cache = self.cache.lock().await;
        let entry = cache.as_ref()?;
        if entry.fetched_at.elapsed() >= self.ttl {
            return None;
        }
        if !symbols.iter().all(|s| entry.quotes.contains_key(s)) {
            return None;
        }
        Some(
            symbols
                .iter()
                .filter_map(|s| entry.quotes.get(s).map(|q| (s.clone(), q.clone())))
                .collect(),
        )
    }
}

#[async_trait]
impl MarketDataSource for ResilientQuoteSource {
    fn name(&self) -> &'static str {
        "resilient"
    }

    async fn fetch_quotes(&self, symbols: &[String]) -> Result<HashMap<String, Quote>> {
        if let Some(quotes) = self.cached(symbols).await {
            debug!("Serving {} quotes from cache", quotes.len());
            return Ok(quotes);
        }

        let mut quotes = match self.primary.fetch_quotes(symbols).await {
            Ok(quotes) => quotes,
            Err(e) => {
                warn!(source = self.primary.name(), error = %e, "live quote fetch failed");
                HashMap::new()
            }
        };

        if !quotes.is_empty() {
            let mut last_known = self.last_known.lock().await;
            for (symbol, quote) in &quotes {
                last_known.insert(symbol.clone(), quote.clone());
            }
        }

        if symbols.iter().all(|s| quotes.contains_key(s)) {
            *self.cache.lock().await = Some(CacheEntry {
                fetched_at: Instant::now(),
                quotes: quotes.clone(),
            });
            return Ok(quotes);
        }

        let mut missing = Vec::new();
        {
            let last_known = self.last_known.lock().await;
            for symbol in symbols {
                if quotes.contains_key(symbol) {
                    continue;
                }
                match last_known.get(symbol) {
                    Some(quote) => {
                        quotes.insert(symbol.clone(), quote.clone().into_cached());
                    }
                    None => missing.push(symbol.clone()),
                }
            }
        }

        if !missing.is_empty() {
            info!(
                source = self.fallback.name(),
                symbols = ?missing,
                "using synthetic quotes"
            );
            match self.fallback.fetch_quotes(&missing).await {
                Ok(synthetic) => quotes.extend(synthetic),
                Err(e) => warn!(error = %e, "fallback quote fetch failed"),
            }
        }

        if quotes.is_empty() {
            return Err(ArenaError::MarketDataUnavailable(
                "no quotes from any source".to_string(),
            ));
        }
        Ok(quotes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::QuoteSource;
    use crate::market_data::MockMarketDataSource;
    use rust_decimal_macros::dec;

    fn pairs() -> Vec<String> {
        vec!["BTC/USDT".to_string(), "ETH/USDT".to_string()]
    }

    fn live(symbol: &str, price: rust_decimal::Decimal) -> Quote {
        let mut quote = Quote::flat(symbol, price, dec!(0.0005));
        quote.source = QuoteSource::Live;
        quote
    }

    fn synthetic_fallback() -> MockMarketDataSource {
        let mut fallback = MockMarketDataSource::new();
        fallback.expect_name().return_const("simulated");
        fallback.expect_fetch_quotes().returning(|symbols| {
            Ok(symbols
                .iter()
                .map(|s| (s.clone(), Quote::flat(s, dec!(100), dec!(0.0005))))
                .collect())
        });
        fallback
    }

    #[tokio::test]
    async fn caches_complete_live_fetch() {
        let mut primary = MockMarketDataSource::new();
        primary.expect_name().return_const("binance");
        primary.expect_fetch_quotes().times(1).returning(|symbols| {
            Ok(symbols
                .iter()
                .map(|s| (s.clone(), live(s, dec!(50000))))
                .collect())
        });

        let source = ResilientQuoteSource::new(
            Arc::new(primary),
            Arc::new(synthetic_fallback()),
            Duration::from_secs(60),
        );
        let first = source.fetch_quotes(&pairs()).await.unwrap();
        let second = source.fetch_quotes(&pairs()).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(second["BTC/USDT"].source, QuoteSource::Live);
    }

    #[tokio::test]
    async fn degrades_to_last_known_then_synthetic() {
        let mut primary = MockMarketDataSource::new();
        primary.expect_name().return_const("binance");
        let mut seq = mockall::Sequence::new();
        primary
            .expect_fetch_quotes()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| {
                let mut quotes = HashMap::new();
                quotes.insert("BTC/USDT".to_string(), live("BTC/USDT", dec!(50000)));
                Ok(quotes)
            });
        primary
            .expect_fetch_quotes()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Err(ArenaError::MarketDataUnavailable("down".to_string())));

        let source = ResilientQuoteSource::new(
            Arc::new(primary),
            Arc::new(synthetic_fallback()),
            Duration::ZERO,
        );

        let first = source.fetch_quotes(&pairs()).await.unwrap();
        assert_eq!(first["BTC/USDT"].source, QuoteSource::Live);
        assert_eq!(first["ETH/USDT"].source, QuoteSource::Simulated);

        let second = source.fetch_quotes(&pairs()).await.unwrap();
        assert_eq!(second["BTC/USDT"].source, QuoteSource::Cached);
        assert_eq!(second["BTC/USDT"].price, dec!(50000));
        assert_eq!(second["ETH/USDT"].source, QuoteSource::Simulated);
    }

    #[tokio::test]
    async fn errors_when_every_source_fails() {
        let mut primary = MockMarketDataSource::new();
        primary.expect_name().return_const("binance");
        primary
            .expect_fetch_quotes()
            .returning(|_| Err(ArenaError::MarketDataUnavailable("down".to_string())));
        let mut fallback = MockMarketDataSource::new();
        fallback.expect_name().return_const("simulated");
        fallback
            .expect_fetch_quotes()
            .returning(|_| Err(ArenaError::Internal("broken".to_string())));

        let source =
            ResilientQuoteSource::new(Arc::new(primary), Arc::new(fallback), Duration::ZERO);
        assert!(matches!(
            source.fetch_quotes(&pairs()).await,
            Err(ArenaError::MarketDataUnavailable(_))
        ));
    }
}
