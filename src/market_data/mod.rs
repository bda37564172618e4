//! Market Data Source
//!
//! Supplies one quote per tracked symbol each cycle. The arena does not
//! distinguish source quality; degraded quotes are labelled on the quote.

mod binance;
mod resilient;
mod simulated;

pub use binance::BinanceTickerSource;
pub use resilient::ResilientQuoteSource;
pub use simulated::SimulatedQuoteSource;

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

use crate::config::{AppConfig, MarketDataProvider};
use crate::domain::Quote;
use crate::error::Result;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    fn name(&self) -> &'static str;

    /// Quotes keyed by symbol. Symbols that could not be priced are absent.
    async fn fetch_quotes(&self, symbols: &[String]) -> Result<HashMap<String, Quote>>;
}

/// Build the configured quote source, always backed by the simulated feed
pub fn build_market_data(config: &AppConfig) -> Result<Arc<dyn MarketDataSource>> {
    let simulated: Arc<dyn MarketDataSource> = Arc::new(SimulatedQuoteSource::new());

    match config.market_data.provider {
        MarketDataProvider::Simulated => Ok(simulated),
        MarketDataProvider::Binance => {
            let binance = BinanceTickerSource::new(
                &config.market_data.base_url,
                config.market_data.request_timeout_secs,
            )?;
            Ok(Arc::new(ResilientQuoteSource::new(
                Arc::new(binance),
                simulated,
                std::time::Duration::from_secs(config.market_data.cache_secs),
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simulated_provider_builds_plain_feed() {
        let mut config = AppConfig::default_config();
        config.market_data.provider = MarketDataProvider::Simulated;
        let source = build_market_data(&config).unwrap();
        assert_eq!(source.name(), "simulated");
    }

    #[test]
    fn binance_provider_is_wrapped_with_fallback() {
        let config = AppConfig::default_config();
        let source = build_market_data(&config).unwrap();
        assert_eq!(source.name(), "resilient");
    }
}
