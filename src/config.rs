use config::{Config, ConfigError, Environment, File};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::{ArenaError, Result};

/// Main configuration structure
///
/// Built once at startup and shared read-only (`Arc<AppConfig>`). Picking up
/// changed settings means constructing a new value, not mutating this one.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub trading: TradingConfig,
    #[serde(default)]
    pub competition: CompetitionConfig,
    #[serde(default)]
    pub arena: ArenaConfig,
    #[serde(default)]
    pub exchange: ExchangeConfig,
    #[serde(default)]
    pub market_data: MarketDataConfig,
    #[serde(default)]
    pub snapshot: SnapshotConfig,
    #[serde(default = "default_agents")]
    pub agents: Vec<AgentSpec>,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TradingConfig {
    /// Paper trading against the simulated exchange. Live settlement is not supported.
    pub mock_trading: bool,
    /// Cash each agent starts with (USDT)
    pub starting_capital: Decimal,
    /// Symbols every agent may trade, e.g. "BTC/USDT"
    pub trading_pairs: Vec<String>,
}

impl Default for TradingConfig {
    fn default() -> Self {
        Self {
            mock_trading: true,
            starting_capital: dec!(10000),
            trading_pairs: vec![
                "BTC/USDT".to_string(),
                "ETH/USDT".to_string(),
                "SOL/USDT".to_string(),
                "BNB/USDT".to_string(),
            ],
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CompetitionConfig {
    /// Number of cycles to run
    pub cycles: u32,
    /// Seconds to sleep between cycles
    pub cycle_interval_secs: u64,
}

impl Default for CompetitionConfig {
    fn default() -> Self {
        Self {
            cycles: 50,
            cycle_interval_secs: 5,
        }
    }
}

/// How the settlement engine's liquidity ledger is scoped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettlementMode {
    /// One liquidity ledger per agent, seeded with that agent's capital.
    Isolated,
    /// One liquidity ledger for every agent, seeded with the pooled capital.
    Shared,
}

impl Default for SettlementMode {
    fn default() -> Self {
        Self::Isolated
    }
}

impl std::fmt::Display for SettlementMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SettlementMode::Isolated => write!(f, "isolated"),
            SettlementMode::Shared => write!(f, "shared"),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ArenaConfig {
    /// Upper bound on a single decision call (ms)
    pub decision_timeout_ms: u64,
    /// Trades per agent included in each snapshot
    pub recent_trades_limit: usize,
    /// Liquidity ledger scoping for settlement
    pub settlement_mode: SettlementMode,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            decision_timeout_ms: 30_000,
            recent_trades_limit: 5,
            settlement_mode: SettlementMode::Isolated,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ExchangeConfig {
    /// Quote currency of every trading pair
    pub quote_asset: String,
    /// Lower bound of the simulated settlement latency (ms)
    pub settlement_delay_min_ms: u64,
    /// Upper bound of the simulated settlement latency (ms)
    pub settlement_delay_max_ms: u64,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            quote_asset: "USDT".to_string(),
            settlement_delay_min_ms: 100,
            settlement_delay_max_ms: 500,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketDataProvider {
    Binance,
    Simulated,
}

impl Default for MarketDataProvider {
    fn default() -> Self {
        Self::Binance
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MarketDataConfig {
    /// Primary quote provider; the simulated feed is always the fallback
    pub provider: MarketDataProvider,
    /// REST endpoint of the ticker API
    pub base_url: String,
    /// How long a fetched quote set is reused (seconds)
    pub cache_secs: u64,
    /// HTTP timeout (seconds)
    pub request_timeout_secs: u64,
}

impl Default for MarketDataConfig {
    fn default() -> Self {
        Self {
            provider: MarketDataProvider::Binance,
            base_url: "https://api.binance.us/api/v3".to_string(),
            cache_secs: 10,
            request_timeout_secs: 5,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SnapshotConfig {
    /// JSON file the dashboard reads
    pub path: String,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            path: "arena_state.json".to_string(),
        }
    }
}

/// One entry of the `[[agents]]` table.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AgentSpec {
    /// Strategy kind tag: momentum | openai | deepseek | openai_compatible
    pub kind: String,
    /// Display name
    pub name: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// How many instances of this spec to register
    #[serde(default = "default_count")]
    pub count: usize,
    /// Model name for LLM-backed kinds
    #[serde(default)]
    pub model: Option<String>,
    /// Environment variable holding the API key
    #[serde(default)]
    pub api_key_env: Option<String>,
    /// Chat-completions base URL override
    #[serde(default)]
    pub base_url: Option<String>,
    /// RNG seed for heuristic kinds (reproducible runs)
    #[serde(default)]
    pub seed: Option<u64>,
}

impl AgentSpec {
    pub fn momentum(name: &str) -> Self {
        Self {
            kind: "momentum".to_string(),
            name: name.to_string(),
            enabled: true,
            count: 1,
            model: None,
            api_key_env: None,
            base_url: None,
            seed: None,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_count() -> usize {
    1
}

fn default_agents() -> Vec<AgentSpec> {
    vec![
        AgentSpec {
            kind: "deepseek".to_string(),
            name: "DeepSeek".to_string(),
            enabled: true,
            count: 1,
            model: Some("deepseek-chat".to_string()),
            api_key_env: Some("DEEPSEEK_API_KEY".to_string()),
            base_url: None,
            seed: None,
        },
        AgentSpec::momentum("Momentum-Alpha"),
        AgentSpec::momentum("Momentum-Beta"),
    ]
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Enable JSON formatted logs
    #[serde(default)]
    pub json: bool,
    /// Directory for the rolling log file (disabled when unset)
    #[serde(default)]
    pub dir: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl AppConfig {
    /// Load configuration from a specific directory
    pub fn load_from<P: AsRef<Path>>(config_dir: P) -> std::result::Result<Self, ConfigError> {
        let config_dir = config_dir.as_ref();

        let builder = Config::builder()
            .set_default("logging.level", "info")?
            .set_default("logging.json", false)?
            // Load default config file
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            // Load environment-specific config (e.g., config/production.toml)
            .add_source(
                File::from(config_dir.join(
                    std::env::var("ARENA_ENV").unwrap_or_else(|_| "development".to_string()),
                ))
                .required(false),
            )
            // Override with environment variables (ARENA_TRADING__STARTING_CAPITAL, etc.)
            .add_source(
                Environment::with_prefix("ARENA")
                    .separator("__")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }

    /// Complete in-code configuration, used when no config directory exists
    pub fn default_config() -> Self {
        Self {
            trading: TradingConfig::default(),
            competition: CompetitionConfig::default(),
            arena: ArenaConfig::default(),
            exchange: ExchangeConfig::default(),
            market_data: MarketDataConfig::default(),
            snapshot: SnapshotConfig::default(),
            agents: default_agents(),
            logging: LoggingConfig {
                level: default_log_level(),
                json: false,
                dir: None,
            },
        }
    }

    /// Reject configurations the arena cannot start with
    pub fn validate(&self) -> Result<()> {
        if !self.trading.mock_trading {
            return Err(ArenaError::InvalidConfig(
                "live settlement is not supported; set trading.mock_trading = true".to_string(),
            ));
        }
        if self.trading.starting_capital <= Decimal::ZERO {
            return Err(ArenaError::InvalidConfig(
                "starting capital must be positive".to_string(),
            ));
        }
        if self.trading.trading_pairs.is_empty() {
            return Err(ArenaError::InvalidConfig(
                "at least one trading pair must be specified".to_string(),
            ));
        }
        if let Some(bad) = self
            .trading
            .trading_pairs
            .iter()
            .find(|pair| base_asset(pair).is_empty())
        {
            return Err(ArenaError::InvalidConfig(format!(
                "invalid trading pair '{}'",
                bad
            )));
        }
        if self.competition.cycles == 0 {
            return Err(ArenaError::InvalidConfig(
                "competition.cycles must be positive".to_string(),
            ));
        }
        if self.arena.decision_timeout_ms == 0 {
            return Err(ArenaError::InvalidConfig(
                "arena.decision_timeout_ms must be positive".to_string(),
            ));
        }
        if self.exchange.settlement_delay_min_ms > self.exchange.settlement_delay_max_ms {
            return Err(ArenaError::InvalidConfig(format!(
                "settlement delay range is inverted: {}ms > {}ms",
                self.exchange.settlement_delay_min_ms, self.exchange.settlement_delay_max_ms
            )));
        }
        Ok(())
    }

    pub fn decision_timeout(&self) -> Duration {
        Duration::from_millis(self.arena.decision_timeout_ms)
    }

    pub fn cycle_interval(&self) -> Duration {
        Duration::from_secs(self.competition.cycle_interval_secs)
    }

    pub fn trading_mode_str(&self) -> &'static str {
        if self.trading.mock_trading {
            "MOCK TRADING"
        } else {
            "REAL TRADING"
        }
    }
}

/// Base asset of a pair: "BTC/USDT" -> "BTC"
pub fn base_asset(pair: &str) -> &str {
    pair.split('/').next().unwrap_or("").trim()
}
