use rust_decimal::Decimal;
use thiserror::Error;

/// Main error type for the arena
#[derive(Error, Debug)]
pub enum ArenaError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // Network errors
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    // Serialization errors
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    // Market data errors
    #[error("Market data unavailable: {0}")]
    MarketDataUnavailable(String),

    #[error("Invalid market data: {0}")]
    InvalidMarketData(String),

    // Decision provider errors
    #[error("Decision provider {agent_id} failed: {reason}")]
    DecisionFailed { agent_id: String, reason: String },

    // Settlement errors (transport only; business rule violations are FAILED trades)
    #[error("Settlement error: {0}")]
    Settlement(String),

    // Snapshot errors
    #[error("Snapshot error: {0}")]
    Snapshot(String),

    // Startup errors
    #[error("No agents registered")]
    NoAgents,

    #[error("Unsupported: {0}")]
    Unsupported(String),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Generic errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

/// Result type alias for ArenaError
pub type Result<T> = std::result::Result<T, ArenaError>;

/// Reason a trade intent was suppressed before it reached settlement.
///
/// These are expected outcomes, not faults: the cycle carries on and the
/// agent simply does not trade.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerRejection {
    #[error("insufficient cash: required ${required}, available ${available}")]
    InsufficientCash {
        required: Decimal,
        available: Decimal,
    },

    #[error("no position in {symbol} to close")]
    NoPosition { symbol: String },

    #[error("insufficient quantity in {symbol}: held {held}, requested {requested}")]
    InsufficientQuantity {
        symbol: String,
        held: Decimal,
        requested: Decimal,
    },

    #[error("position in {symbol} has the wrong direction (held {held})")]
    WrongDirection { symbol: String, held: Decimal },

    #[error("quantity must be positive, got {0}")]
    InvalidQuantity(Decimal),

    #[error("price must be positive, got {0}")]
    InvalidPrice(Decimal),

    #[error("symbol {0} is not tracked this cycle")]
    UnknownSymbol(String),

    #[error("trade value for {symbol} is out of range")]
    ValueOverflow { symbol: String },
}
