use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// The four trade intents an agent can express
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TradeDirection {
    /// Buy to open or add to a long
    #[serde(rename = "buy")]
    OpenLong,
    /// Sell part or all of a long
    #[serde(rename = "sell")]
    CloseLong,
    /// Borrow and sell to open or add to a short
    #[serde(rename = "short")]
    OpenShort,
    /// Buy back part or all of a short
    #[serde(rename = "cover")]
    CloseShort,
}

impl TradeDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeDirection::OpenLong => "buy",
            TradeDirection::CloseLong => "sell",
            TradeDirection::OpenShort => "short",
            TradeDirection::CloseShort => "cover",
        }
    }

    /// Whether the trade pays cash out (buy, cover) rather than receiving it
    pub fn pays_cash(&self) -> bool {
        matches!(self, TradeDirection::OpenLong | TradeDirection::CloseShort)
    }
}

impl std::fmt::Display for TradeDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str().to_uppercase())
    }
}

impl std::str::FromStr for TradeDirection {
    type Err = String;

    fn from_str(raw: &str) -> std::result::Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "buy" | "open_long" | "long" => Ok(Self::OpenLong),
            "sell" | "close_long" => Ok(Self::CloseLong),
            "short" | "open_short" => Ok(Self::OpenShort),
            "cover" | "close_short" => Ok(Self::CloseShort),
            other => Err(format!("unknown trade direction '{}'", other)),
        }
    }
}

/// Proposed trade, not yet authoritative
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeIntent {
    pub symbol: String,
    pub direction: TradeDirection,
    pub quantity: Decimal,
    pub price: Decimal,
    pub reasoning: String,
}

impl TradeIntent {
    pub fn new(
        symbol: impl Into<String>,
        direction: TradeDirection,
        quantity: Decimal,
        price: Decimal,
        reasoning: impl Into<String>,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            direction,
            quantity,
            price,
            reasoning: reasoning.into(),
        }
    }

    /// Notional value, `None` when `quantity × price` is not representable
    pub fn total_value(&self) -> Option<Decimal> {
        self.quantity.checked_mul(self.price)
    }
}

/// Final settlement status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeStatus {
    Executed,
    Failed,
}

impl TradeStatus {
    pub fn is_executed(&self) -> bool {
        matches!(self, TradeStatus::Executed)
    }
}

impl std::fmt::Display for TradeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TradeStatus::Executed => write!(f, "EXECUTED"),
            TradeStatus::Failed => write!(f, "FAILED"),
        }
    }
}

/// Venue that settled the trade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionVenue {
    Simulated,
    Live,
}

/// Settled trade. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub id: u64,
    pub symbol: String,
    pub direction: TradeDirection,
    pub quantity: Decimal,
    pub price: Decimal,
    pub total_value: Decimal,
    pub status: TradeStatus,
    pub venue: ExecutionVenue,
    pub reasoning: String,
    pub timestamp: DateTime<Utc>,
}

impl Trade {
    /// Record the outcome of settling `intent`. An intent whose notional
    /// overflows can only fail, and is recorded with a zero total value.
    pub fn settled(id: u64, intent: TradeIntent, status: TradeStatus, venue: ExecutionVenue) -> Self {
        let total_value = intent.total_value().unwrap_or(Decimal::ZERO);
        Self {
            id,
            symbol: intent.symbol,
            direction: intent.direction,
            quantity: intent.quantity,
            price: intent.price,
            total_value,
            status,
            venue,
            reasoning: intent.reasoning,
            timestamp: Utc::now(),
        }
    }

    pub fn is_executed(&self) -> bool {
        self.status.is_executed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn direction_serializes_as_trade_type() {
        assert_eq!(
            serde_json::to_string(&TradeDirection::CloseShort).unwrap(),
            "\"cover\""
        );
        let parsed: TradeDirection = serde_json::from_str("\"short\"").unwrap();
        assert_eq!(parsed, TradeDirection::OpenShort);
    }

    #[test]
    fn direction_parses_aliases() {
        assert_eq!("BUY".parse::<TradeDirection>(), Ok(TradeDirection::OpenLong));
        assert_eq!(
            "close_long".parse::<TradeDirection>(),
            Ok(TradeDirection::CloseLong)
        );
        assert!("hold".parse::<TradeDirection>().is_err());
    }

    #[test]
    fn settled_trade_copies_intent() {
        let intent = TradeIntent::new(
            "BTC/USDT",
            TradeDirection::OpenLong,
            dec!(0.1),
            dec!(50000),
            "momentum",
        );
        let trade = Trade::settled(7, intent, TradeStatus::Executed, ExecutionVenue::Simulated);
        assert_eq!(trade.id, 7);
        assert_eq!(trade.total_value, dec!(5000));
        assert!(trade.is_executed());
        assert_eq!(trade.venue, ExecutionVenue::Simulated);
        assert_eq!(trade.reasoning, "momentum");
    }

    #[test]
    fn cash_flow_direction() {
        assert!(TradeDirection::OpenLong.pays_cash());
        assert!(TradeDirection::CloseShort.pays_cash());
        assert!(!TradeDirection::OpenShort.pays_cash());
        assert!(!TradeDirection::CloseLong.pays_cash());
    }

    #[test]
    fn overflowing_notional_has_no_value() {
        let intent = TradeIntent::new(
            "BTC/USDT",
            TradeDirection::OpenShort,
            Decimal::MAX,
            dec!(2),
            "",
        );
        assert_eq!(intent.total_value(), None);
        let trade = Trade::settled(1, intent, TradeStatus::Failed, ExecutionVenue::Simulated);
        assert_eq!(trade.total_value, Decimal::ZERO);
    }
}
