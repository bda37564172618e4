use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Positions whose absolute quantity falls below this are closed
pub const QUANTITY_EPSILON: Decimal = dec!(0.000001);

/// Signed exposure of one agent to one symbol.
///
/// Positive quantity is long (owns the asset), negative is short (owes it).
/// A position with zero quantity must not exist; the ledger deletes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub symbol: String,
    pub quantity: Decimal,
    /// Quantity-weighted average of the prices that increased exposure
    pub average_entry_price: Decimal,
    /// Last quote price applied
    pub current_price: Decimal,
    /// Realized P&L accumulated by partial closes of this position
    pub realized_pnl: Decimal,
    pub opened_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

impl Position {
    pub fn open(symbol: &str, quantity: Decimal, price: Decimal) -> Self {
        let now = Utc::now();
        Self {
            symbol: symbol.to_string(),
            quantity,
            average_entry_price: price,
            current_price: price,
            realized_pnl: Decimal::ZERO,
            opened_at: now,
            last_updated: now,
        }
    }

    pub fn is_long(&self) -> bool {
        self.quantity > Decimal::ZERO
    }

    pub fn is_short(&self) -> bool {
        self.quantity < Decimal::ZERO
    }

    /// Market value: positive for longs (asset), negative for shorts (liability)
    /// Saturates rather than overflowing on absurd marks.
    pub fn current_value(&self) -> Decimal {
        self.quantity.saturating_mul(self.current_price)
    }

    pub fn cost_basis(&self) -> Decimal {
        self.quantity.saturating_mul(self.average_entry_price)
    }

    /// `(current - entry) * quantity`; the sign of quantity handles shorts
    pub fn unrealized_pnl(&self) -> Decimal {
        self.current_price
            .saturating_sub(self.average_entry_price)
            .saturating_mul(self.quantity)
    }

    /// Mark to a new price. Never touches quantity or entry price.
    pub fn update_price(&mut self, price: Decimal) {
        self.current_price = price;
        self.last_updated = Utc::now();
    }

    /// Whether the position is small enough to be considered closed
    pub fn is_flat(&self) -> bool {
        self.quantity.abs() < QUANTITY_EPSILON
    }
}
