//! Per-agent portfolio ledger
//!
//! The authoritative record of one agent's cash, positions, trade history
//! and performance counters. Only the arena mutates it, and only after the
//! settlement engine has executed a trade.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info};

use crate::domain::{Position, Trade, TradeDirection, TradeIntent};
use crate::error::LedgerRejection;

/// Financial effect of applying one executed trade
#[derive(Debug, Clone, PartialEq)]
pub struct AppliedTrade {
    /// Realized P&L for closing trades, `None` for opening trades
    pub realized_pnl: Option<Decimal>,
    /// Whether the trade removed the position record
    pub position_closed: bool,
    /// Quantity left in the position afterwards (signed)
    pub remaining_quantity: Decimal,
}

/// Ledger values after a trade, computed before anything is mutated
struct Transition {
    cash: Decimal,
    quantity: Decimal,
    entry_price: Decimal,
    realized_pnl: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentState {
    pub agent_id: String,
    pub agent_name: String,
    pub starting_capital: Decimal,
    pub cash_balance: Decimal,
    pub positions: HashMap<String, Position>,
    /// Executed trades only, append-only
    pub trade_history: Vec<Trade>,
    pub total_trades: u32,
    pub winning_trades: u32,
    pub losing_trades: u32,
    /// Cumulative realized P&L across every closing trade
    pub realized_pnl: Decimal,
    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

impl AgentState {
    pub fn new(agent_id: &str, agent_name: &str, starting_capital: Decimal) -> Self {
        let now = Utc::now();
        Self {
            agent_id: agent_id.to_string(),
            agent_name: agent_name.to_string(),
            starting_capital,
            cash_balance: starting_capital,
            positions: HashMap::new(),
            trade_history: Vec::new(),
            total_trades: 0,
            winning_trades: 0,
            losing_trades: 0,
            realized_pnl: Decimal::ZERO,
            created_at: now,
            last_updated: now,
        }
    }

    // ==================== Derived values ====================

    /// Cash plus the signed market value of every open position
    pub fn total_portfolio_value(&self) -> Decimal {
        self.positions
            .values()
            .map(Position::current_value)
            .fold(self.cash_balance, Decimal::saturating_add)
    }

    /// Return on starting capital, in percent
    pub fn total_return(&self) -> Decimal {
        self.total_pnl()
            .checked_div(self.starting_capital)
            .map(|ratio| ratio.saturating_mul(Decimal::ONE_HUNDRED))
            .unwrap_or(Decimal::ZERO)
    }

    /// Winning closes over all executed trades, in percent
    pub fn win_rate(&self) -> Decimal {
        if self.total_trades == 0 {
            return Decimal::ZERO;
        }
        Decimal::from(self.winning_trades) / Decimal::from(self.total_trades)
            * Decimal::ONE_HUNDRED
    }

    pub fn total_pnl(&self) -> Decimal {
        self.total_portfolio_value()
            .saturating_sub(self.starting_capital)
    }

    pub fn unrealized_pnl(&self) -> Decimal {
        self.positions
            .values()
            .map(Position::unrealized_pnl)
            .fold(Decimal::ZERO, Decimal::saturating_add)
    }

    pub fn position(&self, symbol: &str) -> Option<&Position> {
        self.positions.get(symbol)
    }

    /// Most recent `limit` executed trades, oldest first
    pub fn recent_trades(&self, limit: usize) -> &[Trade] {
        let start = self.trade_history.len().saturating_sub(limit);
        &self.trade_history[start..]
    }

    // ==================== Mutations ====================

    /// Mark every open position to the latest prices.
    ///
    /// Symbols missing from `prices` keep their previous mark.
    pub fn mark_to_market(&mut self, prices: &HashMap<String, Decimal>) {
        for (symbol, position) in self.positions.iter_mut() {
            if let Some(price) = prices.get(symbol) {
                position.update_price(*price);
            }
        }
        self.last_updated = Utc::now();
    }

    /// Check an intent against this ledger before it is sent to settlement.
    ///
    /// Besides the direction rules, the resulting cash, quantity and entry
    /// price must all be representable.
    pub fn precheck(&self, intent: &TradeIntent) -> Result<(), LedgerRejection> {
        if intent.quantity <= Decimal::ZERO {
            return Err(LedgerRejection::InvalidQuantity(intent.quantity));
        }
        if intent.price <= Decimal::ZERO {
            return Err(LedgerRejection::InvalidPrice(intent.price));
        }
        let total_value = intent
            .total_value()
            .ok_or_else(|| LedgerRejection::ValueOverflow {
                symbol: intent.symbol.clone(),
            })?;

        let existing = self.positions.get(&intent.symbol);
        match intent.direction {
            TradeDirection::OpenLong => {
                if total_value > self.cash_balance {
                    return Err(LedgerRejection::InsufficientCash {
                        required: total_value,
                        available: self.cash_balance,
                    });
                }
                if let Some(pos) = existing.filter(|p| p.is_short()) {
                    return Err(LedgerRejection::WrongDirection {
                        symbol: intent.symbol.clone(),
                        held: pos.quantity,
                    });
                }
            }
            TradeDirection::CloseLong => {
                let pos = existing.ok_or_else(|| LedgerRejection::NoPosition {
                    symbol: intent.symbol.clone(),
                })?;
                if !pos.is_long() {
                    return Err(LedgerRejection::WrongDirection {
                        symbol: intent.symbol.clone(),
                        held: pos.quantity,
                    });
                }
                if pos.quantity < intent.quantity {
                    return Err(LedgerRejection::InsufficientQuantity {
                        symbol: intent.symbol.clone(),
                        held: pos.quantity,
                        requested: intent.quantity,
                    });
                }
            }
            TradeDirection::OpenShort => {
                if let Some(pos) = existing.filter(|p| p.is_long()) {
                    return Err(LedgerRejection::WrongDirection {
                        symbol: intent.symbol.clone(),
                        held: pos.quantity,
                    });
                }
            }
            TradeDirection::CloseShort => {
                let pos = existing.ok_or_else(|| LedgerRejection::NoPosition {
                    symbol: intent.symbol.clone(),
                })?;
                if !pos.is_short() {
                    return Err(LedgerRejection::WrongDirection {
                        symbol: intent.symbol.clone(),
                        held: pos.quantity,
                    });
                }
                if pos.quantity.abs() < intent.quantity {
                    return Err(LedgerRejection::InsufficientQuantity {
                        symbol: intent.symbol.clone(),
                        held: pos.quantity.abs(),
                        requested: intent.quantity,
                    });
                }
            }
        }

        self.transition(intent, total_value)
            .map(|_| ())
            .ok_or_else(|| LedgerRejection::ValueOverflow {
                symbol: intent.symbol.clone(),
            })
    }

    /// Cash and position after `intent`, or `None` if any value overflows.
    /// Assumes the direction rules in `precheck` already hold.
    fn transition(&self, intent: &TradeIntent, total_value: Decimal) -> Option<Transition> {
        let q = intent.quantity;
        let p = intent.price;
        let existing = self.positions.get(&intent.symbol);

        let next = match (intent.direction, existing) {
            (TradeDirection::OpenLong, None) => Transition {
                cash: self.cash_balance.checked_sub(total_value)?,
                quantity: q,
                entry_price: p,
                realized_pnl: None,
            },
            (TradeDirection::OpenLong, Some(pos)) => {
                let quantity = pos.quantity.checked_add(q)?;
                let cost = pos
                    .average_entry_price
                    .checked_mul(pos.quantity)?
                    .checked_add(total_value)?;
                Transition {
                    cash: self.cash_balance.checked_sub(total_value)?,
                    quantity,
                    entry_price: cost.checked_div(quantity)?,
                    realized_pnl: None,
                }
            }
            (TradeDirection::OpenShort, None) => Transition {
                cash: self.cash_balance.checked_add(total_value)?,
                quantity: -q,
                entry_price: p,
                realized_pnl: None,
            },
            (TradeDirection::OpenShort, Some(pos)) => {
                let quantity = pos.quantity.checked_sub(q)?;
                let exposure = pos
                    .average_entry_price
                    .checked_mul(pos.quantity)?
                    .abs()
                    .checked_add(total_value)?;
                Transition {
                    cash: self.cash_balance.checked_add(total_value)?,
                    quantity,
                    entry_price: exposure.checked_div(quantity.abs())?,
                    realized_pnl: None,
                }
            }
            (TradeDirection::CloseLong, Some(pos)) => {
                let basis = pos.average_entry_price.checked_mul(q)?;
                Transition {
                    cash: self.cash_balance.checked_add(total_value)?,
                    quantity: pos.quantity.checked_sub(q)?,
                    entry_price: pos.average_entry_price,
                    realized_pnl: Some(total_value.checked_sub(basis)?),
                }
            }
            (TradeDirection::CloseShort, Some(pos)) => {
                let basis = pos.average_entry_price.checked_mul(q)?;
                Transition {
                    cash: self.cash_balance.checked_sub(total_value)?,
                    quantity: pos.quantity.checked_add(q)?,
                    entry_price: pos.average_entry_price,
                    realized_pnl: Some(basis.checked_sub(total_value)?),
                }
            }
            (TradeDirection::CloseLong | TradeDirection::CloseShort, None) => return None,
        };

        if let Some(pnl) = next.realized_pnl {
            self.realized_pnl.checked_add(pnl)?;
        }
        Some(next)
    }

    /// Apply the financial effect of an executed trade.
    ///
    /// The trade is re-checked against the ledger first; a trade that no
    /// longer fits leaves the ledger untouched and is not recorded.
    pub fn apply(&mut self, trade: &Trade) -> Result<AppliedTrade, LedgerRejection> {
        let intent = TradeIntent::new(
            trade.symbol.clone(),
            trade.direction,
            trade.quantity,
            trade.price,
            String::new(),
        );
        self.precheck(&intent)?;
        let next = intent
            .total_value()
            .and_then(|total_value| self.transition(&intent, total_value))
            .ok_or_else(|| LedgerRejection::ValueOverflow {
                symbol: trade.symbol.clone(),
            })?;

        let now = Utc::now();
        self.cash_balance = next.cash;
        match self.positions.get_mut(&trade.symbol) {
            Some(pos) => {
                pos.quantity = next.quantity;
                pos.average_entry_price = next.entry_price;
                if let Some(pnl) = next.realized_pnl {
                    pos.realized_pnl = pos.realized_pnl.saturating_add(pnl);
                }
                pos.last_updated = now;
            }
            None => {
                self.positions.insert(
                    trade.symbol.clone(),
                    Position::open(&trade.symbol, next.quantity, next.entry_price),
                );
            }
        }

        let applied = match next.realized_pnl {
            Some(pnl) => self.close_out(&trade.symbol, pnl),
            None => AppliedTrade {
                realized_pnl: None,
                position_closed: false,
                remaining_quantity: next.quantity,
            },
        };

        self.trade_history.push(trade.clone());
        self.total_trades += 1;
        self.last_updated = now;

        debug!(
            agent_id = %self.agent_id,
            trade_id = trade.id,
            direction = %trade.direction,
            symbol = %trade.symbol,
            quantity = %trade.quantity,
            price = %trade.price,
            cash = %self.cash_balance,
            "trade applied to ledger"
        );

        Ok(applied)
    }

    /// Book realized P&L for a reducing trade and drop the position once flat
    fn close_out(&mut self, symbol: &str, pnl: Decimal) -> AppliedTrade {
        self.realized_pnl = self.realized_pnl.saturating_add(pnl);
        if pnl > Decimal::ZERO {
            self.winning_trades += 1;
        } else if pnl < Decimal::ZERO {
            self.losing_trades += 1;
        }

        let flat = self.positions.get(symbol).map(Position::is_flat).unwrap_or(true);
        if flat {
            self.positions.remove(symbol);
            info!(
                agent_id = %self.agent_id,
                %symbol,
                realized_pnl = %pnl.round_dp(2),
                "position closed"
            );
            AppliedTrade {
                realized_pnl: Some(pnl),
                position_closed: true,
                remaining_quantity: Decimal::ZERO,
            }
        } else {
            let remaining = self
                .positions
                .get(symbol)
                .map(|p| p.quantity)
                .unwrap_or(Decimal::ZERO);
            AppliedTrade {
                realized_pnl: Some(pnl),
                position_closed: false,
                remaining_quantity: remaining,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ExecutionVenue, TradeStatus};
    use rust_decimal_macros::dec;

    fn executed(id: u64, symbol: &str, direction: TradeDirection, qty: Decimal, price: Decimal) -> Trade {
        Trade::settled(
            id,
            TradeIntent::new(symbol, direction, qty, price, "test"),
            TradeStatus::Executed,
            ExecutionVenue::Simulated,
        )
    }

    fn prices(symbol: &str, price: Decimal) -> HashMap<String, Decimal> {
        let mut map = HashMap::new();
        map.insert(symbol.to_string(), price);
        map
    }

    #[test]
    fn buy_creates_position_and_debits_cash() {
        let mut state = AgentState::new("agent_1", "Alpha", dec!(10000));
        let applied = state
            .apply(&executed(1, "BTC/USDT", TradeDirection::OpenLong, dec!(0.1), dec!(50000)))
            .unwrap();

        assert_eq!(applied.realized_pnl, None);
        assert_eq!(state.cash_balance, dec!(5000));
        let pos = state.position("BTC/USDT").unwrap();
        assert_eq!(pos.quantity, dec!(0.1));
        assert_eq!(pos.average_entry_price, dec!(50000));
        assert_eq!(state.total_trades, 1);
        assert_eq!(state.total_portfolio_value(), dec!(10000));
    }

    #[test]
    fn adding_to_long_reweights_entry_price() {
        let mut state = AgentState::new("agent_1", "Alpha", dec!(20000));
        state
            .apply(&executed(1, "BTC/USDT", TradeDirection::OpenLong, dec!(0.1), dec!(50000)))
            .unwrap();
        state
            .apply(&executed(2, "BTC/USDT", TradeDirection::OpenLong, dec!(0.1), dec!(52000)))
            .unwrap();

        let pos = state.position("BTC/USDT").unwrap();
        assert_eq!(pos.quantity, dec!(0.2));
        assert_eq!(pos.average_entry_price, dec!(51000));
        assert_eq!(state.cash_balance, dec!(9800));
    }

    #[test]
    fn full_sell_removes_position() {
        let mut state = AgentState::new("agent_1", "Alpha", dec!(10000));
        state
            .apply(&executed(1, "BTC/USDT", TradeDirection::OpenLong, dec!(0.1), dec!(50000)))
            .unwrap();
        let applied = state
            .apply(&executed(2, "BTC/USDT", TradeDirection::CloseLong, dec!(0.1), dec!(51000)))
            .unwrap();

        assert!(applied.position_closed);
        assert_eq!(applied.realized_pnl, Some(dec!(100)));
        assert!(state.position("BTC/USDT").is_none());
        assert_eq!(state.cash_balance, dec!(10100));
        assert_eq!(state.winning_trades, 1);
        assert_eq!(state.losing_trades, 0);
        assert_eq!(state.win_rate(), dec!(50));
    }

    #[test]
    fn partial_sell_keeps_entry_price() {
        let mut state = AgentState::new("agent_1", "Alpha", dec!(10000));
        state
            .apply(&executed(1, "ETH/USDT", TradeDirection::OpenLong, dec!(2), dec!(3500)))
            .unwrap();
        let applied = state
            .apply(&executed(2, "ETH/USDT", TradeDirection::CloseLong, dec!(0.5), dec!(3400)))
            .unwrap();

        assert!(!applied.position_closed);
        assert_eq!(applied.realized_pnl, Some(dec!(-50)));
        assert_eq!(applied.remaining_quantity, dec!(1.5));
        let pos = state.position("ETH/USDT").unwrap();
        assert_eq!(pos.average_entry_price, dec!(3500));
        assert_eq!(pos.realized_pnl, dec!(-50));
        assert_eq!(state.losing_trades, 1);
    }

    #[test]
    fn break_even_close_counts_neither() {
        let mut state = AgentState::new("agent_1", "Alpha", dec!(10000));
        state
            .apply(&executed(1, "SOL/USDT", TradeDirection::OpenLong, dec!(10), dec!(170)))
            .unwrap();
        state
            .apply(&executed(2, "SOL/USDT", TradeDirection::CloseLong, dec!(10), dec!(170)))
            .unwrap();
        assert_eq!(state.winning_trades, 0);
        assert_eq!(state.losing_trades, 0);
        assert_eq!(state.total_trades, 2);
    }

    #[test]
    fn short_then_cover_at_lower_price_wins() {
        let mut state = AgentState::new("agent_1", "Alpha", dec!(10000));
        state
            .apply(&executed(1, "BTC/USDT", TradeDirection::OpenShort, dec!(0.1), dec!(50000)))
            .unwrap();
        assert_eq!(state.cash_balance, dec!(15000));
        assert_eq!(state.position("BTC/USDT").unwrap().quantity, dec!(-0.1));

        let applied = state
            .apply(&executed(2, "BTC/USDT", TradeDirection::CloseShort, dec!(0.1), dec!(49000)))
            .unwrap();
        assert_eq!(applied.realized_pnl, Some(dec!(100)));
        assert!(applied.position_closed);
        assert_eq!(state.cash_balance, dec!(10100));
        assert_eq!(state.winning_trades, 1);
        assert!(state.position("BTC/USDT").is_none());
    }

    #[test]
    fn adding_to_short_reweights_absolute_exposure() {
        let mut state = AgentState::new("agent_1", "Alpha", dec!(10000));
        state
            .apply(&executed(1, "BTC/USDT", TradeDirection::OpenShort, dec!(0.1), dec!(50000)))
            .unwrap();
        state
            .apply(&executed(2, "BTC/USDT", TradeDirection::OpenShort, dec!(0.3), dec!(54000)))
            .unwrap();

        let pos = state.position("BTC/USDT").unwrap();
        assert_eq!(pos.quantity, dec!(-0.4));
        // (5000 + 16200) / 0.4
        assert_eq!(pos.average_entry_price, dec!(53000));
    }

    #[test]
    fn precheck_rejects_overspend_without_mutation() {
        let state = AgentState::new("agent_1", "Alpha", dec!(1000));
        let intent = TradeIntent::new("BTC/USDT", TradeDirection::OpenLong, dec!(0.1), dec!(50000), "");
        assert_eq!(
            state.precheck(&intent),
            Err(LedgerRejection::InsufficientCash {
                required: dec!(5000),
                available: dec!(1000),
            })
        );
        assert_eq!(state.cash_balance, dec!(1000));
        assert!(state.positions.is_empty());
    }

    #[test]
    fn precheck_rejects_wrong_direction_and_missing_positions() {
        let mut state = AgentState::new("agent_1", "Alpha", dec!(10000));
        let sell = TradeIntent::new("BTC/USDT", TradeDirection::CloseLong, dec!(0.1), dec!(50000), "");
        assert!(matches!(state.precheck(&sell), Err(LedgerRejection::NoPosition { .. })));

        state
            .apply(&executed(1, "BTC/USDT", TradeDirection::OpenLong, dec!(0.1), dec!(50000)))
            .unwrap();
        let short = TradeIntent::new("BTC/USDT", TradeDirection::OpenShort, dec!(0.1), dec!(50000), "");
        assert!(matches!(state.precheck(&short), Err(LedgerRejection::WrongDirection { .. })));

        let cover = TradeIntent::new("BTC/USDT", TradeDirection::CloseShort, dec!(0.1), dec!(50000), "");
        assert!(matches!(state.precheck(&cover), Err(LedgerRejection::WrongDirection { .. })));

        let oversell = TradeIntent::new("BTC/USDT", TradeDirection::CloseLong, dec!(0.2), dec!(50000), "");
        assert!(matches!(
            state.precheck(&oversell),
            Err(LedgerRejection::InsufficientQuantity { .. })
        ));
    }

    #[test]
    fn precheck_rejects_non_positive_amounts() {
        let state = AgentState::new("agent_1", "Alpha", dec!(10000));
        let zero = TradeIntent::new("BTC/USDT", TradeDirection::OpenShort, dec!(0), dec!(50000), "");
        assert_eq!(state.precheck(&zero), Err(LedgerRejection::InvalidQuantity(dec!(0))));
        let free = TradeIntent::new("BTC/USDT", TradeDirection::OpenShort, dec!(1), dec!(0), "");
        assert_eq!(state.precheck(&free), Err(LedgerRejection::InvalidPrice(dec!(0))));
    }

    #[test]
    fn precheck_rejects_unrepresentable_values() {
        let state = AgentState::new("agent_1", "Alpha", dec!(10000));
        let overflow = LedgerRejection::ValueOverflow {
            symbol: "BTC/USDT".into(),
        };

        let notional = TradeIntent::new("BTC/USDT", TradeDirection::OpenShort, Decimal::MAX, dec!(2), "");
        assert_eq!(state.precheck(&notional), Err(overflow.clone()));

        // Notional fits, the cash credit does not
        let credit = TradeIntent::new("BTC/USDT", TradeDirection::OpenShort, Decimal::MAX, dec!(1), "");
        assert_eq!(state.precheck(&credit), Err(overflow));
    }

    #[test]
    fn overflowing_trade_is_not_applied() {
        let mut state = AgentState::new("agent_1", "Alpha", dec!(10000));
        let result = state.apply(&executed(1, "BTC/USDT", TradeDirection::OpenShort, Decimal::MAX, dec!(2)));
        assert!(matches!(result, Err(LedgerRejection::ValueOverflow { .. })));
        assert!(state.positions.is_empty());
        assert!(state.trade_history.is_empty());
        assert_eq!(state.cash_balance, dec!(10000));
    }

    #[test]
    fn extreme_marks_saturate_instead_of_panicking() {
        let mut state = AgentState::new("agent_1", "Alpha", dec!(10000));
        let quantity = Decimal::from_i128_with_scale(10i128.pow(27), 0);
        state
            .apply(&executed(1, "BTC/USDT", TradeDirection::OpenShort, quantity, dec!(2)))
            .unwrap();
        state.mark_to_market(&prices("BTC/USDT", dec!(1000)));
        assert_eq!(state.position("BTC/USDT").unwrap().current_value(), Decimal::MIN);
        assert!(state.total_portfolio_value() < Decimal::ZERO);
        assert!(state.total_return() < Decimal::ZERO);
        assert!(state.unrealized_pnl() < Decimal::ZERO);
    }

    #[test]
    fn rejected_apply_leaves_history_untouched() {
        let mut state = AgentState::new("agent_1", "Alpha", dec!(10000));
        let result = state.apply(&executed(1, "BTC/USDT", TradeDirection::CloseShort, dec!(0.1), dec!(50000)));
        assert!(result.is_err());
        assert!(state.trade_history.is_empty());
        assert_eq!(state.total_trades, 0);
        assert_eq!(state.cash_balance, dec!(10000));
    }

    #[test]
    fn mark_to_market_moves_value_not_quantity() {
        let mut state = AgentState::new("agent_1", "Alpha", dec!(10000));
        state
            .apply(&executed(1, "BTC/USDT", TradeDirection::OpenLong, dec!(0.1), dec!(50000)))
            .unwrap();
        state.mark_to_market(&prices("BTC/USDT", dec!(55000)));
        state.mark_to_market(&prices("BTC/USDT", dec!(55000)));

        let pos = state.position("BTC/USDT").unwrap();
        assert_eq!(pos.quantity, dec!(0.1));
        assert_eq!(pos.average_entry_price, dec!(50000));
        assert_eq!(state.unrealized_pnl(), dec!(500));
        assert_eq!(state.total_portfolio_value(), dec!(10500));
        assert_eq!(state.total_return(), dec!(5));
    }

    #[test]
    fn conservation_holds_across_mixed_trades() {
        let mut state = AgentState::new("agent_1", "Alpha", dec!(10000));
        let trades = [
            executed(1, "BTC/USDT", TradeDirection::OpenLong, dec!(0.05), dec!(50000)),
            executed(2, "ETH/USDT", TradeDirection::OpenShort, dec!(1), dec!(3500)),
            executed(3, "BTC/USDT", TradeDirection::OpenLong, dec!(0.03), dec!(51000)),
            executed(4, "BTC/USDT", TradeDirection::CloseLong, dec!(0.04), dec!(52000)),
            executed(5, "ETH/USDT", TradeDirection::CloseShort, dec!(0.25), dec!(3600)),
        ];
        for trade in &trades {
            state.apply(trade).unwrap();
        }
        let mut marks = prices("BTC/USDT", dec!(49500));
        marks.insert("ETH/USDT".to_string(), dec!(3400));
        state.mark_to_market(&marks);

        let lhs = state.total_portfolio_value();
        let rhs = state.starting_capital + state.realized_pnl + state.unrealized_pnl();
        assert!((lhs - rhs).abs() < dec!(0.000001), "lhs {} rhs {}", lhs, rhs);
    }

    #[test]
    fn recent_trades_returns_tail() {
        let mut state = AgentState::new("agent_1", "Alpha", dec!(100000));
        for id in 1..=7 {
            state
                .apply(&executed(id, "SOL/USDT", TradeDirection::OpenLong, dec!(1), dec!(170)))
                .unwrap();
        }
        let recent: Vec<u64> = state.recent_trades(5).iter().map(|t| t.id).collect();
        assert_eq!(recent, vec![3, 4, 5, 6, 7]);
        assert_eq!(state.recent_trades(50).len(), 7);
    }
}
