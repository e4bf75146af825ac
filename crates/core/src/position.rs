use crate::events::{ClosedTrade, ExitReason, OptionSide};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// The single open option position of a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub side: OptionSide,
    pub instrument: String,
    pub quantity: Decimal,
    pub entry_price: Decimal,
    pub entry_time: DateTime<Utc>,
    pub entry_order_id: String,
}

impl Position {
    /// Points gained per unit at `ltp`: `ltp - entry` for CE, `entry - ltp` for PE.
    #[must_use]
    pub fn pnl_points(&self, ltp: Decimal) -> Decimal {
        match self.side {
            OptionSide::Call => ltp - self.entry_price,
            OptionSide::Put => self.entry_price - ltp,
        }
    }

    /// Money P&L at `price` for the whole quantity.
    #[must_use]
    pub fn pnl_at(&self, price: Decimal) -> Decimal {
        self.pnl_points(price) * self.quantity
    }

    /// Consumes the position into a completed trade.
    #[must_use]
    pub fn close(
        self,
        exit_price: Decimal,
        exit_reason: ExitReason,
        closed_at: DateTime<Utc>,
    ) -> ClosedTrade {
        let pnl_points = self.pnl_points(exit_price);
        ClosedTrade {
            pnl: self.pnl_at(exit_price),
            instrument: self.instrument,
            side: self.side,
            quantity: self.quantity,
            entry_price: self.entry_price,
            exit_price,
            pnl_points,
            exit_reason,
            opened_at: self.entry_time,
            closed_at,
        }
    }
}
