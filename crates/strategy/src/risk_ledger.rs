use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Realized P&L for the current session. Losses are never rolled back.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskLedger {
    daily_realized_pnl: Decimal,
    closed_trades: u32,
    wins: u32,
}

impl RiskLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Books one closed trade.
    pub fn record(&mut self, pnl: Decimal) {
        self.daily_realized_pnl += pnl;
        self.closed_trades += 1;
        if pnl > Decimal::ZERO {
            self.wins += 1;
        }
    }

    /// True once the day's loss reaches `limit`.
    #[must_use]
    pub fn breached(&self, limit: Decimal) -> bool {
        self.daily_realized_pnl <= -limit
    }

    #[must_use]
    pub const fn realized_pnl(&self) -> Decimal {
        self.daily_realized_pnl
    }

    #[must_use]
    pub const fn closed_trades(&self) -> u32 {
        self.closed_trades
    }

    #[must_use]
    pub const fn wins(&self) -> u32 {
        self.wins
    }

    #[must_use]
    pub const fn losses(&self) -> u32 {
        self.closed_trades - self.wins
    }
}
