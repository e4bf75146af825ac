use anyhow::{anyhow, Result};
use async_trait::async_trait;
use orb_core::{ClosedTrade, TradeRecorder};
use rust_decimal::Decimal;
use std::sync::Mutex;

/// Keeps recorded trades in memory. Used by tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryTradeJournal {
    trades: Mutex<Vec<ClosedTrade>>,
}

impl MemoryTradeJournal {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything recorded so far.
    #[must_use]
    pub fn trades(&self) -> Vec<ClosedTrade> {
        self.trades
            .lock()
            .map(|trades| trades.clone())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.trades.lock().map_or(0, |trades| trades.len())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn total_pnl(&self) -> Decimal {
        self.trades
            .lock()
            .map(|trades| trades.iter().map(|t| t.pnl).sum())
            .unwrap_or_default()
    }
}

#[async_trait]
impl TradeRecorder for MemoryTradeJournal {
    async fn record(&self, trade: &ClosedTrade) -> Result<()> {
        self.trades
            .lock()
            .map_err(|_| anyhow!("trade journal lock poisoned"))?
            .push(trade.clone());
        Ok(())
    }
}
