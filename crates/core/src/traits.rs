use crate::error::OrderError;
use crate::events::{ClosedTrade, MarketEvent, OrderFill, OrderRequest};
use anyhow::Result;
use async_trait::async_trait;

/// Source of time-ordered market events.
#[async_trait]
pub trait DataProvider: Send + Sync {
    async fn next_event(&mut self) -> Result<Option<MarketEvent>>;
}

/// Order-placement collaborator. Instrument resolution happens upstream.
#[async_trait]
pub trait OrderPlacer: Send + Sync {
    async fn place(&self, order: &OrderRequest) -> Result<OrderFill, OrderError>;
}

/// Persistence for completed trades.
#[async_trait]
pub trait TradeRecorder: Send + Sync {
    async fn record(&self, trade: &ClosedTrade) -> Result<()>;
}
