use anyhow::Result;
use async_trait::async_trait;
use orb_core::{ClosedTrade, TradeRecorder};
use std::sync::Arc;

/// Sends every trade to each inner recorder.
///
/// All recorders are tried even if one fails; the first failure is returned.
#[derive(Default, Clone)]
pub struct FanoutRecorder {
    recorders: Vec<Arc<dyn TradeRecorder>>,
}

impl FanoutRecorder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, recorder: Arc<dyn TradeRecorder>) -> Self {
        self.recorders.push(recorder);
        self
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.recorders.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.recorders.is_empty()
    }
}

#[async_trait]
impl TradeRecorder for FanoutRecorder {
    async fn record(&self, trade: &ClosedTrade) -> Result<()> {
        let mut first_error = None;
        for recorder in &self.recorders {
            if let Err(e) = recorder.record(trade).await {
                tracing::warn!(instrument = %trade.instrument, "Trade recorder failed: {e:#}");
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}
