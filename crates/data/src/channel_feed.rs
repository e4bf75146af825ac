//! Live feed adapter: whatever produces samples pushes them into an mpsc
//! channel and the session runner pulls from the other end.

use anyhow::Result;
use async_trait::async_trait;
use orb_core::{DataProvider, MarketEvent};
use tokio::sync::mpsc;

pub struct ChannelFeed {
    rx: mpsc::Receiver<MarketEvent>,
}

impl ChannelFeed {
    #[must_use]
    pub const fn new(rx: mpsc::Receiver<MarketEvent>) -> Self {
        Self { rx }
    }

    /// Bounded channel. Samples queue here while an order is in flight.
    #[must_use]
    pub fn channel(capacity: usize) -> (mpsc::Sender<MarketEvent>, Self) {
        let (tx, rx) = mpsc::channel(capacity);
        (tx, Self::new(rx))
    }
}

#[async_trait]
impl DataProvider for ChannelFeed {
    /// Ends once every sender is dropped and the queue is drained.
    async fn next_event(&mut self) -> Result<Option<MarketEvent>> {
        Ok(self.rx.recv().await)
    }
}
