//! Paper order placement.
//!
//! Fills market orders locally at the order's reference price moved against
//! the trader by a fixed slippage. Nothing leaves the process.

use async_trait::async_trait;
use orb_core::{OrderError, OrderFill, OrderPlacer, OrderRequest, OrderSide};
use rust_decimal::Decimal;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct PaperBroker {
    slippage_bps: Decimal,
    latency: Option<Duration>,
}

impl PaperBroker {
    /// * `slippage_bps` - basis points added to buys and taken off sells (5 = 0.05%)
    #[must_use]
    pub const fn new(slippage_bps: Decimal) -> Self {
        Self {
            slippage_bps,
            latency: None,
        }
    }

    /// Delays every fill by `latency`, to exercise order timeouts.
    #[must_use]
    pub const fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    fn apply_slippage(&self, price: Decimal, side: OrderSide) -> Decimal {
        let slippage = price * self.slippage_bps / Decimal::from(10000);
        match side {
            OrderSide::Buy => price + slippage,
            OrderSide::Sell => price - slippage,
        }
    }
}

#[async_trait]
impl OrderPlacer for PaperBroker {
    async fn place(&self, order: &OrderRequest) -> Result<OrderFill, OrderError> {
        if order.quantity <= Decimal::ZERO {
            return Err(OrderError::Rejected(format!(
                "quantity must be positive, got {}",
                order.quantity
            )));
        }
        let Some(reference) = order.reference_price else {
            return Err(OrderError::Unavailable(format!(
                "no quote for {} yet",
                order.instrument
            )));
        };

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let fill = OrderFill {
            order_id: format!("PAPER-{}", uuid::Uuid::new_v4()),
            fill_price: self.apply_slippage(reference, order.side),
            quantity: order.quantity,
            filled_at: order.requested_at,
        };

        tracing::info!(
            order_id = %fill.order_id,
            instrument = %order.instrument,
            side = %order.side,
            price = %fill.fill_price,
            quantity = %fill.quantity,
            "Paper fill simulated"
        );

        Ok(fill)
    }
}
