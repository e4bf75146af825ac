use crate::position::Position;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A price observation. `volume` is zero for pure quote ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tick {
    pub timestamp: DateTime<Utc>,
    pub price: Decimal,
    #[serde(default)]
    pub volume: Decimal,
}

impl Tick {
    #[must_use]
    pub const fn new(timestamp: DateTime<Utc>, price: Decimal, volume: Decimal) -> Self {
        Self {
            timestamp,
            price,
            volume,
        }
    }

    /// A tick without traded volume.
    #[must_use]
    pub const fn quote(timestamp: DateTime<Utc>, price: Decimal) -> Self {
        Self::new(timestamp, price, Decimal::ZERO)
    }
}

/// One fixed-interval bar; `timestamp` is the bucket start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp: DateTime<Utc>,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
}

/// Everything the market feed can deliver to a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarketEvent {
    UnderlyingTick(Tick),
    UnderlyingCandle(Candle),
    OptionTick { instrument: String, tick: Tick },
}

impl MarketEvent {
    #[must_use]
    pub const fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Self::UnderlyingTick(tick) | Self::OptionTick { tick, .. } => tick.timestamp,
            Self::UnderlyingCandle(candle) => candle.timestamp,
        }
    }
}

/// Breakout direction: call side (CE) or put side (PE).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OptionSide {
    #[serde(rename = "CE")]
    Call,
    #[serde(rename = "PE")]
    Put,
}

impl std::fmt::Display for OptionSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Call => write!(f, "CE"),
            Self::Put => write!(f, "PE"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderSide {
    Buy,
    Sell,
}

impl std::fmt::Display for OrderSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Buy => write!(f, "BUY"),
            Self::Sell => write!(f, "SELL"),
        }
    }
}

/// A market order handed to the order-placement collaborator.
///
/// `reference_price` is the last option LTP seen for the instrument, if any.
/// Live brokers ignore it; the paper broker fills around it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub instrument: String,
    pub side: OrderSide,
    pub quantity: Decimal,
    pub reference_price: Option<Decimal>,
    pub requested_at: DateTime<Utc>,
}

/// A confirmed fill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderFill {
    pub order_id: String,
    pub fill_price: Decimal,
    pub quantity: Decimal,
    pub filled_at: DateTime<Utc>,
}

/// Why an open position was closed, in rule-priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExitReason {
    Target,
    Stop,
    Time,
    WindowClose,
}

impl std::fmt::Display for ExitReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Target => write!(f, "TARGET"),
            Self::Stop => write!(f, "STOP"),
            Self::Time => write!(f, "TIME"),
            Self::WindowClose => write!(f, "WINDOW_CLOSE"),
        }
    }
}

/// A completed round trip, as handed to the trade-recording collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClosedTrade {
    pub instrument: String,
    pub side: OptionSide,
    pub quantity: Decimal,
    pub entry_price: Decimal,
    pub exit_price: Decimal,
    pub pnl_points: Decimal,
    pub pnl: Decimal,
    pub exit_reason: ExitReason,
    pub opened_at: DateTime<Utc>,
    pub closed_at: DateTime<Utc>,
}

impl ClosedTrade {
    #[must_use]
    pub fn is_win(&self) -> bool {
        self.pnl > Decimal::ZERO
    }
}

/// What a session did in response to one input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StrategyEvent {
    /// Breakout confirmed; entry order sent
    EntryRequested {
        side: OptionSide,
        instrument: String,
        quantity: Decimal,
        at: DateTime<Utc>,
    },

    /// Entry filled
    PositionOpened(Position),

    /// Entry definitely not filled; back to idle
    EntryRejected { side: OptionSide, reason: String },

    /// Exit rule fired; closing order sent
    ExitRequested {
        reason: ExitReason,
        instrument: String,
        at: DateTime<Utc>,
    },

    /// Closing order definitely not filled; position still open
    ExitRejected { reason: ExitReason, message: String },

    /// Exit filled and booked in the risk ledger
    PositionClosed(ClosedTrade),

    /// Daily loss limit breached; no more entries this session
    Halted { realized_pnl: Decimal },
}
