//! Core types and collaborator contracts for the opening-range-breakout +
//! VWAP options strategy.

pub mod config;
pub mod config_loader;
pub mod error;
pub mod events;
pub mod position;
pub mod report;
pub mod traits;

pub use config::{AppConfig, JournalConfig, PaperConfig, StrategyConfig};
pub use config_loader::ConfigLoader;
pub use error::{OrbError, OrderError};
pub use events::{
    Candle, ClosedTrade, ExitReason, MarketEvent, OptionSide, OrderFill, OrderRequest, OrderSide,
    StrategyEvent, Tick,
};
pub use position::Position;
pub use report::{ReportFormatter, SessionReport};
pub use traits::{DataProvider, OrderPlacer, TradeRecorder};
