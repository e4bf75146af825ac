pub mod lifecycle;
pub mod opening_range;
pub mod risk_ledger;
pub mod runner;
pub mod session;
pub mod signal;
pub mod volume_filter;
pub mod vwap;

pub use lifecycle::{ExitRules, LifecycleState, PositionLifecycle};
pub use opening_range::{OpeningRange, OpeningRangeTracker};
pub use risk_ledger::RiskLedger;
pub use runner::{RunOutcome, SessionRunner};
pub use session::OrbSession;
pub use signal::{detect_breakout, SignalInputs};
pub use volume_filter::{volume_confirms, VolumeFilter};
pub use vwap::VwapAccumulator;
