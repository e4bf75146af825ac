//! Breakout + trend + volume confirmation.

use crate::opening_range::OpeningRange;
use crate::volume_filter::volume_confirms;
use orb_core::OptionSide;
use rust_decimal::Decimal;

/// Snapshot the detector decides on.
#[derive(Debug, Clone, Copy)]
pub struct SignalInputs {
    pub price: Decimal,
    pub volume: Decimal,
    pub opening_range: Option<OpeningRange>,
    pub vwap: Option<Decimal>,
    /// Rolling average volume before the current sample.
    pub average_volume: Decimal,
}

/// Returns the breakout side, or `None`.
///
/// Callers guarantee: no open position, inside the trade window, range ready.
/// CE is checked first, so it wins if both sides ever qualify.
#[must_use]
pub fn detect_breakout(inputs: &SignalInputs) -> Option<OptionSide> {
    let range = inputs.opening_range?;
    let vwap = inputs.vwap?;

    if !volume_confirms(inputs.volume, inputs.average_volume) {
        return None;
    }

    let price = inputs.price;
    if price > range.high && price > vwap {
        Some(OptionSide::Call)
    } else if price < range.low && price < vwap {
        Some(OptionSide::Put)
    } else {
        None
    }
}
