//! Running volume-weighted average price for one trading day.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Σ(price·volume) / Σ(volume) over every sample with positive volume.
///
/// Never resets itself; a new session builds a new accumulator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VwapAccumulator {
    numerator: Decimal,
    denominator: Decimal,
}

impl VwapAccumulator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one sample. Zero (or negative) volume leaves the state untouched.
    pub fn update(&mut self, price: Decimal, volume: Decimal) {
        if volume <= Decimal::ZERO {
            return;
        }
        self.numerator += price * volume;
        self.denominator += volume;
    }

    /// `None` until some volume has traded.
    #[must_use]
    pub fn value(&self) -> Option<Decimal> {
        if self.denominator.is_zero() {
            return None;
        }
        Some(self.numerator / self.denominator)
    }

    #[must_use]
    pub const fn numerator(&self) -> Decimal {
        self.numerator
    }

    #[must_use]
    pub const fn denominator(&self) -> Decimal {
        self.denominator
    }
}
