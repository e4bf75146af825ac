//! High/low band of the underlying during the opening window.

use chrono::NaiveTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpeningRange {
    pub high: Decimal,
    pub low: Decimal,
}

/// Records the opening range inside `[start, end)` and freezes it afterwards.
#[derive(Debug, Clone)]
pub struct OpeningRangeTracker {
    start: NaiveTime,
    end: NaiveTime,
    range: Option<OpeningRange>,
    frozen: bool,
}

impl OpeningRangeTracker {
    #[must_use]
    pub const fn new(start: NaiveTime, end: NaiveTime) -> Self {
        Self {
            start,
            end,
            range: None,
            frozen: false,
        }
    }

    /// Folds `price` into the range if `local_time` is inside the window.
    ///
    /// The first sample at or past the window end freezes the range for good,
    /// so later samples are ignored even if the clock were to step back.
    /// Returns true if the range changed.
    pub fn observe(&mut self, local_time: NaiveTime, price: Decimal) -> bool {
        if local_time >= self.end {
            self.frozen = true;
        }
        if self.frozen || local_time < self.start {
            return false;
        }

        match &mut self.range {
            None => {
                self.range = Some(OpeningRange {
                    high: price,
                    low: price,
                });
                true
            }
            Some(range) => {
                let before = *range;
                range.high = range.high.max(price);
                range.low = range.low.min(price);
                *range != before
            }
        }
    }

    /// At least one sample landed in the window.
    #[must_use]
    pub const fn is_ready(&self) -> bool {
        self.range.is_some()
    }

    #[must_use]
    pub const fn is_frozen(&self) -> bool {
        self.frozen
    }

    #[must_use]
    pub const fn range(&self) -> Option<OpeningRange> {
        self.range
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn t(h: u32, m: u32, s: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, s).unwrap()
    }

    fn tracker() -> OpeningRangeTracker {
        OpeningRangeTracker::new(t(9, 15, 0), t(9, 20, 0))
    }

    #[test]
    fn not_ready_before_first_sample() {
        let mut or = tracker();
        assert!(!or.is_ready());
        assert!(!or.observe(t(9, 14, 59), dec!(100)));
        assert!(!or.is_ready());
        assert_eq!(or.range(), None);
    }

    #[test]
    fn tracks_high_and_low_in_window() {
        let mut or = tracker();
        for (i, price) in [dec!(100), dec!(105), dec!(98), dec!(102)].into_iter().enumerate() {
            or.observe(t(9, 15 + i as u32, 0), price);
        }
        assert_eq!(
            or.range(),
            Some(OpeningRange {
                high: dec!(105),
                low: dec!(98)
            })
        );
    }

    #[test]
    fn band_only_widens_inside_window() {
        let mut or = tracker();
        let mut last: Option<OpeningRange> = None;
        let prices = [dec!(100), dec!(99), dec!(103), dec!(101), dec!(97), dec!(104)];
        for (i, price) in prices.into_iter().enumerate() {
            or.observe(t(9, 15, (i * 10) as u32), price);
            let now = or.range().unwrap();
            if let Some(prev) = last {
                assert!(now.high >= prev.high);
                assert!(now.low <= prev.low);
            }
            last = Some(now);
        }
    }

    #[test]
    fn frozen_after_window_end() {
        let mut or = tracker();
        or.observe(t(9, 16, 0), dec!(100));
        or.observe(t(9, 19, 59), dec!(101));

        assert!(!or.observe(t(9, 20, 0), dec!(150)));
        assert!(or.is_frozen());
        assert!(!or.observe(t(9, 45, 0), dec!(50)));
        // even a stale in-window timestamp cannot reopen it
        assert!(!or.observe(t(9, 17, 0), dec!(10)));

        assert_eq!(
            or.range(),
            Some(OpeningRange {
                high: dec!(101),
                low: dec!(100)
            })
        );
    }
}
