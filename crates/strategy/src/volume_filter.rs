//! Short rolling average of traded volume used to confirm breakouts.

use rust_decimal::Decimal;
use std::collections::VecDeque;

/// FIFO of the last `capacity` non-zero volumes.
#[derive(Debug, Clone)]
pub struct VolumeFilter {
    capacity: usize,
    volumes: VecDeque<Decimal>,
}

impl VolumeFilter {
    /// `capacity` is clamped to at least one slot.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            volumes: VecDeque::with_capacity(capacity),
        }
    }

    /// Appends `volume`; zero-volume quotes are skipped so they don't dilute the mean.
    pub fn push(&mut self, volume: Decimal) {
        if volume <= Decimal::ZERO {
            return;
        }
        if self.volumes.len() == self.capacity {
            self.volumes.pop_front();
        }
        self.volumes.push_back(volume);
    }

    /// Arithmetic mean, zero when empty.
    #[must_use]
    pub fn average(&self) -> Decimal {
        if self.volumes.is_empty() {
            return Decimal::ZERO;
        }
        let sum: Decimal = self.volumes.iter().sum();
        sum / Decimal::from(self.volumes.len())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.volumes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.volumes.is_empty()
    }
}

/// Volume gate: `current` must beat `average`, unless there is no average yet.
#[must_use]
pub fn volume_confirms(current: Decimal, average: Decimal) -> bool {
    average <= Decimal::ZERO || current > average
}
