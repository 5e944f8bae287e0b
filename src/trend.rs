//! Barometric trend from recent air pressure readings.
//!
//! The display shows whether pressure is falling, stable or rising. The
//! firmware expects a fixed code per trend; the codes are a convention of
//! the receiving side, not an ordering.

use std::collections::VecDeque;

/// Number of pressure samples kept when no size is configured.
pub const DEFAULT_HISTORY_LEN: usize = 12;

/// Fewer samples than this always classify as stable.
const MIN_SAMPLES: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BarometricTrend {
    Falling,
    Stable,
    Rising,
}

impl BarometricTrend {
    /// Transmission code expected by the display firmware.
    pub fn code(self) -> u8 {
        match self {
            BarometricTrend::Falling => 2,
            BarometricTrend::Stable => 4,
            BarometricTrend::Rising => 1,
        }
    }
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample standard deviation (n - 1 in the denominator).
pub fn std_dev(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let avg = mean(values)?;
    let sum_sq: f64 = values.iter().map(|v| (v - avg).powi(2)).sum();
    Some((sum_sq / (values.len() - 1) as f64).sqrt())
}

/// Classifies the latest sample against the spread of the whole series:
/// more than one standard deviation above the mean is rising, more than one
/// below is falling.
pub fn classify(samples: &[f64]) -> BarometricTrend {
    if samples.len() < MIN_SAMPLES {
        return BarometricTrend::Stable;
    }
    let (Some(avg), Some(sd), Some(&latest)) = (mean(samples), std_dev(samples), samples.last())
    else {
        return BarometricTrend::Stable;
    };

    if latest > avg + sd {
        BarometricTrend::Rising
    } else if latest < avg - sd {
        BarometricTrend::Falling
    } else {
        BarometricTrend::Stable
    }
}

/// Rolling window of air pressure readings, oldest first.
#[derive(Debug, Clone)]
pub struct PressureHistory {
    samples: VecDeque<f64>,
    capacity: usize,
}

impl PressureHistory {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Adds a reading, dropping the oldest one when full. Non-finite
    /// readings are ignored.
    pub fn push(&mut self, pressure: f64) {
        if !pressure.is_finite() {
            return;
        }
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(pressure);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn trend(&self) -> BarometricTrend {
        let samples: Vec<f64> = self.samples.iter().copied().collect();
        classify(&samples)
    }
}

impl Default for PressureHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LEN)
    }
}
