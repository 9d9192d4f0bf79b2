//! Raw sensor readings before resampling.

use chrono::{DateTime, Utc};

/// One timestamped reading of a single channel; `value` is NaN when the
/// sensor reported nothing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

impl Reading {
    pub fn new(timestamp: DateTime<Utc>, value: f64) -> Self {
        Self { timestamp, value }
    }

    pub fn is_missing(&self) -> bool {
        !self.value.is_finite()
    }
}
