//! Univariate time series of sensor readings on UTC timestamps.

use crate::error::{ForecastError, Result};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;

/// Policy for handling missing values (NaN/Inf).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MissingValuePolicy {
    /// Drop observations with missing values.
    Drop,
    /// Fill with a specific value.
    Fill(f64),
    /// Forward fill (use previous valid value).
    ForwardFill,
    /// Return error if missing values found.
    Error,
}

/// A time series with strictly increasing timestamps and one value per timestamp.
#[derive(Debug, Clone)]
pub struct TimeSeries {
    timestamps: Vec<DateTime<Utc>>,
    values: Vec<f64>,
    label: Option<String>,
    frequency: Option<Duration>,
}

impl TimeSeries {
    /// Create a univariate series, validating lengths and ordering.
    pub fn univariate(timestamps: Vec<DateTime<Utc>>, values: Vec<f64>) -> Result<Self> {
        if timestamps.len() != values.len() {
            return Err(ForecastError::DimensionMismatch {
                expected: timestamps.len(),
                got: values.len(),
            });
        }

        if timestamps.windows(2).any(|w| w[1] <= w[0]) {
            return Err(ForecastError::TimestampError(
                "timestamps must be strictly increasing".to_string(),
            ));
        }

        Ok(Self {
            timestamps,
            values,
            label: None,
            frequency: None,
        })
    }

    /// Attach a label (usually the sensor channel name).
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Attach a known sampling interval.
    pub fn with_frequency(mut self, frequency: Duration) -> Self {
        self.frequency = Some(frequency);
        self
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn frequency(&self) -> Option<Duration> {
        self.frequency
    }

    /// Get the number of observations.
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    /// Check if the series is empty.
    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn timestamps(&self) -> &[DateTime<Utc>] {
        &self.timestamps
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// First and last timestamp, if any.
    pub fn span(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        Some((*self.timestamps.first()?, *self.timestamps.last()?))
    }

    /// Copy of the series with the same metadata but new observations.
    fn derive(&self, timestamps: Vec<DateTime<Utc>>, values: Vec<f64>) -> TimeSeries {
        TimeSeries {
            timestamps,
            values,
            label: self.label.clone(),
            frequency: self.frequency,
        }
    }

    /// Extract observations `start..end`.
    pub fn slice(&self, start: usize, end: usize) -> Result<TimeSeries> {
        if start > end {
            return Err(ForecastError::InvalidParameter(
                "start must be <= end".to_string(),
            ));
        }
        if end > self.len() {
            return Err(ForecastError::IndexOutOfBounds {
                index: end,
                size: self.len(),
            });
        }

        Ok(self.derive(
            self.timestamps[start..end].to_vec(),
            self.values[start..end].to_vec(),
        ))
    }

    /// Index of the first observation at or after `at`.
    fn partition_point(&self, at: DateTime<Utc>) -> usize {
        self.timestamps.partition_point(|t| *t < at)
    }

    /// Observations strictly before `at`.
    pub fn before(&self, at: DateTime<Utc>) -> TimeSeries {
        let idx = self.partition_point(at);
        self.derive(self.timestamps[..idx].to_vec(), self.values[..idx].to_vec())
    }

    /// Split into `(< at, >= at)`.
    pub fn split_at_time(&self, at: DateTime<Utc>) -> (TimeSeries, TimeSeries) {
        let idx = self.partition_point(at);
        (
            self.derive(self.timestamps[..idx].to_vec(), self.values[..idx].to_vec()),
            self.derive(self.timestamps[idx..].to_vec(), self.values[idx..].to_vec()),
        )
    }

    /// Apply `f` to every value, keeping timestamps.
    pub fn map_values<F>(&self, f: F) -> TimeSeries
    where
        F: Fn(f64) -> f64,
    {
        self.derive(
            self.timestamps.clone(),
            self.values.iter().map(|&v| f(v)).collect(),
        )
    }

    /// Check if series has missing values (NaN or Inf).
    pub fn has_missing_values(&self) -> bool {
        self.values.iter().any(|v| !v.is_finite())
    }

    /// Return a sanitized copy with missing values handled.
    pub fn sanitized(&self, policy: MissingValuePolicy) -> Result<TimeSeries> {
        match policy {
            MissingValuePolicy::Error => {
                if self.has_missing_values() {
                    return Err(ForecastError::MissingValues);
                }
                Ok(self.clone())
            }
            MissingValuePolicy::Drop => {
                let (timestamps, values): (Vec<_>, Vec<_>) = self
                    .timestamps
                    .iter()
                    .zip(&self.values)
                    .filter(|(_, v)| v.is_finite())
                    .map(|(t, v)| (*t, *v))
                    .unzip();
                Ok(self.derive(timestamps, values))
            }
            MissingValuePolicy::Fill(fill_value) => Ok(self.map_values(|v| {
                if v.is_finite() {
                    v
                } else {
                    fill_value
                }
            })),
            MissingValuePolicy::ForwardFill => {
                let mut last_valid = None;
                let values = self
                    .values
                    .iter()
                    .map(|&v| {
                        if v.is_finite() {
                            last_valid = Some(v);
                            v
                        } else {
                            last_valid.unwrap_or(v)
                        }
                    })
                    .collect();
                Ok(self.derive(self.timestamps.clone(), values))
            }
        }
    }

    /// Infer the sampling interval as the modal spacing between timestamps.
    ///
    /// `tolerance` is the minimum share of gaps that must equal the modal gap.
    pub fn infer_frequency(&self, tolerance: f64) -> Result<Duration> {
        if self.len() < 2 {
            return Err(ForecastError::InsufficientData {
                needed: 2,
                got: self.len(),
            });
        }

        let mut counts: HashMap<i64, usize> = HashMap::new();
        for w in self.timestamps.windows(2) {
            *counts.entry((w[1] - w[0]).num_seconds()).or_insert(0) += 1;
        }

        // Ties go to the smaller gap so the result does not depend on hash order
        let (modal_diff, modal_count) = counts
            .iter()
            .max_by(|a, b| a.1.cmp(b.1).then(b.0.cmp(a.0)))
            .map(|(&diff, &count)| (diff, count))
            .ok_or(ForecastError::FrequencyInference(
                "empty spacing data".to_string(),
            ))?;

        let modal_ratio = modal_count as f64 / (self.len() - 1) as f64;
        if modal_ratio < tolerance {
            return Err(ForecastError::FrequencyInference(format!(
                "modal spacing covers only {:.0}% of gaps",
                modal_ratio * 100.0
            )));
        }

        Ok(Duration::seconds(modal_diff))
    }
}
