//! Accuracy metrics for forecast evaluation.

use crate::error::{ForecastError, Result};
use serde::Serialize;

/// Accuracy of a forecast against held-out actuals.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccuracyMetrics {
    /// Mean Absolute Error
    pub mae: f64,
    /// Mean Squared Error
    pub mse: f64,
    /// Root Mean Squared Error
    pub rmse: f64,
    /// Mean Absolute Percentage Error (None if zeros in actual)
    pub mape: Option<f64>,
    /// Symmetric Mean Absolute Percentage Error
    pub smape: f64,
    /// Share of actuals inside the prediction interval, when one was given
    pub coverage: Option<f64>,
}

/// Calculate accuracy metrics between actual and predicted values.
///
/// # Arguments
/// * `actual` - Observed values
/// * `predicted` - Forecast values
/// * `interval` - Optional `(lower, upper)` bounds for coverage
pub fn calculate_metrics(
    actual: &[f64],
    predicted: &[f64],
    interval: Option<(&[f64], &[f64])>,
) -> Result<AccuracyMetrics> {
    if actual.is_empty() || predicted.is_empty() {
        return Err(ForecastError::EmptyData);
    }
    if actual.len() != predicted.len() {
        return Err(ForecastError::DimensionMismatch {
            expected: actual.len(),
            got: predicted.len(),
        });
    }

    let n = actual.len() as f64;
    let pairs = || actual.iter().zip(predicted.iter());

    let mae = pairs().map(|(a, p)| (a - p).abs()).sum::<f64>() / n;
    let mse = mean_squared_error(actual, predicted)?;

    let mape = if actual.contains(&0.0) {
        None
    } else {
        Some(100.0 * pairs().map(|(a, p)| ((a - p) / a).abs()).sum::<f64>() / n)
    };

    let smape = 100.0
        * pairs()
            .map(|(a, p)| {
                let denom = a.abs() + p.abs();
                if denom == 0.0 {
                    0.0
                } else {
                    2.0 * (a - p).abs() / denom
                }
            })
            .sum::<f64>()
        / n;

    let coverage = match interval {
        Some((lower, upper)) => {
            if lower.len() != actual.len() || upper.len() != actual.len() {
                return Err(ForecastError::DimensionMismatch {
                    expected: actual.len(),
                    got: lower.len().min(upper.len()),
                });
            }
            let inside = actual
                .iter()
                .zip(lower.iter().zip(upper.iter()))
                .filter(|(a, (lo, up))| **a >= **lo && **a <= **up)
                .count();
            Some(inside as f64 / n)
        }
        None => None,
    };

    Ok(AccuracyMetrics {
        mae,
        mse,
        rmse: mse.sqrt(),
        mape,
        smape,
        coverage,
    })
}

/// Mean squared error, the score the order search ranks by.
pub fn mean_squared_error(actual: &[f64], predicted: &[f64]) -> Result<f64> {
    if actual.is_empty() {
        return Err(ForecastError::EmptyData);
    }
    if actual.len() != predicted.len() {
        return Err(ForecastError::DimensionMismatch {
            expected: actual.len(),
            got: predicted.len(),
        });
    }
    Ok(actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| (a - p).powi(2))
        .sum::<f64>()
        / actual.len() as f64)
}
