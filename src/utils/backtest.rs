//! Rolling-origin backtesting with one-step-ahead forecasts.
//!
//! The series is split once into a training prefix and a test suffix. The
//! model is refitted on a growing history before every test point, asked for
//! a single step, and then shown the actual value before moving on.

use crate::core::TimeSeries;
use crate::error::{ForecastError, Result};
use crate::models::arima::{ARIMASpec, ARIMA};
use crate::models::Forecaster;
use crate::utils::metrics::{calculate_metrics, AccuracyMetrics};
use tracing::trace;

/// Share of observations used as the initial history.
pub const DEFAULT_TRAIN_FRACTION: f64 = 0.66;

/// Result of one backtest run.
#[derive(Debug, Clone)]
pub struct BacktestResult {
    /// Length of the initial history.
    pub train_size: usize,
    /// One-step predictions, one per test point.
    pub predictions: Vec<f64>,
    /// Test actuals in the same order.
    pub actual: Vec<f64>,
    /// Mean squared error of `predictions` against `actual`.
    pub mse: f64,
    pub metrics: AccuracyMetrics,
}

/// Size of the initial history for a series of `len` points.
///
/// Truncates like an integer cast: `floor(len * fraction)`.
pub fn train_size(len: usize, fraction: f64) -> usize {
    (len as f64 * fraction).floor() as usize
}

/// Walk forward over the test part of `series`, refitting a fresh model from
/// `model_factory` at every step.
///
/// # Example
/// ```
/// use sensor_forecast::core::TimeSeries;
/// use sensor_forecast::models::exponential::SimpleExponentialSmoothing;
/// use sensor_forecast::utils::backtest::rolling_one_step;
/// use chrono::{Duration, TimeZone, Utc};
///
/// let base = Utc.with_ymd_and_hms(2019, 5, 1, 0, 0, 0).unwrap();
/// let timestamps: Vec<_> = (0..30).map(|i| base + Duration::minutes(30 * i)).collect();
/// let values: Vec<f64> = (0..30).map(|i| 2.0 + (i as f64 * 0.4).sin()).collect();
/// let ts = TimeSeries::univariate(timestamps, values).unwrap();
///
/// let result = rolling_one_step(&ts, 0.66, || SimpleExponentialSmoothing::new(0.5)).unwrap();
/// assert_eq!(result.train_size, 19);
/// assert_eq!(result.predictions.len(), 11);
/// ```
pub fn rolling_one_step<F, Factory>(
    series: &TimeSeries,
    train_fraction: f64,
    model_factory: Factory,
) -> Result<BacktestResult>
where
    F: Forecaster,
    Factory: Fn() -> F,
{
    if !(train_fraction > 0.0 && train_fraction < 1.0) {
        return Err(ForecastError::InvalidParameter(format!(
            "train fraction must be in (0, 1), got {train_fraction}"
        )));
    }

    let n = series.len();
    let train_size = train_size(n, train_fraction);
    if train_size == 0 || train_size >= n {
        return Err(ForecastError::InsufficientData {
            needed: 2,
            got: n,
        });
    }

    let values = series.values();
    let actual = values[train_size..].to_vec();
    let mut predictions = Vec::with_capacity(actual.len());

    for origin in train_size..n {
        let history = series.slice(0, origin)?;
        let mut model = model_factory();
        model.fit(&history)?;

        let forecast = model.predict(1)?;
        let yhat = forecast
            .primary()
            .first()
            .copied()
            .ok_or(ForecastError::EmptyData)?;
        trace!(origin, yhat, actual = values[origin], "one-step forecast");
        predictions.push(yhat);
    }

    let metrics = calculate_metrics(&actual, &predictions, None)?;
    Ok(BacktestResult {
        train_size,
        mse: metrics.mse,
        predictions,
        actual,
        metrics,
    })
}

/// Backtest a single ARIMA order and return its out-of-sample error.
pub fn evaluate_arima_model(
    series: &TimeSeries,
    order: ARIMASpec,
    train_fraction: f64,
) -> Result<BacktestResult> {
    rolling_one_step(series, train_fraction, || ARIMA::from_spec(order))
}
