//! CSV exporters for forecasts and grid search results.

use crate::core::{Forecast, TimeSeries};
use crate::error::DataError;
use crate::models::arima::{GridSearchResult, OrderOutcome};
use serde::Serialize;
use std::io;
use std::path::Path;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Serialize)]
struct ForecastRow {
    timestamp: String,
    actual: f64,
    forecast: f64,
    lower: Option<f64>,
    upper: Option<f64>,
}

#[derive(Debug, Serialize)]
struct GridRow {
    p: usize,
    d: usize,
    q: usize,
    mse: Option<f64>,
    status: String,
}

/// Write forecast and validation actuals side by side, one row per
/// validation timestamp.
pub fn write_forecast<W: io::Write>(
    writer: W,
    validation: &TimeSeries,
    forecast: &Forecast,
) -> Result<(), DataError> {
    let mut csv = csv::Writer::from_writer(writer);
    for (i, (timestamp, actual)) in validation
        .timestamps()
        .iter()
        .zip(validation.values())
        .enumerate()
        .take(forecast.horizon())
    {
        csv.serialize(ForecastRow {
            timestamp: timestamp.format(TIMESTAMP_FORMAT).to_string(),
            actual: *actual,
            forecast: forecast.primary()[i],
            lower: forecast.lower().map(|l| l[i]),
            upper: forecast.upper().map(|u| u[i]),
        })?;
    }
    csv.flush()?;
    Ok(())
}

pub fn write_forecast_csv<P: AsRef<Path>>(
    path: P,
    validation: &TimeSeries,
    forecast: &Forecast,
) -> Result<(), DataError> {
    write_forecast(std::fs::File::create(path)?, validation, forecast)
}

/// Write one row per evaluated order; failed orders carry their reason in
/// `status` and an empty `mse`.
pub fn write_grid<W: io::Write>(writer: W, result: &GridSearchResult) -> Result<(), DataError> {
    let mut csv = csv::Writer::from_writer(writer);
    for evaluation in &result.evaluations {
        let (mse, status) = match &evaluation.outcome {
            OrderOutcome::Scored { mse } => (Some(*mse), "ok".to_string()),
            OrderOutcome::Failed { reason } => (None, reason.clone()),
        };
        csv.serialize(GridRow {
            p: evaluation.order.p,
            d: evaluation.order.d,
            q: evaluation.order.q,
            mse,
            status,
        })?;
    }
    csv.flush()?;
    Ok(())
}

pub fn write_grid_csv<P: AsRef<Path>>(path: P, result: &GridSearchResult) -> Result<(), DataError> {
    write_grid(std::fs::File::create(path)?, result)
}
