//! # sensor-forecast
//!
//! Forecasting for gas sensor telemetry (H2S, CO, LEL, O2).
//!
//! Reads CSV telemetry, resamples a channel onto a fixed grid, fits ARIMA
//! or exponential smoothing models, backtests ARIMA orders with rolling
//! one-step forecasts, decomposes the series seasonally and renders SVG
//! charts of the results.

#![allow(clippy::upper_case_acronyms)]
#![allow(clippy::needless_range_loop)]

pub mod config;
pub mod core;
pub mod error;
pub mod io;
pub mod models;
pub mod pipeline;
pub mod report;
pub mod seasonality;
pub mod transform;
pub mod utils;

pub use error::{DataError, ForecastError, Result};

pub mod prelude {
    pub use crate::config::ForecastConfig;
    pub use crate::core::{Forecast, Reading, TimeSeries};
    pub use crate::error::{ForecastError, Result};
    pub use crate::models::arima::{evaluate_models, ARIMASpec, ARIMA};
    pub use crate::models::{Forecaster, ModelKind};
    pub use crate::pipeline::{Pipeline, RunSummary};
    pub use crate::utils::{calculate_metrics, evaluate_arima_model, AccuracyMetrics};
}
