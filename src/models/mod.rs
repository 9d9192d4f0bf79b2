//! Forecasting models.

mod traits;

pub mod arima;
pub mod exponential;

pub use traits::{BoxedForecaster, Forecaster, ModelKind};
