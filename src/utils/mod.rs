//! Utility functions for forecasting models.

pub mod backtest;
pub mod metrics;
pub mod optimization;
pub mod stats;

pub use backtest::{evaluate_arima_model, rolling_one_step, BacktestResult, DEFAULT_TRAIN_FRACTION};
pub use metrics::{calculate_metrics, mean_squared_error, AccuracyMetrics};
pub use optimization::{nelder_mead, NelderMeadConfig, NelderMeadResult};
pub use stats::{quantile, quantile_normal, z_for_level};
