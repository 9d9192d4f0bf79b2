//! ARIMA (Autoregressive Integrated Moving Average) models.
//!
//! This module provides:
//! - ARIMA models with arbitrary (p, d, q) orders
//! - Exhaustive order search scored by rolling one-step backtests

mod diff;
mod grid_search;
mod model;

pub use diff::{difference, integrate};
pub use grid_search::{
    evaluate_models, GridSearchConfig, GridSearchResult, OrderEvaluation, OrderGrid, OrderOutcome,
};
pub use model::{ARIMASpec, ARIMA};
