//! Charts for forecasts and decompositions.

mod chart;

pub use chart::{decomposition_chart, forecast_chart, LineChart, DEFAULT_HEIGHT, DEFAULT_WIDTH};
