//! Core data structures for sensor time series forecasting.

mod forecast;
mod reading;
mod time_series;

pub use forecast::Forecast;
pub use reading::Reading;
pub use time_series::{MissingValuePolicy, TimeSeries};
