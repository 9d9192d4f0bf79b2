//! Reading sensor telemetry and writing result tables.

mod export;
mod telemetry;

pub use crate::core::Reading;
pub use export::{write_forecast, write_forecast_csv, write_grid, write_grid_csv};
pub use telemetry::{parse_timestamp, TelemetryFrame, TelemetryReader, DEFAULT_TIMESTAMP_COLUMN};
