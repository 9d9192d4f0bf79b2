//! Data transformations for sensor series.
//!
//! Resampling onto a regular grid, gap filling and quantile-band outlier
//! removal.
//!
//! # Example
//!
//! ```
//! use sensor_forecast::core::Reading;
//! use sensor_forecast::transform::{forward_fill, resample_mean};
//! use chrono::{Duration, TimeZone, Utc};
//!
//! let base = Utc.with_ymd_and_hms(2019, 5, 1, 0, 0, 0).unwrap();
//! let readings = vec![
//!     Reading::new(base, 1.0),
//!     Reading::new(base + Duration::minutes(95), 2.0),
//! ];
//!
//! let grid = resample_mean(&readings, Duration::minutes(30)).unwrap();
//! let filled = forward_fill(&grid).unwrap();
//! assert_eq!(filled.values(), &[1.0, 1.0, 1.0, 2.0]);
//! ```

mod outlier;
mod resample;

pub use outlier::clip_quantiles;
pub use resample::{forward_fill, resample_mean};
