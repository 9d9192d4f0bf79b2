//! Forecaster trait and the model selector used by configuration.

use crate::core::{Forecast, TimeSeries};
use crate::error::Result;
use crate::models::arima::{ARIMASpec, ARIMA};
use crate::models::exponential::{HoltLinearTrend, SimpleExponentialSmoothing};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Common interface for all forecasting models.
///
/// This trait is object-safe and can be used with `Box<dyn Forecaster>`.
pub trait Forecaster {
    /// Fit the model to the time series data.
    fn fit(&mut self, series: &TimeSeries) -> Result<()>;

    /// Generate predictions for the specified horizon.
    fn predict(&self, horizon: usize) -> Result<Forecast>;

    /// Generate predictions with intervals at confidence `level`.
    fn predict_with_intervals(&self, horizon: usize, level: f64) -> Result<Forecast> {
        let _ = level;
        self.predict(horizon)
    }

    /// In-sample predictions.
    fn fitted_values(&self) -> Option<&[f64]>;

    /// In-sample errors (actual - fitted).
    fn residuals(&self) -> Option<&[f64]>;

    fn name(&self) -> &str;

    fn is_fitted(&self) -> bool {
        self.fitted_values().is_some()
    }
}

/// Type alias for boxed forecaster trait objects.
pub type BoxedForecaster = Box<dyn Forecaster>;

/// Model family selectable from configuration or the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    #[default]
    Arima,
    /// Holt's linear trend with optimised smoothing parameters.
    Holt,
    /// Simple exponential smoothing with an optimised level parameter.
    Ses,
}

impl ModelKind {
    /// Build an unfitted model; `order` is only used by ARIMA.
    ///
    /// # Example
    /// ```
    /// use sensor_forecast::models::arima::ARIMASpec;
    /// use sensor_forecast::models::ModelKind;
    ///
    /// let model = ModelKind::Holt.build(ARIMASpec::default());
    /// assert_eq!(model.name(), "HoltLinearTrend");
    /// assert!(!model.is_fitted());
    /// ```
    pub fn build(self, order: ARIMASpec) -> BoxedForecaster {
        match self {
            ModelKind::Arima => Box::new(ARIMA::from_spec(order)),
            ModelKind::Holt => Box::new(HoltLinearTrend::auto()),
            ModelKind::Ses => Box::new(SimpleExponentialSmoothing::auto()),
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ModelKind::Arima => "arima",
            ModelKind::Holt => "holt",
            ModelKind::Ses => "ses",
        };
        f.write_str(name)
    }
}

impl FromStr for ModelKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "arima" => Ok(ModelKind::Arima),
            "holt" => Ok(ModelKind::Holt),
            "ses" => Ok(ModelKind::Ses),
            other => Err(format!("unknown model `{other}` (expected arima, holt or ses)")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn make_test_series(n: usize) -> TimeSeries {
        let base = Utc.with_ymd_and_hms(2019, 5, 1, 0, 0, 0).unwrap();
        let timestamps = (0..n)
            .map(|i| base + Duration::minutes(30 * i as i64))
            .collect();
        let values = (0..n).map(|i| 1.0 + 0.1 * i as f64).collect();
        TimeSeries::univariate(timestamps, values).unwrap()
    }

    #[test]
    fn every_kind_builds_a_working_forecaster() {
        let ts = make_test_series(40);
        for kind in [ModelKind::Arima, ModelKind::Holt, ModelKind::Ses] {
            let mut model = kind.build(ARIMASpec::default());
            assert!(!model.is_fitted());
            model.fit(&ts).unwrap();
            assert!(model.is_fitted());

            let forecast = model.predict_with_intervals(4, 0.95).unwrap();
            assert_eq!(forecast.horizon(), 4);
            assert!(forecast.has_intervals());
        }
    }

    #[test]
    fn model_kind_parses_and_prints() {
        assert_eq!("ARIMA".parse::<ModelKind>().unwrap(), ModelKind::Arima);
        assert_eq!("holt".parse::<ModelKind>().unwrap(), ModelKind::Holt);
        assert!("prophet".parse::<ModelKind>().is_err());
        assert_eq!(ModelKind::Ses.to_string(), "ses");
        assert_eq!(ModelKind::default(), ModelKind::Arima);
    }

    #[test]
    fn boxed_forecaster_residuals_cover_series() {
        let mut model: BoxedForecaster = Box::new(SimpleExponentialSmoothing::new(0.4));
        model.fit(&make_test_series(20)).unwrap();
        assert_eq!(model.residuals().unwrap().len(), 20);
    }
}
