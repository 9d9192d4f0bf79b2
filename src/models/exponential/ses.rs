//! Simple Exponential Smoothing (SES) forecasting model.
//!
//! Suited to readings that hover around a slowly drifting level with no
//! trend, such as a gas sensor baseline between exposure events.

use crate::core::{Forecast, TimeSeries};
use crate::error::{ForecastError, Result};
use crate::models::Forecaster;
use crate::utils::optimization::{nelder_mead, NelderMeadConfig};
use crate::utils::stats::z_for_level;

const ALPHA_RANGE: (f64, f64) = (0.0001, 0.9999);

/// Simple Exponential Smoothing forecaster.
///
/// `level_t = α × y_t + (1-α) × level_{t-1}`, forecasts are flat at the
/// final level.
///
/// # Example
/// ```
/// use sensor_forecast::models::exponential::SimpleExponentialSmoothing;
/// use sensor_forecast::models::Forecaster;
/// use sensor_forecast::core::TimeSeries;
/// use chrono::{TimeZone, Utc, Duration};
///
/// let base = Utc.with_ymd_and_hms(2019, 5, 1, 0, 0, 0).unwrap();
/// let timestamps: Vec<_> = (0..10).map(|i| base + Duration::minutes(30 * i)).collect();
/// let values = vec![1.0, 1.2, 1.1, 1.3, 1.2, 1.4, 1.3, 1.5, 1.4, 1.6];
/// let ts = TimeSeries::univariate(timestamps, values).unwrap();
///
/// let mut model = SimpleExponentialSmoothing::new(0.3);
/// model.fit(&ts).unwrap();
/// assert_eq!(model.predict(3).unwrap().horizon(), 3);
/// ```
#[derive(Debug, Clone)]
pub struct SimpleExponentialSmoothing {
    alpha: Option<f64>,
    optimize: bool,
    level: Option<f64>,
    fitted: Option<Vec<f64>>,
    residuals: Option<Vec<f64>>,
    residual_variance: Option<f64>,
}

impl SimpleExponentialSmoothing {
    /// SES with a fixed smoothing parameter.
    pub fn new(alpha: f64) -> Self {
        Self {
            alpha: Some(alpha.clamp(ALPHA_RANGE.0, ALPHA_RANGE.1)),
            optimize: false,
            level: None,
            fitted: None,
            residuals: None,
            residual_variance: None,
        }
    }

    /// SES whose alpha minimises the in-sample one-step SSE.
    pub fn auto() -> Self {
        Self {
            alpha: None,
            optimize: true,
            ..Self::new(0.5)
        }
    }

    pub fn alpha(&self) -> Option<f64> {
        self.alpha
    }

    pub fn level(&self) -> Option<f64> {
        self.level
    }

    /// Run the smoother, returning one-step fitted values and the final level.
    fn smooth(values: &[f64], alpha: f64) -> (Vec<f64>, f64) {
        let mut level = values[0];
        let mut fitted = Vec::with_capacity(values.len());
        for &y in values {
            fitted.push(level);
            level = alpha * y + (1.0 - alpha) * level;
        }
        (fitted, level)
    }

    fn sse(values: &[f64], alpha: f64) -> f64 {
        let (fitted, _) = Self::smooth(values, alpha);
        values
            .iter()
            .zip(&fitted)
            .skip(1)
            .map(|(y, f)| (y - f).powi(2))
            .sum()
    }

    fn optimize_alpha(values: &[f64]) -> f64 {
        let config = NelderMeadConfig {
            max_iter: 500,
            ..Default::default()
        };
        let result = nelder_mead(
            |params| Self::sse(values, params[0]),
            &[0.5],
            Some(&[ALPHA_RANGE]),
            config,
        );
        result.optimal_point[0].clamp(ALPHA_RANGE.0, ALPHA_RANGE.1)
    }
}

impl Default for SimpleExponentialSmoothing {
    fn default() -> Self {
        Self::auto()
    }
}

impl Forecaster for SimpleExponentialSmoothing {
    fn fit(&mut self, series: &TimeSeries) -> Result<()> {
        let values = series.values();
        if values.is_empty() {
            return Err(ForecastError::EmptyData);
        }
        if values.iter().any(|v| !v.is_finite()) {
            return Err(ForecastError::MissingValues);
        }

        if self.optimize {
            self.alpha = Some(Self::optimize_alpha(values));
        }
        let alpha = self.alpha.ok_or(ForecastError::FitRequired)?;

        let (fitted, level) = Self::smooth(values, alpha);
        let residuals: Vec<f64> = values.iter().zip(&fitted).map(|(y, f)| y - f).collect();

        // The first residual is zero by construction
        if residuals.len() > 1 {
            let tail = &residuals[1..];
            self.residual_variance =
                Some(tail.iter().map(|e| e * e).sum::<f64>() / tail.len() as f64);
        }

        self.level = Some(level);
        self.fitted = Some(fitted);
        self.residuals = Some(residuals);
        Ok(())
    }

    fn predict(&self, horizon: usize) -> Result<Forecast> {
        let level = self.level.ok_or(ForecastError::FitRequired)?;
        Ok(Forecast::from_values(vec![level; horizon]))
    }

    fn predict_with_intervals(&self, horizon: usize, level: f64) -> Result<Forecast> {
        let current = self.level.ok_or(ForecastError::FitRequired)?;
        let alpha = self.alpha.ok_or(ForecastError::FitRequired)?;
        let sigma2 = self.residual_variance.unwrap_or(0.0);
        let z = z_for_level(level);

        // Var(e_{n+h}) = σ² (1 + (h-1) α²)
        let (lower, upper): (Vec<f64>, Vec<f64>) = (1..=horizon)
            .map(|h| {
                let se = (sigma2 * (1.0 + (h - 1) as f64 * alpha * alpha)).sqrt();
                (current - z * se, current + z * se)
            })
            .unzip();

        Ok(Forecast::from_values_with_intervals(
            vec![current; horizon],
            lower,
            upper,
        ))
    }

    fn fitted_values(&self) -> Option<&[f64]> {
        self.fitted.as_deref()
    }

    fn residuals(&self) -> Option<&[f64]> {
        self.residuals.as_deref()
    }

    fn name(&self) -> &str {
        "SimpleExponentialSmoothing"
    }
}
