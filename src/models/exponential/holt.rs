//! Holt's Linear Trend forecasting model.
//!
//! Double exponential smoothing for readings with a drift but no
//! seasonality, for example a slowly saturating electrochemical cell.

use crate::core::{Forecast, TimeSeries};
use crate::error::{ForecastError, Result};
use crate::models::Forecaster;
use crate::utils::optimization::{nelder_mead, NelderMeadConfig};
use crate::utils::stats::z_for_level;

const PARAM_RANGE: (f64, f64) = (0.0001, 0.9999);

/// Holt's Linear Trend forecaster.
///
/// - Level: `l_t = α × y_t + (1-α) × (l_{t-1} + b_{t-1})`
/// - Trend: `b_t = β × (l_t - l_{t-1}) + (1-β) × b_{t-1}`
/// - Forecast: `ŷ_{t+h} = l_t + h × b_t`
#[derive(Debug, Clone)]
pub struct HoltLinearTrend {
    alpha: Option<f64>,
    beta: Option<f64>,
    optimize: bool,
    level: Option<f64>,
    trend: Option<f64>,
    fitted: Option<Vec<f64>>,
    residuals: Option<Vec<f64>>,
    residual_variance: Option<f64>,
}

/// Final state and one-step fitted values of a smoothing pass.
struct Pass {
    level: f64,
    trend: f64,
    fitted: Vec<f64>,
}

impl HoltLinearTrend {
    /// Holt with fixed smoothing parameters.
    pub fn new(alpha: f64, beta: f64) -> Self {
        Self {
            alpha: Some(alpha.clamp(PARAM_RANGE.0, PARAM_RANGE.1)),
            beta: Some(beta.clamp(PARAM_RANGE.0, PARAM_RANGE.1)),
            optimize: false,
            level: None,
            trend: None,
            fitted: None,
            residuals: None,
            residual_variance: None,
        }
    }

    /// Holt whose parameters minimise the in-sample one-step SSE.
    pub fn auto() -> Self {
        Self {
            alpha: None,
            beta: None,
            optimize: true,
            ..Self::new(0.3, 0.1)
        }
    }

    pub fn alpha(&self) -> Option<f64> {
        self.alpha
    }

    pub fn beta(&self) -> Option<f64> {
        self.beta
    }

    pub fn level(&self) -> Option<f64> {
        self.level
    }

    pub fn trend(&self) -> Option<f64> {
        self.trend
    }

    /// Level starts at the first reading, trend at the first difference.
    fn run(values: &[f64], alpha: f64, beta: f64) -> Pass {
        let mut level = values[0];
        let mut trend = values[1] - values[0];
        let mut fitted = Vec::with_capacity(values.len());
        fitted.push(level);

        for &y in &values[1..] {
            fitted.push(level + trend);
            let previous = level;
            level = alpha * y + (1.0 - alpha) * (previous + trend);
            trend = beta * (level - previous) + (1.0 - beta) * trend;
        }

        Pass {
            level,
            trend,
            fitted,
        }
    }

    fn sse(values: &[f64], alpha: f64, beta: f64) -> f64 {
        let pass = Self::run(values, alpha, beta);
        let sse: f64 = values
            .iter()
            .zip(&pass.fitted)
            .skip(1)
            .map(|(y, f)| (y - f).powi(2))
            .sum();
        if sse.is_finite() {
            sse
        } else {
            f64::MAX
        }
    }

    fn optimize_params(values: &[f64]) -> (f64, f64) {
        let config = NelderMeadConfig {
            max_iter: 1000,
            ..Default::default()
        };
        let result = nelder_mead(
            |params| Self::sse(values, params[0], params[1]),
            &[0.3, 0.1],
            Some(&[PARAM_RANGE, PARAM_RANGE]),
            config,
        );
        (
            result.optimal_point[0].clamp(PARAM_RANGE.0, PARAM_RANGE.1),
            result.optimal_point[1].clamp(PARAM_RANGE.0, PARAM_RANGE.1),
        )
    }
}

impl Default for HoltLinearTrend {
    fn default() -> Self {
        Self::auto()
    }
}

impl Forecaster for HoltLinearTrend {
    fn fit(&mut self, series: &TimeSeries) -> Result<()> {
        let values = series.values();
        if values.len() < 2 {
            return Err(ForecastError::InsufficientData {
                needed: 2,
                got: values.len(),
            });
        }
        if values.iter().any(|v| !v.is_finite()) {
            return Err(ForecastError::MissingValues);
        }

        if self.optimize {
            let (alpha, beta) = Self::optimize_params(values);
            self.alpha = Some(alpha);
            self.beta = Some(beta);
        }
        let alpha = self.alpha.ok_or(ForecastError::FitRequired)?;
        let beta = self.beta.ok_or(ForecastError::FitRequired)?;

        let pass = Self::run(values, alpha, beta);
        let residuals: Vec<f64> = values
            .iter()
            .zip(&pass.fitted)
            .map(|(y, f)| y - f)
            .collect();

        let tail = &residuals[1..];
        self.residual_variance = Some(tail.iter().map(|e| e * e).sum::<f64>() / tail.len() as f64);
        self.level = Some(pass.level);
        self.trend = Some(pass.trend);
        self.fitted = Some(pass.fitted);
        self.residuals = Some(residuals);
        Ok(())
    }

    fn predict(&self, horizon: usize) -> Result<Forecast> {
        let level = self.level.ok_or(ForecastError::FitRequired)?;
        let trend = self.trend.ok_or(ForecastError::FitRequired)?;
        Ok(Forecast::from_values(
            (1..=horizon).map(|h| level + h as f64 * trend).collect(),
        ))
    }

    fn predict_with_intervals(&self, horizon: usize, level: f64) -> Result<Forecast> {
        let forecast = self.predict(horizon)?;
        let alpha = self.alpha.ok_or(ForecastError::FitRequired)?;
        let beta = self.beta.ok_or(ForecastError::FitRequired)?;
        let sigma2 = self.residual_variance.unwrap_or(0.0);
        let z = z_for_level(level);

        // Var(e_{n+h}) = σ² (1 + Σ_{j<h} (α + αβj)²)
        let mut factor = 1.0;
        let mut lower = Vec::with_capacity(horizon);
        let mut upper = Vec::with_capacity(horizon);
        for (h, pred) in forecast.primary().iter().enumerate() {
            if h > 0 {
                factor += (alpha + alpha * beta * h as f64).powi(2);
            }
            let se = (sigma2 * factor).sqrt();
            lower.push(pred - z * se);
            upper.push(pred + z * se);
        }

        Ok(Forecast::from_values_with_intervals(
            forecast.primary().to_vec(),
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
        "HoltLinearTrend"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::{Duration, TimeZone, Utc};

    fn make_series(values: Vec<f64>) -> TimeSeries {
        let base = Utc.with_ymd_and_hms(2019, 5, 1, 0, 0, 0).unwrap();
        let timestamps = (0..values.len())
            .map(|i| base + Duration::minutes(30 * i as i64))
            .collect();
        TimeSeries::univariate(timestamps, values).unwrap()
    }

    #[test]
    fn holt_tracks_exact_line() {
        let values: Vec<f64> = (0..20).map(|i| 5.0 + 0.25 * i as f64).collect();
        let mut model = HoltLinearTrend::new(0.5, 0.3);
        model.fit(&make_series(values)).unwrap();

        let preds = model.predict(2).unwrap();
        assert_relative_eq!(preds.primary()[0], 10.0, epsilon = 1e-9);
        assert_relative_eq!(preds.primary()[1], 10.25, epsilon = 1e-9);
    }

    #[test]
    fn holt_auto_optimization() {
        let values: Vec<f64> = (0..30)
            .map(|i| 10.0 + 1.5 * i as f64 + (i as f64 * 0.5).sin())
            .collect();
        let mut model = HoltLinearTrend::auto();
        model.fit(&make_series(values)).unwrap();

        assert!(model.alpha().unwrap() > 0.0);
        assert!(model.beta().unwrap() < 1.0);
        let preds = model.predict(3).unwrap();
        assert!(preds.primary()[2] > preds.primary()[0]);
    }

    #[test]
    fn holt_confidence_intervals() {
        let values: Vec<f64> = (0..30)
            .map(|i| 1.0 + 0.05 * i as f64 + 0.1 * (i as f64 * 2.1).sin())
            .collect();
        let mut model = HoltLinearTrend::new(0.4, 0.2);
        model.fit(&make_series(values)).unwrap();

        let forecast = model.predict_with_intervals(5, 0.95).unwrap();
        let lower = forecast.lower().unwrap();
        let upper = forecast.upper().unwrap();
        for h in 0..5 {
            assert!(upper[h] >= lower[h]);
        }
        assert!(upper[4] - lower[4] > upper[0] - lower[0]);
    }

    #[test]
    fn holt_insufficient_data() {
        let mut model = HoltLinearTrend::new(0.3, 0.1);
        assert!(matches!(
            model.fit(&make_series(vec![1.0])),
            Err(ForecastError::InsufficientData { needed: 2, got: 1 })
        ));
    }

    #[test]
    fn holt_requires_fit_before_predict() {
        assert!(matches!(
            HoltLinearTrend::new(0.3, 0.1).predict(3),
            Err(ForecastError::FitRequired)
        ));
    }
}
