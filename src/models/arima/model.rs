//! ARIMA (Autoregressive Integrated Moving Average) model.

use crate::core::{Forecast, TimeSeries};
use crate::error::{ForecastError, Result};
use crate::models::arima::diff::{difference, difference_polynomial, integrate, multiply_polynomials};
use crate::models::Forecaster;
use crate::utils::optimization::{nelder_mead, NelderMeadConfig};
use crate::utils::stats::z_for_level;
use serde::{Deserialize, Serialize};
use std::fmt;

/// ARIMA order `(p, d, q)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ARIMASpec {
    /// AR order (p)
    pub p: usize,
    /// Differencing order (d)
    pub d: usize,
    /// MA order (q)
    pub q: usize,
}

impl ARIMASpec {
    pub fn new(p: usize, d: usize, q: usize) -> Self {
        Self { p, d, q }
    }

    /// Number of estimated parameters: AR + MA + intercept.
    pub fn num_params(&self) -> usize {
        self.p + self.q + 1
    }

    /// Shortest series this order can be fitted on.
    pub fn min_observations(&self) -> usize {
        self.d + self.p.max(self.q) + 2
    }
}

impl Default for ARIMASpec {
    fn default() -> Self {
        Self::new(1, 1, 1)
    }
}

impl fmt::Display for ARIMASpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.p, self.d, self.q)
    }
}

/// ARIMA forecasting model.
///
/// The series is differenced `d` times and the differenced values `w_t`
/// follow
///
/// `w_t = c + Σ φ_i (w_{t-i} - c) + Σ θ_j e_{t-j} + e_t`
///
/// with `c`, `φ` and `θ` estimated by conditional sum of squares.
#[derive(Debug, Clone)]
pub struct ARIMA {
    spec: ARIMASpec,
    ar_coefficients: Vec<f64>,
    ma_coefficients: Vec<f64>,
    /// Mean of the differenced series.
    intercept: f64,
    /// Observations on the original scale, needed for integration.
    original: Option<Vec<f64>>,
    differenced: Option<Vec<f64>>,
    /// Fitted values on the differenced scale.
    fitted_diff: Option<Vec<f64>>,
    residuals: Option<Vec<f64>>,
    residual_variance: Option<f64>,
    aic: Option<f64>,
    bic: Option<f64>,
}

impl ARIMA {
    pub fn new(p: usize, d: usize, q: usize) -> Self {
        Self::from_spec(ARIMASpec::new(p, d, q))
    }

    pub fn from_spec(spec: ARIMASpec) -> Self {
        Self {
            spec,
            ar_coefficients: vec![],
            ma_coefficients: vec![],
            intercept: 0.0,
            original: None,
            differenced: None,
            fitted_diff: None,
            residuals: None,
            residual_variance: None,
            aic: None,
            bic: None,
        }
    }

    pub fn spec(&self) -> ARIMASpec {
        self.spec
    }

    pub fn ar_coefficients(&self) -> &[f64] {
        &self.ar_coefficients
    }

    pub fn ma_coefficients(&self) -> &[f64] {
        &self.ma_coefficients
    }

    pub fn intercept(&self) -> f64 {
        self.intercept
    }

    /// Innovation variance estimated from the in-sample residuals.
    pub fn residual_variance(&self) -> Option<f64> {
        self.residual_variance
    }

    pub fn aic(&self) -> Option<f64> {
        self.aic
    }

    pub fn bic(&self) -> Option<f64> {
        self.bic
    }

    /// One pass of the ARMA recursion over `w`.
    ///
    /// Returns `(fitted, residuals)`; the first `max(p, q)` entries carry no
    /// prediction (NaN fitted, zero residual).
    fn filter(
        w: &[f64],
        intercept: f64,
        ar: &[f64],
        ma: &[f64],
    ) -> (Vec<f64>, Vec<f64>) {
        let n = w.len();
        let start = ar.len().max(ma.len());
        let mut fitted = vec![f64::NAN; n];
        let mut residuals = vec![0.0; n];

        for t in start..n {
            let ar_part: f64 = ar
                .iter()
                .enumerate()
                .map(|(i, phi)| phi * (w[t - 1 - i] - intercept))
                .sum();
            let ma_part: f64 = ma
                .iter()
                .enumerate()
                .map(|(j, theta)| theta * residuals[t - 1 - j])
                .sum();
            let pred = intercept + ar_part + ma_part;
            fitted[t] = pred;
            residuals[t] = w[t] - pred;
        }

        (fitted, residuals)
    }

    /// Conditional sum of squares for a packed parameter vector
    /// `[intercept, φ_1..φ_p, θ_1..θ_q]`.
    fn css(w: &[f64], p: usize, params: &[f64]) -> f64 {
        let start = (params.len() - 1 - p).max(p);
        if w.len() <= start {
            return f64::MAX;
        }
        let (_, residuals) = Self::filter(w, params[0], &params[1..1 + p], &params[1 + p..]);
        let css: f64 = residuals[start..].iter().map(|e| e * e).sum();
        if css.is_finite() {
            css
        } else {
            f64::MAX
        }
    }

    fn estimate_parameters(&mut self, w: &[f64]) {
        let ARIMASpec { p, q, .. } = self.spec;
        let mean = w.iter().sum::<f64>() / w.len() as f64;

        if p == 0 && q == 0 {
            self.intercept = mean;
            self.ar_coefficients.clear();
            self.ma_coefficients.clear();
            return;
        }

        let mut initial = Vec::with_capacity(self.spec.num_params());
        initial.push(mean);
        initial.extend((0..p).map(|i| 0.1 / (i + 1) as f64));
        initial.extend((0..q).map(|j| 0.1 / (j + 1) as f64));

        // Keep coefficients inside the unit interval so recursions stay bounded
        let mut bounds = vec![(f64::NEG_INFINITY, f64::INFINITY)];
        bounds.extend(std::iter::repeat((-0.99, 0.99)).take(p + q));

        let config = NelderMeadConfig {
            max_iter: 1000,
            tolerance: 1e-8,
            ..Default::default()
        };
        let result = nelder_mead(|params| Self::css(w, p, params), &initial, Some(&bounds), config);

        let best = result.optimal_point;
        self.intercept = best[0];
        self.ar_coefficients = best[1..1 + p].to_vec();
        self.ma_coefficients = best[1 + p..].to_vec();
    }

    fn calculate_fitted(&mut self, w: &[f64]) {
        let start = self.spec.p.max(self.spec.q);
        let (fitted, residuals) =
            Self::filter(w, self.intercept, &self.ar_coefficients, &self.ma_coefficients);

        let effective = &residuals[start..];
        if !effective.is_empty() {
            let n_eff = effective.len() as f64;
            let variance = effective.iter().map(|e| e * e).sum::<f64>() / n_eff;
            let k = self.spec.num_params() as f64;
            let log_likelihood =
                -0.5 * n_eff * (1.0 + variance.ln() + (2.0 * std::f64::consts::PI).ln());

            self.residual_variance = Some(variance);
            self.aic = Some(-2.0 * log_likelihood + 2.0 * k);
            self.bic = Some(-2.0 * log_likelihood + k * n_eff.ln());
        }

        self.fitted_diff = Some(fitted);
        self.residuals = Some(residuals);
    }

    /// First `horizon` psi weights of the model written in MA(∞) form on the
    /// original (undifferenced) scale.
    pub fn psi_weights(&self, horizon: usize) -> Vec<f64> {
        if horizon == 0 {
            return vec![];
        }

        // φ(B)(1 - B)^d in ascending powers; entries after the leading 1 are
        // the negated coefficients of the integrated AR operator
        let mut ar_poly = vec![1.0];
        ar_poly.extend(self.ar_coefficients.iter().map(|phi| -phi));
        let full = multiply_polynomials(&ar_poly, &difference_polynomial(self.spec.d));

        let mut psi = Vec::with_capacity(horizon);
        psi.push(1.0);
        for j in 1..horizon {
            let theta = self.ma_coefficients.get(j - 1).copied().unwrap_or(0.0);
            let ar_part: f64 = (1..full.len().min(j + 1))
                .map(|i| -full[i] * psi[j - i])
                .sum();
            psi.push(theta + ar_part);
        }
        psi
    }
}

impl Default for ARIMA {
    fn default() -> Self {
        Self::from_spec(ARIMASpec::default())
    }
}

impl Forecaster for ARIMA {
    fn fit(&mut self, series: &TimeSeries) -> Result<()> {
        let values = series.values();
        let min_len = self.spec.min_observations();

        if values.len() < min_len {
            return Err(ForecastError::InsufficientData {
                needed: min_len,
                got: values.len(),
            });
        }
        if values.iter().any(|v| !v.is_finite()) {
            return Err(ForecastError::MissingValues);
        }

        let w = difference(values, self.spec.d);
        self.estimate_parameters(&w);
        self.calculate_fitted(&w);

        self.original = Some(values.to_vec());
        self.differenced = Some(w);

        Ok(())
    }

    fn predict(&self, horizon: usize) -> Result<Forecast> {
        let original = self.original.as_ref().ok_or(ForecastError::FitRequired)?;
        let w = self.differenced.as_ref().ok_or(ForecastError::FitRequired)?;
        let residuals = self.residuals.as_ref().ok_or(ForecastError::FitRequired)?;

        if horizon == 0 {
            return Ok(Forecast::new());
        }

        let mut extended = w.clone();
        let mut shocks = residuals.clone();

        for _ in 0..horizon {
            let t = extended.len();
            let mut pred = self.intercept;
            for (i, phi) in self.ar_coefficients.iter().enumerate() {
                if t > i {
                    pred += phi * (extended[t - 1 - i] - self.intercept);
                }
            }
            for (j, theta) in self.ma_coefficients.iter().enumerate() {
                if t > j {
                    pred += theta * shocks[t - 1 - j];
                }
            }
            extended.push(pred);
            // Future shocks have zero expectation
            shocks.push(0.0);
        }

        let predictions = integrate(&extended[w.len()..], original, self.spec.d);
        if predictions.iter().any(|v| !v.is_finite()) {
            return Err(ForecastError::ComputationError(format!(
                "ARIMA{} produced a non-finite forecast",
                self.spec
            )));
        }

        Ok(Forecast::from_values(predictions))
    }

    fn predict_with_intervals(&self, horizon: usize, level: f64) -> Result<Forecast> {
        let forecast = self.predict(horizon)?;
        if horizon == 0 {
            return Ok(forecast);
        }

        let sigma2 = self.residual_variance.unwrap_or(0.0);
        let z = z_for_level(level);
        let psi = self.psi_weights(horizon);

        let mut cumulative = 0.0;
        let mut lower = Vec::with_capacity(horizon);
        let mut upper = Vec::with_capacity(horizon);
        for (pred, weight) in forecast.primary().iter().zip(&psi) {
            cumulative += weight * weight;
            let se = (sigma2 * cumulative).sqrt();
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
        self.fitted_diff.as_deref()
    }

    fn residuals(&self) -> Option<&[f64]> {
        self.residuals.as_deref()
    }

    fn name(&self) -> &str {
        "ARIMA"
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
    fn arima_basic_fit() {
        let values: Vec<f64> = (0..60)
            .map(|i| 10.0 + 0.5 * i as f64 + (i as f64 * 0.3).sin())
            .collect();
        let mut model = ARIMA::new(1, 1, 1);
        model.fit(&make_series(values)).unwrap();

        assert_eq!(model.ar_coefficients().len(), 1);
        assert_eq!(model.ma_coefficients().len(), 1);
        assert!(model.is_fitted());
        assert_eq!(model.predict(5).unwrap().horizon(), 5);
    }

    #[test]
    fn arima_recovers_ar1_sign() {
        let mut values = vec![10.0];
        for i in 1..120 {
            values.push(0.7 * values[i - 1] + (i as f64 * 0.7).sin());
        }
        let mut model = ARIMA::new(1, 0, 0);
        model.fit(&make_series(values)).unwrap();

        assert!(model.ar_coefficients()[0] > 0.3);
    }

    #[test]
    fn arima_continues_linear_trend() {
        let values: Vec<f64> = (0..50).map(|i| 10.0 + 2.0 * i as f64).collect();
        let last = *values.last().unwrap();
        let mut model = ARIMA::new(1, 1, 0);
        model.fit(&make_series(values)).unwrap();

        let preds = model.predict(3).unwrap();
        assert_relative_eq!(preds.primary()[0], last + 2.0, epsilon = 0.5);
        assert!(preds.primary()[2] > preds.primary()[0]);
    }

    #[test]
    fn psi_weights_of_random_walk_are_ones() {
        let values: Vec<f64> = (0..40).map(|i| (i as f64 * 0.4).sin()).collect();
        let mut model = ARIMA::new(0, 1, 0);
        model.fit(&make_series(values)).unwrap();

        assert_eq!(model.psi_weights(4), vec![1.0, 1.0, 1.0, 1.0]);
    }

    #[test]
    fn psi_weights_of_ma1_stop_after_lag_one() {
        let mut model = ARIMA::new(0, 0, 1);
        model.ma_coefficients = vec![0.4];
        let psi = model.psi_weights(4);
        assert_eq!(psi, vec![1.0, 0.4, 0.0, 0.0]);
    }

    #[test]
    fn psi_weights_of_ar1_decay_geometrically() {
        let mut model = ARIMA::new(1, 0, 0);
        model.ar_coefficients = vec![0.5];
        let psi = model.psi_weights(4);
        assert_relative_eq!(psi[1], 0.5, epsilon = 1e-12);
        assert_relative_eq!(psi[2], 0.25, epsilon = 1e-12);
        assert_relative_eq!(psi[3], 0.125, epsilon = 1e-12);
    }

    #[test]
    fn arima_intervals_widen_with_horizon() {
        let values: Vec<f64> = (0..80)
            .map(|i| 5.0 + (i as f64 * 0.35).sin() + 0.02 * i as f64)
            .collect();
        let mut model = ARIMA::new(1, 1, 1);
        model.fit(&make_series(values)).unwrap();

        let forecast = model.predict_with_intervals(6, 0.95).unwrap();
        assert!(forecast.has_intervals());
        let lower = forecast.lower().unwrap();
        let upper = forecast.upper().unwrap();
        for h in 0..6 {
            assert!(lower[h] <= forecast.primary()[h]);
            assert!(upper[h] >= forecast.primary()[h]);
        }
        assert!(upper[5] - lower[5] >= upper[0] - lower[0]);
    }

    #[test]
    fn arima_information_criteria() {
        let values: Vec<f64> = (0..50).map(|i| 10.0 + (i as f64 * 0.3).sin()).collect();
        let mut model = ARIMA::new(1, 0, 1);
        model.fit(&make_series(values)).unwrap();

        assert!(model.aic().is_some());
        assert!(model.bic().is_some());
        assert!(model.residual_variance().unwrap() >= 0.0);
    }

    #[test]
    fn arima_insufficient_data() {
        let mut model = ARIMA::new(2, 1, 1);
        assert!(matches!(
            model.fit(&make_series(vec![1.0, 2.0, 3.0])),
            Err(ForecastError::InsufficientData { needed: 5, got: 3 })
        ));
    }

    #[test]
    fn arima_rejects_missing_values() {
        let mut values: Vec<f64> = (0..20).map(|i| i as f64).collect();
        values[7] = f64::NAN;
        let mut model = ARIMA::new(1, 1, 0);
        assert!(matches!(
            model.fit(&make_series(values)),
            Err(ForecastError::MissingValues)
        ));
    }

    #[test]
    fn arima_requires_fit() {
        let model = ARIMA::new(1, 1, 1);
        assert!(matches!(model.predict(5), Err(ForecastError::FitRequired)));
    }

    #[test]
    fn arima_zero_horizon() {
        let mut model = ARIMA::new(1, 1, 1);
        model
            .fit(&make_series((0..30).map(|i| i as f64).collect()))
            .unwrap();
        assert_eq!(model.predict(0).unwrap().horizon(), 0);
    }

    #[test]
    fn arima_spec_display_and_defaults() {
        let spec = ARIMASpec::new(2, 1, 3);
        assert_eq!(spec.num_params(), 6);
        assert_eq!(spec.min_observations(), 6);
        assert_eq!(spec.to_string(), "(2, 1, 3)");
        assert_eq!(ARIMA::default().spec(), ARIMASpec::new(1, 1, 1));
        assert_eq!(ARIMA::default().name(), "ARIMA");
    }
}
