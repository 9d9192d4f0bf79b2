//! Classical moving-average decomposition.
//!
//! Splits a series into trend, seasonal and residual parts:
//! - Trend: centred moving average over one period
//! - Seasonal: mean detrended value per phase of the cycle
//! - Residual: what is left after removing both

use crate::error::{ForecastError, Result};
use crate::utils::stats::{nan_mean, variance};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How the components combine into the observed series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecompositionModel {
    /// `observed = trend + seasonal + resid`
    #[default]
    Additive,
    /// `observed = trend × seasonal × resid`
    Multiplicative,
}

impl DecompositionModel {
    /// Remove `part` from `value`.
    fn remove(self, value: f64, part: f64) -> f64 {
        match self {
            DecompositionModel::Additive => value - part,
            DecompositionModel::Multiplicative => value / part,
        }
    }
}

impl fmt::Display for DecompositionModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecompositionModel::Additive => f.write_str("additive"),
            DecompositionModel::Multiplicative => f.write_str("multiplicative"),
        }
    }
}

impl FromStr for DecompositionModel {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "additive" | "add" => Ok(DecompositionModel::Additive),
            "multiplicative" | "mul" => Ok(DecompositionModel::Multiplicative),
            other => Err(format!("unknown decomposition model `{other}`")),
        }
    }
}

/// Components of a decomposed series, all of the input's length.
///
/// `trend` and `resid` are NaN over the first and last `period / 2`
/// positions where the moving average has no full window.
#[derive(Debug, Clone)]
pub struct Decomposition {
    pub observed: Vec<f64>,
    pub trend: Vec<f64>,
    pub seasonal: Vec<f64>,
    pub resid: Vec<f64>,
    pub period: usize,
    pub model: DecompositionModel,
}

impl Decomposition {
    pub fn len(&self) -> usize {
        self.observed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observed.is_empty()
    }

    /// Strength of seasonality in [0, 1], computed where the residual is defined.
    ///
    /// `max(0, 1 - Var(R) / Var(S + R))` for the additive model.
    pub fn seasonal_strength(&self) -> f64 {
        let (resid, combined): (Vec<f64>, Vec<f64>) = self
            .seasonal
            .iter()
            .zip(&self.resid)
            .filter(|(_, r)| r.is_finite())
            .map(|(s, r)| match self.model {
                DecompositionModel::Additive => (*r, s + r),
                DecompositionModel::Multiplicative => (*r, s * r),
            })
            .unzip();

        let var_combined = variance(&combined);
        if var_combined.is_nan() || var_combined < 1e-12 {
            return 0.0;
        }
        (1.0 - variance(&resid) / var_combined).max(0.0)
    }
}

/// Weights of the centred moving average for `period`.
///
/// Odd periods average `period` points; even periods use a `2 × period`
/// average spanning `period + 1` points with half weight at both ends.
fn trend_weights(period: usize) -> Vec<f64> {
    let p = period as f64;
    if period % 2 == 1 {
        vec![1.0 / p; period]
    } else {
        let mut weights = vec![1.0 / p; period + 1];
        weights[0] = 0.5 / p;
        weights[period] = 0.5 / p;
        weights
    }
}

fn centred_moving_average(values: &[f64], period: usize) -> Vec<f64> {
    let weights = trend_weights(period);
    let half = weights.len() / 2;
    let n = values.len();
    let mut trend = vec![f64::NAN; n];

    for (i, slot) in trend.iter_mut().enumerate().take(n - half).skip(half) {
        *slot = weights
            .iter()
            .zip(&values[i - half..=i + half])
            .map(|(w, v)| w * v)
            .sum();
    }
    trend
}

/// Decompose `values` with a classical moving average.
///
/// # Example
/// ```
/// use sensor_forecast::seasonality::{seasonal_decompose, DecompositionModel};
///
/// let values: Vec<f64> = (0..24).map(|i| i as f64 + [1.0, -1.0, 0.0][i % 3]).collect();
/// let parts = seasonal_decompose(&values, 3, DecompositionModel::Additive).unwrap();
///
/// assert!(parts.trend[0].is_nan());
/// assert!((parts.seasonal[0] - 1.0).abs() < 1e-9);
/// assert!((parts.resid[10]).abs() < 1e-9);
/// ```
pub fn seasonal_decompose(
    values: &[f64],
    period: usize,
    model: DecompositionModel,
) -> Result<Decomposition> {
    if period < 2 {
        return Err(ForecastError::InvalidParameter(format!(
            "seasonal period must be at least 2, got {period}"
        )));
    }
    if values.is_empty() {
        return Err(ForecastError::EmptyData);
    }
    if values.len() < 2 * period {
        return Err(ForecastError::InsufficientData {
            needed: 2 * period,
            got: values.len(),
        });
    }
    if values.iter().any(|v| !v.is_finite()) {
        return Err(ForecastError::MissingValues);
    }
    if model == DecompositionModel::Multiplicative && values.iter().any(|&v| v <= 0.0) {
        return Err(ForecastError::InvalidParameter(
            "multiplicative decomposition requires strictly positive values".to_string(),
        ));
    }

    let trend = centred_moving_average(values, period);
    let detrended: Vec<f64> = values
        .iter()
        .zip(&trend)
        .map(|(&v, &t)| model.remove(v, t))
        .collect();

    let mut phase_means: Vec<f64> = (0..period)
        .map(|phase| {
            let column: Vec<f64> = detrended.iter().skip(phase).step_by(period).copied().collect();
            nan_mean(&column)
        })
        .collect();

    let centre = nan_mean(&phase_means);
    for m in phase_means.iter_mut() {
        *m = model.remove(*m, centre);
    }

    let seasonal: Vec<f64> = (0..values.len()).map(|i| phase_means[i % period]).collect();
    let resid = detrended
        .iter()
        .zip(&seasonal)
        .map(|(&d, &s)| model.remove(d, s))
        .collect();

    Ok(Decomposition {
        observed: values.to_vec(),
        trend,
        seasonal,
        resid,
        period,
        model,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn seasonal_series(n: usize, pattern: &[f64], slope: f64) -> Vec<f64> {
        (0..n)
            .map(|i| 10.0 + slope * i as f64 + pattern[i % pattern.len()])
            .collect()
    }

    #[test]
    fn even_period_weights_sum_to_one() {
        let w = trend_weights(4);
        assert_eq!(w.len(), 5);
        assert_relative_eq!(w.iter().sum::<f64>(), 1.0, epsilon = 1e-12);
        assert_relative_eq!(w[0], 0.125, epsilon = 1e-12);
    }

    #[test]
    fn additive_recovers_pattern_on_linear_trend() {
        let pattern = [2.0, -1.0, 0.5, -1.5];
        let values = seasonal_series(40, &pattern, 0.3);
        let parts = seasonal_decompose(&values, 4, DecompositionModel::Additive).unwrap();

        for i in 0..4 {
            assert_relative_eq!(parts.seasonal[i], pattern[i], epsilon = 1e-9);
        }
        for i in 2..38 {
            assert_relative_eq!(parts.trend[i], 10.0 + 0.3 * i as f64, epsilon = 1e-9);
            assert_relative_eq!(parts.resid[i], 0.0, epsilon = 1e-9);
        }
        assert!(parts.seasonal_strength() > 0.99);
    }

    #[test]
    fn edges_without_full_window_are_nan() {
        let values = seasonal_series(21, &[1.0, 0.0, -1.0], 0.0);
        let parts = seasonal_decompose(&values, 3, DecompositionModel::Additive).unwrap();

        assert!(parts.trend[0].is_nan());
        assert!(parts.trend[20].is_nan());
        assert!(parts.resid[0].is_nan());
        assert!(parts.trend[1].is_finite());
        assert!(parts.trend[19].is_finite());
        assert!(parts.seasonal.iter().all(|s| s.is_finite()));
    }

    #[test]
    fn additive_seasonal_sums_to_zero_over_a_cycle() {
        let values: Vec<f64> = (0..60).map(|i| (i as f64 * 0.9).sin() * 3.0 + i as f64).collect();
        let parts = seasonal_decompose(&values, 6, DecompositionModel::Additive).unwrap();
        let cycle: f64 = parts.seasonal[..6].iter().sum();
        assert_relative_eq!(cycle, 0.0, epsilon = 1e-9);
        assert_eq!(parts.len(), 60);
    }

    #[test]
    fn multiplicative_factors_average_one() {
        let factors = [1.2, 0.8, 1.0];
        let values: Vec<f64> = (0..30).map(|i| 50.0 * factors[i % 3]).collect();
        let parts = seasonal_decompose(&values, 3, DecompositionModel::Multiplicative).unwrap();

        let mean: f64 = parts.seasonal[..3].iter().sum::<f64>() / 3.0;
        assert_relative_eq!(mean, 1.0, epsilon = 1e-9);
        assert_relative_eq!(parts.seasonal[0], 1.2, epsilon = 1e-9);
        assert_relative_eq!(parts.resid[5], 1.0, epsilon = 1e-9);
    }

    #[test]
    fn decomposition_requires_two_cycles() {
        let values = vec![1.0; 13];
        assert!(matches!(
            seasonal_decompose(&values, 7, DecompositionModel::Additive),
            Err(ForecastError::InsufficientData { needed: 14, got: 13 })
        ));
    }

    #[test]
    fn decomposition_rejects_bad_input() {
        assert!(seasonal_decompose(&[1.0; 10], 1, DecompositionModel::Additive).is_err());
        assert!(matches!(
            seasonal_decompose(&[], 2, DecompositionModel::Additive),
            Err(ForecastError::EmptyData)
        ));

        let mut values = vec![1.0; 12];
        values[3] = f64::NAN;
        assert!(matches!(
            seasonal_decompose(&values, 3, DecompositionModel::Additive),
            Err(ForecastError::MissingValues)
        ));

        values[3] = -1.0;
        assert!(seasonal_decompose(&values, 3, DecompositionModel::Multiplicative).is_err());
    }

    #[test]
    fn model_parses_aliases() {
        assert_eq!("add".parse::<DecompositionModel>().unwrap(), DecompositionModel::Additive);
        assert_eq!(
            "Multiplicative".parse::<DecompositionModel>().unwrap(),
            DecompositionModel::Multiplicative
        );
        assert_eq!(DecompositionModel::default().to_string(), "additive");
    }
}
