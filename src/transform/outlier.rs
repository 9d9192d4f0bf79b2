//! Quantile-band outlier removal.

use crate::core::TimeSeries;
use crate::error::{ForecastError, Result};
use crate::utils::stats::quantile;

/// Keep only observations inside the inclusive band between the `lower_q`
/// and `upper_q` quantiles of the finite values.
///
/// Non-finite observations are dropped along with the outliers.
pub fn clip_quantiles(series: &TimeSeries, lower_q: f64, upper_q: f64) -> Result<TimeSeries> {
    if !(0.0..=1.0).contains(&lower_q) || !(0.0..=1.0).contains(&upper_q) || lower_q >= upper_q {
        return Err(ForecastError::InvalidParameter(format!(
            "quantile band must satisfy 0 <= lower < upper <= 1, got [{lower_q}, {upper_q}]"
        )));
    }

    let finite: Vec<f64> = series
        .values()
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .collect();
    if finite.is_empty() {
        return Err(ForecastError::EmptyData);
    }

    let low = quantile(&finite, lower_q);
    let high = quantile(&finite, upper_q);

    let (timestamps, values): (Vec<_>, Vec<_>) = series
        .timestamps()
        .iter()
        .zip(series.values())
        .filter(|(_, &v)| v >= low && v <= high)
        .map(|(t, v)| (*t, *v))
        .unzip();

    let mut clipped = TimeSeries::univariate(timestamps, values)?;
    if let Some(label) = series.label() {
        clipped = clipped.with_label(label);
    }
    Ok(clipped)
}
