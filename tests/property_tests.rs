//! Property-based tests for models, transforms and backtesting.
//!
//! These tests verify invariants that should hold for all valid inputs,
//! using randomly generated sensor series.

use chrono::{Duration, TimeZone, Utc};
use proptest::prelude::*;
use sensor_forecast::core::{Reading, TimeSeries};
use sensor_forecast::models::arima::{evaluate_models, GridSearchConfig, OrderGrid, ARIMA};
use sensor_forecast::models::exponential::{HoltLinearTrend, SimpleExponentialSmoothing};
use sensor_forecast::models::Forecaster;
use sensor_forecast::seasonality::{seasonal_decompose, DecompositionModel};
use sensor_forecast::transform::{forward_fill, resample_mean};
use sensor_forecast::utils::backtest::{rolling_one_step, train_size};

/// Create a half-hourly TimeSeries from a vector of values.
fn make_ts(values: &[f64]) -> TimeSeries {
    let base = Utc.with_ymd_and_hms(2019, 5, 1, 0, 0, 0).unwrap();
    let timestamps: Vec<_> = (0..values.len())
        .map(|i| base + Duration::minutes(30 * i as i64))
        .collect();
    TimeSeries::univariate(timestamps, values.to_vec()).unwrap()
}

/// Strategy for generating valid readings.
/// Adds small variation to avoid all-constant series.
fn valid_values_strategy(min_len: usize, max_len: usize) -> impl Strategy<Value = Vec<f64>> {
    (min_len..max_len).prop_flat_map(|len| {
        prop::collection::vec(0.0..50.0_f64, len).prop_map(|mut v| {
            for (i, val) in v.iter_mut().enumerate() {
                *val += (i as f64) * 0.001;
            }
            v
        })
    })
}

/// Strategy for generating seasonal series with a trend.
fn seasonal_values_strategy(period: usize) -> impl Strategy<Value = Vec<f64>> {
    (3 * period..6 * period).prop_flat_map(move |len| {
        (5.0..20.0_f64, 0.5..5.0_f64, -0.1..0.1_f64).prop_map(move |(base, amplitude, slope)| {
            (0..len)
                .map(|i| {
                    base + slope * i as f64
                        + amplitude * (2.0 * std::f64::consts::PI * i as f64 / period as f64).sin()
                })
                .collect()
        })
    })
}

/// Strategy for irregular readings: minute offsets from midnight and values.
fn readings_strategy() -> impl Strategy<Value = Vec<(i64, f64)>> {
    prop::collection::vec((0i64..10_000, -10.0..10.0_f64), 1..200)
}

// =============================================================================
// Property: Forecast length matches requested horizon
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(30))]

    #[test]
    fn arima_forecast_length_matches_horizon(
        values in valid_values_strategy(30, 100),
        horizon in 1usize..20
    ) {
        let ts = make_ts(&values);
        let mut model = ARIMA::new(1, 1, 1);
        model.fit(&ts).unwrap();
        let forecast = model.predict(horizon).unwrap();
        prop_assert_eq!(forecast.horizon(), horizon);
    }

    #[test]
    fn holt_forecast_length_matches_horizon(
        values in valid_values_strategy(20, 100),
        horizon in 1usize..20
    ) {
        let ts = make_ts(&values);
        let mut model = HoltLinearTrend::auto();
        model.fit(&ts).unwrap();
        prop_assert_eq!(model.predict(horizon).unwrap().horizon(), horizon);
    }
}

// =============================================================================
// Property: Intervals are ordered (lower <= point <= upper)
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(30))]

    #[test]
    fn arima_intervals_contain_point_forecast(
        values in valid_values_strategy(30, 100),
        horizon in 1usize..12
    ) {
        let ts = make_ts(&values);
        let mut model = ARIMA::new(1, 0, 1);
        model.fit(&ts).unwrap();
        let forecast = model.predict_with_intervals(horizon, 0.95).unwrap();
        let lower = forecast.lower().unwrap();
        let upper = forecast.upper().unwrap();
        for (i, point) in forecast.primary().iter().enumerate() {
            prop_assert!(point.is_finite());
            prop_assert!(lower[i] <= *point && *point <= upper[i]);
        }
    }

    #[test]
    fn ses_forecast_stays_within_observed_range(
        values in valid_values_strategy(5, 80),
        alpha in 0.01..0.99_f64
    ) {
        let ts = make_ts(&values);
        let mut model = SimpleExponentialSmoothing::new(alpha);
        model.fit(&ts).unwrap();

        let lo = values.iter().cloned().fold(f64::INFINITY, f64::min);
        let hi = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let level = model.predict(1).unwrap().primary()[0];
        prop_assert!(level >= lo - 1e-9 && level <= hi + 1e-9);
    }
}

// =============================================================================
// Property: Resampling produces a contiguous grid
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    #[test]
    fn resample_covers_first_to_last_bin(raw in readings_strategy()) {
        let base = Utc.with_ymd_and_hms(2019, 5, 1, 0, 0, 0).unwrap();
        let readings: Vec<Reading> = raw
            .iter()
            .map(|&(offset, value)| Reading::new(base + Duration::minutes(offset), value))
            .collect();

        let first = raw.iter().map(|r| r.0).min().unwrap();
        let last = raw.iter().map(|r| r.0).max().unwrap();
        let series = resample_mean(&readings, Duration::minutes(30)).unwrap();

        prop_assert_eq!(series.len() as i64, last / 30 - first / 30 + 1);
        prop_assert_eq!(series.timestamps()[0], base + Duration::minutes(first / 30 * 30));
        for v in series.values().iter().filter(|v| v.is_finite()) {
            prop_assert!((-10.0..10.0).contains(v));
        }
        prop_assert!(!forward_fill(&series).unwrap().has_missing_values());
    }
}

// =============================================================================
// Property: Additive decomposition reconstructs the series
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(30))]

    #[test]
    fn additive_components_sum_to_observed(values in seasonal_values_strategy(12)) {
        let parts = seasonal_decompose(&values, 12, DecompositionModel::Additive).unwrap();
        for i in 0..values.len() {
            if parts.trend[i].is_finite() {
                let rebuilt = parts.trend[i] + parts.seasonal[i] + parts.resid[i];
                prop_assert!((rebuilt - values[i]).abs() < 1e-9);
            }
            if i + 12 < values.len() {
                prop_assert!((parts.seasonal[i] - parts.seasonal[i + 12]).abs() < 1e-12);
            }
        }
    }
}

// =============================================================================
// Property: Backtests score every test point and grid search picks the minimum
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(10))]

    #[test]
    fn rolling_backtest_predicts_every_test_point(values in valid_values_strategy(20, 40)) {
        let ts = make_ts(&values);
        let result = rolling_one_step(&ts, 0.66, || SimpleExponentialSmoothing::new(0.5)).unwrap();
        let expected = values.len() - train_size(values.len(), 0.66);
        prop_assert_eq!(result.predictions.len(), expected);
        prop_assert_eq!(result.actual.as_slice(), &values[values.len() - expected..]);
        prop_assert!(result.mse >= 0.0);
    }

    #[test]
    fn grid_search_best_is_minimum(values in valid_values_strategy(30, 45)) {
        let ts = make_ts(&values);
        let config = GridSearchConfig {
            grid: OrderGrid::new(vec![0, 1], vec![0, 1], vec![0, 1]),
            ..GridSearchConfig::default()
        };
        let result = evaluate_models(&ts, &config).unwrap();
        prop_assert_eq!(result.evaluations.len(), 8);

        let min = result.scored().map(|(_, mse)| mse).fold(f64::INFINITY, f64::min);
        if let Some((_, best)) = result.best {
            prop_assert_eq!(best, min);
        }
    }
}
