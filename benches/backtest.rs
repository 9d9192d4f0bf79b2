//! Benchmarks for ARIMA fitting, rolling backtests and the order grid.

use chrono::{Duration, TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sensor_forecast::core::TimeSeries;
use sensor_forecast::models::arima::{evaluate_models, ARIMASpec, GridSearchConfig, OrderGrid, ARIMA};
use sensor_forecast::models::Forecaster;
use sensor_forecast::seasonality::{seasonal_decompose, DecompositionModel};
use sensor_forecast::utils::evaluate_arima_model;

/// Half-hourly H2S-like readings with a daily cycle and noise.
fn generate_series(n: usize) -> TimeSeries {
    let mut rng = StdRng::seed_from_u64(42);
    let base = Utc.with_ymd_and_hms(2019, 5, 1, 0, 0, 0).unwrap();
    let timestamps = (0..n)
        .map(|i| base + Duration::minutes(30 * i as i64))
        .collect();
    let values = (0..n)
        .map(|i| {
            2.0 + 0.8 * (2.0 * std::f64::consts::PI * i as f64 / 48.0).sin()
                + rng.gen_range(-0.2..0.2)
        })
        .collect();
    TimeSeries::univariate(timestamps, values).unwrap()
}

fn bench_arima_fit(c: &mut Criterion) {
    let mut group = c.benchmark_group("arima_fit");

    for size in [200, 500, 1000].iter() {
        let ts = generate_series(*size);
        for order in [ARIMASpec::new(1, 1, 1), ARIMASpec::new(4, 1, 2)] {
            group.bench_with_input(BenchmarkId::new(order.to_string(), size), size, |b, _| {
                b.iter(|| {
                    let mut model = ARIMA::from_spec(order);
                    model.fit(black_box(&ts)).unwrap();
                    model.predict(48).unwrap()
                })
            });
        }
    }

    group.finish();
}

fn bench_rolling_backtest(c: &mut Criterion) {
    let mut group = c.benchmark_group("rolling_backtest");
    group.sample_size(10);

    for size in [60, 120].iter() {
        let ts = generate_series(*size);
        group.bench_with_input(BenchmarkId::new("ARIMA(1, 1, 1)", size), size, |b, _| {
            b.iter(|| evaluate_arima_model(black_box(&ts), ARIMASpec::new(1, 1, 1), 0.66).unwrap())
        });
    }

    group.finish();
}

fn bench_grid_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("grid_search");
    group.sample_size(10);

    let ts = generate_series(80);
    let config = GridSearchConfig {
        grid: OrderGrid::new(vec![1, 2], vec![1], vec![0, 1]),
        ..GridSearchConfig::default()
    };
    group.bench_function("4_orders_80_points", |b| {
        b.iter(|| evaluate_models(black_box(&ts), &config).unwrap())
    });

    group.finish();
}

fn bench_decomposition(c: &mut Criterion) {
    let ts = generate_series(48 * 30);
    c.bench_function("seasonal_decompose_additive_48", |b| {
        b.iter(|| seasonal_decompose(black_box(ts.values()), 48, DecompositionModel::Additive).unwrap())
    });
}

criterion_group!(
    benches,
    bench_arima_fit,
    bench_rolling_backtest,
    bench_grid_search,
    bench_decomposition
);
criterion_main!(benches);
