//! End-to-end forecasting pipeline.
//!
//! 1. Read telemetry and keep the target channel before the cutoff
//! 2. Resample onto a fixed grid, forward-fill gaps, optionally clip outliers
//! 3. Split into training and validation at the configured instant
//! 4. Optionally grid search ARIMA orders on the training part
//! 5. Fit the chosen model and forecast the validation period
//! 6. Decompose the training part
//! 7. Write the forecast table and both charts

use crate::config::{ConfigError, ForecastConfig};
use crate::core::{Forecast, TimeSeries};
use crate::error::{DataError, ForecastError};
use crate::io::{write_forecast_csv, write_grid_csv, TelemetryReader};
use crate::models::arima::{evaluate_models, ARIMASpec, GridSearchResult};
use crate::models::ModelKind;
use crate::report::{decomposition_chart, forecast_chart};
use crate::seasonality::{seasonal_decompose, Decomposition};
use crate::transform::{clip_quantiles, forward_fill, resample_mean};
use crate::utils::metrics::{calculate_metrics, AccuracyMetrics};
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use thiserror::Error;
use tracing::{info, info_span, warn};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Forecast(#[from] ForecastError),

    #[error(transparent)]
    Data(#[from] DataError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("no training observations before {0}")]
    EmptyTraining(DateTime<Utc>),

    #[error("no validation observations from {0}")]
    EmptyValidation(DateTime<Utc>),
}

pub type PipelineResult<T> = std::result::Result<T, PipelineError>;

/// The prepared target series and its split.
#[derive(Debug, Clone)]
pub struct PreparedData {
    /// Resampled, gap-filled series up to the cutoff.
    pub series: TimeSeries,
    pub train: TimeSeries,
    pub validation: TimeSeries,
}

/// What a full run produced.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub channel: String,
    /// Forecaster name as reported by the model.
    pub model: String,
    /// ARIMA order used, `None` for the smoothing models.
    pub order: Option<ARIMASpec>,
    pub train_len: usize,
    pub validation_len: usize,
    pub forecast: Forecast,
    pub metrics: AccuracyMetrics,
    pub grid: Option<GridSearchResult>,
    pub decomposition: Option<Decomposition>,
    /// Files written, in order.
    pub outputs: Vec<PathBuf>,
}

pub struct Pipeline {
    config: ForecastConfig,
}

impl Pipeline {
    pub fn new(config: ForecastConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ForecastConfig {
        &self.config
    }

    /// Steps 1-3: load, resample, fill, clip and split.
    pub fn prepare(&self) -> PipelineResult<PreparedData> {
        let data = &self.config.data;
        let _span = info_span!("prepare", channel = %data.target).entered();

        let frame = TelemetryReader::new()
            .with_timestamp_column(data.timestamp_column.clone())
            .read_path(&data.path)?;
        let readings: Vec<_> = frame
            .channel(&data.target)?
            .into_iter()
            .filter(|r| r.timestamp < data.cutoff)
            .collect();
        if readings.iter().all(|r| r.is_missing()) {
            return Err(DataError::NoReadings(data.target.clone()).into());
        }
        info!(rows = frame.len(), kept = readings.len(), "telemetry loaded");

        let resampled = resample_mean(&readings, data.resample_interval())?;
        let mut series = forward_fill(&resampled)?.with_label(data.target.clone());
        let gaps = resampled.values().iter().filter(|v| v.is_nan()).count();
        if gaps > 0 {
            warn!(gaps, "filled empty buckets with the previous value");
        }

        if let Some(band) = data.clip {
            let before = series.len();
            series = clip_quantiles(&series, band.lower, band.upper)?;
            info!(dropped = before - series.len(), "clipped outliers");
        }

        let at = self.config.split.validation_start;
        let (train, validation) = series.split_at_time(at);
        if train.is_empty() {
            return Err(PipelineError::EmptyTraining(at));
        }
        if validation.is_empty() {
            return Err(PipelineError::EmptyValidation(at));
        }
        info!(
            train = train.len(),
            validation = validation.len(),
            "split at {}",
            at
        );

        Ok(PreparedData {
            series,
            train,
            validation,
        })
    }

    fn ensure_output_dir(&self) -> PipelineResult<()> {
        std::fs::create_dir_all(&self.config.output.directory).map_err(DataError::from)?;
        Ok(())
    }

    fn search(&self, train: &TimeSeries) -> PipelineResult<(GridSearchResult, PathBuf)> {
        let result = evaluate_models(train, &self.config.grid.search_config())?;
        self.ensure_output_dir()?;
        let path = self.config.output.path(&self.config.output.grid_csv);
        write_grid_csv(&path, &result)?;
        Ok((result, path))
    }

    /// Grid search ARIMA orders on the training part and write the table.
    pub fn grid_search(&self) -> PipelineResult<GridSearchResult> {
        let prepared = self.prepare()?;
        let (result, path) = self.search(&prepared.train)?;
        info!(path = %path.display(), "grid search table written");
        Ok(result)
    }

    fn decompose_series(&self, train: &TimeSeries) -> PipelineResult<(Decomposition, PathBuf)> {
        let settings = &self.config.decomposition;
        let parts = seasonal_decompose(train.values(), settings.period, settings.model)?;
        info!(
            period = settings.period,
            model = %settings.model,
            strength = parts.seasonal_strength(),
            "decomposed training series"
        );

        self.ensure_output_dir()?;
        let path = self.config.output.path(&self.config.output.decomposition_chart);
        decomposition_chart(train, &parts).save(&path)?;
        Ok((parts, path))
    }

    /// Decompose the training part and write its chart.
    pub fn decompose(&self) -> PipelineResult<Decomposition> {
        let prepared = self.prepare()?;
        let (parts, _) = self.decompose_series(&prepared.train)?;
        Ok(parts)
    }

    /// Run every stage and write all outputs.
    pub fn run(&self) -> PipelineResult<RunSummary> {
        let _span = info_span!("pipeline", channel = %self.config.data.target).entered();
        let prepared = self.prepare()?;
        let mut outputs = Vec::new();

        let kind = self.config.model.kind;
        let grid = match (self.config.grid.enabled, kind) {
            (false, _) => None,
            (true, ModelKind::Arima) => {
                let (result, path) = self.search(&prepared.train)?;
                outputs.push(path);
                Some(result)
            }
            (true, _) => {
                warn!(model = %kind, "order search only applies to ARIMA, skipping it");
                None
            }
        };

        let order = grid
            .as_ref()
            .and_then(GridSearchResult::best_order)
            .unwrap_or(self.config.model.order);
        let mut model = kind.build(order);
        model.fit(&prepared.train)?;

        let horizon = prepared.validation.len();
        let forecast = model.predict_with_intervals(horizon, self.config.model.interval_level)?;
        let interval = forecast.lower().zip(forecast.upper());
        let metrics = calculate_metrics(prepared.validation.values(), forecast.primary(), interval)?;
        info!(
            model = model.name(),
            horizon,
            mse = metrics.mse,
            mae = metrics.mae,
            "forecast scored"
        );

        self.ensure_output_dir()?;
        let output = &self.config.output;
        let csv_path = output.path(&output.forecast_csv);
        write_forecast_csv(&csv_path, &prepared.validation, &forecast)?;
        outputs.push(csv_path);

        let chart_path = output.path(&output.forecast_chart);
        forecast_chart(&prepared.train, &prepared.validation, &forecast).save(&chart_path)?;
        outputs.push(chart_path);

        let decomposition = if self.config.decomposition.enabled {
            match self.decompose_series(&prepared.train) {
                Ok((parts, path)) => {
                    outputs.push(path);
                    Some(parts)
                }
                Err(PipelineError::Forecast(err)) => {
                    warn!(error = %err, "skipping decomposition");
                    None
                }
                Err(err) => return Err(err),
            }
        } else {
            None
        };

        Ok(RunSummary {
            channel: self.config.data.target.clone(),
            model: model.name().to_string(),
            order: (kind == ModelKind::Arima).then_some(order),
            train_len: prepared.train.len(),
            validation_len: horizon,
            forecast,
            metrics,
            grid,
            decomposition,
            outputs,
        })
    }
}
