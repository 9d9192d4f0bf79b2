//! Pipeline configuration.
//!
//! Loaded from TOML or JSON (chosen by file extension) and overridable from
//! the command line. Defaults reproduce the reference H2S study: readings
//! before July 2019, 30 minute buckets, validation from June 2019 and an
//! ARIMA(1, 1, 1) forecast with a 95% interval.
//!
//! ```toml
//! [data]
//! path = "sensor_data_ts.csv"
//! target = "H2S"
//! cutoff = "2019-07-01T00:00:00Z"
//!
//! [model]
//! kind = "arima"
//! order = { p = 1, d = 1, q = 1 }
//! ```

use crate::models::arima::{ARIMASpec, GridSearchConfig, OrderGrid};
use crate::models::ModelKind;
use crate::seasonality::DecompositionModel;
use crate::utils::backtest::DEFAULT_TRAIN_FRACTION;
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

fn utc_midnight(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 0, 0, 0)
        .single()
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Full pipeline configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    pub data: DataConfig,
    pub split: SplitConfig,
    pub model: ModelConfig,
    pub grid: GridConfig,
    pub decomposition: DecompositionConfig,
    pub output: OutputConfig,
}

/// Where the telemetry comes from and how it is prepared.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// CSV file with a timestamp column and one column per channel.
    pub path: PathBuf,
    pub timestamp_column: String,
    /// Channel to forecast.
    pub target: String,
    /// Readings at or after this instant are discarded.
    pub cutoff: DateTime<Utc>,
    /// Width of the resampling buckets.
    pub resample_minutes: u32,
    /// Optional quantile band; observations outside it are dropped.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clip: Option<QuantileBand>,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("sensor_data_ts.csv"),
            timestamp_column: "datetime".to_string(),
            target: "H2S".to_string(),
            cutoff: utc_midnight(2019, 7, 1),
            resample_minutes: 30,
            clip: None,
        }
    }
}

impl DataConfig {
    pub fn resample_interval(&self) -> Duration {
        Duration::minutes(i64::from(self.resample_minutes))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QuantileBand {
    pub lower: f64,
    pub upper: f64,
}

impl Default for QuantileBand {
    fn default() -> Self {
        Self {
            lower: 0.05,
            upper: 0.95,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitConfig {
    /// First instant of the validation period.
    pub validation_start: DateTime<Utc>,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            validation_start: utc_midnight(2019, 6, 1),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub kind: ModelKind,
    /// Confidence level of the forecast interval.
    pub interval_level: f64,
    /// ARIMA order used when the grid search is disabled or finds nothing.
    pub order: ARIMASpec,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            kind: ModelKind::Arima,
            interval_level: 0.95,
            order: ARIMASpec::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// Run the order search as part of `run` and use its winner.
    pub enabled: bool,
    pub p_values: Vec<usize>,
    pub d_values: Vec<usize>,
    pub q_values: Vec<usize>,
    pub train_fraction: f64,
    pub single_precision: bool,
}

impl Default for GridConfig {
    fn default() -> Self {
        let grid = OrderGrid::default();
        Self {
            enabled: false,
            p_values: grid.p_values,
            d_values: grid.d_values,
            q_values: grid.q_values,
            train_fraction: DEFAULT_TRAIN_FRACTION,
            single_precision: true,
        }
    }
}

impl GridConfig {
    pub fn search_config(&self) -> GridSearchConfig {
        GridSearchConfig {
            grid: OrderGrid::new(
                self.p_values.clone(),
                self.d_values.clone(),
                self.q_values.clone(),
            ),
            train_fraction: self.train_fraction,
            single_precision: self.single_precision,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecompositionConfig {
    pub enabled: bool,
    /// Cycle length in observations.
    pub period: usize,
    pub model: DecompositionModel,
}

impl Default for DecompositionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            period: 365,
            model: DecompositionModel::Additive,
        }
    }
}

/// Output locations; file names are relative to `directory`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub directory: PathBuf,
    pub forecast_csv: String,
    pub forecast_chart: String,
    pub decomposition_chart: String,
    pub grid_csv: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("output"),
            forecast_csv: "forecast.csv".to_string(),
            forecast_chart: "forecast.svg".to_string(),
            decomposition_chart: "decomposition.svg".to_string(),
            grid_csv: "grid_search.csv".to_string(),
        }
    }
}

impl OutputConfig {
    pub fn path(&self, file: &str) -> PathBuf {
        self.directory.join(file)
    }
}

impl ForecastConfig {
    /// Load configuration from a `.toml` or `.json` file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

        let config: Self = match ext {
            "json" => serde_json::from_str(&contents)?,
            "toml" => toml::from_str(&contents)?,
            _ => return Err(ConfigError::UnsupportedFormat(ext.to_string())),
        };
        config.validate()?;
        Ok(config)
    }

    /// Render as TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Reject settings the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.data.target.trim().is_empty() {
            return Err(ConfigError::MissingField("data.target".to_string()));
        }
        if self.data.resample_minutes == 0 {
            return Err(ConfigError::InvalidValue(
                "data.resample_minutes must be > 0".to_string(),
            ));
        }
        if let Some(band) = self.data.clip {
            let in_unit = |q: f64| (0.0..=1.0).contains(&q);
            if !in_unit(band.lower) || !in_unit(band.upper) || band.lower >= band.upper {
                return Err(ConfigError::InvalidValue(format!(
                    "data.clip must satisfy 0 <= lower < upper <= 1, got [{}, {}]",
                    band.lower, band.upper
                )));
            }
        }
        if self.split.validation_start >= self.data.cutoff {
            return Err(ConfigError::InvalidValue(format!(
                "split.validation_start ({}) must be before data.cutoff ({})",
                self.split.validation_start, self.data.cutoff
            )));
        }
        if !(self.model.interval_level > 0.0 && self.model.interval_level < 1.0) {
            return Err(ConfigError::InvalidValue(format!(
                "model.interval_level must be in (0, 1), got {}",
                self.model.interval_level
            )));
        }
        if self.grid.search_config().grid.is_empty() {
            return Err(ConfigError::InvalidValue(
                "grid p_values, d_values and q_values must not be empty".to_string(),
            ));
        }
        if !(self.grid.train_fraction > 0.0 && self.grid.train_fraction < 1.0) {
            return Err(ConfigError::InvalidValue(format!(
                "grid.train_fraction must be in (0, 1), got {}",
                self.grid.train_fraction
            )));
        }
        if self.decomposition.period < 2 {
            return Err(ConfigError::InvalidValue(
                "decomposition.period must be >= 2".to_string(),
            ));
        }
        Ok(())
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Unsupported config format: {0}")]
    UnsupportedFormat(String),

    #[error("Invalid config value: {0}")]
    InvalidValue(String),

    #[error("Missing required field: {0}")]
    MissingField(String),
}
