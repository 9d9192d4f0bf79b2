//! CSV telemetry reader.
//!
//! Expects a header row with one timestamp column and one numeric column
//! per gas channel. Other columns may hold anything as long as they are not
//! requested as a channel:
//!
//! ```text
//! datetime,H2S,CO,LEL,O2
//! 2019-05-01 00:00:07,0.0,1.2,0,20.9
//! ```

use crate::core::Reading;
use crate::error::DataError;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use std::io;
use std::path::Path;
use tracing::{debug, warn};

/// Default name of the timestamp column.
pub const DEFAULT_TIMESTAMP_COLUMN: &str = "datetime";

const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

/// Parse a timestamp in any of the accepted layouts; naive times are UTC.
///
/// ```
/// use sensor_forecast::io::parse_timestamp;
///
/// assert!(parse_timestamp("2019-05-01T12:00:00+02:00").is_some());
/// assert!(parse_timestamp("2019-05-01 12:00:00.250").is_some());
/// assert!(parse_timestamp("2019-05-01").is_some());
/// assert!(parse_timestamp("yesterday").is_none());
/// ```
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(t) = DateTime::parse_from_rfc3339(raw) {
        return Some(t.with_timezone(&Utc));
    }
    for format in NAIVE_FORMATS {
        if let Ok(t) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(t.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|t| t.and_utc())
}

/// Empty cells and NaN markers are missing readings.
fn parse_cell(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    if raw.is_empty() || raw.eq_ignore_ascii_case("nan") || raw.eq_ignore_ascii_case("na") {
        return Some(f64::NAN);
    }
    raw.parse().ok()
}

/// Reads telemetry tables from CSV.
#[derive(Debug, Clone)]
pub struct TelemetryReader {
    timestamp_column: String,
}

impl Default for TelemetryReader {
    fn default() -> Self {
        Self::new()
    }
}

impl TelemetryReader {
    pub fn new() -> Self {
        Self {
            timestamp_column: DEFAULT_TIMESTAMP_COLUMN.to_string(),
        }
    }

    pub fn with_timestamp_column(mut self, column: impl Into<String>) -> Self {
        self.timestamp_column = column.into();
        self
    }

    /// Read a CSV file from disk.
    pub fn read_path<P: AsRef<Path>>(&self, path: P) -> Result<TelemetryFrame, DataError> {
        let path = path.as_ref();
        debug!(path = %path.display(), "reading telemetry");
        let file = std::fs::File::open(path)?;
        self.read(file)
    }

    /// Read CSV from any byte source.
    pub fn read<R: io::Read>(&self, source: R) -> Result<TelemetryFrame, DataError> {
        let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(source);
        let headers = reader.headers()?.clone();

        let ts_idx = headers
            .iter()
            .position(|h| h == self.timestamp_column)
            .ok_or_else(|| DataError::MissingColumn(self.timestamp_column.clone()))?;
        let channels: Vec<(usize, String)> = headers
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != ts_idx)
            .map(|(i, h)| (i, h.to_string()))
            .collect();

        let mut rows: Vec<(DateTime<Utc>, u64, Vec<String>)> = Vec::new();
        for record in reader.records() {
            let record = record?;
            let line = record.position().map_or(0, |p| p.line());

            let raw_ts = record.get(ts_idx).unwrap_or_default();
            let timestamp = parse_timestamp(raw_ts).ok_or_else(|| DataError::Timestamp {
                line,
                value: raw_ts.to_string(),
            })?;

            let cells = channels
                .iter()
                .map(|(idx, _)| record.get(*idx).unwrap_or_default().to_string())
                .collect();
            rows.push((timestamp, line, cells));
        }

        if rows.windows(2).any(|w| w[1].0 < w[0].0) {
            warn!("telemetry rows are out of order, sorting by timestamp");
            rows.sort_by_key(|(t, _, _)| *t);
        }

        let mut columns = vec![Vec::with_capacity(rows.len()); channels.len()];
        let mut timestamps = Vec::with_capacity(rows.len());
        let mut lines = Vec::with_capacity(rows.len());
        for (timestamp, line, cells) in rows {
            timestamps.push(timestamp);
            lines.push(line);
            for (column, cell) in columns.iter_mut().zip(cells) {
                column.push(cell);
            }
        }

        debug!(rows = timestamps.len(), channels = channels.len(), "telemetry parsed");
        Ok(TelemetryFrame {
            timestamps,
            lines,
            channels: channels.into_iter().map(|(_, name)| name).collect(),
            columns,
        })
    }
}

/// Parsed telemetry: timestamps in ascending order and the raw cells of every
/// other column. Duplicate timestamps are kept.
///
/// Cells are only parsed as numbers when their channel is requested, so text
/// columns such as device identifiers can sit next to the gas channels.
#[derive(Debug, Clone)]
pub struct TelemetryFrame {
    timestamps: Vec<DateTime<Utc>>,
    /// Source line of each row, for error messages.
    lines: Vec<u64>,
    channels: Vec<String>,
    columns: Vec<Vec<String>>,
}

impl TelemetryFrame {
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn timestamps(&self) -> &[DateTime<Utc>] {
        &self.timestamps
    }

    /// Column names other than the timestamp, in header order.
    pub fn channels(&self) -> &[String] {
        &self.channels
    }

    /// Readings of one channel, including missing ones.
    pub fn channel(&self, name: &str) -> Result<Vec<Reading>, DataError> {
        let idx = self
            .channels
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| DataError::MissingColumn(name.to_string()))?;

        self.timestamps
            .iter()
            .zip(&self.lines)
            .zip(&self.columns[idx])
            .map(|((&t, &line), raw)| {
                let value = parse_cell(raw).ok_or_else(|| DataError::Number {
                    line,
                    column: name.to_string(),
                    value: raw.clone(),
                })?;
                Ok(Reading::new(t, value))
            })
            .collect()
    }
}
