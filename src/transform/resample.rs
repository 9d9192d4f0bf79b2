//! Resampling irregular readings onto a fixed time grid.

use crate::core::{MissingValuePolicy, Reading, TimeSeries};
use crate::error::{ForecastError, Result};
use chrono::{DateTime, Duration, NaiveTime, Utc};

/// Midnight UTC of the day `t` falls on.
fn start_of_day(t: DateTime<Utc>) -> DateTime<Utc> {
    t.date_naive().and_time(NaiveTime::MIN).and_utc()
}

/// Bucket `readings` into bins of width `interval` and average each bin.
///
/// Bins are left-closed and labelled by their left edge. The grid is
/// anchored at midnight UTC of the earliest reading's day and spans every
/// bin from the earliest to the latest reading. Missing readings are
/// ignored; a bin with no valid reading holds NaN.
///
/// # Example
/// ```
/// use sensor_forecast::core::Reading;
/// use sensor_forecast::transform::resample_mean;
/// use chrono::{Duration, TimeZone, Utc};
///
/// let t = |h, m| Utc.with_ymd_and_hms(2019, 5, 1, h, m, 0).unwrap();
/// let readings = vec![
///     Reading::new(t(0, 5), 1.0),
///     Reading::new(t(0, 20), 3.0),
///     Reading::new(t(1, 10), 5.0),
/// ];
/// let series = resample_mean(&readings, Duration::minutes(30)).unwrap();
///
/// assert_eq!(series.timestamps()[0], t(0, 0));
/// assert_eq!(series.values()[0], 2.0);
/// assert!(series.values()[1].is_nan());
/// assert_eq!(series.values()[2], 5.0);
/// ```
pub fn resample_mean(readings: &[Reading], interval: Duration) -> Result<TimeSeries> {
    let step = interval.num_milliseconds();
    if step <= 0 {
        return Err(ForecastError::InvalidParameter(format!(
            "resample interval must be positive, got {interval}"
        )));
    }

    let first = readings
        .iter()
        .map(|r| r.timestamp)
        .min()
        .ok_or(ForecastError::EmptyData)?;
    let last = readings
        .iter()
        .map(|r| r.timestamp)
        .max()
        .ok_or(ForecastError::EmptyData)?;

    let origin = start_of_day(first);
    let bin_of = |t: DateTime<Utc>| ((t - origin).num_milliseconds() / step) as usize;
    let first_bin = bin_of(first);
    let n_bins = bin_of(last) - first_bin + 1;

    let mut sums = vec![0.0; n_bins];
    let mut counts = vec![0usize; n_bins];
    for reading in readings.iter().filter(|r| !r.is_missing()) {
        let bin = bin_of(reading.timestamp) - first_bin;
        sums[bin] += reading.value;
        counts[bin] += 1;
    }

    let timestamps = (0..n_bins)
        .map(|k| origin + Duration::milliseconds(step * (first_bin + k) as i64))
        .collect();
    let values = sums
        .iter()
        .zip(&counts)
        .map(|(&sum, &count)| {
            if count == 0 {
                f64::NAN
            } else {
                sum / count as f64
            }
        })
        .collect();

    Ok(TimeSeries::univariate(timestamps, values)?.with_frequency(interval))
}

/// Carry the last valid value forward over gaps.
///
/// Leading gaps have nothing to carry and are dropped.
pub fn forward_fill(series: &TimeSeries) -> Result<TimeSeries> {
    let filled = series.sanitized(MissingValuePolicy::ForwardFill)?;
    let start = filled
        .values()
        .iter()
        .position(|v| v.is_finite())
        .unwrap_or(filled.len());
    filled.slice(start, filled.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(day: u32, h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2019, 5, day, h, m, 0).unwrap()
    }

    #[test]
    fn bins_are_aligned_to_midnight() {
        let readings = vec![Reading::new(at(1, 7, 47), 4.0), Reading::new(at(1, 8, 29), 6.0)];
        let series = resample_mean(&readings, Duration::minutes(30)).unwrap();

        assert_eq!(series.timestamps(), &[at(1, 7, 30), at(1, 8, 0)]);
        assert_eq!(series.values(), &[4.0, 6.0]);
        assert_eq!(series.frequency(), Some(Duration::minutes(30)));
    }

    #[test]
    fn bins_are_left_closed() {
        let readings = vec![
            Reading::new(at(1, 0, 0), 1.0),
            Reading::new(at(1, 0, 29), 2.0),
            Reading::new(at(1, 0, 30), 10.0),
        ];
        let series = resample_mean(&readings, Duration::minutes(30)).unwrap();
        assert_eq!(series.values(), &[1.5, 10.0]);
    }

    #[test]
    fn unsorted_input_and_missing_readings() {
        let readings = vec![
            Reading::new(at(2, 1, 15), 8.0),
            Reading::new(at(2, 0, 10), f64::NAN),
            Reading::new(at(2, 0, 5), 2.0),
        ];
        let series = resample_mean(&readings, Duration::minutes(30)).unwrap();

        assert_eq!(series.len(), 3);
        assert_eq!(series.timestamps()[0], at(2, 0, 0));
        assert_eq!(series.values()[0], 2.0);
        assert!(series.values()[1].is_nan());
        assert_eq!(series.values()[2], 8.0);
    }

    #[test]
    fn resample_rejects_bad_input() {
        assert!(matches!(
            resample_mean(&[], Duration::minutes(30)),
            Err(ForecastError::EmptyData)
        ));
        let readings = vec![Reading::new(at(1, 0, 0), 1.0)];
        assert!(matches!(
            resample_mean(&readings, Duration::zero()),
            Err(ForecastError::InvalidParameter(_))
        ));
    }

    #[test]
    fn forward_fill_carries_and_drops_leading_gaps() {
        let timestamps = (0..5).map(|i| at(1, 0, 0) + Duration::minutes(30 * i)).collect();
        let series = TimeSeries::univariate(
            timestamps,
            vec![f64::NAN, 1.0, f64::NAN, f64::NAN, 4.0],
        )
        .unwrap();

        let filled = forward_fill(&series).unwrap();
        assert_eq!(filled.values(), &[1.0, 1.0, 1.0, 4.0]);
        assert_eq!(filled.timestamps()[0], at(1, 0, 30));
    }

    #[test]
    fn forward_fill_of_all_missing_is_empty() {
        let timestamps = (0..3).map(|i| at(1, 0, 0) + Duration::minutes(30 * i)).collect();
        let series = TimeSeries::univariate(timestamps, vec![f64::NAN; 3]).unwrap();
        assert!(forward_fill(&series).unwrap().is_empty());
    }
}
