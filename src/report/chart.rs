//! Time-indexed line charts rendered as standalone SVG documents.

use crate::core::{Forecast, TimeSeries};
use crate::error::DataError;
use crate::seasonality::Decomposition;
use chrono::{DateTime, Utc};
use std::fmt::Write;
use std::path::Path;

/// 12 × 5 inches at 100 dpi.
pub const DEFAULT_WIDTH: u32 = 1200;
pub const DEFAULT_HEIGHT: u32 = 500;

const PALETTE: [&str; 4] = ["#1f77b4", "#ff7f0e", "#2ca02c", "#d62728"];
const MARGIN_LEFT: f64 = 70.0;
const MARGIN_RIGHT: f64 = 20.0;
const MARGIN_TOP: f64 = 40.0;
const MARGIN_BOTTOM: f64 = 30.0;
const PANEL_GAP: f64 = 30.0;
const Y_TICKS: usize = 5;
const X_TICKS: usize = 6;

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[derive(Debug, Clone)]
struct Line {
    label: String,
    color: String,
    points: Vec<(DateTime<Utc>, f64)>,
}

#[derive(Debug, Clone)]
struct Band {
    color: String,
    opacity: f64,
    points: Vec<(DateTime<Utc>, f64, f64)>,
}

#[derive(Debug, Clone, Default)]
struct Panel {
    title: Option<String>,
    lines: Vec<Line>,
    band: Option<Band>,
}

impl Panel {
    fn x_range(&self) -> Option<(i64, i64)> {
        let line_times = self.lines.iter().flat_map(|l| l.points.iter().map(|p| p.0));
        let band_times = self.band.iter().flat_map(|b| b.points.iter().map(|p| p.0));
        let times: Vec<i64> = line_times.chain(band_times).map(|t| t.timestamp()).collect();
        Some((*times.iter().min()?, *times.iter().max()?))
    }

    fn y_range(&self) -> Option<(f64, f64)> {
        let line_values = self.lines.iter().flat_map(|l| l.points.iter().map(|p| p.1));
        let band_values = self
            .band
            .iter()
            .flat_map(|b| b.points.iter().flat_map(|p| [p.1, p.2]));
        let (lo, hi) = line_values
            .chain(band_values)
            .filter(|v| v.is_finite())
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
        if lo > hi {
            return None;
        }
        let pad = if hi > lo { (hi - lo) * 0.05 } else { lo.abs().max(1.0) * 0.5 };
        Some((lo - pad, hi + pad))
    }
}

/// Maps data coordinates into one panel's plot area.
struct Frame {
    left: f64,
    top: f64,
    width: f64,
    height: f64,
    x_range: (i64, i64),
    y_range: (f64, f64),
}

impl Frame {
    fn x(&self, t: DateTime<Utc>) -> f64 {
        let (lo, hi) = self.x_range;
        let span = (hi - lo).max(1) as f64;
        self.left + (t.timestamp() - lo) as f64 / span * self.width
    }

    fn y(&self, v: f64) -> f64 {
        let (lo, hi) = self.y_range;
        self.top + (hi - v) / (hi - lo) * self.height
    }
}

/// A chart of one or more stacked panels sharing a title, each holding
/// labelled line series and an optional shaded band.
///
/// # Example
/// ```
/// use sensor_forecast::report::LineChart;
/// use chrono::{Duration, TimeZone, Utc};
///
/// let base = Utc.with_ymd_and_hms(2019, 5, 1, 0, 0, 0).unwrap();
/// let times: Vec<_> = (0..4).map(|i| base + Duration::minutes(30 * i)).collect();
///
/// let svg = LineChart::new("H2S")
///     .line("reading", &times, &[0.1, 0.3, f64::NAN, 0.2])
///     .render();
/// assert!(svg.starts_with("<?xml"));
/// assert_eq!(svg.matches("<polyline").count(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct LineChart {
    title: String,
    width: u32,
    height: u32,
    panels: Vec<Panel>,
}

impl LineChart {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            panels: vec![Panel::default()],
        }
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    fn current(&mut self) -> &mut Panel {
        if self.panels.is_empty() {
            self.panels.push(Panel::default());
        }
        let last = self.panels.len() - 1;
        &mut self.panels[last]
    }

    /// Start a new panel below the current one. The first call names the
    /// initial panel instead if it is still empty.
    pub fn panel(mut self, title: impl Into<String>) -> Self {
        let title = Some(title.into());
        let current = self.current();
        if current.lines.is_empty() && current.band.is_none() && current.title.is_none() {
            current.title = title;
        } else {
            self.panels.push(Panel {
                title,
                ..Panel::default()
            });
        }
        self
    }

    /// Add a line to the current panel; NaN values break the line.
    pub fn line(mut self, label: impl Into<String>, times: &[DateTime<Utc>], values: &[f64]) -> Self {
        let panel = self.current();
        let color = PALETTE[panel.lines.len() % PALETTE.len()].to_string();
        panel.lines.push(Line {
            label: label.into(),
            color,
            points: times.iter().copied().zip(values.iter().copied()).collect(),
        });
        self
    }

    /// Shade the area between `lower` and `upper` in the current panel.
    pub fn band(mut self, times: &[DateTime<Utc>], lower: &[f64], upper: &[f64]) -> Self {
        let points = times
            .iter()
            .zip(lower.iter().zip(upper))
            .map(|(&t, (&lo, &hi))| (t, lo, hi))
            .collect();
        self.current().band = Some(Band {
            color: "#000000".to_string(),
            opacity: 0.15,
            points,
        });
        self
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn panel_count(&self) -> usize {
        self.panels.len()
    }

    /// Render the chart as an SVG document.
    pub fn render(&self) -> String {
        let mut svg = String::new();
        // Writing into a String cannot fail
        let _ = self.render_into(&mut svg);
        svg
    }

    fn render_into(&self, svg: &mut String) -> std::fmt::Result {
        let (w, h) = (self.width as f64, self.height as f64);
        writeln!(svg, "<?xml version=\"1.0\" encoding=\"UTF-8\"?>")?;
        writeln!(
            svg,
            "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{}\" height=\"{}\" viewBox=\"0 0 {} {}\">",
            self.width, self.height, self.width, self.height
        )?;
        writeln!(svg, "  <style>")?;
        writeln!(svg, "    text {{ font-family: sans-serif; fill: #333; }}")?;
        writeln!(svg, "    .tick {{ font-size: 10px; }}")?;
        writeln!(svg, "    .legend {{ font-size: 8pt; }}")?;
        writeln!(svg, "  </style>")?;
        writeln!(svg, "  <rect width=\"100%\" height=\"100%\" fill=\"#ffffff\"/>")?;
        writeln!(
            svg,
            "  <text x=\"{:.1}\" y=\"24\" text-anchor=\"middle\" font-size=\"16\">{}</text>",
            w / 2.0,
            escape(&self.title)
        )?;

        let n = self.panels.len().max(1) as f64;
        let usable = h - MARGIN_TOP - MARGIN_BOTTOM - PANEL_GAP * (n - 1.0);
        let panel_height = (usable / n).max(10.0);

        for (i, panel) in self.panels.iter().enumerate() {
            let top = MARGIN_TOP + i as f64 * (panel_height + PANEL_GAP);
            self.render_panel(svg, panel, top, panel_height)?;
        }

        writeln!(svg, "</svg>")
    }

    fn render_panel(&self, svg: &mut String, panel: &Panel, top: f64, height: f64) -> std::fmt::Result {
        let left = MARGIN_LEFT;
        let width = self.width as f64 - MARGIN_LEFT - MARGIN_RIGHT;

        writeln!(
            svg,
            "  <rect x=\"{left:.1}\" y=\"{top:.1}\" width=\"{width:.1}\" height=\"{height:.1}\" fill=\"none\" stroke=\"#333\"/>"
        )?;
        if let Some(title) = &panel.title {
            writeln!(
                svg,
                "  <text x=\"{:.1}\" y=\"{:.1}\" text-anchor=\"middle\" transform=\"rotate(-90 {:.1} {:.1})\" font-size=\"12\">{}</text>",
                18.0,
                top + height / 2.0,
                18.0,
                top + height / 2.0,
                escape(title)
            )?;
        }

        let (Some(x_range), Some(y_range)) = (panel.x_range(), panel.y_range()) else {
            return Ok(());
        };
        let frame = Frame {
            left,
            top,
            width,
            height,
            x_range,
            y_range,
        };

        for k in 0..Y_TICKS {
            let v = y_range.0 + (y_range.1 - y_range.0) * k as f64 / (Y_TICKS - 1) as f64;
            writeln!(
                svg,
                "  <text class=\"tick\" x=\"{:.1}\" y=\"{:.1}\" text-anchor=\"end\">{:.3}</text>",
                left - 6.0,
                frame.y(v) + 3.0,
                v
            )?;
        }
        for k in 0..X_TICKS {
            let secs = x_range.0 + (x_range.1 - x_range.0) * k as i64 / (X_TICKS - 1) as i64;
            if let Some(t) = DateTime::from_timestamp(secs, 0) {
                writeln!(
                    svg,
                    "  <text class=\"tick\" x=\"{:.1}\" y=\"{:.1}\" text-anchor=\"middle\">{}</text>",
                    frame.x(t),
                    top + height + 14.0,
                    t.format("%Y-%m-%d")
                )?;
            }
        }

        if let Some(band) = &panel.band {
            let finite: Vec<_> = band
                .points
                .iter()
                .filter(|(_, lo, hi)| lo.is_finite() && hi.is_finite())
                .collect();
            if !finite.is_empty() {
                let upper = finite.iter().map(|(t, _, hi)| (frame.x(*t), frame.y(*hi)));
                let lower = finite.iter().rev().map(|(t, lo, _)| (frame.x(*t), frame.y(*lo)));
                let points: Vec<String> = upper
                    .chain(lower)
                    .map(|(x, y)| format!("{x:.1},{y:.1}"))
                    .collect();
                writeln!(
                    svg,
                    "  <polygon points=\"{}\" fill=\"{}\" fill-opacity=\"{}\" stroke=\"none\"/>",
                    points.join(" "),
                    band.color,
                    band.opacity
                )?;
            }
        }

        for line in &panel.lines {
            for segment in line.points.split(|(_, v)| !v.is_finite()) {
                if segment.is_empty() {
                    continue;
                }
                let points: Vec<String> = segment
                    .iter()
                    .map(|(t, v)| format!("{:.1},{:.1}", frame.x(*t), frame.y(*v)))
                    .collect();
                writeln!(
                    svg,
                    "  <polyline points=\"{}\" fill=\"none\" stroke=\"{}\" stroke-width=\"1.5\"/>",
                    points.join(" "),
                    line.color
                )?;
            }
        }

        self.render_legend(svg, panel, left, top)
    }

    /// Legend boxed in the upper-left corner of the plot area.
    fn render_legend(&self, svg: &mut String, panel: &Panel, left: f64, top: f64) -> std::fmt::Result {
        if panel.lines.is_empty() {
            return Ok(());
        }
        let x = left + 8.0;
        let longest = panel.lines.iter().map(|l| l.label.len()).max().unwrap_or(0) as f64;
        writeln!(
            svg,
            "  <rect x=\"{:.1}\" y=\"{:.1}\" width=\"{:.1}\" height=\"{:.1}\" fill=\"#ffffff\" fill-opacity=\"0.8\" stroke=\"#ccc\"/>",
            x,
            top + 8.0,
            36.0 + longest * 6.0,
            8.0 + panel.lines.len() as f64 * 14.0
        )?;
        for (i, line) in panel.lines.iter().enumerate() {
            let y = top + 20.0 + i as f64 * 14.0;
            writeln!(
                svg,
                "  <line x1=\"{:.1}\" y1=\"{:.1}\" x2=\"{:.1}\" y2=\"{:.1}\" stroke=\"{}\" stroke-width=\"2\"/>",
                x + 6.0,
                y - 3.0,
                x + 24.0,
                y - 3.0,
                line.color
            )?;
            writeln!(
                svg,
                "  <text class=\"legend\" x=\"{:.1}\" y=\"{:.1}\">{}</text>",
                x + 30.0,
                y,
                escape(&line.label)
            )?;
        }
        Ok(())
    }

    /// Render and write to `path`.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), DataError> {
        std::fs::write(path, self.render())?;
        Ok(())
    }
}

/// Training series, validation actuals and the forecast with its interval.
pub fn forecast_chart(train: &TimeSeries, actual: &TimeSeries, forecast: &Forecast) -> LineChart {
    let horizon = forecast.horizon().min(actual.len());
    let times = &actual.timestamps()[..horizon];

    let mut chart = LineChart::new("Forecast vs Actuals")
        .line("training", train.timestamps(), train.values())
        .line("actual", actual.timestamps(), actual.values())
        .line("forecast", times, &forecast.primary()[..horizon]);
    if let (Some(lower), Some(upper)) = (forecast.lower(), forecast.upper()) {
        chart = chart.band(times, &lower[..horizon], &upper[..horizon]);
    }
    chart
}

/// Four stacked panels: observed, trend, seasonal and residual.
pub fn decomposition_chart(series: &TimeSeries, parts: &Decomposition) -> LineChart {
    let title = match series.label() {
        Some(label) => format!("{label} ({} decomposition)", parts.model),
        None => format!("{} decomposition", parts.model),
    };
    let times = series.timestamps();

    LineChart::new(title)
        .with_size(DEFAULT_WIDTH, 800)
        .panel("Observed")
        .line("observed", times, &parts.observed)
        .panel("Trend")
        .line("trend", times, &parts.trend)
        .panel("Seasonal")
        .line("seasonal", times, &parts.seasonal)
        .panel("Resid")
        .line("resid", times, &parts.resid)
}
