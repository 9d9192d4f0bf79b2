//! Exhaustive ARIMA order search scored by rolling one-step backtests.

use crate::core::TimeSeries;
use crate::error::{ForecastError, Result};
use crate::models::arima::model::ARIMASpec;
use crate::utils::backtest::{evaluate_arima_model, DEFAULT_TRAIN_FRACTION};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, info_span};

/// Candidate values for each order component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderGrid {
    pub p_values: Vec<usize>,
    pub d_values: Vec<usize>,
    pub q_values: Vec<usize>,
}

impl Default for OrderGrid {
    fn default() -> Self {
        Self {
            p_values: vec![4, 6, 8, 10],
            d_values: vec![1, 2],
            q_values: vec![0, 1, 2],
        }
    }
}

impl OrderGrid {
    pub fn new(p_values: Vec<usize>, d_values: Vec<usize>, q_values: Vec<usize>) -> Self {
        Self {
            p_values,
            d_values,
            q_values,
        }
    }

    /// Every order, p outermost and q innermost.
    pub fn orders(&self) -> impl Iterator<Item = ARIMASpec> + '_ {
        self.p_values.iter().flat_map(move |&p| {
            self.d_values.iter().flat_map(move |&d| {
                self.q_values.iter().map(move |&q| ARIMASpec::new(p, d, q))
            })
        })
    }

    pub fn len(&self) -> usize {
        self.p_values.len() * self.d_values.len() * self.q_values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Grid search settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridSearchConfig {
    #[serde(flatten)]
    pub grid: OrderGrid,
    /// Share of the series used as initial history in each backtest.
    pub train_fraction: f64,
    /// Round values through `f32` before searching.
    pub single_precision: bool,
}

impl Default for GridSearchConfig {
    fn default() -> Self {
        Self {
            grid: OrderGrid::default(),
            train_fraction: DEFAULT_TRAIN_FRACTION,
            single_precision: true,
        }
    }
}

/// What happened when one order was backtested.
#[derive(Debug, Clone, PartialEq)]
pub enum OrderOutcome {
    Scored { mse: f64 },
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderEvaluation {
    pub order: ARIMASpec,
    pub outcome: OrderOutcome,
}

impl OrderEvaluation {
    pub fn mse(&self) -> Option<f64> {
        match self.outcome {
            OrderOutcome::Scored { mse } => Some(mse),
            OrderOutcome::Failed { .. } => None,
        }
    }
}

/// Outcome of a full grid search.
#[derive(Debug, Clone, Default)]
pub struct GridSearchResult {
    /// One entry per order, in search order.
    pub evaluations: Vec<OrderEvaluation>,
    /// Order with the smallest MSE, if any order could be scored.
    pub best: Option<(ARIMASpec, f64)>,
}

impl GridSearchResult {
    pub fn scored(&self) -> impl Iterator<Item = (ARIMASpec, f64)> + '_ {
        self.evaluations
            .iter()
            .filter_map(|e| e.mse().map(|mse| (e.order, mse)))
    }

    pub fn failures(&self) -> impl Iterator<Item = &OrderEvaluation> + '_ {
        self.evaluations.iter().filter(|e| e.mse().is_none())
    }

    pub fn best_order(&self) -> Option<ARIMASpec> {
        self.best.map(|(order, _)| order)
    }
}

/// Whether `candidate` replaces the current best score.
///
/// Strictly smaller only: NaN compares false and equal scores keep the
/// earlier order.
fn improves(candidate: f64, best: f64) -> bool {
    candidate < best
}

/// Backtest every order in the grid and keep the one with the lowest MSE.
///
/// Orders whose fit or forecast fails are recorded and skipped. A NaN score
/// never becomes the best, and ties keep the order seen first.
pub fn evaluate_models(series: &TimeSeries, config: &GridSearchConfig) -> Result<GridSearchResult> {
    if config.grid.is_empty() {
        return Err(ForecastError::InvalidParameter(
            "order grid has no candidates".to_string(),
        ));
    }

    let dataset = if config.single_precision {
        series.map_values(|v| v as f32 as f64)
    } else {
        series.clone()
    };

    let span = info_span!("grid_search", orders = config.grid.len(), n = dataset.len());
    let _enter = span.enter();

    let mut result = GridSearchResult::default();
    let mut best_score = f64::INFINITY;

    for order in config.grid.orders() {
        let outcome = match evaluate_arima_model(&dataset, order, config.train_fraction) {
            Ok(backtest) => {
                let mse = backtest.mse;
                if improves(mse, best_score) {
                    best_score = mse;
                    result.best = Some((order, mse));
                }
                info!("ARIMA{} MSE={:.3}", order, mse);
                OrderOutcome::Scored { mse }
            }
            Err(err) => {
                debug!(%order, error = %err, "skipping order");
                OrderOutcome::Failed {
                    reason: err.to_string(),
                }
            }
        };
        result.evaluations.push(OrderEvaluation { order, outcome });
    }

    match result.best {
        Some((order, mse)) => info!("Best ARIMA{} MSE={:.3}", order, mse),
        None => info!("no ARIMA order could be scored"),
    }

    Ok(result)
}
