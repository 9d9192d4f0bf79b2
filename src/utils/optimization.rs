//! Derivative-free minimisation used for model parameter estimation.

use std::cmp::Ordering;

/// Outcome of a Nelder-Mead run.
#[derive(Debug, Clone)]
pub struct NelderMeadResult {
    /// Best point found.
    pub optimal_point: Vec<f64>,
    /// Objective value at the best point.
    pub optimal_value: f64,
    /// Number of iterations performed.
    pub iterations: usize,
    /// Whether the simplex met the tolerance before `max_iter`.
    pub converged: bool,
}

/// Tuning knobs for Nelder-Mead.
#[derive(Debug, Clone)]
pub struct NelderMeadConfig {
    pub max_iter: usize,
    /// Spread of objective values across the simplex that counts as converged.
    pub tolerance: f64,
    /// Reflection coefficient.
    pub alpha: f64,
    /// Expansion coefficient.
    pub gamma: f64,
    /// Contraction coefficient.
    pub rho: f64,
    /// Shrink coefficient.
    pub sigma: f64,
    /// Relative size of the initial simplex.
    pub initial_step: f64,
}

impl Default for NelderMeadConfig {
    fn default() -> Self {
        Self {
            max_iter: 1000,
            tolerance: 1e-8,
            alpha: 1.0,
            gamma: 2.0,
            rho: 0.5,
            sigma: 0.5,
            initial_step: 0.05,
        }
    }
}

/// Box constraints applied after every simplex move.
struct Bounds<'a>(Option<&'a [(f64, f64)]>);

impl Bounds<'_> {
    fn project(&self, mut point: Vec<f64>) -> Vec<f64> {
        if let Some(bounds) = self.0 {
            for (x, (lo, hi)) in point.iter_mut().zip(bounds) {
                *x = x.clamp(*lo, *hi);
            }
        }
        point
    }
}

/// A simplex vertex and its objective value.
#[derive(Clone)]
struct Vertex {
    point: Vec<f64>,
    value: f64,
}

fn by_value(a: &Vertex, b: &Vertex) -> Ordering {
    a.value.partial_cmp(&b.value).unwrap_or(Ordering::Equal)
}

/// `from + coef * (to - from)` component-wise.
fn lerp(from: &[f64], to: &[f64], coef: f64) -> Vec<f64> {
    from.iter().zip(to).map(|(f, t)| f + coef * (t - f)).collect()
}

/// Minimise `objective` starting at `initial`.
///
/// NaN objective values rank as equal to everything, so an objective that
/// returns `f64::MAX` for infeasible points is preferred over NaN.
///
/// # Example
/// ```
/// use sensor_forecast::utils::optimization::{nelder_mead, NelderMeadConfig};
///
/// let result = nelder_mead(
///     |x| (x[0] - 2.0).powi(2) + (x[1] - 3.0).powi(2),
///     &[0.0, 0.0],
///     None,
///     NelderMeadConfig::default(),
/// );
///
/// assert!(result.converged);
/// assert!((result.optimal_point[0] - 2.0).abs() < 0.01);
/// assert!((result.optimal_point[1] - 3.0).abs() < 0.01);
/// ```
pub fn nelder_mead<F>(
    objective: F,
    initial: &[f64],
    bounds: Option<&[(f64, f64)]>,
    config: NelderMeadConfig,
) -> NelderMeadResult
where
    F: Fn(&[f64]) -> f64,
{
    let n = initial.len();
    if n == 0 {
        return NelderMeadResult {
            optimal_point: vec![],
            optimal_value: f64::NAN,
            iterations: 0,
            converged: false,
        };
    }

    let bounds = Bounds(bounds);
    let evaluate = |point: Vec<f64>| {
        let point = bounds.project(point);
        let value = objective(&point);
        Vertex { point, value }
    };

    let mut simplex: Vec<Vertex> = Vec::with_capacity(n + 1);
    simplex.push(evaluate(initial.to_vec()));
    for i in 0..n {
        let mut point = initial.to_vec();
        point[i] += if initial[i].abs() > 1e-10 {
            config.initial_step * initial[i].abs()
        } else {
            config.initial_step
        };
        simplex.push(evaluate(point));
    }

    let mut iterations = 0;
    let mut converged = false;

    while iterations < config.max_iter {
        iterations += 1;
        simplex.sort_by(by_value);

        let best = simplex[0].value;
        let worst = simplex[n].value;
        if (worst - best).abs() < config.tolerance {
            converged = true;
            break;
        }

        // Centroid of every vertex but the worst
        let mut centroid = vec![0.0; n];
        for vertex in &simplex[..n] {
            for (c, x) in centroid.iter_mut().zip(&vertex.point) {
                *c += x / n as f64;
            }
        }

        let spread = simplex
            .iter()
            .map(|v| {
                v.point
                    .iter()
                    .zip(&centroid)
                    .map(|(a, b)| (a - b).powi(2))
                    .sum::<f64>()
                    .sqrt()
            })
            .fold(0.0, f64::max);
        if spread < config.tolerance {
            converged = true;
            break;
        }

        let reflected = evaluate(lerp(&centroid, &simplex[n].point, -config.alpha));

        if reflected.value < best {
            let expanded = evaluate(lerp(&centroid, &reflected.point, config.gamma));
            simplex[n] = if expanded.value < reflected.value {
                expanded
            } else {
                reflected
            };
            continue;
        }

        if reflected.value < simplex[n - 1].value {
            simplex[n] = reflected;
            continue;
        }

        let (contracted, target) = if reflected.value < worst {
            (
                evaluate(lerp(&centroid, &reflected.point, config.rho)),
                reflected.value,
            )
        } else {
            (
                evaluate(lerp(&centroid, &simplex[n].point, config.rho)),
                worst,
            )
        };
        if contracted.value < target {
            simplex[n] = contracted;
            continue;
        }

        let anchor = simplex[0].point.clone();
        for vertex in simplex.iter_mut().skip(1) {
            *vertex = evaluate(lerp(&anchor, &vertex.point, config.sigma));
        }
    }

    let best = simplex
        .into_iter()
        .min_by(by_value)
        .unwrap_or(Vertex {
            point: initial.to_vec(),
            value: f64::NAN,
        });

    NelderMeadResult {
        optimal_point: best.point,
        optimal_value: best.value,
        iterations,
        converged,
    }
}
