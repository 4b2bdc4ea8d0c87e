//! # Result Validation
//!
//! $$
//! |\mathbf{1}^\top\mathbf{w}-1|\le\varepsilon,\qquad
//! w_{\min}-\varepsilon_b\le w_i\le w_{\max}+\varepsilon_b
//! $$
//!
//! Tolerance-based feasibility re-check of a solved allocation against the
//! original constraint set. Nothing is returned to the caller without
//! passing this gate; a reduced-accuracy status that drifts past tolerance
//! is converted into an infeasibility error instead of being passed along.

use ndarray::Array1;
use tracing::debug;

use crate::conic::RatioLimits;
use crate::error::AllocError;
use crate::types::SolveStatus;
use crate::types::WeightBounds;

/// Tolerances applied when re-checking a solved allocation.
#[derive(Clone, Copy, Debug)]
pub struct Tolerances {
  /// Allowed deviation of `sum(w)` from one.
  pub budget: f64,
  /// Absolute slack on the weight box.
  pub bound: f64,
  /// Absolute slack on drawdown/hit-rate side constraints.
  pub side: f64,
}

impl Default for Tolerances {
  fn default() -> Self {
    Self {
      budget: 1e-6,
      bound: 1e-9,
      side: 1e-6,
    }
  }
}

fn dot(a: &[f64], b: &Array1<f64>) -> f64 {
  a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// Re-check budget, box, and optional risk-limit compliance of `weights`.
pub fn validate_allocation(
  weights: &[f64],
  bounds: &WeightBounds,
  risk_limits: Option<(&Array1<f64>, &Array1<f64>, &RatioLimits)>,
  status: SolveStatus,
  tolerances: &Tolerances,
) -> Result<(), AllocError> {
  let violation = |reason: String| AllocError::Infeasible {
    reason: format!("{reason} (solver status {status:?})"),
  };

  if weights.iter().any(|w| !w.is_finite()) {
    return Err(violation("solution contains non-finite weights".to_string()));
  }

  let total: f64 = weights.iter().sum();
  if (total - 1.0).abs() > tolerances.budget {
    return Err(violation(format!("weights sum to {total}, budget violated")));
  }

  for (i, &w) in weights.iter().enumerate() {
    if w < bounds.lower - tolerances.bound || w > bounds.upper + tolerances.bound {
      return Err(violation(format!("weight {i} = {w} escapes the box")));
    }
  }

  if let Some((drawdown, hit_rate, limits)) = risk_limits {
    let dd = dot(weights, drawdown);
    if dd > limits.max_drawdown + tolerances.side {
      return Err(violation(format!(
        "weighted drawdown {dd} exceeds ceiling {}",
        limits.max_drawdown
      )));
    }

    let hit = dot(weights, hit_rate);
    if hit < limits.min_hit_rate - tolerances.side {
      return Err(violation(format!(
        "weighted hit rate {hit} undercuts floor {}",
        limits.min_hit_rate
      )));
    }
  }

  debug!(total, "allocation validated");

  Ok(())
}
