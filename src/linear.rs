//! # Linear Program Builder
//!
//! $$
//! \max_{\mathbf{w}}\ (\mu-\lambda_{dd}\,d-\gamma\,p)^\top\mathbf{w}
//! \quad\text{s.t.}\quad \mathbf{1}^\top\mathbf{w}=1,\ w_{\min}\le w_i\le w_{\max}
//! $$
//!
//! Assembles the penalized-return allocation LP: expected return net of a
//! drawdown penalty and an instability penalty, over the budget simplex
//! intersected with the weight box.

use ndarray::Array1;
use tracing::debug;

use crate::error::AllocError;
use crate::program::LinearConstraint;
use crate::program::ObjectiveSense;
use crate::program::ProgramDescription;
use crate::types::WeightBounds;

/// Penalty coefficients of the linear objective.
#[derive(Clone, Copy, Debug)]
pub struct PenaltyParams {
  /// Weight on drawdown magnitudes, `>= 0`.
  pub lambda_dd: f64,
  /// Weight on instability (e.g. `1 - hit_rate`), `>= 0`.
  pub gamma: f64,
}

impl PenaltyParams {
  pub fn new(lambda_dd: f64, gamma: f64) -> Self {
    Self { lambda_dd, gamma }
  }

  fn validate(&self) -> Result<(), AllocError> {
    if !self.lambda_dd.is_finite() || self.lambda_dd < 0.0 {
      return Err(AllocError::InvalidInput {
        reason: format!("lambda_dd must be finite and >= 0, got {}", self.lambda_dd),
      });
    }
    if !self.gamma.is_finite() || self.gamma < 0.0 {
      return Err(AllocError::InvalidInput {
        reason: format!("gamma must be finite and >= 0, got {}", self.gamma),
      });
    }
    Ok(())
  }
}

/// Build the penalized-return LP over `mu.len()` streams.
///
/// Objective coefficients are `c = mu - lambda_dd * d - gamma * p` with `p`
/// the instability vector. Bound infeasibility is rejected here, before any
/// solver call.
pub fn build_penalized_program(
  mu: &Array1<f64>,
  drawdown: &Array1<f64>,
  instability: &Array1<f64>,
  penalties: &PenaltyParams,
  bounds: &WeightBounds,
) -> Result<ProgramDescription, AllocError> {
  let n = mu.len();

  if n == 0 {
    return Err(AllocError::InvalidInput {
      reason: "expected-return vector is empty".to_string(),
    });
  }
  if drawdown.len() != n || instability.len() != n {
    return Err(AllocError::InvalidInput {
      reason: format!(
        "penalty vectors have lengths {}/{}, expected {n}",
        drawdown.len(),
        instability.len()
      ),
    });
  }
  if mu.iter().chain(drawdown.iter()).chain(instability.iter()).any(|v| !v.is_finite()) {
    return Err(AllocError::InvalidInput {
      reason: "objective inputs contain non-finite entries".to_string(),
    });
  }
  penalties.validate()?;
  bounds.validate(n)?;

  let objective: Vec<f64> = (0..n)
    .map(|i| mu[i] - penalties.lambda_dd * drawdown[i] - penalties.gamma * instability[i])
    .collect();

  let mut program = ProgramDescription::new(n, ObjectiveSense::Maximize, objective);
  program
    .equalities
    .push(LinearConstraint::new(vec![1.0; n], 1.0));
  program.bounds = vec![(bounds.lower, bounds.upper); n];

  debug!(n, lambda_dd = penalties.lambda_dd, gamma = penalties.gamma, "penalized LP built");

  Ok(program)
}

#[cfg(test)]
mod tests {
  use approx::assert_abs_diff_eq;
  use ndarray::array;

  use super::*;

  #[test]
  fn objective_nets_out_both_penalties() {
    let mu = array![0.01, 0.02, 0.0];
    let d = array![0.1, 0.3, 0.05];
    let p = array![0.4, 0.5, 0.6];

    let program = build_penalized_program(
      &mu,
      &d,
      &p,
      &PenaltyParams::new(10.0, 2.0),
      &WeightBounds::long_only(),
    )
    .unwrap();

    assert_abs_diff_eq!(program.objective[0], 0.01 - 1.0 - 0.8, epsilon = 1e-12);
    assert_abs_diff_eq!(program.objective[1], 0.02 - 3.0 - 1.0, epsilon = 1e-12);
    assert_abs_diff_eq!(program.objective[2], 0.0 - 0.5 - 1.2, epsilon = 1e-12);
    assert_eq!(program.equalities.len(), 1);
    assert!(program.cones.is_empty());
  }

  #[test]
  fn budget_infeasible_box_fails_before_solving() {
    let mu = array![0.01, 0.02, 0.0];
    let d = array![0.1, 0.1, 0.1];
    let p = array![0.5, 0.5, 0.5];

    let err = build_penalized_program(
      &mu,
      &d,
      &p,
      &PenaltyParams::new(1.0, 0.0),
      &WeightBounds::new(0.5, 1.0),
    )
    .unwrap_err();

    assert!(matches!(err, AllocError::InvalidBounds { .. }));
  }

  #[test]
  fn negative_penalty_is_rejected() {
    let mu = array![0.01];
    let d = array![0.1];
    let p = array![0.5];

    let err = build_penalized_program(
      &mu,
      &d,
      &p,
      &PenaltyParams::new(-1.0, 0.0),
      &WeightBounds::long_only(),
    )
    .unwrap_err();

    assert!(matches!(err, AllocError::InvalidInput { .. }));
  }

  #[test]
  fn mismatched_vectors_are_rejected() {
    let mu = array![0.01, 0.02];
    let d = array![0.1];
    let p = array![0.5, 0.5];

    let err = build_penalized_program(
      &mu,
      &d,
      &p,
      &PenaltyParams::new(1.0, 1.0),
      &WeightBounds::long_only(),
    )
    .unwrap_err();

    assert!(matches!(err, AllocError::InvalidInput { .. }));
  }
}
