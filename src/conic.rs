//! # Conic Program Builder
//!
//! $$
//! \max_{\mathbf{w}}\ \frac{\mu^\top\mathbf{w}}{\|L\mathbf{w}\|_2}
//! \;\Longrightarrow\;
//! \max_{\mathbf{y},\kappa}\ \mu^\top\mathbf{y}
//! \quad\text{s.t.}\quad \|L\mathbf{y}\|_2\le 1
//! $$
//!
//! Sharpe-ratio maximization under hard drawdown and hit-rate limits. The
//! ratio objective is only quasi-convex; substituting `y = kappa * w` with
//! `kappa = 1 / ||Lw||` turns it into a single second-order-cone program
//! whose feasible set shrinks monotonically in the attained ratio, so one
//! solver call replaces a bisection over candidate ratios. Weights are
//! recovered as `w = y / kappa` and the attained ratio as `t = mu . y`.
//!
//! `L` is an upper-triangular factor with `L^T L = Sigma` from a Cholesky
//! decomposition, retried under an escalating diagonal ridge when `Sigma`
//! is semidefinite or slightly indefinite from finite-sample noise.

use nalgebra::Cholesky;
use nalgebra::DMatrix;
use ndarray::Array1;
use ndarray::Array2;
use tracing::debug;
use tracing::warn;

use crate::error::AllocError;
use crate::program::LinearConstraint;
use crate::program::ObjectiveSense;
use crate::program::ProgramDescription;
use crate::program::SecondOrderCone;
use crate::types::WeightBounds;

/// Scale-relative ridge ladder tried before rejecting a covariance.
const RIDGE_STEPS: [f64; 4] = [0.0, 1e-10, 1e-8, 1e-6];

/// Smallest homogenization scale accepted when recovering weights. A
/// realistic optimum has `kappa = 1 / ||Lw||` far above this; anything
/// smaller means the lifted problem collapsed to the origin.
pub(crate) const KAPPA_TOL: f64 = 1e-6;

/// Hard linear limits of the ratio program.
#[derive(Clone, Copy, Debug)]
pub struct RatioLimits {
  /// Ceiling on weighted drawdown `d . w`.
  pub max_drawdown: f64,
  /// Floor on weighted hit rate `h . w`.
  pub min_hit_rate: f64,
}

impl RatioLimits {
  pub fn new(max_drawdown: f64, min_hit_rate: f64) -> Self {
    Self {
      max_drawdown,
      min_hit_rate,
    }
  }

  fn validate(&self) -> Result<(), AllocError> {
    if !self.max_drawdown.is_finite() || self.max_drawdown < 0.0 {
      return Err(AllocError::InvalidInput {
        reason: format!("max_drawdown must be finite and >= 0, got {}", self.max_drawdown),
      });
    }
    if !self.min_hit_rate.is_finite() || !(0.0..=1.0).contains(&self.min_hit_rate) {
      return Err(AllocError::InvalidInput {
        reason: format!("min_hit_rate must lie in [0, 1], got {}", self.min_hit_rate),
      });
    }
    Ok(())
  }
}

/// Upper-triangular factor `L` with `L^T L = Sigma`.
///
/// The input is symmetrized first; asymmetry beyond rounding is the
/// caller's bug but harmless here. Each ridge step adds
/// `step * max|Sigma_ii|` to the diagonal before retrying.
pub(crate) fn covariance_factor(sigma: &Array2<f64>) -> Result<DMatrix<f64>, AllocError> {
  let n = sigma.nrows();
  let symmetric = DMatrix::from_fn(n, n, |i, j| 0.5 * (sigma[[i, j]] + sigma[[j, i]]));
  let scale = symmetric
    .diagonal()
    .iter()
    .fold(0.0_f64, |acc, v| acc.max(v.abs()))
    .max(f64::MIN_POSITIVE);

  for step in RIDGE_STEPS {
    let ridge = step * scale;
    let mut candidate = symmetric.clone();
    for i in 0..n {
      candidate[(i, i)] += ridge;
    }

    if let Some(chol) = Cholesky::new(candidate) {
      if step > 0.0 {
        warn!(ridge, "covariance regularized before factorization");
      }
      return Ok(chol.l().transpose());
    }
  }

  Err(AllocError::CovarianceIllConditioned {
    max_ridge: RIDGE_STEPS[RIDGE_STEPS.len() - 1] * scale,
  })
}

/// Build the homogenized max-Sharpe SOCP over variables `x = [y, kappa]`.
///
/// Constraints in the lifted space:
/// - `1^T y - kappa = 0` (budget after de-homogenization)
/// - `y_i - w_max kappa <= 0`, `w_min kappa - y_i <= 0` (box)
/// - `d . y - D_max kappa <= 0`, `H_min kappa - h . y <= 0` (risk limits)
/// - `kappa >= 0`, `||L y||_2 <= 1`
pub fn build_max_sharpe_program(
  mu: &Array1<f64>,
  sigma: &Array2<f64>,
  drawdown: &Array1<f64>,
  hit_rate: &Array1<f64>,
  limits: &RatioLimits,
  bounds: &WeightBounds,
) -> Result<ProgramDescription, AllocError> {
  let n = mu.len();

  if n == 0 {
    return Err(AllocError::InvalidInput {
      reason: "expected-return vector is empty".to_string(),
    });
  }
  if sigma.dim() != (n, n) {
    return Err(AllocError::InvalidInput {
      reason: format!("covariance has shape {:?}, expected ({n}, {n})", sigma.dim()),
    });
  }
  if drawdown.len() != n || hit_rate.len() != n {
    return Err(AllocError::InvalidInput {
      reason: format!(
        "risk vectors have lengths {}/{}, expected {n}",
        drawdown.len(),
        hit_rate.len()
      ),
    });
  }
  if mu.iter().chain(sigma.iter()).any(|v| !v.is_finite()) {
    return Err(AllocError::InvalidInput {
      reason: "moment inputs contain non-finite entries".to_string(),
    });
  }
  limits.validate()?;
  bounds.validate(n)?;

  let factor = covariance_factor(sigma)?;

  // Variables: y_0 .. y_{n-1}, kappa.
  let n_vars = n + 1;
  let kappa = n;

  let mut objective = mu.to_vec();
  objective.push(0.0);

  let mut program = ProgramDescription::new(n_vars, ObjectiveSense::Maximize, objective);

  let mut budget = vec![1.0; n];
  budget.push(-1.0);
  program.equalities.push(LinearConstraint::new(budget, 0.0));

  for i in 0..n {
    let mut upper = vec![0.0; n_vars];
    upper[i] = 1.0;
    upper[kappa] = -bounds.upper;
    program.inequalities.push(LinearConstraint::new(upper, 0.0));

    let mut lower = vec![0.0; n_vars];
    lower[i] = -1.0;
    lower[kappa] = bounds.lower;
    program.inequalities.push(LinearConstraint::new(lower, 0.0));
  }

  let mut dd_row: Vec<f64> = drawdown.to_vec();
  dd_row.push(-limits.max_drawdown);
  program.inequalities.push(LinearConstraint::new(dd_row, 0.0));

  let mut hit_row: Vec<f64> = hit_rate.iter().map(|h| -h).collect();
  hit_row.push(limits.min_hit_rate);
  program.inequalities.push(LinearConstraint::new(hit_row, 0.0));

  program.bounds[kappa] = (0.0, f64::INFINITY);

  let rows = (0..n)
    .map(|i| {
      let mut row = vec![0.0; n_vars];
      for j in 0..n {
        row[j] = factor[(i, j)];
      }
      row
    })
    .collect();
  program.cones.push(SecondOrderCone {
    axis: vec![0.0; n_vars],
    offset: 1.0,
    rows,
    shift: vec![0.0; n],
  });

  debug!(
    n,
    max_drawdown = limits.max_drawdown,
    min_hit_rate = limits.min_hit_rate,
    "max-Sharpe SOCP built"
  );

  Ok(program)
}

/// Recover weights and the attained ratio from the homogenized primal.
///
/// A vanishing `kappa` certifies that no feasible allocation attains a
/// positive expected return, where the ratio program has no solution.
pub(crate) fn recover_weights(
  primal: &[f64],
  mu: &Array1<f64>,
) -> Result<(Vec<f64>, f64), AllocError> {
  let (y, kappa) = primal.split_at(primal.len() - 1);
  let kappa = kappa[0];

  if kappa <= KAPPA_TOL {
    return Err(AllocError::Infeasible {
      reason: "no allocation satisfies the risk limits with positive expected return".to_string(),
    });
  }

  let weights: Vec<f64> = y.iter().map(|v| v / kappa).collect();
  let sharpe_proxy = y.iter().zip(mu.iter()).map(|(a, b)| a * b).sum();

  Ok((weights, sharpe_proxy))
}

#[cfg(test)]
mod tests {
  use approx::assert_abs_diff_eq;
  use ndarray::array;
  use tracing_test::traced_test;

  use super::*;

  #[test]
  fn factor_reproduces_covariance() {
    let sigma = array![[0.04, 0.01], [0.01, 0.09]];
    let factor = covariance_factor(&sigma).unwrap();

    for i in 0..2 {
      for j in 0..2 {
        let reconstructed: f64 = (0..2).map(|k| factor[(k, i)] * factor[(k, j)]).sum();
        assert_abs_diff_eq!(reconstructed, sigma[[i, j]], epsilon = 1e-12);
      }
    }
    // upper triangular
    assert_abs_diff_eq!(factor[(1, 0)], 0.0, epsilon = 1e-15);
  }

  #[traced_test]
  #[test]
  fn slightly_indefinite_covariance_is_regularized() {
    // eigenvalues 2 + 1e-7 and -1e-7
    let sigma = array![[1.0, 1.0 + 1e-7], [1.0 + 1e-7, 1.0]];
    let factor = covariance_factor(&sigma).unwrap();

    assert_eq!(factor.nrows(), 2);
    assert!(logs_contain("covariance regularized"));
  }

  #[test]
  fn negative_definite_covariance_is_rejected() {
    let sigma = array![[-1.0, 0.0], [0.0, -1.0]];
    assert!(matches!(
      covariance_factor(&sigma),
      Err(AllocError::CovarianceIllConditioned { .. })
    ));
  }

  #[test]
  fn homogenized_program_has_lifted_shape() {
    let mu = array![0.01, 0.02, 0.015];
    let sigma = array![
      [0.04, 0.01, 0.0],
      [0.01, 0.09, 0.02],
      [0.0, 0.02, 0.16]
    ];
    let d = array![0.1, 0.3, 0.05];
    let h = array![0.55, 0.6, 0.5];

    let program = build_max_sharpe_program(
      &mu,
      &sigma,
      &d,
      &h,
      &RatioLimits::new(0.2, 0.5),
      &WeightBounds::long_only(),
    )
    .unwrap();

    assert_eq!(program.n_vars, 4);
    assert_eq!(program.equalities.len(), 1);
    // 2n box rows plus drawdown ceiling and hit-rate floor
    assert_eq!(program.inequalities.len(), 8);
    assert_eq!(program.cones.len(), 1);
    assert_eq!(program.cones[0].rows.len(), 3);
    assert_eq!(program.bounds[3], (0.0, f64::INFINITY));
  }

  #[test]
  fn recovery_rejects_vanishing_scale() {
    let mu = array![0.01, 0.02];
    let primal = vec![0.0, 0.0, 0.0];

    assert!(matches!(
      recover_weights(&primal, &mu),
      Err(AllocError::Infeasible { .. })
    ));
  }

  #[test]
  fn recovery_rescales_weights() {
    let mu = array![0.05, 0.1];
    let primal = vec![1.0, 3.0, 4.0];
    let (weights, proxy) = recover_weights(&primal, &mu).unwrap();

    assert_abs_diff_eq!(weights[0], 0.25, epsilon = 1e-12);
    assert_abs_diff_eq!(weights[1], 0.75, epsilon = 1e-12);
    assert_abs_diff_eq!(proxy, 0.05 + 0.3, epsilon = 1e-12);
  }
}
