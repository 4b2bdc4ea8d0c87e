//! # Moment Estimation
//!
//! $$
//! \hat\Sigma=\frac{1}{T-1}(R-\bar R)^\top(R-\bar R)
//! $$
//!
//! Column-wise sample mean and unbiased sample covariance of a T x N return
//! matrix. The `T - 1` divisor is deliberate; it shapes the cone factor of
//! the ratio program, so switching conventions changes optimal weights.

use ndarray::Array1;
use ndarray::Array2;
use ndarray::Axis;

use crate::error::AllocError;

/// Sample moments of a return matrix.
#[derive(Clone, Debug)]
pub struct Moments {
  /// Column means, one per stream.
  pub mean: Array1<f64>,
  /// Unbiased sample covariance (divisor `T - 1`).
  pub covariance: Array2<f64>,
}

/// Estimate column means and the unbiased sample covariance of `returns`.
///
/// Requires at least two observation rows and one column; the input is
/// treated as an immutable snapshot and never mutated.
pub fn estimate_moments(returns: &Array2<f64>) -> Result<Moments, AllocError> {
  let (t, n) = returns.dim();

  if n == 0 {
    return Err(AllocError::InvalidInput {
      reason: "return matrix has no columns".to_string(),
    });
  }
  if t < 2 {
    return Err(AllocError::InsufficientData { rows: t });
  }
  if returns.iter().any(|v| !v.is_finite()) {
    return Err(AllocError::InvalidInput {
      reason: "return matrix contains non-finite entries".to_string(),
    });
  }

  let mean = returns
    .mean_axis(Axis(0))
    .ok_or(AllocError::InsufficientData { rows: t })?;
  let centered = returns - &mean;
  let covariance = centered.t().dot(&centered) / (t as f64 - 1.0);

  Ok(Moments { mean, covariance })
}

#[cfg(test)]
mod tests {
  use approx::assert_abs_diff_eq;
  use ndarray::array;

  use super::*;

  #[test]
  fn moments_match_hand_computed_values() {
    let returns = array![[0.01, 0.02], [0.03, -0.02], [0.02, 0.03]];
    let moments = estimate_moments(&returns).unwrap();

    assert_abs_diff_eq!(moments.mean[0], 0.02, epsilon = 1e-12);
    assert_abs_diff_eq!(moments.mean[1], 0.01, epsilon = 1e-12);

    // var_0 = (1e-4 + 1e-4) / 2, cov_01 = (-1e-4 - 3e-4) / 2
    assert_abs_diff_eq!(moments.covariance[[0, 0]], 1e-4, epsilon = 1e-12);
    assert_abs_diff_eq!(moments.covariance[[0, 1]], -2e-4, epsilon = 1e-12);
    assert_abs_diff_eq!(
      moments.covariance[[0, 1]],
      moments.covariance[[1, 0]],
      epsilon = 1e-15
    );
  }

  #[test]
  fn moments_reject_single_observation() {
    let returns = array![[0.01, 0.02]];
    assert!(matches!(
      estimate_moments(&returns),
      Err(AllocError::InsufficientData { rows: 1 })
    ));
  }

  #[test]
  fn moments_reject_empty_universe() {
    let returns = Array2::<f64>::zeros((5, 0));
    assert!(matches!(
      estimate_moments(&returns),
      Err(AllocError::InvalidInput { .. })
    ));
  }

  #[test]
  fn moments_reject_non_finite_entries() {
    let returns = array![[0.01, f64::NAN], [0.02, 0.03]];
    assert!(matches!(
      estimate_moments(&returns),
      Err(AllocError::InvalidInput { .. })
    ));
  }
}
