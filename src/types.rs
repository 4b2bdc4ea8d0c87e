//! # Allocation Types
//!
//! $$
//! \mathbf{1}^\top\mathbf{w}=1,\qquad w_{\min}\le w_i\le w_{\max}
//! $$
//!
//! Shared input containers, weight bounds, and the allocation result.

use ndarray::Array1;

use crate::error::AllocError;

/// Terminal status of an accepted solve.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SolveStatus {
  /// Solution meets the backend's full accuracy targets.
  Optimal,
  /// Solution accepted at reduced accuracy; still validated before return.
  OptimalInaccurate,
}

impl SolveStatus {
  /// True when the backend flagged reduced accuracy.
  pub fn is_inaccurate(self) -> bool {
    matches!(self, Self::OptimalInaccurate)
  }
}

/// Per-stream weight box shared by both programs.
#[derive(Clone, Copy, Debug)]
pub struct WeightBounds {
  /// Lower bound applied to every weight.
  pub lower: f64,
  /// Upper bound applied to every weight.
  pub upper: f64,
}

impl WeightBounds {
  /// Construct a box `lower <= w_i <= upper`.
  pub fn new(lower: f64, upper: f64) -> Self {
    Self { lower, upper }
  }

  /// Long-only box `0 <= w_i <= 1`.
  pub fn long_only() -> Self {
    Self {
      lower: 0.0,
      upper: 1.0,
    }
  }

  /// Reject boxes that cannot host the budget constraint `sum(w) = 1`.
  ///
  /// Checked before any solver call so an impossible box surfaces as a
  /// precise diagnostic instead of an opaque solver certificate.
  pub(crate) fn validate(&self, n: usize) -> Result<(), AllocError> {
    if !self.lower.is_finite() || !self.upper.is_finite() {
      return Err(AllocError::InvalidBounds {
        reason: "bounds must be finite".to_string(),
      });
    }
    if self.lower > self.upper {
      return Err(AllocError::InvalidBounds {
        reason: format!("lower {} exceeds upper {}", self.lower, self.upper),
      });
    }
    if self.lower * n as f64 > 1.0 {
      return Err(AllocError::InvalidBounds {
        reason: format!("{n} streams at lower bound {} already exceed the budget", self.lower),
      });
    }
    if self.upper * (n as f64) < 1.0 {
      return Err(AllocError::InvalidBounds {
        reason: format!("{n} streams at upper bound {} cannot reach the budget", self.upper),
      });
    }
    Ok(())
  }
}

/// Per-stream risk proxies aligned with the return matrix columns.
#[derive(Clone, Debug)]
pub struct RiskProfile {
  /// Drawdown magnitude per stream, each `>= 0`.
  pub drawdown: Array1<f64>,
  /// Hit rate per stream, each in `[0, 1]`.
  pub hit_rate: Array1<f64>,
}

impl RiskProfile {
  /// Bundle drawdown and hit-rate vectors.
  pub fn new(drawdown: Array1<f64>, hit_rate: Array1<f64>) -> Self {
    Self { drawdown, hit_rate }
  }

  pub(crate) fn validate(&self, n: usize) -> Result<(), AllocError> {
    if self.drawdown.len() != n || self.hit_rate.len() != n {
      return Err(AllocError::InvalidInput {
        reason: format!(
          "risk vectors have lengths {}/{}, expected {n}",
          self.drawdown.len(),
          self.hit_rate.len()
        ),
      });
    }
    if self.drawdown.iter().any(|d| !d.is_finite() || *d < 0.0) {
      return Err(AllocError::InvalidInput {
        reason: "drawdown entries must be finite and non-negative".to_string(),
      });
    }
    if self
      .hit_rate
      .iter()
      .any(|h| !h.is_finite() || !(0.0..=1.0).contains(h))
    {
      return Err(AllocError::InvalidInput {
        reason: "hit-rate entries must lie in [0, 1]".to_string(),
      });
    }
    Ok(())
  }
}

/// Output of one allocation call.
#[derive(Clone, Debug)]
pub struct Allocation {
  /// Final weights, one per stream, summing to one.
  pub weights: Vec<f64>,
  /// Accepted solver status.
  pub status: SolveStatus,
  /// Objective value attained: the penalized expected return for the linear
  /// program, the Sharpe proxy `t` for the ratio program.
  pub objective: f64,
}

#[cfg(test)]
mod tests {
  use ndarray::array;

  use super::*;

  #[test]
  fn bounds_reject_inverted_box() {
    let err = WeightBounds::new(0.6, 0.4).validate(3).unwrap_err();
    assert!(matches!(err, AllocError::InvalidBounds { .. }));
  }

  #[test]
  fn bounds_reject_budget_infeasible_lower() {
    let err = WeightBounds::new(0.5, 1.0).validate(3).unwrap_err();
    assert!(matches!(err, AllocError::InvalidBounds { .. }));
  }

  #[test]
  fn bounds_reject_budget_infeasible_upper() {
    let err = WeightBounds::new(0.0, 0.2).validate(3).unwrap_err();
    assert!(matches!(err, AllocError::InvalidBounds { .. }));
  }

  #[test]
  fn bounds_accept_feasible_box() {
    assert!(WeightBounds::long_only().validate(3).is_ok());
  }

  #[test]
  fn risk_profile_rejects_out_of_range_hit_rate() {
    let risk = RiskProfile::new(array![0.1, 0.2], array![0.5, 1.2]);
    assert!(matches!(
      risk.validate(2),
      Err(AllocError::InvalidInput { .. })
    ));
  }

  #[test]
  fn risk_profile_rejects_length_mismatch() {
    let risk = RiskProfile::new(array![0.1], array![0.5]);
    assert!(matches!(
      risk.validate(2),
      Err(AllocError::InvalidInput { .. })
    ));
  }
}
