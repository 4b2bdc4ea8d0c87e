//! # Allocation Errors
//!
//! Typed failure taxonomy for a single optimization call. Every error is
//! raised synchronously to the caller; nothing is swallowed or retried.

use thiserror::Error;

/// Failures surfaced by one allocation call.
#[derive(Debug, Error)]
pub enum AllocError {
  /// The return matrix carries fewer than two observations.
  #[error("insufficient data: {rows} observation(s), need at least 2")]
  InsufficientData {
    /// Number of observation rows supplied.
    rows: usize,
  },

  /// An input vector or matrix fails shape or range validation.
  #[error("invalid input: {reason}")]
  InvalidInput {
    /// What was malformed.
    reason: String,
  },

  /// The box/budget bounds admit no feasible weight vector.
  #[error("invalid bounds: {reason}")]
  InvalidBounds {
    /// Which bound check failed.
    reason: String,
  },

  /// Covariance stayed non-positive-semidefinite after ridge escalation.
  #[error("covariance not positive semidefinite after ridge up to {max_ridge:e}")]
  CovarianceIllConditioned {
    /// Largest diagonal ridge attempted before giving up.
    max_ridge: f64,
  },

  /// Solver or post-solve validation found no feasible point.
  #[error("infeasible problem: {reason}")]
  Infeasible {
    /// Certificate or validation detail.
    reason: String,
  },

  /// The objective is unbounded over the constraint set.
  #[error("unbounded objective")]
  Unbounded,

  /// Backend failure, timeout, or a status outside the accepted set.
  #[error("solver failure: {status}")]
  Solver {
    /// Raw backend status.
    status: String,
  },
}
