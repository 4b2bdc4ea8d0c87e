//! # Program Description
//!
//! $$
//! \max_{\mathbf{x}}\ c^\top\mathbf{x}
//! \quad\text{s.t.}\quad A_{eq}\mathbf{x}=b_{eq},\ A\mathbf{x}\le b,\
//! \|F\mathbf{x}+g\|_2\le a^\top\mathbf{x}+\delta
//! $$
//!
//! Canonical convex-program form handed to the solve orchestrator. Built
//! fresh for every call and discarded afterwards; no state survives a solve.

/// Objective direction of a program.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ObjectiveSense {
  Maximize,
  Minimize,
}

/// One linear row `coeffs . x (=|<=) rhs`; the owning list fixes the relation.
#[derive(Clone, Debug)]
pub struct LinearConstraint {
  /// Row coefficients, one per variable.
  pub coeffs: Vec<f64>,
  /// Right-hand side.
  pub rhs: f64,
}

impl LinearConstraint {
  pub fn new(coeffs: Vec<f64>, rhs: f64) -> Self {
    Self { coeffs, rhs }
  }
}

/// Second-order-cone constraint `||rows . x + shift||_2 <= axis . x + offset`.
#[derive(Clone, Debug)]
pub struct SecondOrderCone {
  /// Linear part of the cone axis.
  pub axis: Vec<f64>,
  /// Constant part of the cone axis.
  pub offset: f64,
  /// Rows of the norm argument, one per cone dimension.
  pub rows: Vec<Vec<f64>>,
  /// Constant shift of the norm argument.
  pub shift: Vec<f64>,
}

/// Canonical pre-solve description of one optimization problem.
#[derive(Clone, Debug)]
pub struct ProgramDescription {
  /// Number of decision variables.
  pub n_vars: usize,
  /// Objective direction.
  pub sense: ObjectiveSense,
  /// Objective coefficients, one per variable.
  pub objective: Vec<f64>,
  /// Equality rows `a . x = rhs`.
  pub equalities: Vec<LinearConstraint>,
  /// Inequality rows `a . x <= rhs`.
  pub inequalities: Vec<LinearConstraint>,
  /// Per-variable `(lower, upper)`; an infinite side is unconstrained.
  pub bounds: Vec<(f64, f64)>,
  /// Optional second-order-cone constraints.
  pub cones: Vec<SecondOrderCone>,
}

impl ProgramDescription {
  /// Empty program over `n_vars` variables with the given objective.
  pub fn new(n_vars: usize, sense: ObjectiveSense, objective: Vec<f64>) -> Self {
    Self {
      n_vars,
      sense,
      objective,
      equalities: Vec::new(),
      inequalities: Vec::new(),
      bounds: vec![(f64::NEG_INFINITY, f64::INFINITY); n_vars],
      cones: Vec::new(),
    }
  }
}
