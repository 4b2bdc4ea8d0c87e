//! # Solve Orchestration
//!
//! $$
//! \min_{\mathbf{x}}\ q^\top\mathbf{x}
//! \quad\text{s.t.}\quad A\mathbf{x}+\mathbf{s}=\mathbf{b},\ \mathbf{s}\in\mathcal K
//! $$
//!
//! Lowers a [`ProgramDescription`] to the solver's canonical conic form,
//! dispatches it through the [`SolverBackend`] seam, and normalizes the
//! terminal status. One call, one solve; retries belong to the caller.

use std::time::Duration;

use clarabel::algebra::CscMatrix;
use clarabel::solver::*;
use tracing::debug;
use tracing::warn;

use crate::error::AllocError;
use crate::program::ObjectiveSense;
use crate::program::ProgramDescription;
use crate::types::SolveStatus;

/// Backend-neutral terminal status of one solve.
#[derive(Clone, Debug, PartialEq)]
pub enum RawStatus {
  Optimal,
  OptimalInaccurate,
  Infeasible,
  InfeasibleInaccurate,
  Unbounded,
  /// Any other terminal condition, carrying the backend's own wording.
  Failed(String),
}

/// Primal output of a backend call.
#[derive(Clone, Debug)]
pub struct RawSolution {
  /// Terminal status.
  pub status: RawStatus,
  /// Primal vector; meaningful only for accepted statuses.
  pub primal: Vec<f64>,
  /// Objective value in the caller's sense.
  pub objective: f64,
}

/// Minimal LP + SOCP capability required from a numerical backend.
///
/// Implementations solve the program as given, blocking until a terminal
/// status or the deadline, and never mutate the description.
pub trait SolverBackend {
  fn solve(
    &self,
    program: &ProgramDescription,
    deadline: Option<Duration>,
  ) -> Result<RawSolution, AllocError>;
}

/// Interior-point backend over the Clarabel conic solver.
#[derive(Clone, Copy, Debug, Default)]
pub struct ClarabelBackend;

impl SolverBackend for ClarabelBackend {
  fn solve(
    &self,
    program: &ProgramDescription,
    deadline: Option<Duration>,
  ) -> Result<RawSolution, AllocError> {
    let n = program.n_vars;

    let q: Vec<f64> = match program.sense {
      ObjectiveSense::Minimize => program.objective.clone(),
      ObjectiveSense::Maximize => program.objective.iter().map(|c| -c).collect(),
    };

    // Rows stacked as [equalities | inequalities + bounds | cone blocks],
    // with slacks in the zero, nonnegative, and second-order cones.
    let mut rows: Vec<Vec<f64>> = Vec::new();
    let mut b: Vec<f64> = Vec::new();
    let mut cones: Vec<SupportedConeT<f64>> = Vec::new();

    for eq in &program.equalities {
      rows.push(eq.coeffs.clone());
      b.push(eq.rhs);
    }
    if !program.equalities.is_empty() {
      cones.push(ZeroConeT(program.equalities.len()));
    }

    let mut n_ineq = 0;
    for ineq in &program.inequalities {
      rows.push(ineq.coeffs.clone());
      b.push(ineq.rhs);
      n_ineq += 1;
    }
    for (i, &(lower, upper)) in program.bounds.iter().enumerate() {
      if upper.is_finite() {
        let mut row = vec![0.0; n];
        row[i] = 1.0;
        rows.push(row);
        b.push(upper);
        n_ineq += 1;
      }
      if lower.is_finite() {
        let mut row = vec![0.0; n];
        row[i] = -1.0;
        rows.push(row);
        b.push(-lower);
        n_ineq += 1;
      }
    }
    if n_ineq > 0 {
      cones.push(NonnegativeConeT(n_ineq));
    }

    for cone in &program.cones {
      rows.push(cone.axis.iter().map(|v| -v).collect());
      b.push(cone.offset);
      for (row, shift) in cone.rows.iter().zip(cone.shift.iter()) {
        rows.push(row.iter().map(|v| -v).collect());
        b.push(*shift);
      }
      cones.push(SecondOrderConeT(cone.rows.len() + 1));
    }

    let a = csc_from_rows(&rows, n);
    let p = CscMatrix::new(n, n, vec![0; n + 1], Vec::new(), Vec::new());

    let mut builder = DefaultSettingsBuilder::default();
    builder.verbose(false);
    if let Some(limit) = deadline {
      builder.time_limit(limit.as_secs_f64().max(f64::MIN_POSITIVE));
    }
    let settings = builder.build().map_err(|e| AllocError::Solver {
      status: format!("settings rejected: {e}"),
    })?;

    let mut solver =
      DefaultSolver::new(&p, &q, &a, &b, &cones, settings).map_err(|e| AllocError::Solver {
        status: format!("problem rejected: {e:?}"),
      })?;
    solver.solve();

    let objective = match program.sense {
      ObjectiveSense::Minimize => solver.solution.obj_val,
      ObjectiveSense::Maximize => -solver.solution.obj_val,
    };

    Ok(RawSolution {
      status: normalize_status(solver.solution.status),
      primal: solver.solution.x.clone(),
      objective,
    })
  }
}

fn normalize_status(status: SolverStatus) -> RawStatus {
  match status {
    SolverStatus::Solved => RawStatus::Optimal,
    SolverStatus::AlmostSolved => RawStatus::OptimalInaccurate,
    SolverStatus::PrimalInfeasible => RawStatus::Infeasible,
    SolverStatus::AlmostPrimalInfeasible => RawStatus::InfeasibleInaccurate,
    // dual infeasibility of the minimization certifies an unbounded objective
    SolverStatus::DualInfeasible | SolverStatus::AlmostDualInfeasible => RawStatus::Unbounded,
    other => RawStatus::Failed(format!("{other:?}")),
  }
}

fn csc_from_rows(rows: &[Vec<f64>], n_cols: usize) -> CscMatrix<f64> {
  let mut colptr = Vec::with_capacity(n_cols + 1);
  let mut rowval = Vec::new();
  let mut nzval = Vec::new();

  colptr.push(0);
  for j in 0..n_cols {
    for (i, row) in rows.iter().enumerate() {
      if row[j] != 0.0 {
        rowval.push(i);
        nzval.push(row[j]);
      }
    }
    colptr.push(nzval.len());
  }

  CscMatrix::new(rows.len(), n_cols, colptr, rowval, nzval)
}

/// Dispatch `program` to `backend` and normalize the outcome.
///
/// Accepted statuses return the primal, the objective in the caller's
/// sense, and the confidence marker; everything else becomes a typed error.
pub fn solve_program<B: SolverBackend>(
  backend: &B,
  program: &ProgramDescription,
  deadline: Option<Duration>,
) -> Result<(Vec<f64>, f64, SolveStatus), AllocError> {
  debug!(
    n_vars = program.n_vars,
    equalities = program.equalities.len(),
    inequalities = program.inequalities.len(),
    cones = program.cones.len(),
    "solving"
  );

  let raw = backend.solve(program, deadline)?;

  match raw.status {
    RawStatus::Optimal => {
      debug!(objective = raw.objective, "solved");
      Ok((raw.primal, raw.objective, SolveStatus::Optimal))
    }
    RawStatus::OptimalInaccurate => {
      warn!(objective = raw.objective, "solver returned a reduced-accuracy solution");
      Ok((raw.primal, raw.objective, SolveStatus::OptimalInaccurate))
    }
    RawStatus::Infeasible => Err(AllocError::Infeasible {
      reason: "solver certified primal infeasibility".to_string(),
    }),
    RawStatus::InfeasibleInaccurate => Err(AllocError::Infeasible {
      reason: "solver produced a near-certificate of primal infeasibility".to_string(),
    }),
    RawStatus::Unbounded => Err(AllocError::Unbounded),
    RawStatus::Failed(status) => Err(AllocError::Solver { status }),
  }
}

#[cfg(test)]
mod tests {
  use approx::assert_abs_diff_eq;

  use super::*;
  use crate::program::LinearConstraint;

  struct FixedBackend(RawStatus);

  impl SolverBackend for FixedBackend {
    fn solve(
      &self,
      program: &ProgramDescription,
      _deadline: Option<Duration>,
    ) -> Result<RawSolution, AllocError> {
      Ok(RawSolution {
        status: self.0.clone(),
        primal: vec![0.0; program.n_vars],
        objective: 0.0,
      })
    }
  }

  fn simplex_lp(objective: Vec<f64>) -> ProgramDescription {
    let n = objective.len();
    let mut program = ProgramDescription::new(n, ObjectiveSense::Maximize, objective);
    program
      .equalities
      .push(LinearConstraint::new(vec![1.0; n], 1.0));
    program.bounds = vec![(0.0, 1.0); n];
    program
  }

  #[test]
  fn clarabel_solves_a_two_stream_lp_at_the_vertex() {
    let program = simplex_lp(vec![1.0, 2.0]);
    let (x, objective, status) =
      solve_program(&ClarabelBackend, &program, None).unwrap();

    assert_eq!(status, SolveStatus::Optimal);
    assert_abs_diff_eq!(x[0], 0.0, epsilon = 1e-6);
    assert_abs_diff_eq!(x[1], 1.0, epsilon = 1e-6);
    assert_abs_diff_eq!(objective, 2.0, epsilon = 1e-6);
  }

  #[test]
  fn clarabel_certifies_infeasible_side_constraints() {
    let mut program = simplex_lp(vec![1.0, 1.0]);
    // x_0 + x_1 <= 0.5 contradicts the budget row
    program
      .inequalities
      .push(LinearConstraint::new(vec![1.0, 1.0], 0.5));

    assert!(matches!(
      solve_program(&ClarabelBackend, &program, None),
      Err(AllocError::Infeasible { .. })
    ));
  }

  #[test]
  fn clarabel_certifies_an_unbounded_objective() {
    // maximize x with no upper bound anywhere
    let mut program = ProgramDescription::new(1, ObjectiveSense::Maximize, vec![1.0]);
    program.bounds = vec![(0.0, f64::INFINITY)];

    assert!(matches!(
      solve_program(&ClarabelBackend, &program, None),
      Err(AllocError::Unbounded)
    ));
  }

  #[test]
  fn infeasible_raw_status_maps_to_typed_error() {
    let program = simplex_lp(vec![1.0, 1.0]);
    let backend = FixedBackend(RawStatus::Infeasible);

    assert!(matches!(
      solve_program(&backend, &program, None),
      Err(AllocError::Infeasible { .. })
    ));
  }

  #[test]
  fn failed_raw_status_carries_the_backend_wording() {
    let program = simplex_lp(vec![1.0, 1.0]);
    let backend = FixedBackend(RawStatus::Failed("MaxTime".to_string()));

    match solve_program(&backend, &program, None) {
      Err(AllocError::Solver { status }) => assert_eq!(status, "MaxTime"),
      other => panic!("unexpected outcome: {other:?}"),
    }
  }

  #[test]
  fn inaccurate_raw_status_keeps_the_marker() {
    let program = simplex_lp(vec![1.0, 1.0]);
    let backend = FixedBackend(RawStatus::OptimalInaccurate);
    let (_, _, status) = solve_program(&backend, &program, None).unwrap();

    assert!(status.is_inaccurate());
  }
}
