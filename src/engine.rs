//! # Allocation Engine
//!
//! $$
//! \mathbf{w}^\* = \operatorname{Allocate}(\mu,\Sigma,d,h)
//! $$
//!
//! High-level orchestration API over the program builders, the solver
//! backend, and the result validator. One engine call is one optimization:
//! build, solve, validate, return. Calls share no mutable state, so
//! independent portfolios may be optimized concurrently without locking.

use std::time::Duration;

use ndarray::Array1;
use ndarray::Array2;

use crate::conic::build_max_sharpe_program;
use crate::conic::recover_weights;
use crate::conic::RatioLimits;
use crate::error::AllocError;
use crate::linear::build_penalized_program;
use crate::linear::PenaltyParams;
use crate::moments::estimate_moments;
use crate::moments::Moments;
use crate::solve::solve_program;
use crate::solve::ClarabelBackend;
use crate::solve::SolverBackend;
use crate::types::Allocation;
use crate::types::RiskProfile;
use crate::types::WeightBounds;
use crate::validate::validate_allocation;
use crate::validate::Tolerances;

/// Runtime configuration for [`AllocationEngine`].
#[derive(Clone, Copy, Debug)]
pub struct AllocationConfig {
  /// Weight box applied to every stream.
  pub bounds: WeightBounds,
  /// Post-solve validation tolerances.
  pub tolerances: Tolerances,
  /// Wall-clock budget handed to the solver backend.
  pub deadline: Option<Duration>,
}

impl Default for AllocationConfig {
  fn default() -> Self {
    Self {
      bounds: WeightBounds::long_only(),
      tolerances: Tolerances::default(),
      deadline: None,
    }
  }
}

/// Single entry point for both allocation programs.
#[derive(Clone, Debug)]
pub struct AllocationEngine<B: SolverBackend = ClarabelBackend> {
  config: AllocationConfig,
  backend: B,
}

impl AllocationEngine {
  /// Engine over the default Clarabel backend.
  pub fn new(config: AllocationConfig) -> Self {
    Self {
      config,
      backend: ClarabelBackend,
    }
  }
}

impl<B: SolverBackend> AllocationEngine<B> {
  /// Engine over a caller-supplied solver backend.
  pub fn with_backend(config: AllocationConfig, backend: B) -> Self {
    Self { config, backend }
  }

  /// Borrow engine configuration.
  pub fn config(&self) -> &AllocationConfig {
    &self.config
  }

  /// Maximize expected return net of drawdown and instability penalties.
  ///
  /// Solves `max (mu - lambda_dd d - gamma (1 - h)) . w` over the budget
  /// simplex intersected with the weight box.
  pub fn allocate_penalized(
    &self,
    mu: &Array1<f64>,
    risk: &RiskProfile,
    penalties: &PenaltyParams,
  ) -> Result<Allocation, AllocError> {
    risk.validate(mu.len())?;
    let instability = risk.hit_rate.mapv(|h| 1.0 - h);

    let program =
      build_penalized_program(mu, &risk.drawdown, &instability, penalties, &self.config.bounds)?;
    let (weights, objective, status) =
      solve_program(&self.backend, &program, self.config.deadline)?;

    validate_allocation(
      &weights,
      &self.config.bounds,
      None,
      status,
      &self.config.tolerances,
    )?;

    Ok(Allocation {
      weights,
      status,
      objective,
    })
  }

  /// Maximize the Sharpe ratio of the allocation under hard risk limits,
  /// estimating moments from the raw return matrix.
  pub fn allocate_max_sharpe(
    &self,
    returns: &Array2<f64>,
    risk: &RiskProfile,
    limits: &RatioLimits,
  ) -> Result<Allocation, AllocError> {
    let moments = estimate_moments(returns)?;
    self.allocate_max_sharpe_with_moments(&moments, risk, limits)
  }

  /// Same as [`Self::allocate_max_sharpe`] with caller-supplied moments.
  pub fn allocate_max_sharpe_with_moments(
    &self,
    moments: &Moments,
    risk: &RiskProfile,
    limits: &RatioLimits,
  ) -> Result<Allocation, AllocError> {
    risk.validate(moments.mean.len())?;

    let program = build_max_sharpe_program(
      &moments.mean,
      &moments.covariance,
      &risk.drawdown,
      &risk.hit_rate,
      limits,
      &self.config.bounds,
    )?;
    let (primal, _, status) = solve_program(&self.backend, &program, self.config.deadline)?;
    let (weights, sharpe_proxy) = recover_weights(&primal, &moments.mean)?;

    validate_allocation(
      &weights,
      &self.config.bounds,
      Some((&risk.drawdown, &risk.hit_rate, limits)),
      status,
      &self.config.tolerances,
    )?;

    Ok(Allocation {
      weights,
      status,
      objective: sharpe_proxy,
    })
  }
}
