//! # portopt-rs
//!
//! $$
//! \max_{\mathbf{w}}\ \frac{\mu^\top\mathbf{w}}{\|L\mathbf{w}\|_2}
//! \quad\text{s.t.}\quad \mathbf{1}^\top\mathbf{w}=1,\
//! w_{\min}\le w_i\le w_{\max},\ d^\top\mathbf{w}\le D_{\max},\
//! h^\top\mathbf{w}\ge H_{\min}
//! $$
//!
//! Convex allocation across candidate return streams. Two programs share
//! one pipeline: a penalized-return LP (expected return net of drawdown and
//! instability penalties) and a Sharpe-ratio maximization reformulated as a
//! single second-order-cone program. Problems are described in a canonical
//! form, dispatched through a pluggable solver backend (Clarabel by
//! default), and every solution is re-validated against the original
//! constraints before it reaches the caller.

pub mod conic;
pub mod engine;
pub mod error;
pub mod linear;
pub mod moments;
pub mod program;
pub mod solve;
pub mod types;
pub mod validate;

pub use conic::build_max_sharpe_program;
pub use conic::RatioLimits;
pub use engine::AllocationConfig;
pub use engine::AllocationEngine;
pub use error::AllocError;
pub use linear::build_penalized_program;
pub use linear::PenaltyParams;
pub use moments::estimate_moments;
pub use moments::Moments;
pub use program::LinearConstraint;
pub use program::ObjectiveSense;
pub use program::ProgramDescription;
pub use program::SecondOrderCone;
pub use solve::solve_program;
pub use solve::ClarabelBackend;
pub use solve::RawSolution;
pub use solve::RawStatus;
pub use solve::SolverBackend;
pub use types::Allocation;
pub use types::RiskProfile;
pub use types::SolveStatus;
pub use types::WeightBounds;
pub use validate::validate_allocation;
pub use validate::Tolerances;
