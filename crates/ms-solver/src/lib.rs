//! Constrained nonlinear programming for small dense problems.
//!
//! This crate provides a sequential quadratic programming (SQP) solver for
//! problems of the form
//!
//! ```text
//! minimize f(x)  subject to  c_eq(x) = 0,  c_in(x) >= 0,  lower <= x <= upper
//! ```
//!
//! Gradients come from bound-aware finite differences, the Hessian of the
//! Lagrangian is approximated with damped BFGS, and each QP subproblem is
//! solved exactly through its bound-constrained dual.

pub mod error;
pub mod jacobian;
pub mod problem;
pub mod qp;
pub mod sqp;

pub use error::{SolverError, SolverResult};
pub use problem::{Evaluation, NlpProblem};
pub use qp::{QpSolution, solve_qp};
pub use sqp::{SqpConfig, SqpProgress, SqpResult, SqpStatus, sqp_solve, sqp_solve_with_progress};
