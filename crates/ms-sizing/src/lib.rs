//! ms-sizing: propellant split optimization for multistage vehicles.
//!
//! The objective is lift-off mass, the equality constraint is the total
//! delta-v against the vehicle target, and the inequality constraints are
//! configured as explicit [`ConstraintSpec`] tuples. [`optimize`] wires these
//! into the SQP solver and reports a [`SizingOutcome`]; running out of
//! iterations is an outcome, not an error.

pub mod constraint;
pub mod error;
pub mod optimize;
pub mod problem;

pub use constraint::{
    ConstraintKind, ConstraintSpec, ConstraintValue, acceleration_ceiling, delta_v_deficit,
    delta_v_residual, evaluate_all, ignition_acceleration_floor, objective, stage_delta_v_floor,
    structural_floor,
};
pub use error::{SizingError, SizingResult};
pub use optimize::{
    FailureReason, OptimizeOptions, SizingFailure, SizingOutcome, SizingSolution,
    default_initial_guess, optimize, optimize_with_progress,
};
pub use problem::SizingProblem;
