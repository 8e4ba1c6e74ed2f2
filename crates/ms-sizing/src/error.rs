//! Error types for the sizing layer.

use ms_solver::SolverError;
use ms_vehicle::VehicleError;
use thiserror::Error;

/// Errors that prevent a sizing run from starting.
///
/// An optimizer that runs but fails to converge is not an error; see
/// [`crate::SizingOutcome::Failed`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SizingError {
    #[error("Vehicle error: {0}")]
    Vehicle(#[from] VehicleError),

    #[error("Solver error: {0}")]
    Solver(#[from] SolverError),

    #[error("Invalid constraint #{index}: {what}")]
    InvalidConstraint { index: usize, what: String },

    #[error("Constraint on stage {stage} but the vehicle has {num_stages} stages")]
    UnknownStage { stage: usize, num_stages: usize },

    #[error("Invalid initial guess: {what}")]
    InvalidGuess { what: String },
}

pub type SizingResult<T> = Result<T, SizingError>;
