//! Errors raised by the QP and SQP routines.

use thiserror::Error;

/// Setup, evaluation and numerical failures. Running out of iterations is a
/// status on the result, not an error.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SolverError {
    #[error("Problem setup error: {what}")]
    ProblemSetup { what: String },

    #[error("Evaluation failed: {what}")]
    Evaluation { what: String },

    #[error("Infeasible subproblem: {what}")]
    Infeasible { what: String },

    #[error("Numeric error: {what}")]
    Numeric { what: String },
}

pub type SolverResult<T> = Result<T, SolverError>;
