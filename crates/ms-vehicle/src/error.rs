//! Error types for stage and vehicle resolution.

use ms_core::CoreError;
use thiserror::Error;

/// Errors raised while resolving stages. Stage indices are 0-based.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum VehicleError {
    #[error("Propellant vector has {actual} entries, vehicle has {expected} stages")]
    ShapeMismatch { expected: usize, actual: usize },

    #[error("Negative {what} at stage {stage}: {value}")]
    NegativeMass {
        stage: usize,
        what: &'static str,
        value: f64,
    },

    #[error("Degenerate mass ratio at stage {stage} (m0={m0}, mf={mf})")]
    Degenerate { stage: usize, m0: f64, mf: f64 },

    #[error("Invalid configuration for stage {stage}: {what}")]
    InvalidConfig { stage: usize, what: String },

    #[error("Invalid vehicle parameter: {what}")]
    InvalidParameter { what: String },

    #[error("Vehicle has no stages")]
    NoStages,

    #[error("Numeric error: {0}")]
    Core(#[from] CoreError),
}

pub type VehicleResult<T> = Result<T, VehicleError>;

impl VehicleError {
    /// Re-tag a stage-local error with the stage's position in the stack.
    pub(crate) fn at_stage(self, index: usize) -> Self {
        match self {
            VehicleError::NegativeMass { what, value, .. } => VehicleError::NegativeMass {
                stage: index,
                what,
                value,
            },
            VehicleError::Degenerate { m0, mf, .. } => VehicleError::Degenerate {
                stage: index,
                m0,
                mf,
            },
            VehicleError::InvalidConfig { what, .. } => {
                VehicleError::InvalidConfig { stage: index, what }
            }
            other => other,
        }
    }

    /// True for physically infeasible points, as opposed to caller mistakes.
    pub fn is_degenerate(&self) -> bool {
        matches!(self, VehicleError::Degenerate { .. })
    }
}
