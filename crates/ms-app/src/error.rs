//! Error types for the ms-app service layer.

use std::path::PathBuf;

/// Application error type that wraps errors from the backend crates
/// and provides a unified error interface for front ends.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Configuration file not found: {}", .0.display())]
    ConfigNotFound(PathBuf),

    #[error("Failed to read configuration file: {}", path.display())]
    ConfigRead {
        path: PathBuf,
        source: ms_project::ProjectError,
    },

    #[error("Project error: {0}")]
    Project(String),

    #[error("Configuration validation failed: {0}")]
    Validation(String),

    #[error("Vehicle error: {0}")]
    Vehicle(String),

    #[error("Sizing error: {0}")]
    Sizing(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for ms-app operations.
pub type AppResult<T> = Result<T, AppError>;

impl From<ms_project::ProjectError> for AppError {
    fn from(err: ms_project::ProjectError) -> Self {
        match err {
            ms_project::ProjectError::Validation(e) => AppError::Validation(e.to_string()),
            other => AppError::Project(other.to_string()),
        }
    }
}

impl From<ms_vehicle::VehicleError> for AppError {
    fn from(err: ms_vehicle::VehicleError) -> Self {
        AppError::Vehicle(err.to_string())
    }
}

impl From<ms_sizing::SizingError> for AppError {
    fn from(err: ms_sizing::SizingError) -> Self {
        AppError::Sizing(err.to_string())
    }
}
