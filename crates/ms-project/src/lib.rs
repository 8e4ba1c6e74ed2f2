//! ms-project: sizing configuration file format and validation.

pub mod overrides;
pub mod schema;
pub mod validate;

pub use overrides::{apply_overrides, parse_override};
pub use schema::*;
pub use validate::{ValidationError, validate_project};

use std::path::Path;

pub type ProjectResult<T> = Result<T, ProjectError>;

#[derive(thiserror::Error, Debug)]
pub enum ProjectError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Invalid override '{key}': {reason}")]
    Override { key: String, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Parse without validating, so overrides can still fix the result.
pub fn parse_yaml(content: &str) -> ProjectResult<SizingProject> {
    Ok(serde_yaml::from_str(content)?)
}

pub fn parse_json(content: &str) -> ProjectResult<SizingProject> {
    Ok(serde_json::from_str(content)?)
}

/// Read a project by extension (`.json` as JSON, anything else as YAML) without validating.
pub fn read_unvalidated(path: &Path) -> ProjectResult<SizingProject> {
    let content = std::fs::read_to_string(path)?;
    if is_json(path) {
        parse_json(&content)
    } else {
        parse_yaml(&content)
    }
}

/// Read and validate a project, choosing the format by extension.
pub fn load(path: &Path) -> ProjectResult<SizingProject> {
    let project = read_unvalidated(path)?;
    validate_project(&project)?;
    Ok(project)
}

pub fn load_yaml(path: &Path) -> ProjectResult<SizingProject> {
    let content = std::fs::read_to_string(path)?;
    let project = parse_yaml(&content)?;
    validate_project(&project)?;
    Ok(project)
}

pub fn save_yaml(path: &Path, project: &SizingProject) -> ProjectResult<()> {
    validate_project(project)?;
    let content = serde_yaml::to_string(project)?;
    std::fs::write(path, content)?;
    Ok(())
}

pub fn load_json(path: &Path) -> ProjectResult<SizingProject> {
    let content = std::fs::read_to_string(path)?;
    let project = parse_json(&content)?;
    validate_project(&project)?;
    Ok(project)
}

pub fn save_json(path: &Path, project: &SizingProject) -> ProjectResult<()> {
    validate_project(project)?;
    let content = serde_json::to_string_pretty(project)?;
    std::fs::write(path, content)?;
    Ok(())
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"))
}
