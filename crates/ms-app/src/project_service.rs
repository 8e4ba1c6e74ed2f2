//! Configuration loading, saving, validation, and introspection.

use ms_project::SizingProject;
use std::path::Path;
use tracing::debug;

use crate::error::{AppError, AppResult};

/// Vehicle-level overview of a configuration.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ProjectSummary {
    pub name: String,
    pub stage_count: usize,
    pub payload_kg: f64,
    pub target_delta_v_km_s: f64,
    pub constraint_count: usize,
}

/// Load a configuration, apply `key=value` overrides, then validate the result.
pub fn load_project(path: &Path, overrides: &[(String, String)]) -> AppResult<SizingProject> {
    if !path.exists() {
        return Err(AppError::ConfigNotFound(path.to_path_buf()));
    }

    let parsed = ms_project::read_unvalidated(path).map_err(|e| AppError::ConfigRead {
        path: path.to_path_buf(),
        source: e,
    })?;
    let project = ms_project::apply_overrides(&parsed, overrides)?;
    validate_project(&project)?;

    debug!(
        path = %path.display(),
        stages = project.stages.len(),
        overrides = overrides.len(),
        "configuration loaded"
    );
    Ok(project)
}

/// Parse `key=value` strings as given on a command line.
pub fn parse_overrides(specs: &[String]) -> AppResult<Vec<(String, String)>> {
    specs
        .iter()
        .map(|s| ms_project::parse_override(s).map_err(AppError::from))
        .collect()
}

/// Save configuration, format chosen by extension.
pub fn save_project(path: &Path, project: &SizingProject) -> AppResult<()> {
    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));
    if is_json {
        ms_project::save_json(path, project)?;
    } else {
        ms_project::save_yaml(path, project)?;
    }
    Ok(())
}

pub fn validate_project(project: &SizingProject) -> AppResult<()> {
    ms_project::validate_project(project).map_err(|e| AppError::Validation(e.to_string()))
}

pub fn summarize(project: &SizingProject) -> ProjectSummary {
    ProjectSummary {
        name: project.name.clone(),
        stage_count: project.stages.len(),
        payload_kg: project.payload_kg,
        target_delta_v_km_s: project.target_delta_v_km_s,
        constraint_count: project.constraints.len(),
    }
}
