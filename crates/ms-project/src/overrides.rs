//! Dotted-key setting overrides applied to a parsed project.
//!
//! Keys address a single scalar: `name`, `payload_kg`,
//! `target_delta_v_km_s`, `stages.<n>.<field>` with a 1-based stage number,
//! and `optimizer.<field>`. Overrides produce a new project; validation runs
//! afterwards on the result.

use crate::schema::{OptimizerDef, SizingProject, StageDef};
use crate::{ProjectError, ProjectResult};
use std::str::FromStr;

/// Split `key=value`.
pub fn parse_override(spec: &str) -> ProjectResult<(String, String)> {
    match spec.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.trim().to_string()))
        }
        _ => Err(ProjectError::Override {
            key: spec.to_string(),
            reason: "expected key=value".to_string(),
        }),
    }
}

/// Apply `(key, value)` pairs in order.
pub fn apply_overrides(
    project: &SizingProject,
    overrides: &[(String, String)],
) -> ProjectResult<SizingProject> {
    let mut out = project.clone();
    for (key, value) in overrides {
        apply_one(&mut out, key, value)?;
    }
    Ok(out)
}

fn apply_one(project: &mut SizingProject, key: &str, value: &str) -> ProjectResult<()> {
    let parts: Vec<&str> = key.split('.').collect();
    match parts.as_slice() {
        ["name"] => project.name = value.to_string(),
        ["payload_kg"] => project.payload_kg = parse(key, value)?,
        ["target_delta_v_km_s"] => project.target_delta_v_km_s = parse(key, value)?,
        ["stages", number, field] => {
            let count = project.stages.len();
            let index = number
                .parse::<usize>()
                .ok()
                .filter(|n| (1..=count).contains(n))
                .ok_or_else(|| ProjectError::Override {
                    key: key.to_string(),
                    reason: format!("stage number must be in 1..={count}"),
                })?;
            set_stage_field(&mut project.stages[index - 1], key, field, value)?;
        }
        ["optimizer", field] => set_optimizer_field(&mut project.optimizer, key, field, value)?,
        _ => return Err(unknown(key)),
    }
    Ok(())
}

fn set_stage_field(stage: &mut StageDef, key: &str, field: &str, value: &str) -> ProjectResult<()> {
    match field {
        "structural_ratio" => stage.structural_ratio = parse(key, value)?,
        "propellant_consumption_pct" => stage.propellant_consumption_pct = parse(key, value)?,
        "jettison_kg" => stage.jettison_kg = parse(key, value)?,
        "isp_vac_s" => stage.isp_vac_s = parse(key, value)?,
        "thrust_vac_kn" => stage.thrust_vac_kn = parse(key, value)?,
        "engine_count" => stage.engine_count = parse(key, value)?,
        "nozzle_exit_area_m2" => stage.nozzle_exit_area_m2 = parse(key, value)?,
        "ignition_in_atmosphere" => stage.ignition_in_atmosphere = parse(key, value)?,
        _ => return Err(unknown(key)),
    }
    Ok(())
}

fn set_optimizer_field(
    optimizer: &mut OptimizerDef,
    key: &str,
    field: &str,
    value: &str,
) -> ProjectResult<()> {
    match field {
        "min_propellant_kg" => optimizer.min_propellant_kg = parse(key, value)?,
        "max_iterations" => optimizer.max_iterations = parse(key, value)?,
        "constraint_tolerance" => optimizer.constraint_tolerance = parse(key, value)?,
        "delta_v_tolerance_mps" => optimizer.delta_v_tolerance_mps = parse(key, value)?,
        "parallel_gradients" => optimizer.parallel_gradients = parse(key, value)?,
        "initial_guess_kg" => {
            let guess = value
                .split(',')
                .map(|v| parse(key, v.trim()))
                .collect::<ProjectResult<Vec<f64>>>()?;
            optimizer.initial_guess_kg = Some(guess);
        }
        _ => return Err(unknown(key)),
    }
    Ok(())
}

fn parse<T: FromStr>(key: &str, value: &str) -> ProjectResult<T>
where
    T::Err: std::fmt::Display,
{
    value.parse::<T>().map_err(|e| ProjectError::Override {
        key: key.to_string(),
        reason: format!("cannot parse '{value}': {e}"),
    })
}

fn unknown(key: &str) -> ProjectError {
    ProjectError::Override {
        key: key.to_string(),
        reason: "unknown setting".to_string(),
    }
}
