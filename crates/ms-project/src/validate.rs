//! Configuration validation.

use crate::schema::{ConstraintDef, OptimizerDef, SCHEMA_VERSION, SizingProject, StageDef};

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Invalid value: {field} = {value} ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Length mismatch: {field} has {actual} entries, expected {expected}")]
    LengthMismatch {
        field: String,
        expected: usize,
        actual: usize,
    },

    #[error("Vehicle has no stages")]
    NoStages,

    #[error("Unsupported version: {version}")]
    UnsupportedVersion { version: u32 },
}

fn invalid(field: impl Into<String>, value: impl ToString, reason: &str) -> ValidationError {
    ValidationError::InvalidValue {
        field: field.into(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn finite_non_negative(field: impl Into<String>, value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() || value < 0.0 {
        return Err(invalid(field, value, "must be finite and non-negative"));
    }
    Ok(())
}

fn finite_positive(field: impl Into<String>, value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(invalid(field, value, "must be finite and positive"));
    }
    Ok(())
}

pub fn validate_project(project: &SizingProject) -> Result<(), ValidationError> {
    if project.version != SCHEMA_VERSION {
        return Err(ValidationError::UnsupportedVersion {
            version: project.version,
        });
    }
    if project.stages.is_empty() {
        return Err(ValidationError::NoStages);
    }

    finite_non_negative("payload_kg", project.payload_kg)?;
    finite_positive("target_delta_v_km_s", project.target_delta_v_km_s)?;

    for (i, stage) in project.stages.iter().enumerate() {
        validate_stage(stage, i + 1)?;
    }
    for (i, constraint) in project.constraints.iter().enumerate() {
        validate_constraint(constraint, i, project.stages.len())?;
    }
    validate_optimizer(&project.optimizer, project.stages.len())?;

    Ok(())
}

fn validate_stage(stage: &StageDef, number: usize) -> Result<(), ValidationError> {
    let field = |name: &str| format!("stages.{number}.{name}");

    if !(stage.structural_ratio > 0.0 && stage.structural_ratio <= 1.0) {
        return Err(invalid(
            field("structural_ratio"),
            stage.structural_ratio,
            "must be in (0, 1]",
        ));
    }
    if !(stage.propellant_consumption_pct > 0.0 && stage.propellant_consumption_pct <= 100.0) {
        return Err(invalid(
            field("propellant_consumption_pct"),
            stage.propellant_consumption_pct,
            "must be in (0, 100]",
        ));
    }
    finite_non_negative(field("jettison_kg"), stage.jettison_kg)?;
    finite_positive(field("isp_vac_s"), stage.isp_vac_s)?;
    finite_positive(field("thrust_vac_kn"), stage.thrust_vac_kn)?;
    if stage.engine_count == 0 {
        return Err(invalid(field("engine_count"), 0, "must be at least 1"));
    }
    finite_non_negative(field("nozzle_exit_area_m2"), stage.nozzle_exit_area_m2)?;

    Ok(())
}

fn validate_constraint(
    constraint: &ConstraintDef,
    index: usize,
    num_stages: usize,
) -> Result<(), ValidationError> {
    if constraint.stage == 0 || constraint.stage > num_stages {
        return Err(invalid(
            format!("constraints.{index}.stage"),
            constraint.stage,
            &format!("must be in 1..={num_stages}"),
        ));
    }
    if !constraint.bound.is_finite() {
        return Err(invalid(
            format!("constraints.{index}.bound"),
            constraint.bound,
            "must be finite",
        ));
    }
    Ok(())
}

fn validate_optimizer(optimizer: &OptimizerDef, num_stages: usize) -> Result<(), ValidationError> {
    finite_positive("optimizer.min_propellant_kg", optimizer.min_propellant_kg)?;
    finite_positive(
        "optimizer.constraint_tolerance",
        optimizer.constraint_tolerance,
    )?;
    finite_positive(
        "optimizer.delta_v_tolerance_mps",
        optimizer.delta_v_tolerance_mps,
    )?;
    if optimizer.max_iterations == 0 {
        return Err(invalid("optimizer.max_iterations", 0, "must be at least 1"));
    }

    if let Some(guess) = &optimizer.initial_guess_kg {
        if guess.len() != num_stages {
            return Err(ValidationError::LengthMismatch {
                field: "optimizer.initial_guess_kg".to_string(),
                expected: num_stages,
                actual: guess.len(),
            });
        }
        for (i, value) in guess.iter().enumerate() {
            finite_non_negative(format!("optimizer.initial_guess_kg.{i}"), *value)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ConstraintKindDef;

    fn stage() -> StageDef {
        StageDef {
            structural_ratio: 0.9,
            propellant_consumption_pct: 100.0,
            jettison_kg: 0.0,
            isp_vac_s: 300.0,
            thrust_vac_kn: 20.0,
            engine_count: 1,
            nozzle_exit_area_m2: 0.0,
            ignition_in_atmosphere: false,
        }
    }

    fn project() -> SizingProject {
        SizingProject {
            version: SCHEMA_VERSION,
            name: "test".to_string(),
            payload_kg: 100.0,
            target_delta_v_km_s: 8.0,
            stages: vec![stage(), stage()],
            constraints: vec![ConstraintDef {
                kind: ConstraintKindDef::StructuralMassMin,
                stage: 2,
                bound: 50.0,
            }],
            optimizer: OptimizerDef::default(),
        }
    }

    #[test]
    fn valid_project_passes() {
        validate_project(&project()).unwrap();
    }

    #[test]
    fn version_and_stage_count_checked() {
        let mut p = project();
        p.version = 7;
        assert_eq!(
            validate_project(&p),
            Err(ValidationError::UnsupportedVersion { version: 7 })
        );

        let mut p = project();
        p.stages.clear();
        p.constraints.clear();
        assert_eq!(validate_project(&p), Err(ValidationError::NoStages));
    }

    #[test]
    fn stage_ranges_checked() {
        let mut p = project();
        p.stages[1].structural_ratio = 1.2;
        let err = validate_project(&p).unwrap_err();
        assert!(err.to_string().contains("stages.2.structural_ratio"));

        let mut p = project();
        p.stages[0].propellant_consumption_pct = 0.0;
        assert!(validate_project(&p).is_err());

        let mut p = project();
        p.stages[0].engine_count = 0;
        assert!(validate_project(&p).is_err());

        let mut p = project();
        p.stages[0].isp_vac_s = f64::NAN;
        assert!(validate_project(&p).is_err());
    }

    #[test]
    fn constraint_stage_is_one_based() {
        let mut p = project();
        p.constraints[0].stage = 0;
        assert!(validate_project(&p).is_err());
        p.constraints[0].stage = 3;
        assert!(validate_project(&p).is_err());
        p.constraints[0].stage = 1;
        assert!(validate_project(&p).is_ok());
    }

    #[test]
    fn initial_guess_length_checked() {
        let mut p = project();
        p.optimizer.initial_guess_kg = Some(vec![1000.0]);
        assert!(matches!(
            validate_project(&p),
            Err(ValidationError::LengthMismatch {
                expected: 2,
                actual: 1,
                ..
            })
        ));
    }

    #[test]
    fn target_must_be_positive() {
        let mut p = project();
        p.target_delta_v_km_s = 0.0;
        assert!(validate_project(&p).is_err());
        let mut p = project();
        p.payload_kg = -1.0;
        assert!(validate_project(&p).is_err());
    }
}
