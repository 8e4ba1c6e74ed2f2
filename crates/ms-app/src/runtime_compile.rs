//! Compile a validated configuration into runtime sizing objects.

use ms_core::units::{kg, kmps, kn, m2, s};
use ms_project::{ConstraintKindDef, SizingProject, StageDef};
use ms_sizing::{ConstraintKind, ConstraintSpec, OptimizeOptions};
use ms_solver::SqpConfig;
use ms_vehicle::{StageConfig, Vehicle};
use tracing::debug;

use crate::error::{AppError, AppResult};

/// Everything one sizing run needs.
#[derive(Debug, Clone)]
pub struct SizingRuntime {
    pub vehicle: Vehicle,
    /// 0-based stage indices
    pub constraints: Vec<ConstraintSpec>,
    pub options: OptimizeOptions,
}

pub fn compile_project(project: &SizingProject) -> AppResult<SizingRuntime> {
    let vehicle = compile_vehicle(project)?;
    let constraints = compile_constraints(project)?;
    let options = compile_options(project);
    debug!(
        name = vehicle.name(),
        stages = vehicle.num_stages(),
        constraints = constraints.len(),
        "runtime compiled"
    );
    Ok(SizingRuntime {
        vehicle,
        constraints,
        options,
    })
}

pub fn build_stage(def: &StageDef) -> StageConfig {
    StageConfig {
        structural_ratio: def.structural_ratio,
        propellant_consumption: def.propellant_consumption_pct / 100.0,
        jettison: kg(def.jettison_kg),
        isp_vac: s(def.isp_vac_s),
        thrust_vac: kn(def.thrust_vac_kn),
        engine_count: def.engine_count,
        nozzle_exit_area: m2(def.nozzle_exit_area_m2),
        ignition_in_atmosphere: def.ignition_in_atmosphere,
    }
}

pub fn compile_vehicle(project: &SizingProject) -> AppResult<Vehicle> {
    let stages = project.stages.iter().map(build_stage).collect();
    Ok(Vehicle::new(
        project.name.clone(),
        stages,
        kg(project.payload_kg),
        kmps(project.target_delta_v_km_s),
    )?)
}

/// Convert file constraints (1-based stage numbers) into runtime specs.
pub fn compile_constraints(project: &SizingProject) -> AppResult<Vec<ConstraintSpec>> {
    project
        .constraints
        .iter()
        .enumerate()
        .map(|(i, def)| {
            let stage = def.stage.checked_sub(1).ok_or_else(|| {
                AppError::Validation(format!("constraint {i}: stage numbers start at 1"))
            })?;
            Ok(ConstraintSpec::new(compile_kind(def.kind), stage, def.bound))
        })
        .collect()
}

fn compile_kind(kind: ConstraintKindDef) -> ConstraintKind {
    match kind {
        ConstraintKindDef::StructuralMassMin => ConstraintKind::StructuralMassMin,
        ConstraintKindDef::CutoffAccelerationMax => ConstraintKind::CutoffAccelerationMax,
        ConstraintKindDef::StageDeltaVMin => ConstraintKind::StageDeltaVMin,
        ConstraintKindDef::IgnitionAccelerationMin => ConstraintKind::IgnitionAccelerationMin,
    }
}

pub fn compile_options(project: &SizingProject) -> OptimizeOptions {
    let opt = &project.optimizer;
    OptimizeOptions {
        initial_guess_kg: opt.initial_guess_kg.clone(),
        min_propellant_kg: opt.min_propellant_kg,
        delta_v_tolerance_mps: opt.delta_v_tolerance_mps,
        solver: SqpConfig {
            max_iterations: opt.max_iterations,
            constraint_tolerance: opt.constraint_tolerance,
            parallel_gradients: opt.parallel_gradients,
            ..SqpConfig::default()
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ms_project::{ConstraintDef, OptimizerDef, SCHEMA_VERSION};

    fn project() -> SizingProject {
        SizingProject {
            version: SCHEMA_VERSION,
            name: "compile".to_string(),
            payload_kg: 200.0,
            target_delta_v_km_s: 9.0,
            stages: vec![
                StageDef {
                    structural_ratio: 0.9,
                    propellant_consumption_pct: 100.0,
                    jettison_kg: 0.0,
                    isp_vac_s: 280.0,
                    thrust_vac_kn: 50.0,
                    engine_count: 4,
                    nozzle_exit_area_m2: 0.1,
                    ignition_in_atmosphere: true,
                },
                StageDef {
                    structural_ratio: 0.88,
                    propellant_consumption_pct: 98.0,
                    jettison_kg: 20.0,
                    isp_vac_s: 320.0,
                    thrust_vac_kn: 20.0,
                    engine_count: 1,
                    nozzle_exit_area_m2: 0.3,
                    ignition_in_atmosphere: false,
                },
            ],
            constraints: vec![ConstraintDef {
                kind: ConstraintKindDef::StructuralMassMin,
                stage: 2,
                bound: 300.0,
            }],
            optimizer: OptimizerDef {
                max_iterations: 75,
                ..OptimizerDef::default()
            },
        }
    }

    #[test]
    fn units_convert_to_si() {
        let runtime = compile_project(&project()).unwrap();
        let cfg = runtime.vehicle.stages()[1].config();
        assert_eq!(cfg.thrust_vac.value, 20_000.0);
        assert_eq!(cfg.jettison.value, 20.0);
        assert!((cfg.propellant_consumption - 0.98).abs() < 1e-12);
        assert_eq!(runtime.vehicle.target_delta_v_mps(), 9000.0);
        assert_eq!(runtime.vehicle.payload_kg(), 200.0);
    }

    #[test]
    fn constraint_stages_become_zero_based() {
        let runtime = compile_project(&project()).unwrap();
        assert_eq!(
            runtime.constraints,
            vec![ConstraintSpec::structural_mass_min(1, 300.0)]
        );
    }

    #[test]
    fn optimizer_settings_carry_over() {
        let options = compile_options(&project());
        assert_eq!(options.solver.max_iterations, 75);
        assert_eq!(options.min_propellant_kg, 1.0);
        assert_eq!(options.delta_v_tolerance_mps, 1e-3);
        assert_eq!(options.initial_guess_kg, None);
    }

    #[test]
    fn invalid_stage_surfaces_as_vehicle_error() {
        let mut p = project();
        p.stages[0].structural_ratio = 0.0;
        assert!(matches!(compile_vehicle(&p), Err(AppError::Vehicle(_))));
    }
}
