//! Objective and constraint functions of the propellant vector.
//!
//! Every function resolves the vehicle itself, so each one is a pure function
//! of `(vehicle, propellant)` and the explicit bound. [`crate::SizingProblem`]
//! resolves once per point and reads all values from the same snapshot.

use crate::error::{SizingError, SizingResult};
use ms_vehicle::{StageState, Vehicle, VehicleSnapshot};
use serde::Serialize;
use std::fmt;

/// Inequality constraint family. Each is feasible when its value is >= 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintKind {
    /// `structural_mass - bound`
    StructuralMassMin,
    /// `bound - acc_cutoff`
    CutoffAccelerationMax,
    /// `delta_v - bound`
    StageDeltaVMin,
    /// `acc_ignition - bound`
    IgnitionAccelerationMin,
}

impl ConstraintKind {
    pub fn unit(self) -> &'static str {
        match self {
            ConstraintKind::StructuralMassMin => "kg",
            ConstraintKind::CutoffAccelerationMax | ConstraintKind::IgnitionAccelerationMin => "G",
            ConstraintKind::StageDeltaVMin => "m/s",
        }
    }

    fn value(self, stage: &StageState, bound: f64) -> f64 {
        match self {
            ConstraintKind::StructuralMassMin => stage.structural_mass_kg - bound,
            ConstraintKind::CutoffAccelerationMax => bound - stage.acc_cutoff_g,
            ConstraintKind::StageDeltaVMin => stage.delta_v_mps - bound,
            ConstraintKind::IgnitionAccelerationMin => stage.acc_ignition_g - bound,
        }
    }
}

impl fmt::Display for ConstraintKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConstraintKind::StructuralMassMin => "structural mass >=",
            ConstraintKind::CutoffAccelerationMax => "cutoff acceleration <=",
            ConstraintKind::StageDeltaVMin => "stage delta-v >=",
            ConstraintKind::IgnitionAccelerationMin => "ignition acceleration >=",
        };
        f.write_str(name)
    }
}

/// One `(kind, stage, bound)` tuple. `stage` is 0-based.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ConstraintSpec {
    pub kind: ConstraintKind,
    pub stage: usize,
    pub bound: f64,
}

impl ConstraintSpec {
    pub fn new(kind: ConstraintKind, stage: usize, bound: f64) -> Self {
        Self { kind, stage, bound }
    }

    pub fn structural_mass_min(stage: usize, bound_kg: f64) -> Self {
        Self::new(ConstraintKind::StructuralMassMin, stage, bound_kg)
    }

    pub fn cutoff_acceleration_max(stage: usize, bound_g: f64) -> Self {
        Self::new(ConstraintKind::CutoffAccelerationMax, stage, bound_g)
    }

    pub fn stage_delta_v_min(stage: usize, bound_mps: f64) -> Self {
        Self::new(ConstraintKind::StageDeltaVMin, stage, bound_mps)
    }

    pub fn ignition_acceleration_min(stage: usize, bound_g: f64) -> Self {
        Self::new(ConstraintKind::IgnitionAccelerationMin, stage, bound_g)
    }

    /// `index` is the position in the constraint list, used for reporting.
    pub fn validate(&self, index: usize, num_stages: usize) -> SizingResult<()> {
        if self.stage >= num_stages {
            return Err(SizingError::InvalidConstraint {
                index,
                what: format!(
                    "stage index {} out of range for {} stages",
                    self.stage, num_stages
                ),
            });
        }
        if !self.bound.is_finite() {
            return Err(SizingError::InvalidConstraint {
                index,
                what: format!("bound {} is not finite", self.bound),
            });
        }
        Ok(())
    }

    /// Constraint value on an already resolved snapshot.
    pub fn evaluate(&self, snapshot: &VehicleSnapshot) -> SizingResult<f64> {
        let stage = snapshot
            .stage(self.stage)
            .ok_or(SizingError::UnknownStage {
                stage: self.stage,
                num_stages: snapshot.stages.len(),
            })?;
        Ok(self.kind.value(stage, self.bound))
    }
}

impl fmt::Display for ConstraintSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "stage {} {} {} {}",
            self.stage + 1,
            self.kind,
            self.bound,
            self.kind.unit()
        )
    }
}

/// Constraint value at a point; negative means violated.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ConstraintValue {
    pub spec: ConstraintSpec,
    pub value: f64,
}

impl ConstraintValue {
    pub fn violation(&self) -> f64 {
        (-self.value).max(0.0)
    }

    pub fn is_satisfied(&self, tolerance: f64) -> bool {
        self.value >= -tolerance
    }
}

/// Evaluate every constraint on one snapshot.
pub fn evaluate_all(
    constraints: &[ConstraintSpec],
    snapshot: &VehicleSnapshot,
) -> SizingResult<Vec<ConstraintValue>> {
    constraints
        .iter()
        .map(|spec| {
            Ok(ConstraintValue {
                spec: *spec,
                value: spec.evaluate(snapshot)?,
            })
        })
        .collect()
}

/// Total lift-off mass, the quantity being minimized.
pub fn objective(vehicle: &Vehicle, propellant_kg: &[f64]) -> SizingResult<f64> {
    Ok(vehicle.resolve(propellant_kg)?.initial_mass_kg())
}

/// `|delta_v_sum - target|`, zero when the target is met exactly.
pub fn delta_v_deficit(vehicle: &Vehicle, propellant_kg: &[f64]) -> SizingResult<f64> {
    Ok(delta_v_residual(vehicle, propellant_kg)?.abs())
}

/// Signed `delta_v_sum - target`. This smooth form is what the optimizer drives to zero.
pub fn delta_v_residual(vehicle: &Vehicle, propellant_kg: &[f64]) -> SizingResult<f64> {
    Ok(vehicle.resolve(propellant_kg)?.delta_v_residual_mps())
}

pub fn structural_floor(
    vehicle: &Vehicle,
    propellant_kg: &[f64],
    stage: usize,
    limit_kg: f64,
) -> SizingResult<f64> {
    single(vehicle, propellant_kg, ConstraintSpec::structural_mass_min(stage, limit_kg))
}

pub fn acceleration_ceiling(
    vehicle: &Vehicle,
    propellant_kg: &[f64],
    stage: usize,
    limit_g: f64,
) -> SizingResult<f64> {
    single(vehicle, propellant_kg, ConstraintSpec::cutoff_acceleration_max(stage, limit_g))
}

pub fn stage_delta_v_floor(
    vehicle: &Vehicle,
    propellant_kg: &[f64],
    stage: usize,
    limit_mps: f64,
) -> SizingResult<f64> {
    single(vehicle, propellant_kg, ConstraintSpec::stage_delta_v_min(stage, limit_mps))
}

pub fn ignition_acceleration_floor(
    vehicle: &Vehicle,
    propellant_kg: &[f64],
    stage: usize,
    limit_g: f64,
) -> SizingResult<f64> {
    single(vehicle, propellant_kg, ConstraintSpec::ignition_acceleration_min(stage, limit_g))
}

fn single(vehicle: &Vehicle, propellant_kg: &[f64], spec: ConstraintSpec) -> SizingResult<f64> {
    spec.validate(0, vehicle.num_stages())?;
    spec.evaluate(&vehicle.resolve(propellant_kg)?)
}
