//! Sizing configuration file schema.

use serde::{Deserialize, Serialize};

pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SizingProject {
    pub version: u32,
    pub name: String,
    pub payload_kg: f64,
    pub target_delta_v_km_s: f64,
    /// Index 0 is the first (bottom) stage
    pub stages: Vec<StageDef>,
    #[serde(default)]
    pub constraints: Vec<ConstraintDef>,
    #[serde(default)]
    pub optimizer: OptimizerDef,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StageDef {
    pub structural_ratio: f64,
    #[serde(default = "default_consumption_pct")]
    pub propellant_consumption_pct: f64,
    #[serde(default)]
    pub jettison_kg: f64,
    pub isp_vac_s: f64,
    /// Per engine
    pub thrust_vac_kn: f64,
    #[serde(default = "default_engine_count")]
    pub engine_count: u32,
    /// Per engine
    #[serde(default)]
    pub nozzle_exit_area_m2: f64,
    #[serde(default)]
    pub ignition_in_atmosphere: bool,
}

fn default_consumption_pct() -> f64 {
    100.0
}

fn default_engine_count() -> u32 {
    1
}

/// A `(kind, stage, bound)` tuple. Stage numbers are 1-based in files.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConstraintDef {
    pub kind: ConstraintKindDef,
    pub stage: usize,
    pub bound: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintKindDef {
    /// Structural mass [kg] at least `bound`
    StructuralMassMin,
    /// Acceleration at cutoff [G] at most `bound`
    CutoffAccelerationMax,
    /// Stage delta-v [m/s] at least `bound`
    StageDeltaVMin,
    /// Acceleration at ignition [G] at least `bound`
    IgnitionAccelerationMin,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OptimizerDef {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial_guess_kg: Option<Vec<f64>>,
    pub min_propellant_kg: f64,
    pub max_iterations: usize,
    pub constraint_tolerance: f64,
    /// Accepted miss of the target delta-v at convergence [m/s]
    pub delta_v_tolerance_mps: f64,
    pub parallel_gradients: bool,
}

impl Default for OptimizerDef {
    fn default() -> Self {
        Self {
            initial_guess_kg: None,
            min_propellant_kg: 1.0,
            max_iterations: 200,
            constraint_tolerance: 1e-6,
            delta_v_tolerance_mps: 1e-3,
            parallel_gradients: false,
        }
    }
}
