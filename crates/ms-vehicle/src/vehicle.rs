//! Vehicle assembly and the top-down mass-closure pass.

use crate::error::{VehicleError, VehicleResult};
use crate::stage::{StageConfig, StageModel, StageState};
use ms_core::ensure_finite;
use ms_core::units::{Mass, Velocity};
use serde::Serialize;

/// Ordered stack of stages plus payload and target velocity increment.
///
/// Index 0 is the first (bottom) stage, the last index is the topmost stage.
/// Immutable once built; every [`Vehicle::resolve`] allocates a fresh
/// [`VehicleSnapshot`].
#[derive(Debug, Clone, PartialEq)]
pub struct Vehicle {
    name: String,
    stages: Vec<StageModel>,
    payload_kg: f64,
    target_delta_v_mps: f64,
}

/// Fully resolved vehicle for one propellant vector.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VehicleSnapshot {
    /// Stage states in bottom-to-top order
    pub stages: Vec<StageState>,
    pub payload_kg: f64,
    pub delta_v_sum_mps: f64,
    pub target_delta_v_mps: f64,
}

impl VehicleSnapshot {
    /// Total lift-off mass: ignition mass of the first stage.
    pub fn initial_mass_kg(&self) -> f64 {
        self.stages.first().map_or(0.0, |s| s.ignition_mass_kg)
    }

    pub fn stage(&self, index: usize) -> Option<&StageState> {
        self.stages.get(index)
    }

    /// Signed shortfall/excess against the vehicle target.
    pub fn delta_v_residual_mps(&self) -> f64 {
        self.delta_v_sum_mps - self.target_delta_v_mps
    }

    pub fn propellant_kg(&self) -> Vec<f64> {
        self.stages.iter().map(|s| s.propellant_kg).collect()
    }
}

impl Vehicle {
    /// Build a vehicle from bottom-to-top stage configurations.
    pub fn new(
        name: impl Into<String>,
        stages: Vec<StageConfig>,
        payload: Mass,
        target_delta_v: Velocity,
    ) -> VehicleResult<Self> {
        if stages.is_empty() {
            return Err(VehicleError::NoStages);
        }

        let payload_kg = ensure_finite(payload.value, "payload mass")?;
        if payload_kg < 0.0 {
            return Err(VehicleError::InvalidParameter {
                what: format!("payload mass must be non-negative, got {payload_kg}"),
            });
        }
        let target_delta_v_mps = ensure_finite(target_delta_v.value, "target delta-v")?;

        let stages = stages
            .into_iter()
            .enumerate()
            .map(|(i, cfg)| StageModel::new(cfg).map_err(|e| e.at_stage(i)))
            .collect::<VehicleResult<Vec<_>>>()?;

        Ok(Self {
            name: name.into(),
            stages,
            payload_kg,
            target_delta_v_mps,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn num_stages(&self) -> usize {
        self.stages.len()
    }

    pub fn stages(&self) -> &[StageModel] {
        &self.stages
    }

    pub fn payload_kg(&self) -> f64 {
        self.payload_kg
    }

    pub fn target_delta_v_mps(&self) -> f64 {
        self.target_delta_v_mps
    }

    /// Copy of this vehicle carrying a different payload.
    pub fn with_payload_kg(&self, payload_kg: f64) -> VehicleResult<Self> {
        let payload_kg = ensure_finite(payload_kg, "payload mass")?;
        if payload_kg < 0.0 {
            return Err(VehicleError::InvalidParameter {
                what: format!("payload mass must be non-negative, got {payload_kg}"),
            });
        }
        Ok(Self {
            payload_kg,
            ..self.clone()
        })
    }

    /// Resolve all stages for the given per-stage propellant masses [kg].
    ///
    /// Stages are processed from the top of the stack down: the topmost stage
    /// carries the payload, every lower stage carries the ignition mass of the
    /// stage directly above it.
    pub fn resolve(&self, propellant_kg: &[f64]) -> VehicleResult<VehicleSnapshot> {
        self.resolve_with_payload(propellant_kg, self.payload_kg)
    }

    pub(crate) fn resolve_with_payload(
        &self,
        propellant_kg: &[f64],
        payload_kg: f64,
    ) -> VehicleResult<VehicleSnapshot> {
        let n = self.stages.len();
        if propellant_kg.len() != n {
            return Err(VehicleError::ShapeMismatch {
                expected: n,
                actual: propellant_kg.len(),
            });
        }

        let mut resolved: Vec<Option<StageState>> = vec![None; n];
        let mut upper_mass_kg = payload_kg;
        let mut delta_v_sum_mps = 0.0;

        for i in (0..n).rev() {
            let state = self.stages[i]
                .compute(propellant_kg[i], upper_mass_kg)
                .map_err(|e| e.at_stage(i))?;
            upper_mass_kg = state.ignition_mass_kg;
            delta_v_sum_mps += state.delta_v_mps;
            resolved[i] = Some(state);
        }

        let stages = resolved.into_iter().flatten().collect();

        Ok(VehicleSnapshot {
            stages,
            payload_kg,
            delta_v_sum_mps,
            target_delta_v_mps: self.target_delta_v_mps,
        })
    }
}
