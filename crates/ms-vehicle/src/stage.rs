//! Single-stage propulsion and mass model.

use crate::error::{VehicleError, VehicleResult};
use ms_core::ensure_finite;
use ms_core::units::constants;
use ms_core::units::{Area, Force, Mass, Time, kg, kn, m2, s};
use serde::Serialize;

/// Static description of one propulsive stage.
#[derive(Debug, Clone, PartialEq)]
pub struct StageConfig {
    /// Structural ratio s in (0, 1]: propellant / (structure + propellant)
    pub structural_ratio: f64,
    /// Fraction of the loaded propellant actually burned, in (0, 1]
    pub propellant_consumption: f64,
    /// Mass dropped at burnout together with the stage (fairing etc.)
    pub jettison: Mass,
    /// Vacuum specific impulse
    pub isp_vac: Time,
    /// Vacuum thrust per engine
    pub thrust_vac: Force,
    pub engine_count: u32,
    /// Nozzle exit area per engine
    pub nozzle_exit_area: Area,
    /// Apply the sea-level thrust correction at ignition
    pub ignition_in_atmosphere: bool,
}

impl Default for StageConfig {
    fn default() -> Self {
        Self {
            structural_ratio: 0.9,
            propellant_consumption: 1.0,
            jettison: kg(0.0),
            isp_vac: s(300.0),
            thrust_vac: kn(10.0),
            engine_count: 1,
            nozzle_exit_area: m2(0.0),
            ignition_in_atmosphere: false,
        }
    }
}

impl StageConfig {
    /// Create a single-engine vacuum stage that burns all of its propellant.
    pub fn new(structural_ratio: f64, isp_vac: Time, thrust_vac: Force) -> Self {
        Self {
            structural_ratio,
            isp_vac,
            thrust_vac,
            ..Self::default()
        }
    }

    /// Set the consumed share of the propellant load, in percent.
    pub fn with_consumption_pct(mut self, pct: f64) -> Self {
        self.propellant_consumption = pct / 100.0;
        self
    }

    pub fn with_jettison(mut self, jettison: Mass) -> Self {
        self.jettison = jettison;
        self
    }

    pub fn with_engine_count(mut self, engine_count: u32) -> Self {
        self.engine_count = engine_count;
        self
    }

    /// Ignite inside the atmosphere with the given exit area per engine.
    pub fn with_atmospheric_ignition(mut self, nozzle_exit_area: Area) -> Self {
        self.nozzle_exit_area = nozzle_exit_area;
        self.ignition_in_atmosphere = true;
        self
    }

    /// Check the ranges the mass model relies on.
    pub fn validate(&self) -> VehicleResult<()> {
        let invalid = |what: &str| {
            Err(VehicleError::InvalidConfig {
                stage: 0,
                what: what.to_string(),
            })
        };

        if !(self.structural_ratio > 0.0 && self.structural_ratio <= 1.0) {
            return invalid("structural ratio must be in (0, 1]");
        }
        if !(self.propellant_consumption > 0.0 && self.propellant_consumption <= 1.0) {
            return invalid("propellant consumption must be in (0, 100] %");
        }
        if !(self.jettison.value >= 0.0 && self.jettison.value.is_finite()) {
            return invalid("jettison mass must be non-negative");
        }
        if !(self.isp_vac.value > 0.0 && self.isp_vac.value.is_finite()) {
            return invalid("vacuum Isp must be positive");
        }
        if !(self.thrust_vac.value > 0.0 && self.thrust_vac.value.is_finite()) {
            return invalid("vacuum thrust must be positive");
        }
        if self.engine_count == 0 {
            return invalid("engine count must be at least 1");
        }
        if !(self.nozzle_exit_area.value >= 0.0 && self.nozzle_exit_area.value.is_finite()) {
            return invalid("nozzle exit area must be non-negative");
        }
        Ok(())
    }
}

/// Resolved state of one stage for a given propellant load and upper mass.
///
/// Masses in kg, velocities in m/s, thrust in kN per engine, accelerations in G.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageState {
    pub upper_mass_kg: f64,
    pub propellant_kg: f64,
    pub consumed_propellant_kg: f64,
    pub residual_propellant_kg: f64,
    pub structural_mass_kg: f64,
    /// mf: burnout mass including everything above
    pub burnout_mass_kg: f64,
    /// m0: ignition mass including everything above
    pub ignition_mass_kg: f64,
    pub delta_v_mps: f64,
    pub burn_time_s: f64,
    pub mass_flow_per_engine_kgps: f64,
    pub total_mass_flow_kgps: f64,
    pub thrust_ignition_kn: f64,
    pub isp_ignition_s: f64,
    pub acc_ignition_g: f64,
    pub acc_cutoff_g: f64,
}

impl StageState {
    /// Ignition mass of this stage alone.
    pub fn stage_ignition_mass_kg(&self) -> f64 {
        self.ignition_mass_kg - self.upper_mass_kg
    }

    /// Burnout mass of this stage alone.
    pub fn stage_burnout_mass_kg(&self) -> f64 {
        self.burnout_mass_kg - self.upper_mass_kg
    }
}

/// Pure physics of one stage.
#[derive(Debug, Clone, PartialEq)]
pub struct StageModel {
    config: StageConfig,
}

impl StageModel {
    pub fn new(config: StageConfig) -> VehicleResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &StageConfig {
        &self.config
    }

    /// Resolve the stage for a propellant load and the mass stacked above it.
    ///
    /// Fails with [`VehicleError::Degenerate`] when the burnout mass is not
    /// positive, since the rocket equation has no finite answer there.
    pub fn compute(&self, propellant_kg: f64, upper_mass_kg: f64) -> VehicleResult<StageState> {
        check_mass(propellant_kg, "propellant mass")?;
        check_mass(upper_mass_kg, "upper mass")?;

        let cfg = &self.config;
        let isp = cfg.isp_vac.value;
        let thrust_vac_kn = cfg.thrust_vac.value / 1000.0;
        let engines = f64::from(cfg.engine_count);
        let g0 = constants::g0().value;

        let consumed = propellant_kg * cfg.propellant_consumption;
        let residual = propellant_kg - consumed;
        let mdot = thrust_vac_kn * 1000.0 / (isp * g0);
        let burn_time = consumed / (mdot * engines);
        let structural = propellant_kg * (1.0 - cfg.structural_ratio) / cfg.structural_ratio;

        let mf = upper_mass_kg + structural + residual + cfg.jettison.value;
        let m0 = mf + consumed;
        if !(mf > 0.0) || !mf.is_finite() {
            return Err(VehicleError::Degenerate { stage: 0, m0, mf });
        }

        let delta_v = isp * g0 * (m0 / mf).ln();
        if !delta_v.is_finite() {
            return Err(VehicleError::Degenerate { stage: 0, m0, mf });
        }

        let thrust_sl_kn = if cfg.ignition_in_atmosphere {
            let ambient = constants::sea_level_pressure().value;
            thrust_vac_kn - cfg.nozzle_exit_area.value * ambient / 1000.0
        } else {
            thrust_vac_kn
        };
        let isp_sl = thrust_sl_kn * 1000.0 / mdot / g0;

        Ok(StageState {
            upper_mass_kg,
            propellant_kg,
            consumed_propellant_kg: consumed,
            residual_propellant_kg: residual,
            structural_mass_kg: structural,
            burnout_mass_kg: mf,
            ignition_mass_kg: m0,
            delta_v_mps: delta_v,
            burn_time_s: burn_time,
            mass_flow_per_engine_kgps: mdot,
            total_mass_flow_kgps: mdot * engines,
            thrust_ignition_kn: thrust_sl_kn,
            isp_ignition_s: isp_sl,
            acc_ignition_g: engines * thrust_sl_kn * 1000.0 / (m0 * g0),
            acc_cutoff_g: engines * thrust_vac_kn * 1000.0 / (mf * g0),
        })
    }
}

fn check_mass(value: f64, what: &'static str) -> VehicleResult<()> {
    ensure_finite(value, what)?;
    if value < 0.0 {
        return Err(VehicleError::NegativeMass {
            stage: 0,
            what,
            value,
        });
    }
    Ok(())
}
