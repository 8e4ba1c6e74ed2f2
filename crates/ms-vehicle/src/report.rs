//! Metric table for a resolved vehicle.

use crate::stage::{StageConfig, StageState};
use crate::vehicle::{Vehicle, VehicleSnapshot};
use ms_core::round_to;
use serde::Serialize;
use std::fmt;

/// One metric across all stages, plus the vehicle-level value if it has one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricRow {
    pub metric: &'static str,
    pub unit: &'static str,
    /// Printed decimals
    #[serde(skip)]
    pub decimals: i32,
    /// Values in bottom-to-top stage order
    pub stages: Vec<f64>,
    pub vehicle: Option<f64>,
}

/// Metric-by-stage table, stage columns in bottom-to-top order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub vehicle_name: String,
    pub stage_labels: Vec<String>,
    pub rows: Vec<MetricRow>,
}

type Extract = fn(&StageConfig, &StageState) -> f64;

const METRICS: &[(&str, &str, i32, Extract)] = &[
    ("delta-v", "m/s", 0, |_, s| s.delta_v_mps),
    ("ignition mass m0", "kg", 1, |_, s| s.ignition_mass_kg),
    ("burnout mass mf", "kg", 1, |_, s| s.burnout_mass_kg),
    ("stage mass m0", "kg", 1, |_, s| s.stage_ignition_mass_kg()),
    ("stage mass mf", "kg", 1, |_, s| s.stage_burnout_mass_kg()),
    ("upper mass", "kg", 1, |_, s| s.upper_mass_kg),
    ("propellant", "kg", 1, |_, s| s.propellant_kg),
    ("propellant consumption", "%", 1, |c, _| {
        c.propellant_consumption * 100.0
    }),
    ("consumed propellant", "kg", 1, |_, s| s.consumed_propellant_kg),
    ("residual propellant", "kg", 1, |_, s| s.residual_propellant_kg),
    ("structural ratio", "-", 3, |c, _| c.structural_ratio),
    ("structural mass", "kg", 1, |_, s| s.structural_mass_kg),
    ("jettison", "kg", 1, |c, _| c.jettison.value),
    ("Isp (vac)", "s", 1, |c, _| c.isp_vac.value),
    ("engines", "-", 0, |c, _| f64::from(c.engine_count)),
    ("thrust (vac)", "kN/engine", 1, |c, _| c.thrust_vac.value / 1000.0),
    ("burn time", "s", 1, |_, s| s.burn_time_s),
    ("mass flow", "kg/s/engine", 1, |_, s| s.mass_flow_per_engine_kgps),
    ("mass flow", "kg/s", 1, |_, s| s.total_mass_flow_kgps),
    ("Isp (ignition)", "s", 1, |_, s| s.isp_ignition_s),
    ("thrust (ignition)", "kN/engine", 1, |_, s| s.thrust_ignition_kn),
    ("nozzle exit area", "m2/engine", 3, |c, _| {
        c.nozzle_exit_area.value
    }),
    ("acceleration @ ignition", "G", 2, |_, s| s.acc_ignition_g),
    ("acceleration @ cutoff", "G", 2, |_, s| s.acc_cutoff_g),
];

impl Report {
    /// Tabulate a snapshot produced by `vehicle`.
    pub fn build(vehicle: &Vehicle, snapshot: &VehicleSnapshot) -> Self {
        let configs: Vec<&StageConfig> = vehicle.stages().iter().map(|m| m.config()).collect();

        let mut rows: Vec<MetricRow> = METRICS
            .iter()
            .map(|&(metric, unit, decimals, extract)| MetricRow {
                metric,
                unit,
                decimals,
                stages: configs
                    .iter()
                    .zip(&snapshot.stages)
                    .map(|(cfg, state)| extract(cfg, state))
                    .collect(),
                vehicle: None,
            })
            .collect();

        rows[0].vehicle = Some(snapshot.delta_v_sum_mps);
        rows.insert(
            13,
            MetricRow {
                metric: "payload",
                unit: "kg",
                decimals: 1,
                stages: Vec::new(),
                vehicle: Some(snapshot.payload_kg),
            },
        );

        Self {
            vehicle_name: vehicle.name().to_string(),
            stage_labels: (1..=snapshot.stages.len())
                .map(|i| format!("stage {i}"))
                .collect(),
            rows,
        }
    }

    pub fn row(&self, metric: &str) -> Option<&MetricRow> {
        self.rows.iter().find(|r| r.metric == metric)
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label_width = self
            .rows
            .iter()
            .map(|r| r.metric.len() + r.unit.len() + 3)
            .max()
            .unwrap_or(0);

        writeln!(f, "{}", self.vehicle_name)?;
        write!(f, "{:<label_width$}", "")?;
        for label in &self.stage_labels {
            write!(f, " {label:>12}")?;
        }
        writeln!(f, " {:>12}", "vehicle")?;

        for row in &self.rows {
            let label = format!("{} [{}]", row.metric, row.unit);
            write!(f, "{label:<label_width$}")?;
            for i in 0..self.stage_labels.len() {
                match row.stages.get(i) {
                    Some(v) => write!(f, " {:>12}", format_value(*v, row.decimals))?,
                    None => write!(f, " {:>12}", "")?,
                }
            }
            match row.vehicle {
                Some(v) => writeln!(f, " {:>12}", format_value(v, row.decimals))?,
                None => writeln!(f, " {:>12}", "")?,
            }
        }
        Ok(())
    }
}

fn format_value(v: f64, decimals: i32) -> String {
    let places = decimals.max(0) as usize;
    format!("{:.*}", places, round_to(v, decimals))
}
