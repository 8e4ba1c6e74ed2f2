//! ms-vehicle: stage physics and vehicle mass closure.
//!
//! A [`StageModel`] turns an assigned propellant mass and the mass stacked
//! above it into a fully resolved [`StageState`]. A [`Vehicle`] owns the
//! ordered stages (index 0 = first/bottom stage) plus payload and target
//! velocity increment, and resolves a propellant vector top-down into an
//! immutable [`VehicleSnapshot`].
//!
//! # Example
//!
//! ```
//! use ms_core::units::{kg, kmps, kn, s};
//! use ms_vehicle::{StageConfig, Vehicle};
//!
//! let first = StageConfig::new(0.9, s(280.0), kn(50.0)).with_engine_count(4);
//! let second = StageConfig::new(0.88, s(320.0), kn(20.0));
//! let vehicle = Vehicle::new("demo", vec![first, second], kg(200.0), kmps(9.0)).unwrap();
//!
//! let snapshot = vehicle.resolve(&[14_000.0, 2_000.0]).unwrap();
//! assert_eq!(snapshot.stages[0].upper_mass_kg, snapshot.stages[1].ignition_mass_kg);
//! println!("total dV = {:.0} m/s", snapshot.delta_v_sum_mps);
//! ```

pub mod error;
pub mod payload;
pub mod report;
pub mod stage;
pub mod vehicle;

pub use error::{VehicleError, VehicleResult};
pub use payload::{PayloadPoint, delta_v_for_payload, max_payload_for_delta_v, payload_sweep};
pub use report::{MetricRow, Report};
pub use stage::{StageConfig, StageModel, StageState};
pub use vehicle::{Vehicle, VehicleSnapshot};
