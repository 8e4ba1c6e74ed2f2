//! Optimizer driver: propellant split minimizing lift-off mass.

use crate::constraint::{ConstraintSpec, ConstraintValue, evaluate_all};
use crate::error::{SizingError, SizingResult};
use crate::problem::SizingProblem;
use ms_solver::{SqpConfig, SqpProgress, SqpStatus, sqp_solve_with_progress};
use ms_vehicle::{Vehicle, VehicleSnapshot};
use nalgebra::DVector;
use serde::Serialize;
use tracing::{info, warn};

/// Options of one sizing run.
#[derive(Debug, Clone, PartialEq)]
pub struct OptimizeOptions {
    /// Starting propellant vector [kg]; `None` uses [`default_initial_guess`]
    pub initial_guess_kg: Option<Vec<f64>>,
    /// Lower bound on every stage's propellant [kg]
    pub min_propellant_kg: f64,
    /// Largest `|delta_v_sum - target|` accepted from a converged run [m/s]
    pub delta_v_tolerance_mps: f64,
    /// Its `constraint_tolerance` also bounds every inequality in its own unit
    pub solver: SqpConfig,
}

impl Default for OptimizeOptions {
    fn default() -> Self {
        Self {
            initial_guess_kg: None,
            min_propellant_kg: 1.0,
            delta_v_tolerance_mps: 1e-3,
            solver: SqpConfig::default(),
        }
    }
}

/// 1000 kg on the first stage, a tenth of the previous stage on each stage above.
pub fn default_initial_guess(num_stages: usize, min_propellant_kg: f64) -> Vec<f64> {
    (0..num_stages)
        .map(|i| (1000.0 * 0.1_f64.powi(i as i32)).max(min_propellant_kg))
        .collect()
}

/// Converged sizing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SizingSolution {
    pub propellant_kg: Vec<f64>,
    pub snapshot: VehicleSnapshot,
    pub constraints: Vec<ConstraintValue>,
    pub iterations: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    MaxIterations,
    LineSearch,
    /// No QP subproblem could be solved, even with softened constraints
    QpInconsistent,
    /// The model could not be differentiated at an accepted point
    EvaluationFailed,
    /// The solver converged on a split the vehicle cannot resolve
    Unresolvable,
    /// The converged split misses the target or a constraint in real units
    Infeasible,
}

/// The optimizer stopped without a feasible optimum.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SizingFailure {
    pub reason: FailureReason,
    pub message: String,
    /// Last iterate
    pub propellant_kg: Vec<f64>,
    /// Snapshot of the last iterate, when it still resolves
    pub snapshot: Option<VehicleSnapshot>,
    /// Signed `delta_v_sum - target` at the last iterate
    pub delta_v_residual_mps: f64,
    pub constraints: Vec<ConstraintValue>,
    pub iterations: usize,
}

impl SizingFailure {
    /// Constraints violated by more than `tolerance`.
    pub fn violated(&self, tolerance: f64) -> impl Iterator<Item = &ConstraintValue> {
        self.constraints
            .iter()
            .filter(move |c| !c.is_satisfied(tolerance))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SizingOutcome {
    Converged(SizingSolution),
    Failed(SizingFailure),
}

impl SizingOutcome {
    pub fn is_converged(&self) -> bool {
        matches!(self, SizingOutcome::Converged(_))
    }

    pub fn propellant_kg(&self) -> &[f64] {
        match self {
            SizingOutcome::Converged(s) => &s.propellant_kg,
            SizingOutcome::Failed(f) => &f.propellant_kg,
        }
    }

    pub fn snapshot(&self) -> Option<&VehicleSnapshot> {
        match self {
            SizingOutcome::Converged(s) => Some(&s.snapshot),
            SizingOutcome::Failed(f) => f.snapshot.as_ref(),
        }
    }
}

/// Size `vehicle` for its target delta-v under `constraints`.
pub fn optimize(
    vehicle: &Vehicle,
    constraints: &[ConstraintSpec],
    options: &OptimizeOptions,
) -> SizingResult<SizingOutcome> {
    optimize_with_progress(vehicle, constraints, options, None)
}

/// [`optimize`] with a callback invoked after every accepted SQP step.
pub fn optimize_with_progress(
    vehicle: &Vehicle,
    constraints: &[ConstraintSpec],
    options: &OptimizeOptions,
    progress: Option<&mut dyn FnMut(&SqpProgress)>,
) -> SizingResult<SizingOutcome> {
    let n = vehicle.num_stages();
    for (index, spec) in constraints.iter().enumerate() {
        spec.validate(index, n)?;
    }

    let min = options.min_propellant_kg;
    if !(min.is_finite() && min > 0.0) {
        return Err(SizingError::InvalidGuess {
            what: format!("minimum propellant must be positive, got {min}"),
        });
    }

    let guess = match &options.initial_guess_kg {
        Some(g) => g.clone(),
        None => default_initial_guess(n, min),
    };
    if guess.len() != n {
        return Err(SizingError::InvalidGuess {
            what: format!("{} entries for {} stages", guess.len(), n),
        });
    }
    if let Some(bad) = guess.iter().find(|v| !v.is_finite()) {
        return Err(SizingError::InvalidGuess {
            what: format!("non-finite entry {bad}"),
        });
    }

    // The solver starts from the bound-clamped guess; it must resolve
    let start: Vec<f64> = guess.iter().map(|v| v.max(min)).collect();
    vehicle.resolve(&start)?;

    let problem = SizingProblem::new(vehicle, constraints, min);
    let x0 = DVector::from_vec(start);
    let result = sqp_solve_with_progress(&problem, &x0, &options.solver, progress)?;

    let propellant_kg = result.x.as_slice().to_vec();
    let snapshot = vehicle.resolve(&propellant_kg).ok();
    let values = match &snapshot {
        Some(snap) => evaluate_all(constraints, snap)?,
        None => Vec::new(),
    };

    let tolerance = options.solver.constraint_tolerance;
    let shortfall = match &snapshot {
        Some(snap) => real_unit_shortfall(snap, &values, tolerance, options.delta_v_tolerance_mps),
        None => None,
    };

    match (result.status, snapshot) {
        (SqpStatus::Converged, Some(snapshot)) if shortfall.is_none() => {
            info!(
                iterations = result.iterations,
                liftoff_mass_kg = snapshot.initial_mass_kg(),
                delta_v_mps = snapshot.delta_v_sum_mps,
                "sizing converged"
            );
            Ok(SizingOutcome::Converged(SizingSolution {
                propellant_kg,
                snapshot,
                constraints: values,
                iterations: result.iterations,
            }))
        }
        (status, snapshot) => {
            let (reason, message) = match status {
                SqpStatus::Converged if snapshot.is_none() => (
                    FailureReason::Unresolvable,
                    "converged split does not resolve".to_string(),
                ),
                SqpStatus::Converged => (
                    FailureReason::Infeasible,
                    shortfall.unwrap_or_default(),
                ),
                SqpStatus::MaxIterations => (FailureReason::MaxIterations, result.message),
                SqpStatus::LineSearchFailed => (FailureReason::LineSearch, result.message),
                SqpStatus::QpFailed => (FailureReason::QpInconsistent, result.message),
                SqpStatus::EvaluationFailed => (FailureReason::EvaluationFailed, result.message),
            };
            warn!(?reason, iterations = result.iterations, %message, "sizing failed");
            Ok(SizingOutcome::Failed(SizingFailure {
                reason,
                message,
                propellant_kg,
                delta_v_residual_mps: result.equality.get(0).copied().unwrap_or(f64::NAN),
                snapshot,
                constraints: values,
                iterations: result.iterations,
            }))
        }
    }
}

/// What a resolved split misses in real units, if anything.
fn real_unit_shortfall(
    snapshot: &VehicleSnapshot,
    values: &[ConstraintValue],
    tolerance: f64,
    delta_v_tolerance_mps: f64,
) -> Option<String> {
    let residual = snapshot.delta_v_residual_mps();
    if residual.abs() > delta_v_tolerance_mps {
        return Some(format!("delta-v misses the target by {residual:.3e} m/s"));
    }
    values
        .iter()
        .find(|c| !c.is_satisfied(tolerance))
        .map(|c| format!("{} violated by {:.3e}", c.spec, c.violation()))
}
