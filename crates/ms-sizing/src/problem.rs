//! Adapter exposing a vehicle sizing task as a constrained NLP.

use crate::constraint::ConstraintSpec;
use ms_solver::{Evaluation, NlpProblem, SolverError, SolverResult};
use ms_vehicle::{Vehicle, VehicleError};
use nalgebra::DVector;

/// Minimize lift-off mass subject to `delta_v_sum == target` and the
/// configured inequality constraints.
///
/// Variables are the per-stage propellant masses [kg], bounded below by
/// `min_propellant_kg` and unbounded above.
pub struct SizingProblem<'a> {
    vehicle: &'a Vehicle,
    constraints: &'a [ConstraintSpec],
    min_propellant_kg: f64,
}

impl<'a> SizingProblem<'a> {
    /// Constraints are assumed validated against the vehicle.
    pub fn new(
        vehicle: &'a Vehicle,
        constraints: &'a [ConstraintSpec],
        min_propellant_kg: f64,
    ) -> Self {
        Self {
            vehicle,
            constraints,
            min_propellant_kg,
        }
    }

    pub fn vehicle(&self) -> &Vehicle {
        self.vehicle
    }
}

impl NlpProblem for SizingProblem<'_> {
    fn dimension(&self) -> usize {
        self.vehicle.num_stages()
    }

    fn num_equality(&self) -> usize {
        1
    }

    fn num_inequality(&self) -> usize {
        self.constraints.len()
    }

    fn lower_bounds(&self) -> DVector<f64> {
        DVector::from_element(self.dimension(), self.min_propellant_kg)
    }

    fn upper_bounds(&self) -> DVector<f64> {
        DVector::from_element(self.dimension(), f64::INFINITY)
    }

    fn evaluate(&self, x: &DVector<f64>) -> SolverResult<Evaluation> {
        // One resolve serves the objective and every constraint
        let snapshot = self.vehicle.resolve(x.as_slice()).map_err(to_solver)?;

        let inequality = self
            .constraints
            .iter()
            .map(|spec| {
                spec.evaluate(&snapshot)
                    .map_err(|e| SolverError::ProblemSetup { what: e.to_string() })
            })
            .collect::<SolverResult<Vec<f64>>>()?;

        Ok(Evaluation {
            objective: snapshot.initial_mass_kg(),
            equality: DVector::from_element(1, snapshot.delta_v_residual_mps()),
            inequality: DVector::from_vec(inequality),
        })
    }
}

/// Degenerate points are merely infeasible to the solver; anything else is a
/// setup mistake.
fn to_solver(err: VehicleError) -> SolverError {
    match err {
        VehicleError::Degenerate { .. }
        | VehicleError::NegativeMass { .. }
        | VehicleError::Core(_) => SolverError::Evaluation {
            what: err.to_string(),
        },
        other => SolverError::ProblemSetup {
            what: other.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ms_core::units::{kg, kmps, kn, s};
    use ms_vehicle::StageConfig;

    fn vehicle() -> Vehicle {
        let first = StageConfig::new(0.9, s(280.0), kn(50.0)).with_engine_count(4);
        let second = StageConfig::new(0.88, s(320.0), kn(20.0));
        Vehicle::new("demo", vec![first, second], kg(200.0), kmps(9.0)).unwrap()
    }

    #[test]
    fn evaluation_layout() {
        let v = vehicle();
        let constraints = [
            ConstraintSpec::structural_mass_min(1, 300.0),
            ConstraintSpec::cutoff_acceleration_max(0, 8.0),
        ];
        let problem = SizingProblem::new(&v, &constraints, 1.0);
        assert_eq!(problem.dimension(), 2);
        assert_eq!(problem.num_inequality(), 2);
        assert_eq!(problem.lower_bounds(), DVector::from_element(2, 1.0));

        let x = DVector::from_vec(vec![12_000.0, 2_000.0]);
        let eval = problem.evaluate(&x).unwrap();
        let snap = v.resolve(&[12_000.0, 2_000.0]).unwrap();

        assert_eq!(eval.objective, snap.initial_mass_kg());
        assert_eq!(eval.equality[0], snap.delta_v_sum_mps - 9000.0);
        assert_eq!(eval.inequality[0], snap.stages[1].structural_mass_kg - 300.0);
        assert_eq!(eval.inequality[1], 8.0 - snap.stages[0].acc_cutoff_g);
    }

    #[test]
    fn degenerate_point_is_an_evaluation_failure() {
        let stage = StageConfig::new(0.9, s(300.0), kn(10.0));
        let v = Vehicle::new("bare", vec![stage], kg(0.0), kmps(1.0)).unwrap();
        let problem = SizingProblem::new(&v, &[], 1.0);
        let err = problem.evaluate(&DVector::from_element(1, 0.0)).unwrap_err();
        assert!(matches!(err, SolverError::Evaluation { .. }));
    }
}
