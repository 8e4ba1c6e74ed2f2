use ms_solver::{Evaluation, NlpProblem, SolverResult, SqpConfig, SqpStatus, sqp_solve};
use nalgebra::DVector;

/// min x0 + x1 on the circle x0² + x1² = 2
struct CircleLine;

impl NlpProblem for CircleLine {
    fn dimension(&self) -> usize {
        2
    }
    fn num_equality(&self) -> usize {
        1
    }
    fn num_inequality(&self) -> usize {
        0
    }
    fn lower_bounds(&self) -> DVector<f64> {
        DVector::from_element(2, f64::NEG_INFINITY)
    }
    fn upper_bounds(&self) -> DVector<f64> {
        DVector::from_element(2, f64::INFINITY)
    }
    fn evaluate(&self, x: &DVector<f64>) -> SolverResult<Evaluation> {
        Ok(Evaluation {
            objective: x[0] + x[1],
            equality: DVector::from_element(1, x[0] * x[0] + x[1] * x[1] - 2.0),
            inequality: DVector::zeros(0),
        })
    }
}

/// Rosenbrock restricted to the disk x0² + x1² <= 1.5
struct RosenbrockDisk;

impl NlpProblem for RosenbrockDisk {
    fn dimension(&self) -> usize {
        2
    }
    fn num_equality(&self) -> usize {
        0
    }
    fn num_inequality(&self) -> usize {
        1
    }
    fn lower_bounds(&self) -> DVector<f64> {
        DVector::from_element(2, f64::NEG_INFINITY)
    }
    fn upper_bounds(&self) -> DVector<f64> {
        DVector::from_element(2, f64::INFINITY)
    }
    fn evaluate(&self, x: &DVector<f64>) -> SolverResult<Evaluation> {
        let objective = (1.0 - x[0]).powi(2) + 100.0 * (x[1] - x[0] * x[0]).powi(2);
        Ok(Evaluation {
            objective,
            equality: DVector::zeros(0),
            inequality: DVector::from_element(1, 1.5 - x[0] * x[0] - x[1] * x[1]),
        })
    }
}

#[test]
fn circle_minimum() {
    let x0 = DVector::from_vec(vec![0.5, -2.0]);
    let result = sqp_solve(&CircleLine, &x0, &SqpConfig::default()).unwrap();

    assert_eq!(result.status, SqpStatus::Converged);
    assert!((result.x[0] + 1.0).abs() < 1e-5, "{}", result.x);
    assert!((result.x[1] + 1.0).abs() < 1e-5, "{}", result.x);
    assert!(result.max_violation < 1e-6);
}

#[test]
fn rosenbrock_on_disk_boundary() {
    let x0 = DVector::from_vec(vec![-1.2, 1.0]);
    let result = sqp_solve(&RosenbrockDisk, &x0, &SqpConfig::default()).unwrap();

    assert_eq!(result.status, SqpStatus::Converged);
    assert!((result.x[0] - 0.9072).abs() < 1e-3, "{}", result.x);
    assert!((result.x[1] - 0.8228).abs() < 1e-3, "{}", result.x);
    // Constraint is active at the optimum
    assert!(result.inequality[0].abs() < 1e-5);
}

#[test]
fn parallel_gradients_give_same_iterates() {
    let x0 = DVector::from_vec(vec![-1.2, 1.0]);
    let serial = sqp_solve(&RosenbrockDisk, &x0, &SqpConfig::default()).unwrap();
    let parallel = sqp_solve(
        &RosenbrockDisk,
        &x0,
        &SqpConfig {
            parallel_gradients: true,
            ..SqpConfig::default()
        },
    )
    .unwrap();

    assert_eq!(serial.iterations, parallel.iterations);
    assert_eq!(serial.x, parallel.x);
}
