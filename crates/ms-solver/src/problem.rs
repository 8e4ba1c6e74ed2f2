//! Problem definition for constrained minimization.

use crate::error::SolverResult;
use nalgebra::DVector;

/// Objective and constraint values at one point.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub objective: f64,
    /// Feasible when zero
    pub equality: DVector<f64>,
    /// Feasible when non-negative
    pub inequality: DVector<f64>,
}

impl Evaluation {
    /// Largest constraint violation.
    pub fn max_violation(&self) -> f64 {
        let eq = self.equality.iter().fold(0.0_f64, |acc, c| acc.max(c.abs()));
        eq.max(self.inequality_violation())
    }

    /// Largest amount by which an inequality is negative.
    pub fn inequality_violation(&self) -> f64 {
        self.inequality.iter().fold(0.0_f64, |acc, c| acc.max(-c))
    }

    /// Values stacked as `[objective, equality..., inequality...]`.
    pub(crate) fn stacked(&self) -> DVector<f64> {
        let me = self.equality.len();
        let mi = self.inequality.len();
        let mut v = DVector::zeros(1 + me + mi);
        v[0] = self.objective;
        v.rows_mut(1, me).copy_from(&self.equality);
        v.rows_mut(1 + me, mi).copy_from(&self.inequality);
        v
    }
}

/// A smooth constrained minimization problem.
///
/// One [`NlpProblem::evaluate`] call yields objective and all constraints, so
/// implementations that share an expensive model evaluation compute it once.
pub trait NlpProblem: Sync {
    fn dimension(&self) -> usize;

    fn num_equality(&self) -> usize;

    fn num_inequality(&self) -> usize;

    fn lower_bounds(&self) -> DVector<f64>;

    fn upper_bounds(&self) -> DVector<f64>;

    fn evaluate(&self, x: &DVector<f64>) -> SolverResult<Evaluation>;
}
