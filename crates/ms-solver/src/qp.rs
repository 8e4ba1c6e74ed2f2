//! Dense strictly convex quadratic programs.
//!
//! Solves
//!
//! ```text
//! minimize ½ dᵀBd + gᵀd  subject to  A_eq d = b_eq,  A_in d >= b_in
//! ```
//!
//! for positive definite `B` through the dual problem, which only has sign
//! constraints on the inequality multipliers. The dual is minimized with a
//! primal active-set method started from λ = 0, so no feasible primal start
//! is needed.

use crate::error::{SolverError, SolverResult};
use nalgebra::{DMatrix, DVector};

/// Relative diagonal shift keeping the dual Hessian invertible.
const DUAL_REGULARIZATION: f64 = 1e-12;
/// Multipliers beyond this mean the constraints cannot be met together.
const MAX_MULTIPLIER: f64 = 1e10;
const KKT_TOLERANCE: f64 = 1e-12;
const FEASIBILITY_TOLERANCE: f64 = 1e-6;

/// Step and multipliers of a solved QP.
#[derive(Debug, Clone, PartialEq)]
pub struct QpSolution {
    pub step: DVector<f64>,
    pub eq_multipliers: DVector<f64>,
    /// Non-negative, one per inequality row
    pub in_multipliers: DVector<f64>,
}

/// Solve the QP. Fails with [`SolverError::Infeasible`] when the constraints
/// have no common solution.
pub fn solve_qp(
    hessian: &DMatrix<f64>,
    gradient: &DVector<f64>,
    a_eq: &DMatrix<f64>,
    b_eq: &DVector<f64>,
    a_in: &DMatrix<f64>,
    b_in: &DVector<f64>,
) -> SolverResult<QpSolution> {
    let n = gradient.len();
    let me = a_eq.nrows();
    let mi = a_in.nrows();
    let m = me + mi;

    if hessian.shape() != (n, n) || a_eq.ncols() != n || a_in.ncols() != n {
        return Err(SolverError::ProblemSetup {
            what: format!(
                "QP dimension mismatch: n={}, B={:?}, A_eq={:?}, A_in={:?}",
                n,
                hessian.shape(),
                a_eq.shape(),
                a_in.shape()
            ),
        });
    }
    if b_eq.len() != me || b_in.len() != mi {
        return Err(SolverError::ProblemSetup {
            what: "QP right-hand side length mismatch".to_string(),
        });
    }

    let chol = hessian
        .clone()
        .cholesky()
        .ok_or_else(|| SolverError::Numeric {
            what: "QP Hessian is not positive definite".to_string(),
        })?;
    let binv_g = chol.solve(gradient);

    if m == 0 {
        return Ok(QpSolution {
            step: -binv_g,
            eq_multipliers: DVector::zeros(0),
            in_multipliers: DVector::zeros(0),
        });
    }

    let mut a = DMatrix::zeros(m, n);
    a.rows_mut(0, me).copy_from(a_eq);
    a.rows_mut(me, mi).copy_from(a_in);
    let mut rhs = DVector::zeros(m);
    rhs.rows_mut(0, me).copy_from(b_eq);
    rhs.rows_mut(me, mi).copy_from(b_in);

    // Dual: minimize ½ λᵀHλ - cᵀλ with H = A B⁻¹ Aᵀ, c = A B⁻¹ g + b
    let binv_at = chol.solve(&a.transpose());
    let h = &a * &binv_at;
    let c = &a * &binv_g + &rhs;
    let mut shifted = h.clone();
    let shift = DUAL_REGULARIZATION * h.trace().abs().max(1.0);
    for i in 0..m {
        shifted[(i, i)] += shift;
    }

    let free: Vec<bool> = (0..m).map(|i| i < me).collect();
    let lambda = polish(&h, &c, &free, solve_bounded_dual(&shifted, &c, &free)?);
    if lambda.amax() > MAX_MULTIPLIER {
        return Err(SolverError::Infeasible {
            what: format!("multiplier magnitude {:.3e}", lambda.amax()),
        });
    }

    let step = &binv_at * &lambda - &binv_g;

    let residual = &a * &step - &rhs;
    for i in 0..m {
        let tol = FEASIBILITY_TOLERANCE * (1.0 + rhs[i].abs());
        let violated = if i < me {
            residual[i].abs() > tol
        } else {
            residual[i] < -tol
        };
        if violated {
            return Err(SolverError::Infeasible {
                what: format!("constraint row {} residual {:.3e}", i, residual[i]),
            });
        }
    }

    Ok(QpSolution {
        step,
        eq_multipliers: lambda.rows(0, me).into_owned(),
        in_multipliers: lambda.rows(me, mi).into_owned(),
    })
}

/// Re-solve the final active set of the shifted dual with the exact `h`.
///
/// The shift leaves active rows off by `shift * λ_i`, which matters once
/// multipliers are large. Keeps `lambda` when the exact system is singular or
/// its solution breaks a sign constraint.
fn polish(
    h: &DMatrix<f64>,
    c: &DVector<f64>,
    free: &[bool],
    lambda: DVector<f64>,
) -> DVector<f64> {
    let active: Vec<usize> = (0..c.len())
        .filter(|&i| free[i] || lambda[i] > 0.0)
        .collect();
    if active.is_empty() {
        return lambda;
    }
    let k = active.len();
    let h_ff = DMatrix::from_fn(k, k, |r, s| h[(active[r], active[s])]);
    let c_f = DVector::from_fn(k, |r, _| c[active[r]]);
    let Some(sol) = h_ff.lu().solve(&c_f) else {
        return lambda;
    };
    let admissible = active
        .iter()
        .zip(sol.iter())
        .all(|(&i, v)| v.is_finite() && (free[i] || *v >= 0.0));
    if !admissible {
        return lambda;
    }
    let mut exact = DVector::zeros(c.len());
    for (r, &i) in active.iter().enumerate() {
        exact[i] = sol[r];
    }
    exact
}

/// Minimize ½ λᵀHλ - cᵀλ subject to λ_i >= 0 wherever `free[i]` is false.
fn solve_bounded_dual(
    h: &DMatrix<f64>,
    c: &DVector<f64>,
    free: &[bool],
) -> SolverResult<DVector<f64>> {
    let m = c.len();
    let mut lambda = DVector::zeros(m);
    // Sign-constrained multipliers start held at zero
    let mut held: Vec<bool> = free.iter().map(|&f| !f).collect();
    let max_iterations = 50 + 10 * m;

    for _ in 0..max_iterations {
        let active: Vec<usize> = (0..m).filter(|&i| !held[i]).collect();

        let mut candidate = DVector::zeros(m);
        if !active.is_empty() {
            let k = active.len();
            let h_ff = DMatrix::from_fn(k, k, |r, s| h[(active[r], active[s])]);
            let c_f = DVector::from_fn(k, |r, _| c[active[r]]);
            let sol = h_ff.lu().solve(&c_f).ok_or_else(|| SolverError::Numeric {
                what: "singular dual subproblem".to_string(),
            })?;
            for (r, &i) in active.iter().enumerate() {
                candidate[i] = sol[r];
            }
        }

        // Longest step towards the candidate that keeps every λ_i >= 0
        let mut alpha = 1.0;
        let mut blocking = None;
        for &i in &active {
            if !free[i] && candidate[i] < 0.0 {
                let a = lambda[i] / (lambda[i] - candidate[i]);
                if a < alpha {
                    alpha = a;
                    blocking = Some(i);
                }
            }
        }

        match blocking {
            None => {
                lambda = candidate;
                let gradient = h * &lambda - c;
                let mut entering = None;
                let mut most_negative = 0.0;
                for i in 0..m {
                    if held[i]
                        && gradient[i] < -KKT_TOLERANCE * (1.0 + c[i].abs())
                        && gradient[i] < most_negative
                    {
                        most_negative = gradient[i];
                        entering = Some(i);
                    }
                }
                match entering {
                    Some(i) => held[i] = false,
                    None => return Ok(lambda),
                }
            }
            Some(b) => {
                let direction = &candidate - &lambda;
                lambda += direction * alpha;
                lambda[b] = 0.0;
                held[b] = true;
                for &i in &active {
                    if !free[i] && lambda[i] <= 0.0 {
                        lambda[i] = 0.0;
                        held[i] = true;
                    }
                }
            }
        }
    }

    Err(SolverError::Numeric {
        what: "QP active set did not terminate".to_string(),
    })
}
