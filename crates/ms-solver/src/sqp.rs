//! Sequential quadratic programming with an exact-penalty line search.

use crate::error::{SolverError, SolverResult};
use crate::jacobian::bounded_jacobian;
use crate::problem::{Evaluation, NlpProblem};
use crate::qp::solve_qp;
use nalgebra::{DMatrix, DVector};
use tracing::{debug, info, warn};

/// SQP solver configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct SqpConfig {
    /// Maximum major iterations
    pub max_iterations: usize,
    /// Largest constraint violation accepted at convergence. Equalities are
    /// measured scaled, inequalities both scaled and in their own units.
    pub constraint_tolerance: f64,
    /// Relative change of the scaled objective treated as stationary
    pub objective_tolerance: f64,
    /// Infinity norm of the scaled step treated as stationary
    pub step_tolerance: f64,
    /// Relative finite difference step
    pub fd_epsilon: f64,
    /// Maximum line search iterations
    pub max_line_search_iters: usize,
    /// Sufficient decrease coefficient
    pub armijo: f64,
    /// Line search backtracking factor
    pub backtrack: f64,
    /// QP attempts with progressively relaxed linearized constraints, the
    /// last one elastic
    pub max_relaxations: usize,
    /// Fresh scalings from the current iterate after a failed QP or line search
    pub max_restarts: usize,
    /// Evaluate gradient columns on the rayon pool
    pub parallel_gradients: bool,
}

impl Default for SqpConfig {
    fn default() -> Self {
        Self {
            max_iterations: 200,
            constraint_tolerance: 1e-6,
            objective_tolerance: 1e-9,
            step_tolerance: 1e-10,
            fd_epsilon: 1.49e-8,
            max_line_search_iters: 30,
            armijo: 1e-4,
            backtrack: 0.5,
            max_relaxations: 12,
            max_restarts: 2,
            parallel_gradients: false,
        }
    }
}

/// How the iteration ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqpStatus {
    Converged,
    MaxIterations,
    /// No step along the search direction reduced the merit function
    LineSearchFailed,
    /// No QP subproblem could be solved, even in elastic mode
    QpFailed,
    /// Gradients could not be evaluated at the accepted point
    EvaluationFailed,
}

/// Final iterate of an SQP run.
#[derive(Debug, Clone, PartialEq)]
pub struct SqpResult {
    pub x: DVector<f64>,
    pub objective: f64,
    /// Unscaled equality values at `x`
    pub equality: DVector<f64>,
    /// Unscaled inequality values at `x`
    pub inequality: DVector<f64>,
    pub max_violation: f64,
    pub iterations: usize,
    pub status: SqpStatus,
    pub message: String,
}

impl SqpResult {
    pub fn converged(&self) -> bool {
        self.status == SqpStatus::Converged
    }
}

/// Snapshot passed to the progress callback after every accepted step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SqpProgress {
    pub iteration: usize,
    pub objective: f64,
    pub max_violation: f64,
    /// Accepted line search fraction of the full step
    pub step_length: f64,
}

/// Minimize `problem` starting from `x0`.
pub fn sqp_solve<P>(problem: &P, x0: &DVector<f64>, config: &SqpConfig) -> SolverResult<SqpResult>
where
    P: NlpProblem + ?Sized,
{
    sqp_solve_with_progress(problem, x0, config, None)
}

/// Minimize `problem`, reporting every accepted step to `progress`.
///
/// Returns `Err` only when the problem is malformed or cannot be evaluated at
/// the (bound-clamped) starting point. Running out of iterations or failing to
/// find a descent step is reported through [`SqpResult::status`].
///
/// Scaling is fixed from the point a pass starts at. When a pass that made
/// progress stops on a failed QP or line search, a new pass starts from its
/// last iterate, up to [`SqpConfig::max_restarts`] times. Iterations count
/// across passes.
pub fn sqp_solve_with_progress<P>(
    problem: &P,
    x0: &DVector<f64>,
    config: &SqpConfig,
    mut progress: Option<&mut dyn FnMut(&SqpProgress)>,
) -> SolverResult<SqpResult>
where
    P: NlpProblem + ?Sized,
{
    let n = problem.dimension();
    let lower = problem.lower_bounds();
    let upper = problem.upper_bounds();
    check_setup(x0, &lower, &upper, n)?;

    let mut start = x0.clone();
    let mut first_iteration = 0;
    let mut restarts = 0;
    let mut previous: Option<SqpResult> = None;
    loop {
        let pass = solve_pass(problem, &start, first_iteration, config, &mut progress);
        let result = match (pass, previous.take()) {
            (Ok(result), _) => result,
            (Err(SolverError::Evaluation { what }), Some(previous)) => {
                warn!(%what, "restart point cannot be differentiated");
                return Ok(previous);
            }
            (Err(err), _) => return Err(err),
        };
        let stalled = matches!(
            result.status,
            SqpStatus::QpFailed | SqpStatus::LineSearchFailed
        );
        if !stalled || result.iterations == first_iteration || restarts >= config.max_restarts {
            return Ok(result);
        }
        restarts += 1;
        info!(
            iterations = result.iterations,
            status = ?result.status,
            restarts,
            "rescaling from current iterate"
        );
        first_iteration = result.iterations;
        start = result.x.clone();
        previous = Some(result);
    }
}

/// One SQP pass with scaling fixed at `x0`, numbering iterations from
/// `first_iteration`.
fn solve_pass<P>(
    problem: &P,
    x0: &DVector<f64>,
    first_iteration: usize,
    config: &SqpConfig,
    progress: &mut Option<&mut dyn FnMut(&SqpProgress)>,
) -> SolverResult<SqpResult>
where
    P: NlpProblem + ?Sized,
{
    let n = problem.dimension();
    let me = problem.num_equality();
    let mi = problem.num_inequality();
    let lower = problem.lower_bounds();
    let upper = problem.upper_bounds();

    // Work in z = x / sigma so every variable starts at order one
    let sigma = x0.map(|v| v.abs().max(1.0));
    let lz = lower.component_div(&sigma);
    let uz = upper.component_div(&sigma);
    let mut z = clamp(&x0.component_div(&sigma), &lz, &uz);

    // Rescaling can round just past a bound, so clamp again in x
    let to_x = |z: &DVector<f64>| clamp(&z.component_mul(&sigma), &lower, &upper);
    let raw_stacked = |z: &DVector<f64>| -> SolverResult<DVector<f64>> {
        Ok(evaluate_checked(problem, &to_x(z), me, mi)?.stacked())
    };
    let jacobian_at = |z: &DVector<f64>, f_z: &DVector<f64>| {
        bounded_jacobian(
            z,
            f_z,
            &raw_stacked,
            &lz,
            &uz,
            config.fd_epsilon,
            config.parallel_gradients,
        )
    };

    let mut raw = evaluate_checked(problem, &to_x(&z), me, mi)?;
    let raw_values = raw.stacked();
    let raw_jac = jacobian_at(&z, &raw_values)?;

    // Row weights: objective by its magnitude, constraints by gradient size
    let mut weights = DVector::zeros(1 + me + mi);
    weights[0] = 1.0 / raw.objective.abs().max(1.0);
    for r in 1..1 + me + mi {
        weights[r] = 1.0 / raw_jac.row(r).amax().max(1.0);
    }

    let mut values = raw_values.component_mul(&weights);
    let mut jac = scale_rows(&raw_jac, &weights);
    let mut hessian = DMatrix::<f64>::identity(n, n);
    let mut rho = DVector::<f64>::zeros(me + mi);

    let finish = |z: &DVector<f64>,
                  raw: Evaluation,
                  iterations: usize,
                  status: SqpStatus,
                  message: String| {
        let max_violation = raw.max_violation();
        SqpResult {
            x: to_x(z),
            objective: raw.objective,
            equality: raw.equality,
            inequality: raw.inequality,
            max_violation,
            iterations,
            status,
            message,
        }
    };

    for iter in first_iteration..config.max_iterations {
        let violation = scaled_violation(&values, me, mi);

        if hessian.clone().cholesky().is_none() {
            warn!(iter, "BFGS approximation lost positive definiteness, resetting");
            hessian = DMatrix::identity(n, n);
        }

        let Some((d, lambda_eq, lambda_in)) =
            solve_relaxed_qp(&hessian, &jac, &values, &z, &lz, &uz, me, mi, config)
        else {
            warn!(iter, "QP subproblem inconsistent after all relaxations");
            return Ok(finish(
                &z,
                raw,
                iter,
                SqpStatus::QpFailed,
                "linearized constraints are inconsistent".to_string(),
            ));
        };

        let step_norm = d.amax();
        let feasible = violation <= config.constraint_tolerance
            && raw.inequality_violation() <= config.constraint_tolerance;
        if step_norm <= config.step_tolerance && feasible {
            info!(iter, objective = raw.objective, "SQP converged on zero step");
            return Ok(finish(&z, raw, iter, SqpStatus::Converged, String::new()));
        }

        // Exact penalty weights never drop below the current multipliers
        for j in 0..me + mi {
            let lam = if j < me { lambda_eq[j] } else { lambda_in[j - me] };
            rho[j] = lam.abs().max(0.5 * (rho[j] + lam.abs()));
        }

        let g = jac.row(0).transpose();
        let phi0 = merit(&values, &rho, me, mi);
        let derivative = g.dot(&d) - (phi0 - values[0]);

        let mut alpha = 1.0;
        let mut accepted = None;
        for _ in 0..config.max_line_search_iters {
            let z_trial = clamp(&(&z + &d * alpha), &lz, &uz);
            let (phi, trial) = match evaluate_checked(problem, &to_x(&z_trial), me, mi) {
                Ok(eval) => {
                    let stacked = eval.stacked();
                    let scaled = stacked.component_mul(&weights);
                    let phi = merit(&scaled, &rho, me, mi);
                    (phi, Some((eval, stacked, scaled)))
                }
                Err(SolverError::Evaluation { what }) => {
                    debug!(iter, alpha, %what, "trial point rejected");
                    (f64::INFINITY, None)
                }
                Err(err) => return Err(err),
            };

            let sufficient = phi <= phi0 + config.armijo * alpha * derivative.min(0.0);
            if phi.is_finite() && (sufficient || (derivative >= 0.0 && phi < phi0)) {
                if let Some(trial) = trial {
                    accepted = Some((z_trial, trial));
                    break;
                }
            }
            alpha *= config.backtrack;
        }

        let Some((z_new, (raw_new, raw_values_new, values_new))) = accepted else {
            warn!(iter, step_norm, "line search failed");
            return Ok(finish(
                &z,
                raw,
                iter,
                SqpStatus::LineSearchFailed,
                format!("no merit decrease along step of norm {step_norm:.3e}"),
            ));
        };

        let jac_new = match jacobian_at(&z_new, &raw_values_new) {
            Ok(j) => scale_rows(&j, &weights),
            Err(SolverError::Evaluation { what }) => {
                return Ok(finish(
                    &z_new,
                    raw_new,
                    iter + 1,
                    SqpStatus::EvaluationFailed,
                    what,
                ));
            }
            Err(err) => return Err(err),
        };

        // Damped BFGS on the Lagrangian gradient
        let s = &z_new - &z;
        let y = lagrangian_gradient(&jac_new, &lambda_eq, &lambda_in, me, mi)
            - lagrangian_gradient(&jac, &lambda_eq, &lambda_in, me, mi);
        update_bfgs(&mut hessian, &s, y);

        let objective_change = (values_new[0] - values[0]).abs();
        z = z_new;
        raw = raw_new;
        values = values_new;
        jac = jac_new;

        let violation = scaled_violation(&values, me, mi);
        debug!(
            iter,
            alpha,
            objective = raw.objective,
            violation,
            "SQP step accepted"
        );
        if let Some(callback) = progress.as_mut() {
            callback(&SqpProgress {
                iteration: iter + 1,
                objective: raw.objective,
                max_violation: raw.max_violation(),
                step_length: alpha,
            });
        }

        let stationary = objective_change <= config.objective_tolerance * values[0].abs().max(1.0)
            || s.amax() <= config.step_tolerance;
        let feasible = violation <= config.constraint_tolerance
            && raw.inequality_violation() <= config.constraint_tolerance;
        if feasible && stationary {
            info!(iterations = iter + 1, objective = raw.objective, "SQP converged");
            return Ok(finish(&z, raw, iter + 1, SqpStatus::Converged, String::new()));
        }
    }

    Ok(finish(
        &z,
        raw,
        config.max_iterations,
        SqpStatus::MaxIterations,
        format!("{} iterations exhausted", config.max_iterations),
    ))
}

fn check_setup(
    x0: &DVector<f64>,
    lower: &DVector<f64>,
    upper: &DVector<f64>,
    n: usize,
) -> SolverResult<()> {
    if n == 0 {
        return Err(SolverError::ProblemSetup {
            what: "problem has no variables".to_string(),
        });
    }
    if x0.len() != n || lower.len() != n || upper.len() != n {
        return Err(SolverError::ProblemSetup {
            what: format!(
                "expected {} variables, got x0={}, lower={}, upper={}",
                n,
                x0.len(),
                lower.len(),
                upper.len()
            ),
        });
    }
    for i in 0..n {
        if !x0[i].is_finite() {
            return Err(SolverError::ProblemSetup {
                what: format!("initial guess component {} is not finite", i),
            });
        }
        if lower[i].is_nan() || upper[i].is_nan() || lower[i] > upper[i] {
            return Err(SolverError::ProblemSetup {
                what: format!("invalid bounds [{}, {}] on variable {}", lower[i], upper[i], i),
            });
        }
    }
    Ok(())
}

fn evaluate_checked<P>(
    problem: &P,
    x: &DVector<f64>,
    me: usize,
    mi: usize,
) -> SolverResult<Evaluation>
where
    P: NlpProblem + ?Sized,
{
    let eval = problem.evaluate(x)?;
    if eval.equality.len() != me || eval.inequality.len() != mi {
        return Err(SolverError::ProblemSetup {
            what: format!(
                "evaluation returned {} equality and {} inequality values, expected {} and {}",
                eval.equality.len(),
                eval.inequality.len(),
                me,
                mi
            ),
        });
    }
    let all_finite = eval.objective.is_finite()
        && eval.equality.iter().all(|v| v.is_finite())
        && eval.inequality.iter().all(|v| v.is_finite());
    if !all_finite {
        return Err(SolverError::Evaluation {
            what: "non-finite objective or constraint value".to_string(),
        });
    }
    Ok(eval)
}

fn clamp(z: &DVector<f64>, lz: &DVector<f64>, uz: &DVector<f64>) -> DVector<f64> {
    DVector::from_fn(z.len(), |i, _| z[i].max(lz[i]).min(uz[i]))
}

fn scale_rows(m: &DMatrix<f64>, weights: &DVector<f64>) -> DMatrix<f64> {
    DMatrix::from_fn(m.nrows(), m.ncols(), |r, c| m[(r, c)] * weights[r])
}

/// Violation of stacked scaled values `[f, eq..., in...]`.
fn scaled_violation(values: &DVector<f64>, me: usize, mi: usize) -> f64 {
    let eq = values.rows(1, me).iter().fold(0.0_f64, |acc, c| acc.max(c.abs()));
    values.rows(1 + me, mi).iter().fold(eq, |acc, c| acc.max(-c))
}

fn merit(values: &DVector<f64>, rho: &DVector<f64>, me: usize, mi: usize) -> f64 {
    let mut phi = values[0];
    for j in 0..me {
        phi += rho[j] * values[1 + j].abs();
    }
    for j in 0..mi {
        phi += rho[me + j] * (-values[1 + me + j]).max(0.0);
    }
    phi
}

fn lagrangian_gradient(
    jac: &DMatrix<f64>,
    lambda_eq: &DVector<f64>,
    lambda_in: &DVector<f64>,
    me: usize,
    mi: usize,
) -> DVector<f64> {
    let mut g = jac.row(0).transpose();
    if me > 0 {
        g -= jac.rows(1, me).transpose() * lambda_eq;
    }
    if mi > 0 {
        g -= jac.rows(1 + me, mi).transpose() * lambda_in;
    }
    g
}

/// Powell-damped BFGS update keeping `b` positive definite.
fn update_bfgs(b: &mut DMatrix<f64>, s: &DVector<f64>, mut y: DVector<f64>) {
    let bs = &*b * s;
    let sbs = s.dot(&bs);
    if sbs <= 1e-300 {
        return;
    }
    let mut sy = s.dot(&y);
    if sy < 0.2 * sbs {
        let theta = 0.8 * sbs / (sbs - sy);
        y = &y * theta + &bs * (1.0 - theta);
        sy = s.dot(&y);
    }
    *b += &y * y.transpose() / sy - &bs * bs.transpose() / sbs;
}

/// Solve the QP subproblem, relaxing the linearized constraints until it is
/// consistent.
///
/// Returns the step and the equality and inequality multipliers of the
/// nonlinear constraints (box rows dropped).
#[allow(clippy::too_many_arguments)]
fn solve_relaxed_qp(
    hessian: &DMatrix<f64>,
    jac: &DMatrix<f64>,
    values: &DVector<f64>,
    z: &DVector<f64>,
    lz: &DVector<f64>,
    uz: &DVector<f64>,
    me: usize,
    mi: usize,
    config: &SqpConfig,
) -> Option<(DVector<f64>, DVector<f64>, DVector<f64>)> {
    let n = z.len();
    let g = jac.row(0).transpose();
    let a_eq = jac.rows(1, me).into_owned();

    // Bound rows: d_k >= lz_k - z_k and -d_k >= z_k - uz_k
    let mut box_rows: Vec<(usize, f64, f64)> = Vec::new();
    for k in 0..n {
        if lz[k].is_finite() {
            box_rows.push((k, 1.0, lz[k] - z[k]));
        }
        if uz[k].is_finite() {
            box_rows.push((k, -1.0, z[k] - uz[k]));
        }
    }

    let rows_in = mi + box_rows.len();
    let mut a_in = DMatrix::zeros(rows_in, n);
    a_in.rows_mut(0, mi).copy_from(&jac.rows(1 + me, mi));
    for (r, &(k, sign, _)) in box_rows.iter().enumerate() {
        a_in[(mi + r, k)] = sign;
    }

    let rhs = |tau: f64| {
        let b_eq = DVector::from_fn(me, |j, _| -tau * values[1 + j]);
        let b_in = DVector::from_fn(rows_in, |r, _| {
            if r < mi {
                let c = values[1 + me + r];
                if c >= 0.0 {
                    -c
                } else {
                    -tau * c
                }
            } else {
                box_rows[r - mi].2
            }
        });
        (b_eq, b_in)
    };

    let mut tau = 1.0;
    for attempt in 0..config.max_relaxations.saturating_sub(1) {
        let (b_eq, b_in) = rhs(tau);
        match solve_qp(hessian, &g, &a_eq, &b_eq, &a_in, &b_in) {
            Ok(sol) => {
                if attempt > 0 {
                    debug!(attempt, tau, "QP solved with relaxed constraints");
                }
                let lambda_in = sol.in_multipliers.rows(0, mi).into_owned();
                return Some((sol.step, sol.eq_multipliers, lambda_in));
            }
            Err(err) => warn!(attempt, tau, %err, "QP subproblem rejected, relaxing"),
        }
        tau *= 0.5;
    }

    let (b_eq, b_in) = rhs(1.0);
    match solve_elastic_qp(hessian, &g, &a_eq, &b_eq, &a_in, &b_in, mi) {
        Ok(sol) => {
            debug!("QP solved in elastic mode");
            Some(sol)
        }
        Err(err) => {
            warn!(%err, "elastic QP rejected");
            None
        }
    }
}

/// Linear cost per unit of elastic slack, in scaled constraint units.
const ELASTIC_PENALTY: f64 = 1e3;
/// Curvature on the slacks keeping the elastic QP strictly convex.
const ELASTIC_CURVATURE: f64 = 1.0;

/// QP with every linearized nonlinear constraint softened by non-negative
/// slacks, so it is consistent whenever the bound rows are.
///
/// The first `mi` rows of `a_in` are nonlinear inequalities, the rest are
/// bound rows and stay hard.
fn solve_elastic_qp(
    hessian: &DMatrix<f64>,
    g: &DVector<f64>,
    a_eq: &DMatrix<f64>,
    b_eq: &DVector<f64>,
    a_in: &DMatrix<f64>,
    b_in: &DVector<f64>,
    mi: usize,
) -> SolverResult<(DVector<f64>, DVector<f64>, DVector<f64>)> {
    let n = g.len();
    let me = a_eq.nrows();
    let rows_in = a_in.nrows();
    // Slacks: e+ and e- per equality, t per nonlinear inequality
    let slacks = 2 * me + mi;
    let total = n + slacks;

    let mut h = DMatrix::zeros(total, total);
    h.view_mut((0, 0), (n, n)).copy_from(hessian);
    for k in n..total {
        h[(k, k)] = ELASTIC_CURVATURE;
    }
    let gradient = DVector::from_fn(total, |k, _| if k < n { g[k] } else { ELASTIC_PENALTY });

    let mut eq = DMatrix::zeros(me, total);
    eq.view_mut((0, 0), (me, n)).copy_from(a_eq);
    for j in 0..me {
        eq[(j, n + j)] = 1.0;
        eq[(j, n + me + j)] = -1.0;
    }

    let mut ineq = DMatrix::zeros(rows_in + slacks, total);
    ineq.view_mut((0, 0), (rows_in, n)).copy_from(a_in);
    for r in 0..mi {
        ineq[(r, n + 2 * me + r)] = 1.0;
    }
    for k in 0..slacks {
        ineq[(rows_in + k, n + k)] = 1.0;
    }
    let rhs_in = DVector::from_fn(rows_in + slacks, |r, _| if r < rows_in { b_in[r] } else { 0.0 });

    let sol = solve_qp(&h, &gradient, &eq, b_eq, &ineq, &rhs_in)?;
    Ok((
        sol.step.rows(0, n).into_owned(),
        sol.eq_multipliers,
        sol.in_multipliers.rows(0, mi).into_owned(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// min (x0-1)² + (x1-2)² with optional x0 + x1 = 1 and x0 >= 0.8
    struct Paraboloid {
        with_equality: bool,
        with_inequality: bool,
    }

    impl NlpProblem for Paraboloid {
        fn dimension(&self) -> usize {
            2
        }
        fn num_equality(&self) -> usize {
            usize::from(self.with_equality)
        }
        fn num_inequality(&self) -> usize {
            usize::from(self.with_inequality)
        }
        fn lower_bounds(&self) -> DVector<f64> {
            DVector::from_element(2, f64::NEG_INFINITY)
        }
        fn upper_bounds(&self) -> DVector<f64> {
            DVector::from_element(2, f64::INFINITY)
        }
        fn evaluate(&self, x: &DVector<f64>) -> SolverResult<Evaluation> {
            let objective = (x[0] - 1.0).powi(2) + (x[1] - 2.0).powi(2);
            let equality = if self.with_equality {
                DVector::from_element(1, x[0] + x[1] - 1.0)
            } else {
                DVector::zeros(0)
            };
            let inequality = if self.with_inequality {
                DVector::from_element(1, x[0] - 0.8)
            } else {
                DVector::zeros(0)
            };
            Ok(Evaluation {
                objective,
                equality,
                inequality,
            })
        }
    }

    fn close(a: f64, b: f64, tol: f64) -> bool {
        (a - b).abs() <= tol
    }

    #[test]
    fn unconstrained_minimum() {
        let p = Paraboloid {
            with_equality: false,
            with_inequality: false,
        };
        let x0 = DVector::from_vec(vec![5.0, -3.0]);
        let r = sqp_solve(&p, &x0, &SqpConfig::default()).unwrap();
        assert!(r.converged(), "{:?}", r.status);
        assert!(close(r.x[0], 1.0, 1e-5));
        assert!(close(r.x[1], 2.0, 1e-5));
    }

    #[test]
    fn equality_constrained() {
        // Projection of (1, 2) onto x0 + x1 = 1 is (0, 1)
        let p = Paraboloid {
            with_equality: true,
            with_inequality: false,
        };
        let x0 = DVector::from_vec(vec![3.0, 3.0]);
        let r = sqp_solve(&p, &x0, &SqpConfig::default()).unwrap();
        assert!(r.converged(), "{:?}", r.status);
        assert!(close(r.x[0], 0.0, 1e-5));
        assert!(close(r.x[1], 1.0, 1e-5));
        assert!(r.equality[0].abs() < 1e-6);
    }

    #[test]
    fn active_inequality() {
        // With x0 >= 0.8 the optimum moves to (0.8, 0.2)
        let p = Paraboloid {
            with_equality: true,
            with_inequality: true,
        };
        let x0 = DVector::from_vec(vec![3.0, 3.0]);
        let r = sqp_solve(&p, &x0, &SqpConfig::default()).unwrap();
        assert!(r.converged(), "{:?}", r.status);
        assert!(close(r.x[0], 0.8, 1e-5));
        assert!(close(r.x[1], 0.2, 1e-5));
        assert!(r.inequality[0] >= -1e-6);
        assert!(r.max_violation < 1e-6);
    }

    struct Boxed;

    impl NlpProblem for Boxed {
        fn dimension(&self) -> usize {
            1
        }
        fn num_equality(&self) -> usize {
            0
        }
        fn num_inequality(&self) -> usize {
            0
        }
        fn lower_bounds(&self) -> DVector<f64> {
            DVector::from_element(1, 2.0)
        }
        fn upper_bounds(&self) -> DVector<f64> {
            DVector::from_element(1, 10.0)
        }
        fn evaluate(&self, x: &DVector<f64>) -> SolverResult<Evaluation> {
            if x[0] < 2.0 {
                return Err(SolverError::Evaluation {
                    what: "below lower bound".into(),
                });
            }
            Ok(Evaluation {
                objective: x[0] * x[0],
                equality: DVector::zeros(0),
                inequality: DVector::zeros(0),
            })
        }
    }

    #[test]
    fn bounds_are_respected() {
        let r = sqp_solve(&Boxed, &DVector::from_element(1, 7.0), &SqpConfig::default()).unwrap();
        assert!(r.converged(), "{:?}", r.status);
        assert!(close(r.x[0], 2.0, 1e-8));
    }

    #[test]
    fn start_outside_bounds_is_clamped() {
        let r = sqp_solve(&Boxed, &DVector::from_element(1, 50.0), &SqpConfig::default()).unwrap();
        assert!(r.converged(), "{:?}", r.status);
        assert!(close(r.x[0], 2.0, 1e-8));
    }

    #[test]
    fn progress_reports_each_step() {
        let p = Paraboloid {
            with_equality: true,
            with_inequality: false,
        };
        let mut seen = Vec::new();
        let mut record = |s: &SqpProgress| seen.push(*s);
        let r = sqp_solve_with_progress(
            &p,
            &DVector::from_vec(vec![3.0, 3.0]),
            &SqpConfig::default(),
            Some(&mut record),
        )
        .unwrap();

        assert!(!seen.is_empty());
        assert_eq!(seen.last().map(|s| s.iteration), Some(r.iterations));
        for (i, s) in seen.iter().enumerate() {
            assert_eq!(s.iteration, i + 1);
            assert!(s.step_length > 0.0 && s.step_length <= 1.0);
        }
    }

    #[test]
    fn iteration_cap_is_reported() {
        let p = Paraboloid {
            with_equality: true,
            with_inequality: true,
        };
        let config = SqpConfig {
            max_iterations: 1,
            ..SqpConfig::default()
        };
        let r = sqp_solve(&p, &DVector::from_vec(vec![30.0, -40.0]), &config).unwrap();
        assert_eq!(r.status, SqpStatus::MaxIterations);
        assert!(!r.converged());
        assert_eq!(r.iterations, 1);
    }

    #[test]
    fn malformed_setup_is_an_error() {
        let p = Paraboloid {
            with_equality: false,
            with_inequality: false,
        };
        let err = sqp_solve(&p, &DVector::from_element(3, 1.0), &SqpConfig::default()).unwrap_err();
        assert!(matches!(err, SolverError::ProblemSetup { .. }));

        let err = sqp_solve(
            &p,
            &DVector::from_vec(vec![f64::NAN, 1.0]),
            &SqpConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, SolverError::ProblemSetup { .. }));
    }

    #[test]
    fn elastic_qp_softens_inconsistent_rows() {
        // d1 >= 2199 with d >= 0 cannot meet 0.9 d0 + d1 = 648
        let b = DMatrix::identity(2, 2);
        let g = DVector::from_vec(vec![0.5, 0.05]);
        let a_eq = DMatrix::from_row_slice(1, 2, &[0.9, 1.0]);
        let b_eq = DVector::from_vec(vec![648.0]);
        let a_in = DMatrix::from_row_slice(3, 2, &[0.0, 1.0, 1.0, 0.0, 0.0, 1.0]);
        let b_in = DVector::from_vec(vec![2199.0, 0.0, 0.0]);
        assert!(solve_qp(&b, &g, &a_eq, &b_eq, &a_in, &b_in).is_err());

        let (d, lambda_eq, lambda_in) =
            solve_elastic_qp(&b, &g, &a_eq, &b_eq, &a_in, &b_in, 1).unwrap();
        assert_eq!(d.len(), 2);
        assert_eq!((lambda_eq.len(), lambda_in.len()), (1, 1));
        // Bound rows stay hard
        assert!(d[0] >= -1e-6 && d[1] >= -1e-6);
        // The step moves towards both targets
        assert!(d[1] > 0.0);
        assert!(lambda_in[0] >= 0.0);
    }

    /// min x0 + x1 s.t. x0 x1 >= 4, x >= 1e-3, started in the corner
    struct Hyperbola;

    impl NlpProblem for Hyperbola {
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
            DVector::from_element(2, 1e-3)
        }
        fn upper_bounds(&self) -> DVector<f64> {
            DVector::from_element(2, f64::INFINITY)
        }
        fn evaluate(&self, x: &DVector<f64>) -> SolverResult<Evaluation> {
            Ok(Evaluation {
                objective: x[0] + x[1],
                equality: DVector::zeros(0),
                inequality: DVector::from_element(1, x[0] * x[1] - 4.0),
            })
        }
    }

    #[test]
    fn infeasible_corner_start_reaches_feasibility() {
        let x0 = DVector::from_element(2, 1e-3);
        let r = sqp_solve(&Hyperbola, &x0, &SqpConfig::default()).unwrap();
        assert!(r.converged(), "{:?}: {}", r.status, r.message);
        assert!(r.inequality[0] >= -1e-6);
        assert!(close(r.x[0], 2.0, 1e-3));
        assert!(close(r.x[1], 2.0, 1e-3));
    }

    #[test]
    fn damped_bfgs_stays_positive_definite() {
        let mut b = DMatrix::identity(2, 2);
        let s = DVector::from_vec(vec![1.0, 0.0]);
        // Negative curvature along s
        let y = DVector::from_vec(vec![-1.0, 0.5]);
        update_bfgs(&mut b, &s, y);
        assert!(b.clone().cholesky().is_some());
    }
}
