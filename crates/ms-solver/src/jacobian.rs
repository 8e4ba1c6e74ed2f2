//! Finite difference Jacobian computation.

use crate::error::SolverResult;
use nalgebra::{DMatrix, DVector};
use rayon::prelude::*;

/// Forward-difference Jacobian that never steps outside `[lower, upper]`.
///
/// A column whose forward step would cross the upper bound is taken as a
/// backward difference instead. If the function fails at the trial point the
/// opposite direction is tried once before the error is returned. With
/// `parallel` the columns are evaluated on the rayon pool; `f` must then be
/// free of shared mutable state.
pub fn bounded_jacobian<F>(
    x: &DVector<f64>,
    f_x: &DVector<f64>,
    f: F,
    lower: &DVector<f64>,
    upper: &DVector<f64>,
    epsilon: f64,
    parallel: bool,
) -> SolverResult<DMatrix<f64>>
where
    F: Fn(&DVector<f64>) -> SolverResult<DVector<f64>> + Sync,
{
    let n = x.len();
    let m = f_x.len();

    let column = |j: usize| -> SolverResult<DVector<f64>> {
        let h = epsilon * x[j].abs().max(1.0);
        let step = if x[j] + h <= upper[j] { h } else { -h };

        let mut x_perturbed = x.clone();
        x_perturbed[j] += step;
        match f(&x_perturbed) {
            Ok(f_perturbed) => Ok((f_perturbed - f_x) / step),
            Err(err) => {
                let back = -step;
                if x[j] + back < lower[j] || x[j] + back > upper[j] {
                    return Err(err);
                }
                let mut x_back = x.clone();
                x_back[j] += back;
                let f_back = f(&x_back)?;
                Ok((f_back - f_x) / back)
            }
        }
    };

    let columns: Vec<DVector<f64>> = if parallel {
        (0..n)
            .into_par_iter()
            .map(|j| column(j))
            .collect::<SolverResult<_>>()?
    } else {
        (0..n).map(column).collect::<SolverResult<_>>()?
    };

    let mut jac = DMatrix::zeros(m, n);
    for (j, df) in columns.iter().enumerate() {
        for i in 0..m {
            jac[(i, j)] = df[i];
        }
    }

    Ok(jac)
}
