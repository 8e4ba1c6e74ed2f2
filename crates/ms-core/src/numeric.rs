use crate::CoreError;

pub type Real = f64;

/// Combined absolute/relative tolerance for mass and velocity comparisons.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Tolerance {
    pub abs: Real,
    pub rel: Real,
}

impl Tolerance {
    pub const fn new(abs: Real, rel: Real) -> Self {
        Self { abs, rel }
    }

    /// True when `a` and `b` agree within either bound.
    pub fn close(self, a: Real, b: Real) -> bool {
        let diff = (a - b).abs();
        diff <= self.abs || diff <= self.rel * a.abs().max(b.abs())
    }
}

impl Default for Tolerance {
    fn default() -> Self {
        Self::new(1e-12, 1e-9)
    }
}

pub fn ensure_finite(v: Real, what: &'static str) -> Result<Real, CoreError> {
    if !v.is_finite() {
        return Err(CoreError::NonFinite { what, value: v });
    }
    Ok(v)
}

/// Round to a fixed number of decimals, the way the report table prints.
pub fn round_to(v: Real, decimals: i32) -> Real {
    let factor = 10f64.powi(decimals);
    (v * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn close_uses_either_bound() {
        let tol = Tolerance::new(1e-6, 1e-9);
        assert!(tol.close(0.0, 5e-7));
        assert!(tol.close(1e6, 1e6 + 1e-4));
        assert!(!tol.close(1.0, 1.001));
    }

    #[test]
    fn nan_is_rejected() {
        let err = ensure_finite(Real::NAN, "burn time").unwrap_err();
        assert!(err.to_string().contains("burn time"));
    }

    #[test]
    fn round_to_decimals() {
        assert_eq!(round_to(111.1111, 1), 111.1);
        assert_eq!(round_to(6774.2, 0), 6774.0);
        assert_eq!(round_to(0.125, 2), 0.13);
    }
}
