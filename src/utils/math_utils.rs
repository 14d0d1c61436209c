//! Small numeric helpers shared by the shape and ray modules.
use nalgebra::{Point3, Vector3};

#[must_use]
pub const fn usize_to_f64(value: usize) -> f64 {
    #[allow(clippy::cast_precision_loss)]
    let newval = value as f64;
    newval
}

#[must_use]
pub const fn f64_to_usize(value: f64) -> usize {
    #[allow(clippy::cast_possible_truncation)]
    #[allow(clippy::cast_sign_loss)]
    let newval = value as usize;
    newval
}

/// Returns the factorial `n!` as `f64`.
///
/// Values up to `170!` are representable, larger arguments return infinity.
#[must_use]
pub fn factorial(n: usize) -> f64 {
    (1..=n).fold(1.0, |acc, k| acc * usize_to_f64(k))
}

/// Evaluate the power `base^exp` for a non-negative integer exponent.
///
/// In contrast to `f64::powi` this returns 0.0 for `0^0` derivatives, i.e. callers can use it for
/// monomial derivatives `exp * base^(exp-1)` without special casing `exp == 0`.
#[must_use]
pub fn monomial_derivative(base: f64, exp: usize) -> f64 {
    if exp == 0 {
        0.0
    } else {
        #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
        let e = (exp - 1) as i32;
        usize_to_f64(exp) * base.powi(e)
    }
}

/// Checks if all components of the given point are finite.
#[must_use]
pub fn is_finite_point(p: &Point3<f64>) -> bool {
    p.iter().all(|c| c.is_finite())
}

/// Checks if all components of the given vector are finite.
#[must_use]
pub fn is_finite_vector(v: &Vector3<f64>) -> bool {
    v.iter().all(|c| c.is_finite())
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;
    #[test]
    fn conversions() {
        assert_eq!(usize_to_f64(3), 3.0);
        assert_eq!(f64_to_usize(3.7), 3);
        assert_eq!(f64_to_usize(-1.0), 0);
    }
    #[test]
    fn factorial_values() {
        assert_eq!(factorial(0), 1.0);
        assert_eq!(factorial(1), 1.0);
        assert_eq!(factorial(5), 120.0);
        assert!(factorial(200).is_infinite());
    }
    #[test]
    fn monomial_derivative_values() {
        assert_eq!(monomial_derivative(2.0, 0), 0.0);
        assert_eq!(monomial_derivative(2.0, 1), 1.0);
        assert_relative_eq!(monomial_derivative(2.0, 3), 12.0);
        assert_eq!(monomial_derivative(0.0, 1), 1.0);
    }
    #[test]
    fn finite_checks() {
        assert!(is_finite_point(&Point3::new(1.0, 2.0, 3.0)));
        assert!(!is_finite_point(&Point3::new(1.0, f64::NAN, 3.0)));
        assert!(!is_finite_vector(&Vector3::new(f64::INFINITY, 0.0, 0.0)));
    }
}
