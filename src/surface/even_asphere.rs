//! Even asphere
use super::{check_scale_factor, Conic, GeoSurface};
use crate::{
    error::{TraceError, TraceResult},
    utils::usize_to_f64,
};
use serde::{Deserialize, Serialize};
use uom::si::f64::Length;

/// Conic with additional even polynomial terms
///
/// z = conic(r) + Σᵢ aᵢ r^(2i+2), i.e. the coefficients multiply r², r⁴, r⁶, ...
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvenAsphere {
    base: Conic,
    coefficients: Vec<f64>,
}
impl EvenAsphere {
    /// Create a new [`EvenAsphere`].
    ///
    /// # Errors
    ///
    /// This function will return an error if the base conic is invalid or a coefficient is not finite.
    pub fn new(radius: Length, conic_constant: f64, coefficients: Vec<f64>) -> TraceResult<Self> {
        if coefficients.iter().any(|c| !c.is_finite()) {
            return Err(TraceError::Shape(
                "asphere coefficients must be finite".into(),
            ));
        }
        Ok(Self {
            base: Conic::new(radius, conic_constant)?,
            coefficients,
        })
    }
    /// Returns the base conic.
    #[must_use]
    pub const fn base(&self) -> &Conic {
        &self.base
    }
    /// Returns the polynomial coefficients.
    #[must_use]
    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }
}
impl GeoSurface for EvenAsphere {
    fn sag(&self, x: f64, y: f64) -> f64 {
        let r_sq = x.mul_add(x, y * y);
        // Horner scheme in r²
        let poly = self
            .coefficients
            .iter()
            .rev()
            .fold(0.0_f64, |acc, a| acc.mul_add(r_sq, *a))
            * r_sq;
        self.base.sag_r2(r_sq) + poly
    }
    fn gradient(&self, x: f64, y: f64) -> (f64, f64) {
        let r_sq = x.mul_add(x, y * y);
        // d/dx aᵢ (r²)^(i+1) = 2 x (i+1) aᵢ (r²)^i
        let poly_factor = self
            .coefficients
            .iter()
            .enumerate()
            .rev()
            .fold(0.0_f64, |acc, (i, a)| acc.mul_add(r_sq, 2.0 * usize_to_f64(i + 1) * a));
        let f = self.base.slope_factor(r_sq) + poly_factor;
        (x * f, y * f)
    }
    fn flip(&mut self) {
        self.base.flip_base();
        self.coefficients.iter_mut().for_each(|a| *a = -*a);
    }
    fn scale(&mut self, factor: f64) -> TraceResult<()> {
        check_scale_factor(factor)?;
        self.base.scale_base(factor);
        for (i, a) in self.coefficients.iter_mut().enumerate() {
            *a /= factor.powi(2 * i32::try_from(i).unwrap_or(i32::MAX) + 1);
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{millimeter, surface::test_helper};
    use approx::assert_relative_eq;
    #[test]
    fn new() {
        assert!(EvenAsphere::new(millimeter!(10.0), 0.0, vec![f64::NAN]).is_err());
        assert!(EvenAsphere::new(millimeter!(0.0), 0.0, vec![]).is_err());
    }
    #[test]
    fn sag() {
        let s = EvenAsphere::new(millimeter!(100.0), 0.0, vec![0.5, 2.0, 3.0]).unwrap();
        let r_sq: f64 = 0.0004;
        let expected = s.base().sag_r2(r_sq) + 0.5 * r_sq + 2.0 * r_sq.powi(2) + 3.0 * r_sq.powi(3);
        assert_relative_eq!(s.sag(0.0, 0.02), expected);
        let plain = EvenAsphere::new(millimeter!(100.0), 0.0, vec![]).unwrap();
        assert_relative_eq!(plain.sag(0.01, 0.0), plain.base().sag_r2(1e-4));
    }
    #[test]
    fn gradient() {
        let s = EvenAsphere::new(millimeter!(50.0), -0.7, vec![0.1, -20.0, 3000.0]).unwrap();
        let points = [(0.0, 0.0), (0.01, 0.005), (-0.02, 0.01)];
        test_helper::check_gradient(&s, &points);
        test_helper::check_flip_and_scale(&s, &points);
    }
}
