//! Odd asphere
use super::{check_scale_factor, Conic, GeoSurface};
use crate::{
    error::{TraceError, TraceResult},
    utils::math_utils::monomial_derivative,
};
use serde::{Deserialize, Serialize};
use uom::si::f64::Length;

/// Conic with additional polynomial terms of all orders in r
///
/// z = conic(r) + Σᵢ aᵢ r^(i+1), i.e. the coefficients multiply r, r², r³, ...
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OddAsphere {
    base: Conic,
    coefficients: Vec<f64>,
}
impl OddAsphere {
    /// Create a new [`OddAsphere`].
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
impl GeoSurface for OddAsphere {
    fn sag(&self, x: f64, y: f64) -> f64 {
        let r_sq = x.mul_add(x, y * y);
        let r = r_sq.sqrt();
        let poly = self
            .coefficients
            .iter()
            .rev()
            .fold(0.0_f64, |acc, a| acc.mul_add(r, *a))
            * r;
        self.base.sag_r2(r_sq) + poly
    }
    fn gradient(&self, x: f64, y: f64) -> (f64, f64) {
        let r_sq = x.mul_add(x, y * y);
        let r = r_sq.sqrt();
        let conic = self.base.slope_factor(r_sq);
        if r == 0.0 {
            // the linear term has a cone tip at the apex; take the symmetric limit
            return (0.0, 0.0);
        }
        let dz_dr: f64 = self
            .coefficients
            .iter()
            .enumerate()
            .map(|(i, a)| a * monomial_derivative(r, i + 1))
            .sum();
        let f = conic + dz_dr / r;
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
            *a /= factor.powi(i32::try_from(i).unwrap_or(i32::MAX));
        }
        Ok(())
    }
}
