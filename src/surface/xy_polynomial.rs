//! Polynomial free-form surface
use super::{check_scale_factor, Conic, GeoSurface};
use crate::{
    error::{TraceError, TraceResult},
    utils::math_utils::monomial_derivative,
};
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use uom::si::f64::Length;

/// Conic with an additional polynomial in x and y
///
/// z = conic(r) + Σᵢⱼ aᵢⱼ xⁱ yʲ where the coefficient aᵢⱼ is stored at row i and column j.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct XyPolynomial {
    base: Conic,
    coefficients: DMatrix<f64>,
}
fn powers(value: f64, count: usize) -> Vec<f64> {
    let mut p = Vec::with_capacity(count);
    let mut acc = 1.0;
    for _ in 0..count {
        p.push(acc);
        acc *= value;
    }
    p
}
impl XyPolynomial {
    /// Create a new [`XyPolynomial`] surface.
    ///
    /// # Errors
    ///
    /// This function will return an error if the base conic is invalid or a coefficient is not finite.
    pub fn new(
        radius: Length,
        conic_constant: f64,
        coefficients: DMatrix<f64>,
    ) -> TraceResult<Self> {
        if coefficients.iter().any(|c| !c.is_finite()) {
            return Err(TraceError::Shape(
                "polynomial coefficients must be finite".into(),
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
    /// Returns the coefficient matrix.
    #[must_use]
    pub const fn coefficients(&self) -> &DMatrix<f64> {
        &self.coefficients
    }
}
impl GeoSurface for XyPolynomial {
    fn sag(&self, x: f64, y: f64) -> f64 {
        let px = powers(x, self.coefficients.nrows());
        let py = powers(y, self.coefficients.ncols());
        let mut z = self.base.sag_r2(x.mul_add(x, y * y));
        for i in 0..self.coefficients.nrows() {
            for j in 0..self.coefficients.ncols() {
                z += self.coefficients[(i, j)] * px[i] * py[j];
            }
        }
        z
    }
    fn gradient(&self, x: f64, y: f64) -> (f64, f64) {
        let f = self.base.slope_factor(x.mul_add(x, y * y));
        let (mut fx, mut fy) = (x * f, y * f);
        let px = powers(x, self.coefficients.nrows());
        let py = powers(y, self.coefficients.ncols());
        for i in 0..self.coefficients.nrows() {
            for j in 0..self.coefficients.ncols() {
                let a = self.coefficients[(i, j)];
                fx += a * monomial_derivative(x, i) * py[j];
                fy += a * px[i] * monomial_derivative(y, j);
            }
        }
        (fx, fy)
    }
    fn flip(&mut self) {
        self.base.flip_base();
        self.coefficients.neg_mut();
    }
    fn scale(&mut self, factor: f64) -> TraceResult<()> {
        check_scale_factor(factor)?;
        self.base.scale_base(factor);
        for i in 0..self.coefficients.nrows() {
            for j in 0..self.coefficients.ncols() {
                let order = i32::try_from(i + j).unwrap_or(i32::MAX);
                self.coefficients[(i, j)] /= factor.powi(order - 1);
            }
        }
        Ok(())
    }
}
