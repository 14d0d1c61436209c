//! Gradient-index material
use super::RefractiveIndex;
use crate::{
    environment::Environment,
    error::{TraceError, TraceResult},
};
use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};
use uom::si::f64::Length;

/// Gradient-index (GRIN) material with a radial and an axial polynomial index profile
///
/// n(r, z) = n0 + nr2 r² + nr4 r⁴ + nr6 r⁶ + nz1 z + nz2 z² + nz3 z³
///
/// with r² = x² + y². The coordinates (in meters) refer to the local coordinate system of the surface where the
/// rays enter the medium. The profile does not depend on the wavelength.
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq)]
pub struct GradientIndex {
    n0: f64,
    radial: [f64; 3],
    axial: [f64; 3],
}
impl GradientIndex {
    /// Create a new [`GradientIndex`] material.
    ///
    /// `radial` holds the coefficients (nr2, nr4, nr6) in m⁻², m⁻⁴, m⁻⁶, `axial` the coefficients
    /// (nz1, nz2, nz3) in m⁻¹, m⁻², m⁻³.
    ///
    /// # Errors
    ///
    /// This function will return an error if the base index is < 1.0 or a coefficient is not finite.
    pub fn new(n0: f64, radial: [f64; 3], axial: [f64; 3]) -> TraceResult<Self> {
        if n0 < 1.0 || !n0.is_finite() {
            return Err(TraceError::Material(
                "base index must be >= 1.0 and finite".into(),
            ));
        }
        if radial.iter().chain(axial.iter()).any(|c| !c.is_finite()) {
            return Err(TraceError::Material(
                "GRIN coefficients must be finite".into(),
            ));
        }
        Ok(Self { n0, radial, axial })
    }
    /// Returns the base index on axis at the vertex of the entry surface.
    #[must_use]
    pub const fn n0(&self) -> f64 {
        self.n0
    }
    /// Returns the radial coefficients (nr2, nr4, nr6).
    #[must_use]
    pub const fn radial(&self) -> [f64; 3] {
        self.radial
    }
    /// Returns the axial coefficients (nz1, nz2, nz3).
    #[must_use]
    pub const fn axial(&self) -> [f64; 3] {
        self.axial
    }
    /// Returns `true` if all gradient coefficients vanish.
    #[must_use]
    pub fn is_homogeneous(&self) -> bool {
        self.radial.iter().chain(self.axial.iter()).all(|c| *c == 0.0)
    }
    /// Calculate the refractive index and its gradient at the given point (in meters).
    #[must_use]
    pub fn index_and_gradient(&self, point: &Point3<f64>) -> (f64, Vector3<f64>) {
        let [nr2, nr4, nr6] = self.radial;
        let [nz1, nz2, nz3] = self.axial;
        let r_sq = point.x.mul_add(point.x, point.y * point.y);
        let z = point.z;
        let radial = r_sq * nr6.mul_add(r_sq, nr4).mul_add(r_sq, nr2);
        let axial = z * nz3.mul_add(z, nz2).mul_add(z, nz1);
        let n = self.n0 + radial + axial;
        // d/dx (nr2 r² + nr4 r⁴ + nr6 r⁶) = x (2 nr2 + 4 nr4 r² + 6 nr6 r⁴)
        let radial_derivative = (6.0 * nr6).mul_add(r_sq, 4.0 * nr4).mul_add(r_sq, 2.0 * nr2);
        let dn_dz = (3.0 * nz3).mul_add(z, 2.0 * nz2).mul_add(z, nz1);
        (
            n,
            Vector3::new(point.x * radial_derivative, point.y * radial_derivative, dn_dz),
        )
    }
    /// Returns a copy with all lengths multiplied by the given factor.
    #[must_use]
    pub fn scaled(&self, factor: f64) -> Self {
        let [nr2, nr4, nr6] = self.radial;
        let [nz1, nz2, nz3] = self.axial;
        Self {
            n0: self.n0,
            radial: [nr2 / factor.powi(2), nr4 / factor.powi(4), nr6 / factor.powi(6)],
            axial: [nz1 / factor, nz2 / factor.powi(2), nz3 / factor.powi(3)],
        }
    }
}
impl RefractiveIndex for GradientIndex {
    fn get_refractive_index(
        &self,
        _wavelength: Length,
        _environment: &Environment,
    ) -> TraceResult<f64> {
        Ok(self.n0)
    }
}
