//! Toroidal surface
//!
//! A profile curve z_y(y) in the yz plane is rotated around an axis parallel to y which intersects the z axis at
//! the rotation radius R:
//!
//! z = R - sign(R) √((R - z_y(y))² - x²)
//!
//! with the profile z_y(y) = conic(y) + Σᵢ aᵢ y^(2i+2). An infinite rotation radius yields a cylinder along x.
use super::{check_scale_factor, Conic, GeoSurface};
use crate::{
    error::{TraceError, TraceResult},
    utils::usize_to_f64,
};
use serde::{Deserialize, Serialize};
use uom::si::{f64::Length, length::meter};

/// Toroidal surface with an aspheric profile along y.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Toroidal {
    /// curvature 1/R of the rotation radius
    rotation_curvature: f64,
    profile: Conic,
    coefficients: Vec<f64>,
}
impl Toroidal {
    /// Create a new [`Toroidal`] surface.
    ///
    /// # Errors
    ///
    /// This function will return an error if
    ///   - the rotation radius is zero or `NaN`
    ///   - the profile conic is invalid
    ///   - a coefficient is not finite
    pub fn new(
        rotation_radius: Length,
        radius_y: Length,
        conic_constant_y: f64,
        coefficients: Vec<f64>,
    ) -> TraceResult<Self> {
        let r = rotation_radius.get::<meter>();
        if r == 0.0 || r.is_nan() {
            return Err(TraceError::Shape(
                "rotation radius must be != 0.0 and not NaN".into(),
            ));
        }
        if coefficients.iter().any(|c| !c.is_finite()) {
            return Err(TraceError::Shape(
                "toroidal profile coefficients must be finite".into(),
            ));
        }
        Ok(Self {
            rotation_curvature: 1.0 / r,
            profile: Conic::new(radius_y, conic_constant_y)?,
            coefficients,
        })
    }
    /// Returns the profile conic in the yz plane.
    #[must_use]
    pub const fn profile(&self) -> &Conic {
        &self.profile
    }
    /// Returns the rotation radius in meters (infinite for a cylinder).
    #[must_use]
    pub fn rotation_radius(&self) -> f64 {
        1.0 / self.rotation_curvature
    }
    fn profile_sag(&self, y: f64) -> (f64, f64) {
        let y_sq = y * y;
        let poly = self
            .coefficients
            .iter()
            .rev()
            .fold(0.0_f64, |acc, a| acc.mul_add(y_sq, *a))
            * y_sq;
        let poly_factor = self
            .coefficients
            .iter()
            .enumerate()
            .rev()
            .fold(0.0_f64, |acc, (i, a)| acc.mul_add(y_sq, 2.0 * usize_to_f64(i + 1) * a));
        (
            self.profile.sag_r2(y_sq) + poly,
            y * (self.profile.slope_factor(y_sq) + poly_factor),
        )
    }
}
impl GeoSurface for Toroidal {
    fn sag(&self, x: f64, y: f64) -> f64 {
        let (zy, _) = self.profile_sag(y);
        if self.rotation_curvature == 0.0 {
            return zy;
        }
        let r = 1.0 / self.rotation_curvature;
        let w = (r - zy).mul_add(r - zy, -x * x);
        if w < 0.0 {
            return f64::NAN;
        }
        r - r.signum() * w.sqrt()
    }
    fn gradient(&self, x: f64, y: f64) -> (f64, f64) {
        let (zy, dzy) = self.profile_sag(y);
        if self.rotation_curvature == 0.0 {
            return (0.0, dzy);
        }
        let r = 1.0 / self.rotation_curvature;
        let w = (r - zy).mul_add(r - zy, -x * x);
        if w <= 0.0 {
            return (f64::NAN, f64::NAN);
        }
        let s = r.signum() / w.sqrt();
        (s * x, s * (r - zy) * dzy)
    }
    fn flip(&mut self) {
        self.rotation_curvature = -self.rotation_curvature;
        self.profile.flip_base();
        self.coefficients.iter_mut().for_each(|a| *a = -*a);
    }
    fn scale(&mut self, factor: f64) -> TraceResult<()> {
        check_scale_factor(factor)?;
        self.rotation_curvature /= factor;
        self.profile.scale_base(factor);
        for (i, a) in self.coefficients.iter_mut().enumerate() {
            *a /= factor.powi(2 * i32::try_from(i).unwrap_or(i32::MAX) + 1);
        }
        Ok(())
    }
}
