//! Biconic (anamorphic) surface
use super::{check_scale_factor, GeoSurface};
use crate::{
    error::{TraceError, TraceResult},
    utils::usize_to_f64,
};
use serde::{Deserialize, Serialize};
use uom::si::{f64::Length, length::meter};

/// Surface with independent curvatures and conic constants along x and y
///
/// z = (cx x² + cy y²) / (1 + √(1 - (1 + kx) cx² x² - (1 + ky) cy² y²)) + Σᵢ aᵢ r^(2i+2)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Biconic {
    curvature_x: f64,
    conic_constant_x: f64,
    curvature_y: f64,
    conic_constant_y: f64,
    coefficients: Vec<f64>,
}
fn curvature_from_radius(radius: Length) -> TraceResult<f64> {
    let radius = radius.get::<meter>();
    if radius == 0.0 || radius.is_nan() {
        return Err(TraceError::Shape(
            "radius of curvature must be != 0.0 and not NaN".into(),
        ));
    }
    Ok(1.0 / radius)
}
impl Biconic {
    /// Create a new [`Biconic`].
    ///
    /// Infinite radii result in a flat section along the respective axis.
    ///
    /// # Errors
    ///
    /// This function will return an error if
    ///   - one of the radii is zero or `NaN`
    ///   - a conic constant or a coefficient is not finite
    pub fn new(
        radius_x: Length,
        conic_constant_x: f64,
        radius_y: Length,
        conic_constant_y: f64,
        coefficients: Vec<f64>,
    ) -> TraceResult<Self> {
        if !conic_constant_x.is_finite() || !conic_constant_y.is_finite() {
            return Err(TraceError::Shape("conic constants must be finite".into()));
        }
        if coefficients.iter().any(|c| !c.is_finite()) {
            return Err(TraceError::Shape(
                "biconic coefficients must be finite".into(),
            ));
        }
        Ok(Self {
            curvature_x: curvature_from_radius(radius_x)?,
            conic_constant_x,
            curvature_y: curvature_from_radius(radius_y)?,
            conic_constant_y,
            coefficients,
        })
    }
    /// Returns the vertex curvature along x (in 1/m).
    #[must_use]
    pub const fn curvature_x(&self) -> f64 {
        self.curvature_x
    }
    /// Returns the vertex curvature along y (in 1/m).
    #[must_use]
    pub const fn curvature_y(&self) -> f64 {
        self.curvature_y
    }
    /// Returns the conic constant along x.
    #[must_use]
    pub const fn conic_constant_x(&self) -> f64 {
        self.conic_constant_x
    }
    /// Returns the conic constant along y.
    #[must_use]
    pub const fn conic_constant_y(&self) -> f64 {
        self.conic_constant_y
    }
    fn root(&self, x: f64, y: f64) -> f64 {
        let (cx, cy) = (self.curvature_x, self.curvature_y);
        1.0 - (1.0 + self.conic_constant_x) * cx * cx * x * x
            - (1.0 + self.conic_constant_y) * cy * cy * y * y
    }
}
impl GeoSurface for Biconic {
    fn sag(&self, x: f64, y: f64) -> f64 {
        let root = self.root(x, y);
        if root < 0.0 {
            return f64::NAN;
        }
        let a = self.curvature_x * x * x + self.curvature_y * y * y;
        let r_sq = x.mul_add(x, y * y);
        let poly = self
            .coefficients
            .iter()
            .rev()
            .fold(0.0_f64, |acc, a| acc.mul_add(r_sq, *a))
            * r_sq;
        a / (1.0 + root.sqrt()) + poly
    }
    fn gradient(&self, x: f64, y: f64) -> (f64, f64) {
        let root = self.root(x, y);
        if root < 0.0 {
            return (f64::NAN, f64::NAN);
        }
        let (cx, cy) = (self.curvature_x, self.curvature_y);
        let s = root.sqrt();
        let d = 1.0 + s;
        let a = cx * x * x + cy * y * y;
        // d/dx A/(1+√S) = (A' (1+√S) - A S'/(2√S)) / (1+√S)²
        let fx = if s == 0.0 {
            f64::INFINITY
        } else {
            (2.0 * cx * x).mul_add(d, a * (1.0 + self.conic_constant_x) * cx * cx * x / s) / (d * d)
        };
        let fy = if s == 0.0 {
            f64::INFINITY
        } else {
            (2.0 * cy * y).mul_add(d, a * (1.0 + self.conic_constant_y) * cy * cy * y / s) / (d * d)
        };
        let r_sq = x.mul_add(x, y * y);
        let poly_factor = self
            .coefficients
            .iter()
            .enumerate()
            .rev()
            .fold(0.0_f64, |acc, (i, a)| acc.mul_add(r_sq, 2.0 * usize_to_f64(i + 1) * a));
        (x.mul_add(poly_factor, fx), y.mul_add(poly_factor, fy))
    }
    fn flip(&mut self) {
        self.curvature_x = -self.curvature_x;
        self.curvature_y = -self.curvature_y;
        self.coefficients.iter_mut().for_each(|a| *a = -*a);
    }
    fn scale(&mut self, factor: f64) -> TraceResult<()> {
        check_scale_factor(factor)?;
        self.curvature_x /= factor;
        self.curvature_y /= factor;
        for (i, a) in self.coefficients.iter_mut().enumerate() {
            *a /= factor.powi(2 * i32::try_from(i).unwrap_or(i32::MAX) + 1);
        }
        Ok(())
    }
}
