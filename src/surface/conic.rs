//! Conic surface of revolution
//!
//! z = c r² / (1 + √(1 - (1 + k) c² r²)) with the vertex curvature c = 1/R and the conic constant k.
//!
//! | k        | surface     |
//! |----------|-------------|
//! | k < -1   | hyperboloid |
//! | k = -1   | paraboloid  |
//! | -1 < k < 0 | prolate ellipsoid |
//! | k = 0    | sphere      |
//! | k > 0    | oblate ellipsoid |
use super::{check_scale_factor, newton, GeoSurface};
use crate::{
    config::TraceConfig,
    error::{TraceError, TraceResult},
};
use nalgebra::{Point3, Vector3};
use roots::{find_roots_quadratic, Roots};
use serde::{Deserialize, Serialize};
use uom::si::{f64::Length, length::meter};

/// A conic section of revolution (sphere, paraboloid, ellipsoid, hyperboloid) with its vertex at the origin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Conic {
    curvature: f64,
    conic_constant: f64,
}
impl Conic {
    /// Create a new [`Conic`] from a vertex radius of curvature and a conic constant.
    ///
    /// A positive radius leads to a surface with its center of curvature on the positive z axis. An infinite radius
    /// results in a flat surface.
    ///
    /// # Errors
    ///
    /// This function will return an error if the radius is zero or `NaN` or the conic constant is not finite.
    pub fn new(radius: Length, conic_constant: f64) -> TraceResult<Self> {
        let radius = radius.get::<meter>();
        if radius == 0.0 || radius.is_nan() {
            return Err(TraceError::Shape(
                "radius of curvature must be != 0.0 and not NaN".into(),
            ));
        }
        if !conic_constant.is_finite() {
            return Err(TraceError::Shape("conic constant must be finite".into()));
        }
        Ok(Self {
            curvature: 1.0 / radius,
            conic_constant,
        })
    }
    /// Create a flat base (zero curvature).
    #[must_use]
    pub const fn flat() -> Self {
        Self {
            curvature: 0.0,
            conic_constant: 0.0,
        }
    }
    /// Returns the vertex curvature (in 1/m).
    #[must_use]
    pub const fn curvature(&self) -> f64 {
        self.curvature
    }
    /// Returns the conic constant.
    #[must_use]
    pub const fn conic_constant(&self) -> f64 {
        self.conic_constant
    }
    /// Sag as a function of the squared radial coordinate.
    #[must_use]
    pub fn sag_r2(&self, r_sq: f64) -> f64 {
        let c = self.curvature;
        let root = ((1.0 + self.conic_constant) * c * c).mul_add(-r_sq, 1.0);
        if root < 0.0 {
            return f64::NAN;
        }
        c * r_sq / (1.0 + root.sqrt())
    }
    /// Returns `(dz/dr) / r` as a function of the squared radial coordinate.
    ///
    /// The partial derivatives are `∂z/∂x = x * slope_factor` and `∂z/∂y = y * slope_factor`.
    #[must_use]
    pub fn slope_factor(&self, r_sq: f64) -> f64 {
        let c = self.curvature;
        let root = ((1.0 + self.conic_constant) * c * c).mul_add(-r_sq, 1.0);
        if root < 0.0 {
            return f64::NAN;
        }
        c / root.sqrt()
    }
    /// Negate the curvature (mirror at the vertex plane).
    pub(super) fn flip_base(&mut self) {
        self.curvature = -self.curvature;
    }
    /// Scale the radius without checking the factor.
    pub(super) fn scale_base(&mut self, factor: f64) {
        self.curvature /= factor;
    }
}
impl GeoSurface for Conic {
    fn sag(&self, x: f64, y: f64) -> f64 {
        self.sag_r2(x.mul_add(x, y * y))
    }
    fn gradient(&self, x: f64, y: f64) -> (f64, f64) {
        let f = self.slope_factor(x.mul_add(x, y * y));
        (x * f, y * f)
    }
    fn distance(
        &self,
        position: &Point3<f64>,
        direction: &Vector3<f64>,
        config: &TraceConfig,
    ) -> Option<f64> {
        let (p, d) = (position, direction);
        let c = self.curvature;
        if c == 0.0 {
            return if d.z == 0.0 {
                None
            } else {
                newton::accept(-p.z / d.z, config)
            };
        }
        let k1 = 1.0 + self.conic_constant;
        // implicit conic (at origin)
        // c (x^2 + y^2) + c (1+k) z^2 - 2z = 0
        //
        // insert ray (p: position, d: direction):
        // This translates into the quadratic equation
        // at^2 + bt + c = 0 with
        // a = c (d_x^2 + d_y^2 + (1+k) d_z^2)
        // b = 2 (c (p_x d_x + p_y d_y + (1+k) p_z d_z) - d_z)
        // c = c (p_x^2 + p_y^2 + (1+k) p_z^2) - 2 p_z
        let a = c * (k1 * d.z).mul_add(d.z, d.x.mul_add(d.x, d.y * d.y));
        let b = 2.0 * c.mul_add((k1 * p.z).mul_add(d.z, p.x.mul_add(d.x, p.y * d.y)), -d.z);
        let cc = c.mul_add((k1 * p.z).mul_add(p.z, p.x.mul_add(p.x, p.y * p.y)), -2.0 * p.z);
        let candidates = match find_roots_quadratic(a, b, cc) {
            Roots::No(_) => return None,
            // tangent ray: let the general solver decide
            Roots::One(_) => return newton::intersect(self, position, direction, config),
            Roots::Two(t) => t,
            _ => return None,
        };
        // ray starting on the surface: the zero root is numerically unreliable
        if candidates.iter().any(|t| t.abs() < config.newton_tolerance) {
            return newton::intersect(self, position, direction, config);
        }
        // only the sheet through the vertex belongs to the surface: c (1+k) z <= 1
        candidates
            .iter()
            .filter(|t| **t >= 0.0)
            .filter(|t| c * k1 * (p.z + **t * d.z) <= 1.0)
            .copied()
            .reduce(f64::min)
            .and_then(|t| newton::accept(t, config))
    }
    fn flip(&mut self) {
        self.flip_base();
    }
    fn scale(&mut self, factor: f64) -> TraceResult<()> {
        check_scale_factor(factor)?;
        self.scale_base(factor);
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{meter, millimeter, surface::test_helper};
    use approx::assert_relative_eq;
    use nalgebra::{point, vector};
    #[test]
    fn new() {
        assert!(Conic::new(meter!(0.0), 0.0).is_err());
        assert!(Conic::new(meter!(f64::NAN), 0.0).is_err());
        assert!(Conic::new(meter!(1.0), f64::NAN).is_err());
        let c = Conic::new(meter!(f64::INFINITY), 0.0).unwrap();
        assert_eq!(c.curvature(), 0.0);
        assert_eq!(Conic::flat(), c);
    }
    #[test]
    fn sag_sphere() {
        let s = Conic::new(millimeter!(100.0), 0.0).unwrap();
        assert_relative_eq!(s.sag(0.0, 0.01), 0.1 - (0.01f64 - 1e-4).sqrt());
        assert_relative_eq!(s.sag(0.06, 0.0), 0.1 - 0.08, epsilon = 1e-15);
        assert!(s.sag(0.0, 0.11).is_nan());
        assert!(s.gradient(0.0, 0.11).0.is_nan());
    }
    #[test]
    fn gradient() {
        let s = Conic::new(millimeter!(-80.0), -2.5).unwrap();
        test_helper::check_gradient(&s, &[(0.0, 0.0), (0.01, -0.02), (0.03, 0.01)]);
        test_helper::check_flip_and_scale(&s, &[(0.0, 0.0), (0.01, -0.02), (0.03, 0.01)]);
    }
    #[test]
    fn intersect_sphere() {
        let s = Conic::new(millimeter!(100.0), 0.0).unwrap();
        let t = s
            .distance(
                &point![0.0, 0.01, -1.0],
                &vector![0.0, 0.0, 1.0],
                &TraceConfig::default(),
            )
            .unwrap();
        assert_relative_eq!(t, 1.0 + 0.1 - (0.01f64 - 1e-4).sqrt(), epsilon = 1e-12);
    }
    #[test]
    fn intersect_concave_from_inside() {
        // ray starting between vertex plane and center of curvature travelling backwards
        let s = Conic::new(millimeter!(-100.0), 0.0).unwrap();
        let t = s
            .distance(
                &point![0.0, 0.0, 0.05],
                &vector![0.0, 0.0, -1.0],
                &TraceConfig::default(),
            )
            .unwrap();
        assert_relative_eq!(t, 0.05, epsilon = 1e-12);
    }
    #[test]
    fn intersect_miss() {
        let s = Conic::new(millimeter!(10.0), 0.0).unwrap();
        assert!(s
            .distance(
                &point![0.0, 0.02, -1.0],
                &vector![0.0, 0.0, 1.0],
                &TraceConfig::default()
            )
            .is_none());
        // surface behind the ray
        assert!(s
            .distance(
                &point![0.0, 0.0, 1.0],
                &vector![0.0, 0.0, 1.0],
                &TraceConfig::default()
            )
            .is_none());
    }
    #[test]
    fn intersect_on_surface() {
        let s = Conic::new(millimeter!(100.0), 0.0).unwrap();
        let t = s
            .distance(
                &point![0.0, 0.0, 0.0],
                &vector![0.0, 0.0, 1.0],
                &TraceConfig::default(),
            )
            .unwrap();
        assert_eq!(t, 0.0);
    }
    #[test]
    fn intersect_flat() {
        let s = Conic::flat();
        let t = s
            .distance(
                &point![0.0, 0.0, -2.0],
                &vector![0.6, 0.0, 0.8],
                &TraceConfig::default(),
            )
            .unwrap();
        assert_relative_eq!(t, 2.5);
        assert!(s
            .distance(
                &point![0.0, 0.0, -2.0],
                &vector![1.0, 0.0, 0.0],
                &TraceConfig::default()
            )
            .is_none());
    }
    #[test]
    fn closed_form_matches_newton() {
        let config = TraceConfig::default();
        for (radius, k) in [(100.0, 0.0), (-50.0, 0.0), (80.0, -1.0), (60.0, -3.0), (70.0, 0.5)] {
            let s = Conic::new(millimeter!(radius), k).unwrap();
            for (pos, dir) in [
                (point![0.0, 0.01, -1.0], vector![0.0, 0.0, 1.0]),
                (point![0.003, -0.002, -0.1], vector![0.05, 0.1, 1.0].normalize()),
                (point![-0.01, 0.0, -0.5], vector![0.02, -0.01, 1.0].normalize()),
            ] {
                let closed = s.distance(&pos, &dir, &config).unwrap();
                let general = newton::intersect(&s, &pos, &dir, &config).unwrap();
                assert_relative_eq!(closed, general, epsilon = 1e-10);
            }
        }
    }
}
