//! Deflection by a surface phase gradient (gratings and phase plates)
//!
//! A grating or phase surface adds an optical path Ψ(x, y) to each ray. The tangential component of the optical
//! direction vector then changes by the tangential part of ∇Ψ:
//!
//! n₂ d'ₜ = n₁ dₜ + ∇ₜΨ
//!
//! while the normal component follows from |d'| = 1. For a grating with period Λ the gradient of the m-th order
//! is m λ / Λ along the grating vector. If |d'ₜ| > 1 the order is evanescent and the ray is lost.
use super::refraction::oriented_normal;
use crate::error::{TraceError, TraceResult};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use uom::si::{
    angle::radian,
    f64::{Angle, Length},
    length::meter,
};

/// Parameters of a linear grating on top of a surface shape.
///
/// The grooves are formed by the intersection of the surface with equidistant planes perpendicular to the grating
/// vector, which lies in the local xy plane.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GratingConfig {
    order: i32,
    period: f64,
    orientation: f64,
    reflective: bool,
}
impl GratingConfig {
    /// Create a new [`GratingConfig`].
    ///
    /// The `orientation` is the angle of the grating vector measured from the local x axis. A `reflective` grating
    /// sends the diffracted orders back into the incident medium.
    ///
    /// # Errors
    ///
    /// This function will return an error if the period is not positive and finite or the orientation is not finite.
    pub fn new(order: i32, period: Length, orientation: Angle, reflective: bool) -> TraceResult<Self> {
        if !period.is_normal() || period.is_sign_negative() {
            return Err(TraceError::Surface(
                "grating period must be positive and finite".into(),
            ));
        }
        if !orientation.is_finite() {
            return Err(TraceError::Surface(
                "grating orientation must be finite".into(),
            ));
        }
        Ok(Self {
            order,
            period: period.get::<meter>(),
            orientation: orientation.get::<radian>(),
            reflective,
        })
    }
    /// Returns the diffraction order.
    #[must_use]
    pub const fn order(&self) -> i32 {
        self.order
    }
    /// Returns the grating period in meters.
    #[must_use]
    pub const fn period(&self) -> f64 {
        self.period
    }
    /// Returns `true` for a reflective grating.
    #[must_use]
    pub const fn is_reflective(&self) -> bool {
        self.reflective
    }
    /// Returns the unit grating vector in the local xy plane.
    #[must_use]
    pub fn grating_vector(&self) -> Vector3<f64> {
        Vector3::new(self.orientation.cos(), self.orientation.sin(), 0.0)
    }
    /// Returns the gradient of the added optical path for the given wavelength (in meters).
    #[must_use]
    pub fn phase_gradient(&self, wavelength: f64) -> Vector3<f64> {
        f64::from(self.order) * wavelength / self.period * self.grating_vector()
    }
    /// Returns the optical path added at the local position (x, y).
    #[must_use]
    pub fn added_opl(&self, x: f64, y: f64, wavelength: f64) -> f64 {
        let g = self.phase_gradient(wavelength);
        g.x.mul_add(x, g.y * y)
    }
}
/// Change the direction of a ray according to the tangential gradient `phase_gradient` of an added optical path.
///
/// `n1` is the index of the incident medium, `n2` the index of the medium the ray enters (ignored for
/// `reflective == true`). Returns `None` if the resulting order is evanescent.
#[must_use]
pub fn deflect(
    direction: &Vector3<f64>,
    normal: &Vector3<f64>,
    n1: f64,
    n2: f64,
    phase_gradient: &Vector3<f64>,
    reflective: bool,
) -> Option<Vector3<f64>> {
    let n = oriented_normal(direction, normal);
    let d_t = direction - direction.dot(&n) * n;
    let g_t = phase_gradient - phase_gradient.dot(&n) * n;
    let n_out = if reflective { n1 } else { n2 };
    let t = (n1 * d_t + g_t) / n_out;
    let normal_sq = 1.0 - t.norm_squared();
    if normal_sq < 0.0 {
        return None;
    }
    if reflective {
        Some(t + normal_sq.sqrt() * n)
    } else {
        Some(t - normal_sq.sqrt() * n)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        degree,
        interaction::refraction::{reflect, refract},
        micrometer, millimeter,
    };
    use approx::assert_relative_eq;
    use nalgebra::vector;
    #[test]
    fn new() {
        assert!(GratingConfig::new(1, millimeter!(0.0), degree!(0.0), false).is_err());
        assert!(GratingConfig::new(1, millimeter!(-1.0), degree!(0.0), false).is_err());
        assert!(GratingConfig::new(1, millimeter!(1.0), degree!(f64::NAN), false).is_err());
        let g = GratingConfig::new(-1, micrometer!(2.0), degree!(90.0), true).unwrap();
        assert_eq!(g.order(), -1);
        assert!(g.is_reflective());
        assert_relative_eq!(g.grating_vector(), vector![0.0, 1.0, 0.0], epsilon = 1e-15);
    }
    #[test]
    fn zeroth_order() {
        let n = vector![0.0, 0.0, 1.0];
        let d = vector![0.0, 0.4f64.sin(), 0.4f64.cos()];
        let zero = Vector3::zeros();
        assert_relative_eq!(
            deflect(&d, &n, 1.0, 1.5, &zero, false).unwrap(),
            refract(&d, &n, 1.0 / 1.5).unwrap(),
            epsilon = 1e-15
        );
        assert_relative_eq!(
            deflect(&d, &n, 1.0, 1.0, &zero, true).unwrap(),
            reflect(&d, &n),
            epsilon = 1e-15
        );
    }
    #[test]
    fn grating_equation() {
        // normal incidence on a transmission grating: sin θₘ = m λ / Λ
        let g = GratingConfig::new(1, micrometer!(2.0), degree!(0.0), false).unwrap();
        let wavelength = 0.5e-6;
        let d = deflect(
            &vector![0.0, 0.0, 1.0],
            &vector![0.0, 0.0, 1.0],
            1.0,
            1.0,
            &g.phase_gradient(wavelength),
            false,
        )
        .unwrap();
        assert_relative_eq!(d.x, 0.25);
        assert_relative_eq!(d.norm(), 1.0);
        assert!(d.z > 0.0);
        assert_relative_eq!(g.added_opl(1e-6, 5.0, wavelength), 0.25e-6);
    }
    #[test]
    fn evanescent_order() {
        let g = GratingConfig::new(3, micrometer!(1.0), degree!(0.0), true).unwrap();
        assert!(deflect(
            &vector![0.0, 0.0, 1.0],
            &vector![0.0, 0.0, 1.0],
            1.0,
            1.0,
            &g.phase_gradient(0.5e-6),
            true
        )
        .is_none());
    }
}
