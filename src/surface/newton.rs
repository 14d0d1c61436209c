//! General intersection solver
//!
//! Newton-Raphson iteration on F(t) = z(t) - sag(x(t), y(t)) along the ray parameter t. The iteration is seeded
//! with the intersection of the ray and the vertex plane (z = 0).
use super::GeoSurface;
use crate::config::TraceConfig;
use nalgebra::{Point3, Vector3};

/// Solve for the geometric distance between `position` and the surface along `direction`.
///
/// Returns `None` if
///   - the iteration does not converge within `config.newton_max_iterations`
///   - the sag is undefined along the iteration path
///   - the derivative of F vanishes (ray tangent to the surface)
///   - the intersection lies behind the ray origin
pub fn intersect<S: GeoSurface + ?Sized>(
    surface: &S,
    position: &Point3<f64>,
    direction: &Vector3<f64>,
    config: &TraceConfig,
) -> Option<f64> {
    let mut t = if direction.z.abs() > f64::EPSILON {
        -position.z / direction.z
    } else {
        0.0
    };
    for _ in 0..config.newton_max_iterations {
        let p = position + t * direction;
        let f = p.z - surface.sag(p.x, p.y);
        if !f.is_finite() {
            return None;
        }
        if f.abs() < config.newton_tolerance {
            return accept(t, config);
        }
        let (fx, fy) = surface.gradient(p.x, p.y);
        let df = direction.z - fx.mul_add(direction.x, fy * direction.y);
        if !df.is_normal() {
            return None;
        }
        t -= f / df;
    }
    None
}
/// Accept a solution if it does not lie behind the ray origin.
///
/// Distances slightly below zero (within the solver tolerance) stem from rays starting on the surface and
/// are clamped to zero.
pub fn accept(t: f64, config: &TraceConfig) -> Option<f64> {
    if !t.is_finite() || t < -config.newton_tolerance {
        None
    } else {
        Some(t.max(0.0))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        meter,
        surface::{Conic, EvenAsphere, GeoSurface, Plane},
    };
    use approx::assert_relative_eq;
    use nalgebra::{point, vector};
    #[test]
    fn plane() {
        let t = intersect(
            &Plane,
            &point![0.1, 0.2, -1.0],
            &vector![0.0, 0.6, 0.8],
            &TraceConfig::default(),
        )
        .unwrap();
        assert_relative_eq!(t, 1.25);
    }
    #[test]
    fn behind() {
        assert!(intersect(
            &Plane,
            &point![0.0, 0.0, 1.0],
            &vector![0.0, 0.0, 1.0],
            &TraceConfig::default()
        )
        .is_none());
    }
    #[test]
    fn parallel() {
        assert!(intersect(
            &Conic::new(meter!(10.0), 0.0).unwrap(),
            &point![0.0, 0.0, -1.0],
            &vector![1.0, 0.0, 0.0],
            &TraceConfig::default()
        )
        .is_none());
    }
    #[test]
    fn iteration_budget() {
        let config = TraceConfig {
            newton_max_iterations: 1,
            ..Default::default()
        };
        let asphere = EvenAsphere::new(meter!(10.0), -0.5, vec![0.0, 1e-3]).unwrap();
        assert!(intersect(
            &asphere,
            &point![0.0, 0.02, -1.0],
            &vector![0.0, 0.0, 1.0],
            &config
        )
        .is_none());
        let t = intersect(
            &asphere,
            &point![0.0, 0.02, -1.0],
            &vector![0.0, 0.0, 1.0],
            &TraceConfig::default(),
        )
        .unwrap();
        assert_relative_eq!(t, 1.0 + asphere.sag(0.0, 0.02), epsilon = 1e-12);
    }
    #[test]
    fn accept_values() {
        let c = TraceConfig::default();
        assert_eq!(accept(-1e-14, &c), Some(0.0));
        assert_eq!(accept(-1e-3, &c), None);
        assert_eq!(accept(f64::NAN, &c), None);
        assert_eq!(accept(2.0, &c), Some(2.0));
    }
}
