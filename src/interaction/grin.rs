//! Ray propagation through gradient-index media
//!
//! Inside a GRIN medium the ray follows the ray equation, written for the unit tangent T and the arc length s:
//!
//! dr/ds = T,    dT/ds = (∇n - (∇n·T) T) / n
//!
//! It is integrated with a classical fourth order Runge-Kutta scheme using a fixed step length. The optical path
//! length ∫ n ds is accumulated with Simpson's rule. Once the ray crosses the target surface, the last step is
//! bisected until the crossing point is found within the intersection tolerance.
use crate::{config::TraceConfig, material::GradientIndex};
use nalgebra::{Point3, Vector3};

/// maximum number of bisection steps to locate the exit point within the last integration step
const MAX_BISECTIONS: usize = 100;

/// State of a ray inside a gradient-index medium.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GrinPath {
    /// position (in meters)
    pub position: Point3<f64>,
    /// unit tangent
    pub direction: Vector3<f64>,
    /// accumulated optical path length (in meters)
    pub opl: f64,
}
fn curvature(medium: &GradientIndex, position: &Point3<f64>, direction: &Vector3<f64>) -> Vector3<f64> {
    let (n, grad) = medium.index_and_gradient(position);
    (grad - grad.dot(direction) * direction) / n
}
/// Advance the ray by one Runge-Kutta step of arc length `h`.
fn rk4_step(medium: &GradientIndex, path: &GrinPath, h: f64) -> GrinPath {
    let (r0, t0) = (path.position, path.direction);
    let k1_r = t0;
    let k1_t = curvature(medium, &r0, &t0);
    let r1 = r0 + 0.5 * h * k1_r;
    let t1 = t0 + 0.5 * h * k1_t;
    let k2_r = t1;
    let k2_t = curvature(medium, &r1, &t1);
    let r2 = r0 + 0.5 * h * k2_r;
    let t2 = t0 + 0.5 * h * k2_t;
    let k3_r = t2;
    let k3_t = curvature(medium, &r2, &t2);
    let r3 = r0 + h * k3_r;
    let t3 = t0 + h * k3_t;
    let k4_r = t3;
    let k4_t = curvature(medium, &r3, &t3);
    let position = r0 + h / 6.0 * (k1_r + 2.0 * k2_r + 2.0 * k3_r + k4_r);
    let direction = (t0 + h / 6.0 * (k1_t + 2.0 * k2_t + 2.0 * k3_t + k4_t)).normalize();
    let n_start = medium.index_and_gradient(&r0).0;
    let n_mid = medium.index_and_gradient(&Point3::from((r0.coords + position.coords) / 2.0)).0;
    let n_end = medium.index_and_gradient(&position).0;
    GrinPath {
        position,
        direction,
        opl: path.opl + h / 6.0 * (4.0f64.mul_add(n_mid, n_start) + n_end),
    }
}
/// Integrate a ray over a fixed arc length.
#[must_use]
pub fn integrate_length(
    medium: &GradientIndex,
    start: &Point3<f64>,
    direction: &Vector3<f64>,
    length: f64,
    step: f64,
) -> GrinPath {
    let mut path = GrinPath {
        position: *start,
        direction: direction.normalize(),
        opl: 0.0,
    };
    let mut remaining = length;
    while remaining > 0.0 {
        let h = step.min(remaining);
        path = rk4_step(medium, &path, h);
        remaining -= h;
    }
    path
}
/// Integrate a ray until it crosses the surface given by the implicit function `surface` (F = 0).
///
/// The sign of `F` at the start position defines the side the ray starts on. Returns `None` if the ray does not
/// cross the surface within the step budget of the [`TraceConfig`] or the integration produces non-finite values.
pub fn integrate_to_surface<F>(
    medium: &GradientIndex,
    start: &Point3<f64>,
    direction: &Vector3<f64>,
    surface: F,
    config: &TraceConfig,
) -> Option<GrinPath>
where
    F: Fn(&Point3<f64>) -> f64,
{
    let step = config.grin_step.value;
    let mut path = GrinPath {
        position: *start,
        direction: direction.normalize(),
        opl: 0.0,
    };
    let start_side = surface(start);
    if start_side == 0.0 {
        return Some(path);
    }
    for _ in 0..config.grin_max_steps {
        let next = rk4_step(medium, &path, step);
        if !next.position.iter().all(|c| c.is_finite()) || !next.opl.is_finite() {
            return None;
        }
        let side = surface(&next.position);
        if side * start_side <= 0.0 {
            return Some(bisect(medium, &path, step, start_side, &surface, config));
        }
        path = next;
    }
    None
}
fn bisect<F>(
    medium: &GradientIndex,
    path: &GrinPath,
    step: f64,
    start_side: f64,
    surface: &F,
    config: &TraceConfig,
) -> GrinPath
where
    F: Fn(&Point3<f64>) -> f64,
{
    let (mut lower, mut upper) = (0.0, step);
    let mut result = rk4_step(medium, path, step);
    for _ in 0..MAX_BISECTIONS {
        let h = 0.5 * (lower + upper);
        result = rk4_step(medium, path, h);
        let side = surface(&result.position);
        if side.abs() < config.newton_tolerance {
            break;
        }
        if side * start_side > 0.0 {
            lower = h;
        } else {
            upper = h;
        }
    }
    result
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::millimeter;
    use approx::assert_relative_eq;
    use nalgebra::{point, vector};
    #[test]
    fn homogeneous_is_straight() {
        let medium = GradientIndex::new(1.6, [0.0; 3], [0.0; 3]).unwrap();
        let start = point![0.001, -0.002, 0.0];
        let d = vector![0.1, 0.2, 1.0].normalize();
        let path = integrate_length(&medium, &start, &d, 0.05, 1e-4);
        assert_relative_eq!(path.position, start + 0.05 * d, epsilon = 1e-12);
        assert_relative_eq!(path.direction, d, epsilon = 1e-12);
        assert_relative_eq!(path.opl, 1.6 * 0.05, epsilon = 1e-12);
    }
    #[test]
    fn radial_gradient_focuses() {
        // parabolic index profile n = n0 (1 - g² r² / 2): a paraxial ray oscillates with period 2π / g
        let (n0, g) = (1.5, 100.0);
        let medium = GradientIndex::new(n0, [-n0 * g * g / 2.0, 0.0, 0.0], [0.0; 3]).unwrap();
        let start = point![0.0, 1e-5, 0.0];
        let quarter_pitch = std::f64::consts::FRAC_PI_2 / g;
        let path = integrate_length(&medium, &start, &Vector3::z(), quarter_pitch, 1e-5);
        assert_relative_eq!(path.position.y, 0.0, epsilon = 1e-8);
        assert!(path.direction.y < 0.0);
        assert_relative_eq!(path.direction.norm(), 1.0, epsilon = 1e-14);
    }
    #[test]
    fn reaches_plane() {
        let medium = GradientIndex::new(1.5, [-10.0, 0.0, 0.0], [0.0; 3]).unwrap();
        let config = TraceConfig {
            grin_step: millimeter!(0.3),
            ..Default::default()
        };
        let path = integrate_to_surface(
            &medium,
            &point![0.0, 0.002, 0.0],
            &Vector3::z(),
            |p| p.z - 0.01,
            &config,
        )
        .unwrap();
        assert_relative_eq!(path.position.z, 0.01, epsilon = 1e-11);
        assert!(path.position.y < 0.002);
        assert!(path.opl > 0.01);
    }
    #[test]
    fn step_budget() {
        let medium = GradientIndex::new(1.5, [0.0; 3], [0.0; 3]).unwrap();
        let config = TraceConfig {
            grin_step: millimeter!(0.1),
            grin_max_steps: 10,
            ..Default::default()
        };
        let surface = |p: &Point3<f64>| p.z - 0.01;
        assert!(integrate_to_surface(&medium, &Point3::origin(), &Vector3::z(), surface, &config).is_none());
        let config = TraceConfig {
            grin_max_steps: 101,
            ..config
        };
        assert!(integrate_to_surface(&medium, &Point3::origin(), &Vector3::z(), surface, &config).is_some());
    }
}
