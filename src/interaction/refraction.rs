//! Refraction and specular reflection in vector form
use nalgebra::Vector3;

/// Returns the given unit normal flipped (if necessary) such that it points against the ray direction.
#[must_use]
pub fn oriented_normal(direction: &Vector3<f64>, normal: &Vector3<f64>) -> Vector3<f64> {
    if direction.dot(normal) > 0.0 {
        -normal
    } else {
        *normal
    }
}
/// Specular reflection d' = d + 2 cos θᵢ n̂.
#[must_use]
pub fn reflect(direction: &Vector3<f64>, normal: &Vector3<f64>) -> Vector3<f64> {
    let n = oriented_normal(direction, normal);
    let cos_i = -direction.dot(&n);
    direction + 2.0 * cos_i * n
}
/// Refract a unit direction at an interface with the index ratio `mu = n_pre / n_post`.
///
/// Vector form of Snell's law: d' = μ d + (μ cos θᵢ - cos θₜ) n̂ with the normal n̂ oriented against d.
/// Returns `None` if the ray is totally internally reflected.
#[must_use]
pub fn refract(direction: &Vector3<f64>, normal: &Vector3<f64>, mu: f64) -> Option<Vector3<f64>> {
    let n = oriented_normal(direction, normal);
    let cos_i = -direction.dot(&n);
    let sin_t_sq = (mu * mu) * cos_i.mul_add(-cos_i, 1.0);
    if sin_t_sq > 1.0 {
        return None;
    }
    let cos_t = (1.0 - sin_t_sq).sqrt();
    Some(mu * direction + mu.mul_add(cos_i, -cos_t) * n)
}
/// Returns the cosine of the angle of incidence (always >= 0.0).
#[must_use]
pub fn cos_incidence(direction: &Vector3<f64>, normal: &Vector3<f64>) -> f64 {
    direction.dot(normal).abs()
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::vector;
    fn incident(angle: f64) -> Vector3<f64> {
        vector![0.0, angle.sin(), angle.cos()]
    }
    #[test]
    fn normal_incidence() {
        let d = vector![0.0, 0.0, 1.0];
        let n = vector![0.0, 0.0, 1.0];
        assert_relative_eq!(refract(&d, &n, 1.0 / 1.5).unwrap(), d);
        assert_relative_eq!(refract(&d, &(-n), 1.0 / 1.5).unwrap(), d);
        assert_relative_eq!(reflect(&d, &n), -d);
    }
    #[test]
    fn snell() {
        let n = vector![0.0, 0.0, 1.0];
        let (n1, n2) = (1.0, 1.5);
        for deg in [1.0_f64, 10.0, 30.0, 60.0, 89.0] {
            let theta_i = deg.to_radians();
            let out = refract(&incident(theta_i), &n, n1 / n2).unwrap();
            assert_relative_eq!(out.norm(), 1.0, epsilon = 1e-14);
            let sin_t = out.y;
            assert_relative_eq!(n1 * theta_i.sin(), n2 * sin_t, epsilon = 1e-14);
            assert!(out.z > 0.0);
        }
    }
    #[test]
    fn total_internal_reflection() {
        let n = vector![0.0, 0.0, 1.0];
        let (n1, n2): (f64, f64) = (1.5, 1.0);
        let critical = (n2 / n1).asin();
        assert!(refract(&incident(critical - 1e-6), &n, n1 / n2).is_some());
        assert!(refract(&incident(critical + 1e-6), &n, n1 / n2).is_none());
        assert!(refract(&incident(1.2), &n, n1 / n2).is_none());
    }
    #[test]
    fn reflection() {
        let n = vector![0.0, 0.0, -1.0];
        let d = incident(0.3);
        let r = reflect(&d, &n);
        assert_relative_eq!(r, vector![0.0, 0.3f64.sin(), -(0.3f64.cos())]);
        assert_relative_eq!(r.norm(), 1.0);
        assert_relative_eq!(cos_incidence(&d, &n), 0.3f64.cos());
    }
}
