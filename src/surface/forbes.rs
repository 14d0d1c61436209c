//! Forbes Q-bfs asphere
//!
//! The departure from a base conic is expressed in the slope-orthogonal Q-bfs polynomials of G. W. Forbes,
//! "Shape specification for axially symmetric optical surfaces", Opt. Express 15, 5218 (2007):
//!
//! z = conic(ρ) + w (1 - w) / √(1 - c² ρ²) · Σₘ aₘ Qₘ(w)
//!
//! with the normalized radial coordinate w = ρ² / ρₘₐₓ².
use super::{check_scale_factor, Conic, GeoSurface};
use crate::{
    error::{TraceError, TraceResult},
    utils::usize_to_f64,
};
use serde::{Deserialize, Serialize};
use uom::si::{f64::Length, length::meter};

/// Evaluate the Q-bfs polynomials Qₘ(x) and their derivatives for m in 0..count.
fn qbfs_values(x: f64, count: usize) -> (Vec<f64>, Vec<f64>) {
    let mut q = vec![0.0; count];
    let mut dq = vec![0.0; count];
    if count == 0 {
        return (q, dq);
    }
    // Jacobi type polynomials Pₘ and the recurrence coefficients f, g, h
    let mut p = vec![2.0, 8.0f64.mul_add(-x, 6.0)];
    let mut dp = vec![0.0, -8.0];
    let mut f = vec![2.0, 19.0f64.sqrt() / 2.0];
    let mut g = vec![-0.5];
    let mut h: Vec<f64> = Vec::new();
    q[0] = p[0] / f[0];
    if count == 1 {
        return (q, dq);
    }
    q[1] = (p[1] - g[0] * q[0]) / f[1];
    dq[1] = dp[1] / f[1];
    for m in 2..count {
        let mf = usize_to_f64(m);
        p.push(4.0f64.mul_add(-x, 2.0).mul_add(p[m - 1], -p[m - 2]));
        dp.push((-4.0f64).mul_add(p[m - 1], 4.0f64.mul_add(-x, 2.0).mul_add(dp[m - 1], -dp[m - 2])));
        h.push(-mf * (mf - 1.0) / (2.0 * f[m - 2]));
        g.push(-(1.0 + g[m - 2] * h[m - 2]) / f[m - 1]);
        f.push((mf.mul_add(mf + 1.0, 3.0) - g[m - 1] * g[m - 1] - h[m - 2] * h[m - 2]).sqrt());
        q[m] = (p[m] - g[m - 1] * q[m - 1] - h[m - 2] * q[m - 2]) / f[m];
        dq[m] = (dp[m] - g[m - 1] * dq[m - 1] - h[m - 2] * dq[m - 2]) / f[m];
    }
    (q, dq)
}

/// Conic with a Forbes Q-bfs departure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForbesQbfs {
    base: Conic,
    coefficients: Vec<f64>,
    norm_radius: f64,
}
impl ForbesQbfs {
    /// Create a new [`ForbesQbfs`] surface.
    ///
    /// # Errors
    ///
    /// This function will return an error if
    ///   - the base conic is invalid
    ///   - a coefficient is not finite
    ///   - the normalization radius is not positive and finite
    pub fn new(
        radius: Length,
        conic_constant: f64,
        coefficients: Vec<f64>,
        norm_radius: Length,
    ) -> TraceResult<Self> {
        if coefficients.iter().any(|c| !c.is_finite()) {
            return Err(TraceError::Shape("Q-bfs coefficients must be finite".into()));
        }
        if !norm_radius.is_normal() || norm_radius.is_sign_negative() {
            return Err(TraceError::Shape(
                "normalization radius must be positive and finite".into(),
            ));
        }
        Ok(Self {
            base: Conic::new(radius, conic_constant)?,
            coefficients,
            norm_radius: norm_radius.get::<meter>(),
        })
    }
    /// Returns the base conic.
    #[must_use]
    pub const fn base(&self) -> &Conic {
        &self.base
    }
    /// Returns the Q-bfs coefficients.
    #[must_use]
    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }
    /// Returns the normalization radius in meters.
    #[must_use]
    pub const fn norm_radius(&self) -> f64 {
        self.norm_radius
    }
    fn departure_sum(&self, w: f64) -> (f64, f64) {
        let (q, dq) = qbfs_values(w, self.coefficients.len());
        self.coefficients
            .iter()
            .zip(q.iter().zip(&dq))
            .fold((0.0, 0.0), |(s, ds), (a, (q, dq))| {
                (a.mul_add(*q, s), a.mul_add(*dq, ds))
            })
    }
}
impl GeoSurface for ForbesQbfs {
    fn sag(&self, x: f64, y: f64) -> f64 {
        let r_sq = x.mul_add(x, y * y);
        let c = self.base.curvature();
        let root = (c * c).mul_add(-r_sq, 1.0);
        if root <= 0.0 {
            return f64::NAN;
        }
        let w = r_sq / (self.norm_radius * self.norm_radius);
        let (s, _) = self.departure_sum(w);
        self.base.sag_r2(r_sq) + w * (1.0 - w) * s / root.sqrt()
    }
    fn gradient(&self, x: f64, y: f64) -> (f64, f64) {
        let r_sq = x.mul_add(x, y * y);
        let c = self.base.curvature();
        let root = (c * c).mul_add(-r_sq, 1.0);
        if root <= 0.0 {
            return (f64::NAN, f64::NAN);
        }
        let phi = 1.0 / root.sqrt();
        let rm_sq = self.norm_radius * self.norm_radius;
        let w = r_sq / rm_sq;
        let (s, ds) = self.departure_sum(w);
        let departure = (2.0 / rm_sq).mul_add(
            (1.0 - 2.0 * w).mul_add(phi * s, w * (1.0 - w) * phi * ds),
            w * (1.0 - w) * s * c * c * phi.powi(3),
        );
        let f = self.base.slope_factor(r_sq) + departure;
        (x * f, y * f)
    }
    fn flip(&mut self) {
        self.base.flip_base();
        self.coefficients.iter_mut().for_each(|a| *a = -*a);
    }
    fn scale(&mut self, factor: f64) -> TraceResult<()> {
        check_scale_factor(factor)?;
        self.base.scale_base(factor);
        self.coefficients.iter_mut().for_each(|a| *a *= factor);
        self.norm_radius *= factor;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{millimeter, surface::test_helper};
    use approx::assert_relative_eq;
    #[test]
    fn polynomials() {
        let (q, dq) = qbfs_values(0.3, 3);
        assert_relative_eq!(q[0], 1.0);
        assert_relative_eq!(q[1], (13.0 - 16.0 * 0.3) / 19.0f64.sqrt());
        assert_relative_eq!(dq[0], 0.0);
        assert_relative_eq!(dq[1], -16.0 / 19.0f64.sqrt());
        let (q, _) = qbfs_values(0.0, 3);
        assert_relative_eq!(q[2], 4.2078, epsilon = 1e-4);
        assert!(qbfs_values(0.5, 0).0.is_empty());
    }
    #[test]
    fn derivatives() {
        let h = 1e-6;
        let (_, dq) = qbfs_values(0.4, 6);
        let (qp, _) = qbfs_values(0.4 + h, 6);
        let (qm, _) = qbfs_values(0.4 - h, 6);
        for m in 0..6 {
            assert_relative_eq!(dq[m], (qp[m] - qm[m]) / (2.0 * h), epsilon = 1e-6);
        }
    }
    #[test]
    fn new() {
        assert!(ForbesQbfs::new(millimeter!(50.0), 0.0, vec![f64::NAN], millimeter!(10.0)).is_err());
        assert!(ForbesQbfs::new(millimeter!(50.0), 0.0, vec![], millimeter!(0.0)).is_err());
    }
    #[test]
    fn vanishing_departure() {
        let s = ForbesQbfs::new(millimeter!(50.0), -0.2, vec![1e-4, 2e-5], millimeter!(10.0)).unwrap();
        // the departure vanishes at the vertex and at the normalization radius
        assert_eq!(s.sag(0.0, 0.0), 0.0);
        assert_relative_eq!(s.sag(0.006, 0.008), s.base().sag_r2(1e-4), epsilon = 1e-15);
    }
    #[test]
    fn gradient() {
        let s = ForbesQbfs::new(
            millimeter!(-60.0),
            -0.8,
            vec![1e-5, -4e-6, 2e-6, 5e-7],
            millimeter!(15.0),
        )
        .unwrap();
        let points = [(0.0, 0.0), (0.005, 0.007), (-0.012, 0.003)];
        test_helper::check_gradient(&s, &points);
        test_helper::check_flip_and_scale(&s, &points);
    }
}
