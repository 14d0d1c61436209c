//! Zernike free-form surface
use super::{check_scale_factor, Conic, GeoSurface};
use crate::{
    error::{TraceError, TraceResult},
    utils::{math_utils::factorial, usize_to_f64},
};
use num::complex::Complex64;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter};
use uom::si::{f64::Length, length::meter};

/// Single index ordering scheme of the Zernike polynomials.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumIter)]
pub enum ZernikeOrdering {
    /// Noll ordering, starting at j = 1 (piston)
    #[default]
    Noll,
    /// ANSI / OSA ordering, starting at j = 0 (piston)
    Ansi,
}
impl ZernikeOrdering {
    /// Convert the position of a coefficient in the coefficient list into the radial order n and the
    /// azimuthal frequency m.
    #[must_use]
    pub fn radial_azimuthal(self, index: usize) -> (usize, i64) {
        match self {
            Self::Noll => noll_to_nm(index + 1),
            Self::Ansi => ansi_to_nm(index),
        }
    }
}
fn noll_to_nm(j: usize) -> (usize, i64) {
    let mut n = 0;
    let mut j1 = j - 1;
    while j1 > n {
        n += 1;
        j1 -= n;
    }
    let magnitude = (n % 2) + 2 * ((j1 + (n + 1) % 2) / 2);
    let m = i64::try_from(magnitude).unwrap_or(i64::MAX);
    if j % 2 == 0 {
        (n, m)
    } else {
        (n, -m)
    }
}
fn ansi_to_nm(j: usize) -> (usize, i64) {
    let n = crate::utils::f64_to_usize((8.0f64.mul_add(usize_to_f64(j), 1.0).sqrt() - 1.0) / 2.0);
    let m = 2 * i64::try_from(j).unwrap_or(i64::MAX)
        - i64::try_from(n * (n + 2)).unwrap_or(i64::MAX);
    (n, m)
}

/// A single Zernike term in a form that is cheap to evaluate in Cartesian coordinates.
///
/// Z = N Q(ρ²) Re((u + iv)^|m|) for m ≥ 0 and N Q(ρ²) Im((u + iv)^|m|) for m < 0, where Q holds the
/// remaining radial polynomial after splitting off ρ^|m|.
#[derive(Debug, Clone, PartialEq)]
struct ZernikeTerm {
    m: i64,
    /// coefficients of Q in ascending powers of ρ², already multiplied by the normalization
    q: Vec<f64>,
}
impl ZernikeTerm {
    fn new(n: usize, m: i64) -> Self {
        let m_abs = usize::try_from(m.unsigned_abs()).unwrap_or(usize::MAX);
        let norm = if m == 0 {
            usize_to_f64(n + 1).sqrt()
        } else {
            (2.0 * usize_to_f64(n + 1)).sqrt()
        };
        let half_sum = (n + m_abs) / 2;
        let half_diff = (n - m_abs) / 2;
        let mut q = vec![0.0; half_diff + 1];
        for k in 0..=half_diff {
            let sign = if k % 2 == 0 { 1.0 } else { -1.0 };
            q[half_diff - k] = norm * sign * factorial(n - k)
                / (factorial(k) * factorial(half_sum - k) * factorial(half_diff - k));
        }
        Self { m, q }
    }
    /// Returns (Z, ∂Z/∂u, ∂Z/∂v) at the normalized coordinates.
    fn eval(&self, u: f64, v: f64) -> (f64, f64, f64) {
        let rho_sq = u.mul_add(u, v * v);
        let q = self.q.iter().rev().fold(0.0_f64, |acc, a| acc.mul_add(rho_sq, *a));
        let dq = self
            .q
            .iter()
            .enumerate()
            .skip(1)
            .rev()
            .fold(0.0_f64, |acc, (i, a)| acc.mul_add(rho_sq, usize_to_f64(i) * a));
        let m_abs = i32::try_from(self.m.unsigned_abs()).unwrap_or(i32::MAX);
        let w = Complex64::new(u, v);
        let (p, dp_du, dp_dv) = if m_abs == 0 {
            (1.0, 0.0, 0.0)
        } else {
            let wm = w.powi(m_abs);
            let dw = w.powi(m_abs - 1) * f64::from(m_abs);
            if self.m > 0 {
                (wm.re, dw.re, -dw.im)
            } else {
                (wm.im, dw.im, dw.re)
            }
        };
        (
            q * p,
            (2.0 * u * dq).mul_add(p, q * dp_du),
            (2.0 * v * dq).mul_add(p, q * dp_dv),
        )
    }
}
/// Conic with additional Zernike polynomial terms defined on a normalization radius.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "ZernikeDef", into = "ZernikeDef")]
pub struct Zernike {
    base: Conic,
    coefficients: Vec<f64>,
    ordering: ZernikeOrdering,
    norm_radius: f64,
    terms: Vec<ZernikeTerm>,
}
#[derive(Serialize, Deserialize)]
struct ZernikeDef {
    base: Conic,
    coefficients: Vec<f64>,
    ordering: ZernikeOrdering,
    norm_radius: f64,
}
impl From<ZernikeDef> for Zernike {
    fn from(d: ZernikeDef) -> Self {
        let terms = build_terms(d.coefficients.len(), d.ordering);
        Self {
            base: d.base,
            coefficients: d.coefficients,
            ordering: d.ordering,
            norm_radius: d.norm_radius,
            terms,
        }
    }
}
impl From<Zernike> for ZernikeDef {
    fn from(z: Zernike) -> Self {
        Self {
            base: z.base,
            coefficients: z.coefficients,
            ordering: z.ordering,
            norm_radius: z.norm_radius,
        }
    }
}
fn build_terms(count: usize, ordering: ZernikeOrdering) -> Vec<ZernikeTerm> {
    (0..count)
        .map(|k| {
            let (n, m) = ordering.radial_azimuthal(k);
            ZernikeTerm::new(n, m)
        })
        .collect()
}
impl Zernike {
    /// Create a new [`Zernike`] surface.
    ///
    /// The coefficients are given in meters and belong to the orthonormal Zernike polynomials in the order defined
    /// by `ordering`. The polynomials are evaluated on the radial coordinate divided by `norm_radius`.
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
        ordering: ZernikeOrdering,
        norm_radius: Length,
    ) -> TraceResult<Self> {
        if coefficients.iter().any(|c| !c.is_finite()) {
            return Err(TraceError::Shape(
                "Zernike coefficients must be finite".into(),
            ));
        }
        if !norm_radius.is_normal() || norm_radius.is_sign_negative() {
            return Err(TraceError::Shape(
                "normalization radius must be positive and finite".into(),
            ));
        }
        let terms = build_terms(coefficients.len(), ordering);
        Ok(Self {
            base: Conic::new(radius, conic_constant)?,
            coefficients,
            ordering,
            norm_radius: norm_radius.get::<meter>(),
            terms,
        })
    }
    /// Returns the base conic.
    #[must_use]
    pub const fn base(&self) -> &Conic {
        &self.base
    }
    /// Returns the Zernike coefficients.
    #[must_use]
    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }
    /// Returns the ordering of the coefficients.
    #[must_use]
    pub const fn ordering(&self) -> ZernikeOrdering {
        self.ordering
    }
    /// Returns the normalization radius in meters.
    #[must_use]
    pub const fn norm_radius(&self) -> f64 {
        self.norm_radius
    }
}
impl GeoSurface for Zernike {
    fn sag(&self, x: f64, y: f64) -> f64 {
        let (u, v) = (x / self.norm_radius, y / self.norm_radius);
        let departure: f64 = self
            .coefficients
            .iter()
            .zip(&self.terms)
            .filter(|(c, _)| **c != 0.0)
            .map(|(c, t)| c * t.eval(u, v).0)
            .sum();
        self.base.sag_r2(x.mul_add(x, y * y)) + departure
    }
    fn gradient(&self, x: f64, y: f64) -> (f64, f64) {
        let f = self.base.slope_factor(x.mul_add(x, y * y));
        let (u, v) = (x / self.norm_radius, y / self.norm_radius);
        let (mut fx, mut fy) = (0.0, 0.0);
        for (c, t) in self.coefficients.iter().zip(&self.terms) {
            if *c != 0.0 {
                let (_, du, dv) = t.eval(u, v);
                fx += c * du;
                fy += c * dv;
            }
        }
        (
            x.mul_add(f, fx / self.norm_radius),
            y.mul_add(f, fy / self.norm_radius),
        )
    }
    fn flip(&mut self) {
        self.base.flip_base();
        self.coefficients.iter_mut().for_each(|c| *c = -*c);
    }
    fn scale(&mut self, factor: f64) -> TraceResult<()> {
        check_scale_factor(factor)?;
        self.base.scale_base(factor);
        self.coefficients.iter_mut().for_each(|c| *c *= factor);
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
    fn noll() {
        let expected = [
            (0, 0),
            (1, 1),
            (1, -1),
            (2, 0),
            (2, -2),
            (2, 2),
            (3, -1),
            (3, 1),
            (3, -3),
            (3, 3),
            (4, 0),
        ];
        for (k, nm) in expected.iter().enumerate() {
            assert_eq!(ZernikeOrdering::Noll.radial_azimuthal(k), *nm, "index {k}");
        }
    }
    #[test]
    fn ansi() {
        let expected = [(0, 0), (1, -1), (1, 1), (2, -2), (2, 0), (2, 2), (3, -3)];
        for (k, nm) in expected.iter().enumerate() {
            assert_eq!(ZernikeOrdering::Ansi.radial_azimuthal(k), *nm, "index {k}");
        }
    }
    #[test]
    fn terms() {
        // defocus √3 (2ρ² - 1)
        let defocus = ZernikeTerm::new(2, 0);
        assert_relative_eq!(defocus.eval(0.0, 0.0).0, -(3.0f64.sqrt()));
        assert_relative_eq!(defocus.eval(0.6, 0.8).0, 3.0f64.sqrt());
        // tilt 2ρ cos θ
        assert_relative_eq!(ZernikeTerm::new(1, 1).eval(0.5, 0.3).0, 1.0);
        // oblique astigmatism √6 ρ² sin 2θ
        assert_relative_eq!(
            ZernikeTerm::new(2, -2).eval(0.5, 0.5).0,
            6.0f64.sqrt() * 0.5
        );
        // spherical √5 (6ρ⁴ - 6ρ² + 1)
        assert_relative_eq!(ZernikeTerm::new(4, 0).eval(1.0, 0.0).0, 5.0f64.sqrt());
        // coma √8 (3ρ³ - 2ρ) sin θ
        assert_relative_eq!(
            ZernikeTerm::new(3, -1).eval(0.0, 0.5).0,
            8.0f64.sqrt() * (3.0 * 0.125 - 1.0)
        );
    }
    #[test]
    fn new() {
        assert!(Zernike::new(
            millimeter!(100.0),
            0.0,
            vec![f64::NAN],
            ZernikeOrdering::Noll,
            millimeter!(10.0)
        )
        .is_err());
        assert!(Zernike::new(
            millimeter!(100.0),
            0.0,
            vec![],
            ZernikeOrdering::Noll,
            millimeter!(-10.0)
        )
        .is_err());
    }
    #[test]
    fn gradient() {
        let coefficients = vec![1e-6, 2e-6, -1e-6, 3e-6, 5e-7, -2e-6, 1e-6, 4e-7, -3e-7, 6e-7, 2e-7];
        for ordering in [ZernikeOrdering::Noll, ZernikeOrdering::Ansi] {
            let s = Zernike::new(
                millimeter!(200.0),
                -0.5,
                coefficients.clone(),
                ordering,
                millimeter!(10.0),
            )
            .unwrap();
            let points = [(0.0, 0.0), (0.003, -0.004), (-0.007, 0.002), (0.0, 0.009)];
            test_helper::check_gradient(&s, &points);
            test_helper::check_flip_and_scale(&s, &points);
        }
    }
    #[test]
    fn serde() {
        let s = Zernike::new(
            millimeter!(100.0),
            0.0,
            vec![0.0, 0.0, 0.0, 1e-6],
            ZernikeOrdering::Ansi,
            millimeter!(5.0),
        )
        .unwrap();
        let yaml = serde_yaml::to_string(&s).unwrap();
        let restored: Zernike = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(restored, s);
    }
}
