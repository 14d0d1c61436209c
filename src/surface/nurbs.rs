//! Rational B-spline (NURBS) height field
//!
//! The surface is defined over a rectangular domain [x₀, x₁] × [y₀, y₁] which is mapped linearly onto the parameter
//! square [0, 1]². A grid of control heights zᵢⱼ with weights wᵢⱼ defines
//!
//! z(u, v) = Σᵢⱼ Nᵢ(u) Nⱼ(v) wᵢⱼ zᵢⱼ / Σᵢⱼ Nᵢ(u) Nⱼ(v) wᵢⱼ
//!
//! with B-spline basis functions on clamped uniform knot vectors. Outside of the domain the sag is `NaN`.
use super::{check_scale_factor, GeoSurface};
use crate::{
    error::{TraceError, TraceResult},
    utils::usize_to_f64,
};
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use uom::si::{f64::Length, length::meter};

/// Clamped uniform knot vector for `count` control points of the given degree.
fn clamped_knots(count: usize, degree: usize) -> Vec<f64> {
    let spans = count - degree;
    let mut knots = vec![0.0; degree + 1];
    knots.extend((1..spans).map(|i| usize_to_f64(i) / usize_to_f64(spans)));
    knots.extend(std::iter::repeat(1.0).take(degree + 1));
    knots
}
/// Cox-de Boor evaluation of all basis functions Nᵢ,ₚ(u) and their first derivatives.
fn basis_functions(knots: &[f64], count: usize, degree: usize, u: f64) -> (Vec<f64>, Vec<f64>) {
    let last = knots.len() - 1;
    let span = if u >= knots[last] {
        count - 1
    } else {
        (degree..count)
            .rfind(|i| knots[*i] <= u)
            .unwrap_or(degree)
    };
    let mut n = vec![0.0; last];
    n[span] = 1.0;
    let mut lower = Vec::new();
    for d in 1..=degree {
        lower.clone_from(&n);
        for i in 0..(last - d) {
            let left_den = knots[i + d] - knots[i];
            let right_den = knots[i + d + 1] - knots[i + 1];
            let left = if left_den > 0.0 {
                (u - knots[i]) / left_den * lower[i]
            } else {
                0.0
            };
            let right = if right_den > 0.0 {
                (knots[i + d + 1] - u) / right_den * lower[i + 1]
            } else {
                0.0
            };
            n[i] = left + right;
        }
        n.truncate(last - d);
    }
    let p = usize_to_f64(degree);
    let derivatives = (0..count)
        .map(|i| {
            let left_den = knots[i + degree] - knots[i];
            let right_den = knots[i + degree + 1] - knots[i + 1];
            let left = if left_den > 0.0 { p / left_den * lower[i] } else { 0.0 };
            let right = if right_den > 0.0 {
                p / right_den * lower[i + 1]
            } else {
                0.0
            };
            left - right
        })
        .collect();
    n.truncate(count);
    (n, derivatives)
}

/// Rational B-spline height field over a rectangular domain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Nurbs {
    heights: DMatrix<f64>,
    weights: DMatrix<f64>,
    degree: (usize, usize),
    x_range: (f64, f64),
    y_range: (f64, f64),
}
impl Nurbs {
    /// Create a new [`Nurbs`] height field.
    ///
    /// The rows of `heights` run along x, the columns along y. If no `weights` are given, all weights are set to
    /// 1.0 (non-rational B-spline).
    ///
    /// # Errors
    ///
    /// This function will return an error if
    ///   - a degree is zero or the number of control points is not larger than the degree
    ///   - heights or weights are not finite or a weight is not positive
    ///   - the weight matrix does not match the height matrix
    ///   - a domain range is empty or not finite
    pub fn new(
        heights: DMatrix<f64>,
        weights: Option<DMatrix<f64>>,
        degree: (usize, usize),
        x_range: (Length, Length),
        y_range: (Length, Length),
    ) -> TraceResult<Self> {
        if degree.0 == 0 || degree.1 == 0 {
            return Err(TraceError::Shape("NURBS degree must be >= 1".into()));
        }
        if heights.nrows() <= degree.0 || heights.ncols() <= degree.1 {
            return Err(TraceError::Shape(
                "number of NURBS control points must be larger than the degree".into(),
            ));
        }
        if heights.iter().any(|h| !h.is_finite()) {
            return Err(TraceError::Shape("NURBS heights must be finite".into()));
        }
        let weights =
            weights.unwrap_or_else(|| DMatrix::from_element(heights.nrows(), heights.ncols(), 1.0));
        if weights.shape() != heights.shape() {
            return Err(TraceError::Shape(
                "NURBS weights must have the same shape as the heights".into(),
            ));
        }
        if weights.iter().any(|w| !w.is_normal() || w.is_sign_negative()) {
            return Err(TraceError::Shape(
                "NURBS weights must be positive and finite".into(),
            ));
        }
        let x_range = (x_range.0.get::<meter>(), x_range.1.get::<meter>());
        let y_range = (y_range.0.get::<meter>(), y_range.1.get::<meter>());
        for (lower, upper) in [x_range, y_range] {
            if !lower.is_finite() || !upper.is_finite() || upper <= lower {
                return Err(TraceError::Shape(
                    "NURBS domain must be a finite, non-empty range".into(),
                ));
            }
        }
        Ok(Self {
            heights,
            weights,
            degree,
            x_range,
            y_range,
        })
    }
    /// Returns the control heights.
    #[must_use]
    pub const fn heights(&self) -> &DMatrix<f64> {
        &self.heights
    }
    /// Returns the degrees along x and y.
    #[must_use]
    pub const fn degree(&self) -> (usize, usize) {
        self.degree
    }
    fn parameters(&self, x: f64, y: f64) -> Option<(f64, f64)> {
        let u = (x - self.x_range.0) / (self.x_range.1 - self.x_range.0);
        let v = (y - self.y_range.0) / (self.y_range.1 - self.y_range.0);
        ((0.0..=1.0).contains(&u) && (0.0..=1.0).contains(&v)).then_some((u, v))
    }
    /// Returns the sag and its derivatives with respect to the parameters u and v.
    fn evaluate(&self, u: f64, v: f64) -> (f64, f64, f64) {
        let (nx, ny) = self.heights.shape();
        let (bu, dbu) = basis_functions(&clamped_knots(nx, self.degree.0), nx, self.degree.0, u);
        let (bv, dbv) = basis_functions(&clamped_knots(ny, self.degree.1), ny, self.degree.1, v);
        let (mut a, mut a_u, mut a_v) = (0.0, 0.0, 0.0);
        let (mut w, mut w_u, mut w_v) = (0.0, 0.0, 0.0);
        for i in 0..nx {
            for j in 0..ny {
                let wij = self.weights[(i, j)];
                let wz = wij * self.heights[(i, j)];
                a += bu[i] * bv[j] * wz;
                a_u += dbu[i] * bv[j] * wz;
                a_v += bu[i] * dbv[j] * wz;
                w += bu[i] * bv[j] * wij;
                w_u += dbu[i] * bv[j] * wij;
                w_v += bu[i] * dbv[j] * wij;
            }
        }
        (
            a / w,
            a_u.mul_add(w, -a * w_u) / (w * w),
            a_v.mul_add(w, -a * w_v) / (w * w),
        )
    }
}
impl GeoSurface for Nurbs {
    fn sag(&self, x: f64, y: f64) -> f64 {
        self.parameters(x, y)
            .map_or(f64::NAN, |(u, v)| self.evaluate(u, v).0)
    }
    fn gradient(&self, x: f64, y: f64) -> (f64, f64) {
        self.parameters(x, y).map_or((f64::NAN, f64::NAN), |(u, v)| {
            let (_, z_u, z_v) = self.evaluate(u, v);
            (
                z_u / (self.x_range.1 - self.x_range.0),
                z_v / (self.y_range.1 - self.y_range.0),
            )
        })
    }
    fn flip(&mut self) {
        self.heights.neg_mut();
    }
    fn scale(&mut self, factor: f64) -> TraceResult<()> {
        check_scale_factor(factor)?;
        self.heights *= factor;
        self.x_range = (self.x_range.0 * factor, self.x_range.1 * factor);
        self.y_range = (self.y_range.0 * factor, self.y_range.1 * factor);
        Ok(())
    }
}
