//! Chebyshev polynomial free-form surface
use super::{check_scale_factor, Conic, GeoSurface};
use crate::{
    error::{TraceError, TraceResult},
    utils::usize_to_f64,
};
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use uom::si::{f64::Length, length::meter};

/// Conic with an additional sum of products of Chebyshev polynomials of the first kind
///
/// z = conic(r) + Σᵢⱼ aᵢⱼ Tᵢ(x / nx) Tⱼ(y / ny) with the normalization lengths nx and ny.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chebyshev {
    base: Conic,
    coefficients: DMatrix<f64>,
    norm_x: f64,
    norm_y: f64,
}
/// Returns the values Tₙ(u) and derivatives Tₙ'(u) for n in 0..count.
fn chebyshev_values(u: f64, count: usize) -> (Vec<f64>, Vec<f64>) {
    let mut t = vec![0.0; count];
    let mut dt = vec![0.0; count];
    // Chebyshev polynomials of the second kind, Tₙ' = n Uₙ₋₁
    let mut u_prev = 0.0;
    let mut u_curr = 1.0;
    for n in 0..count {
        t[n] = match n {
            0 => 1.0,
            1 => u,
            _ => (2.0 * u).mul_add(t[n - 1], -t[n - 2]),
        };
        if n > 0 {
            dt[n] = usize_to_f64(n) * u_curr;
            let u_next = (2.0 * u).mul_add(u_curr, -u_prev);
            u_prev = u_curr;
            u_curr = u_next;
        }
    }
    (t, dt)
}
impl Chebyshev {
    /// Create a new [`Chebyshev`] surface.
    ///
    /// # Errors
    ///
    /// This function will return an error if
    ///   - the base conic is invalid
    ///   - a coefficient is not finite
    ///   - a normalization length is not positive and finite
    pub fn new(
        radius: Length,
        conic_constant: f64,
        coefficients: DMatrix<f64>,
        norm_x: Length,
        norm_y: Length,
    ) -> TraceResult<Self> {
        if coefficients.iter().any(|c| !c.is_finite()) {
            return Err(TraceError::Shape(
                "Chebyshev coefficients must be finite".into(),
            ));
        }
        for n in [norm_x, norm_y] {
            if !n.is_normal() || n.is_sign_negative() {
                return Err(TraceError::Shape(
                    "normalization lengths must be positive and finite".into(),
                ));
            }
        }
        Ok(Self {
            base: Conic::new(radius, conic_constant)?,
            coefficients,
            norm_x: norm_x.get::<meter>(),
            norm_y: norm_y.get::<meter>(),
        })
    }
    /// Returns the base conic.
    #[must_use]
    pub const fn base(&self) -> &Conic {
        &self.base
    }
    /// Returns the coefficient matrix.
    #[must_use]
    pub const fn coefficients(&self) -> &DMatrix<f64> {
        &self.coefficients
    }
}
impl GeoSurface for Chebyshev {
    fn sag(&self, x: f64, y: f64) -> f64 {
        let (tx, _) = chebyshev_values(x / self.norm_x, self.coefficients.nrows());
        let (ty, _) = chebyshev_values(y / self.norm_y, self.coefficients.ncols());
        let mut z = self.base.sag_r2(x.mul_add(x, y * y));
        for i in 0..self.coefficients.nrows() {
            for j in 0..self.coefficients.ncols() {
                z += self.coefficients[(i, j)] * tx[i] * ty[j];
            }
        }
        z
    }
    fn gradient(&self, x: f64, y: f64) -> (f64, f64) {
        let f = self.base.slope_factor(x.mul_add(x, y * y));
        let (mut fx, mut fy) = (x * f, y * f);
        let (tx, dtx) = chebyshev_values(x / self.norm_x, self.coefficients.nrows());
        let (ty, dty) = chebyshev_values(y / self.norm_y, self.coefficients.ncols());
        for i in 0..self.coefficients.nrows() {
            for j in 0..self.coefficients.ncols() {
                let a = self.coefficients[(i, j)];
                fx += a * dtx[i] * ty[j] / self.norm_x;
                fy += a * tx[i] * dty[j] / self.norm_y;
            }
        }
        (fx, fy)
    }
    fn flip(&mut self) {
        self.base.flip_base();
        self.coefficients.neg_mut();
    }
    fn scale(&mut self, factor: f64) -> TraceResult<()> {
        check_scale_factor(factor)?;
        self.base.scale_base(factor);
        self.coefficients *= factor;
        self.norm_x *= factor;
        self.norm_y *= factor;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{meter, millimeter, surface::test_helper};
    use approx::assert_relative_eq;
    use nalgebra::dmatrix;
    #[test]
    fn values() {
        let (t, dt) = chebyshev_values(0.3, 5);
        assert_relative_eq!(t[2], 2.0 * 0.09 - 1.0);
        assert_relative_eq!(t[3], 4.0 * 0.027 - 3.0 * 0.3);
        assert_relative_eq!(t[4], 8.0 * 0.0081 - 8.0 * 0.09 + 1.0);
        assert_relative_eq!(dt[0], 0.0);
        assert_relative_eq!(dt[1], 1.0);
        assert_relative_eq!(dt[2], 4.0 * 0.3);
        assert_relative_eq!(dt[3], 12.0 * 0.09 - 3.0);
    }
    #[test]
    fn new() {
        let c = dmatrix![1.0];
        assert!(Chebyshev::new(meter!(1.0), 0.0, c.clone(), meter!(0.0), meter!(1.0)).is_err());
        assert!(Chebyshev::new(meter!(1.0), 0.0, c, meter!(1.0), meter!(f64::NAN)).is_err());
        assert!(Chebyshev::new(meter!(1.0), 0.0, dmatrix![f64::NAN], meter!(1.0), meter!(1.0)).is_err());
    }
    #[test]
    fn gradient() {
        let s = Chebyshev::new(
            millimeter!(150.0),
            0.0,
            dmatrix![0.0, 1e-5, 2e-5; -1e-5, 3e-5, 0.0; 4e-5, 0.0, 1e-6],
            millimeter!(10.0),
            millimeter!(20.0),
        )
        .unwrap();
        let points = [(0.0, 0.0), (0.004, 0.01), (-0.008, -0.015)];
        test_helper::check_gradient(&s, &points);
        test_helper::check_flip_and_scale(&s, &points);
    }
}
