//! Free-form grid sag surface
//!
//! A rectangular grid of sag departures, centered on the vertex, is added on top of a base conic. Between the
//! grid points the departure is interpolated bicubically with Catmull-Rom splines, which keeps the surface and its
//! slope continuous. Outside the grid the sag is `NaN`.
use super::{check_scale_factor, Conic, GeoSurface};
use crate::{
    error::{TraceError, TraceResult},
    utils::{f64_to_usize, usize_to_f64},
};
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use uom::si::{f64::Length, length::meter};

/// index offsets of the four samples entering the interpolation of a cell
const NEIGHBOURS: [isize; 4] = [-1, 0, 1, 2];

/// Catmull-Rom weights of the four neighbouring samples and their derivatives with respect to t.
fn catmull_rom(t: f64) -> ([f64; 4], [f64; 4]) {
    let t2 = t * t;
    let t3 = t2 * t;
    (
        [
            0.5 * (-t3 + 2.0 * t2 - t),
            0.5 * (3.0 * t3 - 5.0 * t2 + 2.0),
            0.5 * (-3.0 * t3 + 4.0 * t2 + t),
            0.5 * (t3 - t2),
        ],
        [
            0.5 * (-3.0 * t2 + 4.0 * t - 1.0),
            0.5 * (9.0 * t2 - 10.0 * t),
            0.5 * (-9.0 * t2 + 8.0 * t + 1.0),
            0.5 * (3.0 * t2 - 2.0 * t),
        ],
    )
}

/// Conic with an interpolated grid of sag departures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridSag {
    base: Conic,
    /// departures, rows along x, columns along y
    grid: DMatrix<f64>,
    dx: f64,
    dy: f64,
}
impl GridSag {
    /// Create a new [`GridSag`] surface.
    ///
    /// The grid point (i, j) is located at x = (i - (nx - 1) / 2) dx and y = (j - (ny - 1) / 2) dy.
    ///
    /// # Errors
    ///
    /// This function will return an error if
    ///   - the base conic is invalid
    ///   - the grid has less than two points along one axis or contains non-finite values
    ///   - a grid spacing is not positive and finite
    pub fn new(
        radius: Length,
        conic_constant: f64,
        grid: DMatrix<f64>,
        dx: Length,
        dy: Length,
    ) -> TraceResult<Self> {
        if grid.nrows() < 2 || grid.ncols() < 2 {
            return Err(TraceError::Shape(
                "sag grid needs at least 2 x 2 points".into(),
            ));
        }
        if grid.iter().any(|g| !g.is_finite()) {
            return Err(TraceError::Shape("sag grid values must be finite".into()));
        }
        for d in [dx, dy] {
            if !d.is_normal() || d.is_sign_negative() {
                return Err(TraceError::Shape(
                    "grid spacing must be positive and finite".into(),
                ));
            }
        }
        Ok(Self {
            base: Conic::new(radius, conic_constant)?,
            grid,
            dx: dx.get::<meter>(),
            dy: dy.get::<meter>(),
        })
    }
    /// Returns the base conic.
    #[must_use]
    pub const fn base(&self) -> &Conic {
        &self.base
    }
    /// Returns the grid of sag departures.
    #[must_use]
    pub const fn grid(&self) -> &DMatrix<f64> {
        &self.grid
    }
    /// Map a coordinate onto (cell index, fractional position) along one axis.
    fn locate(coordinate: f64, spacing: f64, count: usize) -> Option<(usize, f64)> {
        let s = coordinate / spacing + usize_to_f64(count - 1) / 2.0;
        if !(0.0..=usize_to_f64(count - 1)).contains(&s) {
            return None;
        }
        let cell = f64_to_usize(s.floor()).min(count - 2);
        Some((cell, s - usize_to_f64(cell)))
    }
    fn sample(&self, i: isize, j: isize) -> f64 {
        let clamp = |k: isize, n: usize| usize::try_from(k.max(0)).unwrap_or(0).min(n - 1);
        self.grid[(clamp(i, self.grid.nrows()), clamp(j, self.grid.ncols()))]
    }
    /// Returns the interpolated departure and its derivatives along x and y.
    fn departure(&self, x: f64, y: f64) -> Option<(f64, f64, f64)> {
        let (ci, tx) = Self::locate(x, self.dx, self.grid.nrows())?;
        let (cj, ty) = Self::locate(y, self.dy, self.grid.ncols())?;
        let (wx, dwx) = catmull_rom(tx);
        let (wy, dwy) = catmull_rom(ty);
        let (ci, cj) = (
            isize::try_from(ci).unwrap_or(isize::MAX),
            isize::try_from(cj).unwrap_or(isize::MAX),
        );
        let (mut z, mut zx, mut zy) = (0.0, 0.0, 0.0);
        for (a, (wxa, dwxa)) in NEIGHBOURS.iter().zip(wx.iter().zip(&dwx)) {
            for (b, (wyb, dwyb)) in NEIGHBOURS.iter().zip(wy.iter().zip(&dwy)) {
                let g = self.sample(ci + a, cj + b);
                z += wxa * wyb * g;
                zx += dwxa * wyb * g;
                zy += wxa * dwyb * g;
            }
        }
        Some((z, zx / self.dx, zy / self.dy))
    }
}
impl GeoSurface for GridSag {
    fn sag(&self, x: f64, y: f64) -> f64 {
        self.departure(x, y)
            .map_or(f64::NAN, |(d, _, _)| self.base.sag_r2(x.mul_add(x, y * y)) + d)
    }
    fn gradient(&self, x: f64, y: f64) -> (f64, f64) {
        self.departure(x, y).map_or((f64::NAN, f64::NAN), |(_, dx, dy)| {
            let f = self.base.slope_factor(x.mul_add(x, y * y));
            (x.mul_add(f, dx), y.mul_add(f, dy))
        })
    }
    fn flip(&mut self) {
        self.base.flip_base();
        self.grid.neg_mut();
    }
    fn scale(&mut self, factor: f64) -> TraceResult<()> {
        check_scale_factor(factor)?;
        self.base.scale_base(factor);
        self.grid *= factor;
        self.dx *= factor;
        self.dy *= factor;
        Ok(())
    }
}
