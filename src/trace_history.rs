#![warn(missing_docs)]
//! Per-surface record of a trace
//!
//! A [`TraceHistory`] stores the state of all rays at every surface of a
//! [`SurfaceStack`](crate::surface_stack::SurfaceStack). Each quantity is a matrix with one row per surface and one
//! column per ray. Row 0 holds the rays as handed to the trace (object surface). All values are given in global
//! coordinates (lengths in meters).
use crate::{
    error::{TraceError, TraceResult},
    meter,
    rays::RayBatch,
    utils::usize_to_f64,
};
use kahan::KahanSummator;
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use uom::si::f64::Length;

/// Snapshots of a [`RayBatch`] at all surfaces of a stack.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceHistory {
    x: DMatrix<f64>,
    y: DMatrix<f64>,
    z: DMatrix<f64>,
    l: DMatrix<f64>,
    m: DMatrix<f64>,
    n: DMatrix<f64>,
    intensity: DMatrix<f64>,
    opl: DMatrix<f64>,
    wavelengths: DVector<f64>,
}
impl TraceHistory {
    /// Create an empty history for the given number of surfaces and the rays of the given batch.
    pub(crate) fn new(nr_of_surfaces: usize, rays: &RayBatch) -> Self {
        let zeros = DMatrix::zeros(nr_of_surfaces, rays.len());
        Self {
            x: zeros.clone(),
            y: zeros.clone(),
            z: zeros.clone(),
            l: zeros.clone(),
            m: zeros.clone(),
            n: zeros.clone(),
            intensity: zeros.clone(),
            opl: zeros,
            wavelengths: rays.wavelengths().clone(),
        }
    }
    /// Store the state of the given rays as the snapshot of surface `surface_idx`.
    pub(crate) fn record(&mut self, surface_idx: usize, rays: &RayBatch) {
        self.x.set_row(surface_idx, &rays.x().transpose());
        self.y.set_row(surface_idx, &rays.y().transpose());
        self.z.set_row(surface_idx, &rays.z().transpose());
        self.l.set_row(surface_idx, &rays.l().transpose());
        self.m.set_row(surface_idx, &rays.m().transpose());
        self.n.set_row(surface_idx, &rays.n().transpose());
        self.intensity
            .set_row(surface_idx, &rays.intensity().transpose());
        self.opl.set_row(surface_idx, &rays.opl().transpose());
    }
    /// Returns the number of surfaces.
    #[must_use]
    pub fn nr_of_surfaces(&self) -> usize {
        self.x.nrows()
    }
    /// Returns the number of rays.
    #[must_use]
    pub fn nr_of_rays(&self) -> usize {
        self.x.ncols()
    }
    /// Returns the x coordinates (surfaces × rays).
    #[must_use]
    pub const fn x(&self) -> &DMatrix<f64> {
        &self.x
    }
    /// Returns the y coordinates (surfaces × rays).
    #[must_use]
    pub const fn y(&self) -> &DMatrix<f64> {
        &self.y
    }
    /// Returns the z coordinates (surfaces × rays).
    #[must_use]
    pub const fn z(&self) -> &DMatrix<f64> {
        &self.z
    }
    /// Returns the direction cosines along x (surfaces × rays).
    #[must_use]
    pub const fn l(&self) -> &DMatrix<f64> {
        &self.l
    }
    /// Returns the direction cosines along y (surfaces × rays).
    #[must_use]
    pub const fn m(&self) -> &DMatrix<f64> {
        &self.m
    }
    /// Returns the direction cosines along z (surfaces × rays).
    #[must_use]
    pub const fn n(&self) -> &DMatrix<f64> {
        &self.n
    }
    /// Returns the intensities (surfaces × rays).
    #[must_use]
    pub const fn intensity(&self) -> &DMatrix<f64> {
        &self.intensity
    }
    /// Returns the accumulated optical path lengths (surfaces × rays).
    #[must_use]
    pub const fn opl(&self) -> &DMatrix<f64> {
        &self.opl
    }
    fn check_index(&self, surface_idx: usize) -> TraceResult<()> {
        if surface_idx >= self.nr_of_surfaces() {
            return Err(TraceError::Stack(format!(
                "surface index {surface_idx} out of range (history of {} surfaces)",
                self.nr_of_surfaces()
            )));
        }
        Ok(())
    }
    /// Rebuild the [`RayBatch`] recorded at the given surface.
    ///
    /// # Errors
    ///
    /// This function will return an error if the surface index is out of range.
    pub fn surface_rays(&self, surface_idx: usize) -> TraceResult<RayBatch> {
        self.check_index(surface_idx)?;
        let row = |m: &DMatrix<f64>| m.row(surface_idx).transpose();
        Ok(RayBatch::from_snapshot(
            row(&self.x),
            row(&self.y),
            row(&self.z),
            row(&self.l),
            row(&self.m),
            row(&self.n),
            row(&self.opl),
            row(&self.intensity),
            self.wavelengths.clone(),
        ))
    }
    /// Returns the rays at the image surface.
    ///
    /// # Errors
    ///
    /// This function will return an error if the history is empty.
    pub fn final_rays(&self) -> TraceResult<RayBatch> {
        let last = self
            .nr_of_surfaces()
            .checked_sub(1)
            .ok_or_else(|| TraceError::Stack("trace history is empty".into()))?;
        self.surface_rays(last)
    }
    /// Returns the mask of rays still valid at the given surface.
    ///
    /// # Errors
    ///
    /// This function will return an error if the surface index is out of range.
    pub fn valid_mask(&self, surface_idx: usize) -> TraceResult<Vec<bool>> {
        self.check_index(surface_idx)?;
        Ok(self.intensity.row(surface_idx).iter().map(|i| *i > 0.0).collect())
    }
    /// Returns the geometric RMS radius of the valid ray positions around their centroid at the given surface.
    ///
    /// The positions are taken in the global xy plane. Returns `None` if no ray is valid at this surface.
    ///
    /// # Errors
    ///
    /// This function will return an error if the surface index is out of range.
    pub fn rms_spot_radius(&self, surface_idx: usize) -> TraceResult<Option<Length>> {
        let mask = self.valid_mask(surface_idx)?;
        let points: Vec<(f64, f64)> = mask
            .iter()
            .enumerate()
            .filter(|(_, valid)| **valid)
            .map(|(idx, _)| (self.x[(surface_idx, idx)], self.y[(surface_idx, idx)]))
            .collect();
        if points.is_empty() {
            return Ok(None);
        }
        let count = usize_to_f64(points.len());
        let cx: kahan::KahanSum<f64> = points.iter().map(|p| p.0).kahan_sum();
        let cy: kahan::KahanSum<f64> = points.iter().map(|p| p.1).kahan_sum();
        let (cx, cy) = (cx.sum() / count, cy.sum() / count);
        let sum_sq: kahan::KahanSum<f64> = points
            .iter()
            .map(|(x, y)| (x - cx).mul_add(x - cx, (y - cy) * (y - cy)))
            .kahan_sum();
        Ok(Some(meter!((sum_sq.sum() / count).sqrt())))
    }
}
