#![warn(missing_docs)]
//! Module for handling bundles of rays
//!
//! A [`RayBatch`] stores the state of many rays as parallel arrays (structure of arrays): positions, direction
//! cosines, accumulated optical path length, intensity and wavelength. All lengths are stored in meters.
//!
//! The intensity channel doubles as validity flag: a ray with intensity 0.0 is invalid (blocked by an aperture,
//! totally reflected, missed a surface, ...). Invalid rays stay in the batch with their last valid position so that
//! the number of rays never changes during a trace.
use crate::{
    error::{TraceError, TraceResult},
    meter,
    position_distributions::PositionDistribution,
};
use itertools::izip;
use kahan::KahanSummator;
use nalgebra::{DVector, Isometry3, Point3, Vector3};
use num::Zero;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use uom::si::{
    f64::Length,
    length::{meter, nanometer},
};

/// Bundle of rays stored as parallel arrays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RayBatch {
    x: DVector<f64>,
    y: DVector<f64>,
    z: DVector<f64>,
    l: DVector<f64>,
    m: DVector<f64>,
    n: DVector<f64>,
    opl: DVector<f64>,
    intensity: DVector<f64>,
    wavelength: DVector<f64>,
}
impl RayBatch {
    /// Creates a new [`RayBatch`] from a set of start positions and directions with a common wavelength.
    ///
    /// The direction vectors are normalized (direction cosines). All rays start with intensity 1.0 and zero optical path length.
    ///
    /// # Errors
    ///
    /// This function returns an error if
    ///  - the number of positions and directions differs
    ///  - the given wavelength is <= 0.0, `NaN` or +inf
    ///  - a position is not finite
    ///  - a direction vector has a zero length or is not finite
    pub fn new(
        positions: &[Point3<Length>],
        directions: &[Vector3<f64>],
        wavelength: Length,
    ) -> TraceResult<Self> {
        if positions.len() != directions.len() {
            return Err(TraceError::Other(
                "number of positions and directions must be equal".into(),
            ));
        }
        Self::check_wavelength(wavelength)?;
        let nr_of_rays = positions.len();
        let mut rays = Self::with_len(nr_of_rays, wavelength.get::<meter>());
        for (idx, (pos, dir)) in positions.iter().zip(directions).enumerate() {
            if pos.iter().any(|c| !c.is_finite()) {
                return Err(TraceError::Other("ray position must be finite".into()));
            }
            if dir.norm().is_zero() || dir.iter().any(|c| !c.is_finite()) {
                return Err(TraceError::Other(
                    "length of direction must be >0 and finite".into(),
                ));
            }
            let dir = dir.normalize();
            rays.x[idx] = pos.x.get::<meter>();
            rays.y[idx] = pos.y.get::<meter>();
            rays.z[idx] = pos.z.get::<meter>();
            rays.l[idx] = dir.x;
            rays.m[idx] = dir.y;
            rays.n[idx] = dir.z;
        }
        Ok(rays)
    }
    /// Creates a bundle of parallel rays.
    ///
    /// The start points are generated by the given [`PositionDistribution`] in the xy plane and shifted to the plane `z`.
    /// All rays share the given direction.
    ///
    /// # Errors
    ///
    /// This function returns an error if the wavelength, the z position or the direction are invalid.
    pub fn new_collimated(
        distribution: &dyn PositionDistribution,
        direction: Vector3<f64>,
        z: Length,
        wavelength: Length,
    ) -> TraceResult<Self> {
        let positions: Vec<Point3<Length>> = distribution
            .generate()
            .into_iter()
            .map(|p| Point3::new(p.x, p.y, z))
            .collect();
        let directions = vec![direction; positions.len()];
        Self::new(&positions, &directions, wavelength)
    }
    /// Creates a [`RayBatch`] from raw arrays (all lengths in meters).
    ///
    /// This is the constructor of choice for drivers that build rays in a vectorized way. The direction cosines are
    /// normalized.
    ///
    /// # Errors
    ///
    /// This function returns an error if
    ///   - the arrays differ in length
    ///   - an intensity is outside the range `0.0..=1.0`
    ///   - a wavelength is not positive and finite
    ///   - a direction vector has zero length
    #[allow(clippy::too_many_arguments)]
    pub fn from_arrays(
        x: DVector<f64>,
        y: DVector<f64>,
        z: DVector<f64>,
        l: DVector<f64>,
        m: DVector<f64>,
        n: DVector<f64>,
        intensity: DVector<f64>,
        wavelength: DVector<f64>,
    ) -> TraceResult<Self> {
        let len = x.len();
        if [
            y.len(),
            z.len(),
            l.len(),
            m.len(),
            n.len(),
            intensity.len(),
            wavelength.len(),
        ]
        .iter()
        .any(|l| *l != len)
        {
            return Err(TraceError::Other("all arrays must have equal length".into()));
        }
        if intensity.iter().any(|i| !(0.0..=1.0).contains(i)) {
            return Err(TraceError::Other(
                "intensities must be within (0.0..=1.0)".into(),
            ));
        }
        for w in &wavelength {
            Self::check_wavelength(meter!(*w))?;
        }
        let mut rays = Self {
            x,
            y,
            z,
            l,
            m,
            n,
            opl: DVector::zeros(len),
            intensity,
            wavelength,
        };
        for idx in 0..len {
            let d = rays.direction(idx);
            if d.norm().is_zero() || !d.norm().is_finite() {
                return Err(TraceError::Other(
                    "length of direction must be >0 and finite".into(),
                ));
            }
            rays.set_direction(idx, &d.normalize());
        }
        Ok(rays)
    }
    /// Rebuild a [`RayBatch`] from a recorded state without any checks.
    #[allow(clippy::too_many_arguments)]
    pub(crate) const fn from_snapshot(
        x: DVector<f64>,
        y: DVector<f64>,
        z: DVector<f64>,
        l: DVector<f64>,
        m: DVector<f64>,
        n: DVector<f64>,
        opl: DVector<f64>,
        intensity: DVector<f64>,
        wavelength: DVector<f64>,
    ) -> Self {
        Self {
            x,
            y,
            z,
            l,
            m,
            n,
            opl,
            intensity,
            wavelength,
        }
    }
    fn with_len(nr_of_rays: usize, wavelength_in_m: f64) -> Self {
        Self {
            x: DVector::zeros(nr_of_rays),
            y: DVector::zeros(nr_of_rays),
            z: DVector::zeros(nr_of_rays),
            l: DVector::zeros(nr_of_rays),
            m: DVector::zeros(nr_of_rays),
            n: DVector::from_element(nr_of_rays, 1.0),
            opl: DVector::zeros(nr_of_rays),
            intensity: DVector::from_element(nr_of_rays, 1.0),
            wavelength: DVector::from_element(nr_of_rays, wavelength_in_m),
        }
    }
    fn check_wavelength(wavelength: Length) -> TraceResult<()> {
        if wavelength.is_zero() || wavelength.is_sign_negative() || !wavelength.is_finite() {
            return Err(TraceError::Other("wavelength must be >0 and finite".into()));
        }
        Ok(())
    }
    /// Returns the number of rays (valid and invalid) of this [`RayBatch`].
    #[must_use]
    pub fn len(&self) -> usize {
        self.x.len()
    }
    /// Returns `true` if this [`RayBatch`] does not contain any ray.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }
    /// Returns the x coordinates (in meters).
    #[must_use]
    pub const fn x(&self) -> &DVector<f64> {
        &self.x
    }
    /// Returns the y coordinates (in meters).
    #[must_use]
    pub const fn y(&self) -> &DVector<f64> {
        &self.y
    }
    /// Returns the z coordinates (in meters).
    #[must_use]
    pub const fn z(&self) -> &DVector<f64> {
        &self.z
    }
    /// Returns the direction cosines along x.
    #[must_use]
    pub const fn l(&self) -> &DVector<f64> {
        &self.l
    }
    /// Returns the direction cosines along y.
    #[must_use]
    pub const fn m(&self) -> &DVector<f64> {
        &self.m
    }
    /// Returns the direction cosines along z.
    #[must_use]
    pub const fn n(&self) -> &DVector<f64> {
        &self.n
    }
    /// Returns the accumulated optical path lengths (in meters).
    #[must_use]
    pub const fn opl(&self) -> &DVector<f64> {
        &self.opl
    }
    /// Returns the intensities of all rays.
    #[must_use]
    pub const fn intensity(&self) -> &DVector<f64> {
        &self.intensity
    }
    /// Returns the wavelengths of all rays (in meters).
    #[must_use]
    pub const fn wavelengths(&self) -> &DVector<f64> {
        &self.wavelength
    }
    /// Returns the wavelength of the ray with the given index.
    #[must_use]
    pub fn wavelength(&self, idx: usize) -> Length {
        meter!(self.wavelength[idx])
    }
    /// Returns the position of the ray with the given index.
    #[must_use]
    pub fn position(&self, idx: usize) -> Point3<Length> {
        meter!(self.x[idx], self.y[idx], self.z[idx])
    }
    /// Returns the position of the ray with the given index in meters.
    #[must_use]
    pub fn position_m(&self, idx: usize) -> Point3<f64> {
        Point3::new(self.x[idx], self.y[idx], self.z[idx])
    }
    /// Returns the direction cosines of the ray with the given index.
    #[must_use]
    pub fn direction(&self, idx: usize) -> Vector3<f64> {
        Vector3::new(self.l[idx], self.m[idx], self.n[idx])
    }
    /// Sets the position (in meters) of the ray with the given index.
    pub fn set_position(&mut self, idx: usize, position: &Point3<f64>) {
        self.x[idx] = position.x;
        self.y[idx] = position.y;
        self.z[idx] = position.z;
    }
    /// Sets the direction of the ray with the given index.
    ///
    /// **Note**: The vector is stored as given. Use [`normalize_directions`](Self::normalize_directions) to restore unit length.
    pub fn set_direction(&mut self, idx: usize, direction: &Vector3<f64>) {
        self.l[idx] = direction.x;
        self.m[idx] = direction.y;
        self.n[idx] = direction.z;
    }
    /// Adds the given amount (in meters) to the optical path length of the ray with the given index.
    pub fn add_opl(&mut self, idx: usize, delta: f64) {
        self.opl[idx] += delta;
    }
    /// Multiplies the intensity of the ray with the given index by the given factor.
    ///
    /// The factor is clamped to `0.0..=1.0` so that the intensity never increases. A non-finite factor invalidates the ray.
    pub fn attenuate(&mut self, idx: usize, factor: f64) {
        if factor.is_finite() {
            self.intensity[idx] *= factor.clamp(0.0, 1.0);
        } else {
            self.intensity[idx] = 0.0;
        }
    }
    /// Returns `true` if the ray with the given index is still valid (intensity > 0.0).
    #[must_use]
    pub fn is_valid(&self, idx: usize) -> bool {
        self.intensity[idx] > 0.0
    }
    /// Invalidates the ray with the given index by setting its intensity to zero.
    pub fn invalidate(&mut self, idx: usize) {
        self.intensity[idx] = 0.0;
    }
    /// Returns a mask of all valid rays.
    #[must_use]
    pub fn valid_mask(&self) -> Vec<bool> {
        self.intensity.iter().map(|i| *i > 0.0).collect()
    }
    /// Returns the number of valid rays.
    #[must_use]
    pub fn nr_of_valid_rays(&self) -> usize {
        self.intensity.iter().filter(|i| **i > 0.0).count()
    }
    /// Returns the sum of all ray intensities.
    #[must_use]
    pub fn total_intensity(&self) -> f64 {
        let sum: kahan::KahanSum<f64> = self.intensity.iter().kahan_sum();
        sum.sum()
    }
    /// Apply an isometry (in meters) to all positions and directions.
    pub fn transform(&mut self, isometry: &Isometry3<f64>) {
        for idx in 0..self.len() {
            let p = isometry.transform_point(&self.position_m(idx));
            let d = isometry.transform_vector(&self.direction(idx));
            self.set_position(idx, &p);
            self.set_direction(idx, &d);
        }
    }
    /// Freely propagate all valid rays along their directions.
    ///
    /// `distances` holds the geometric propagation length (in meters) per ray, `refractive_indices` the index of the
    /// medium traversed. The optical path length grows by `n * distance`. Rays with a `None` distance (e.g. a missed
    /// surface) or a non-finite result are invalidated and keep their current position.
    ///
    /// # Errors
    ///
    /// This function returns an error if the number of distances or refractive indices does not match the number of rays.
    pub fn propagate(
        &mut self,
        distances: &[Option<f64>],
        refractive_indices: &[f64],
    ) -> TraceResult<()> {
        if distances.len() != self.len() || refractive_indices.len() != self.len() {
            return Err(TraceError::Other(
                "number of distances / refractive indices does not match number of rays".into(),
            ));
        }
        for (idx, (distance, index)) in distances.iter().zip(refractive_indices).enumerate() {
            if !self.is_valid(idx) {
                continue;
            }
            let Some(t) = distance else {
                self.invalidate(idx);
                continue;
            };
            let new_pos = self.position_m(idx) + *t * self.direction(idx);
            let new_opl = self.opl[idx] + index * t.abs();
            if new_pos.iter().all(|c| c.is_finite()) && new_opl.is_finite() {
                self.set_position(idx, &new_pos);
                self.opl[idx] = new_opl;
            } else {
                self.invalidate(idx);
            }
        }
        Ok(())
    }
    /// Normalize all direction vectors to unit length (direction cosines).
    ///
    /// Rays with a degenerate (zero or non-finite) direction are invalidated.
    pub fn normalize_directions(&mut self) {
        for idx in 0..self.len() {
            let d = self.direction(idx);
            let norm = d.norm();
            if norm.is_normal() {
                self.set_direction(idx, &(d / norm));
            } else {
                self.invalidate(idx);
            }
        }
    }
    /// Invalidate all rays whose state contains `NaN` or infinite values.
    ///
    /// This guards downstream statistics against numerical degeneracies.
    pub fn sanitize(&mut self) {
        for idx in 0..self.len() {
            let finite = izip!(
                [self.x[idx], self.y[idx], self.z[idx]],
                [self.l[idx], self.m[idx], self.n[idx]]
            )
            .all(|(p, d)| p.is_finite() && d.is_finite())
                && self.opl[idx].is_finite();
            if !finite {
                self.invalidate(idx);
            }
        }
    }
}
impl Display for RayBatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "{} rays ({} valid), total intensity: {:.6}",
            self.len(),
            self.nr_of_valid_rays(),
            self.total_intensity()
        )?;
        for idx in 0..self.len() {
            writeln!(
                f,
                "pos: ({:.6e}, {:.6e}, {:.6e}) m, dir: ({:.6}, {:.6}, {:.6}), opl: {:.6e} m, intensity: {:.4}, wavelength: {:.2} nm",
                self.x[idx],
                self.y[idx],
                self.z[idx],
                self.l[idx],
                self.m[idx],
                self.n[idx],
                self.opl[idx],
                self.intensity[idx],
                self.wavelength(idx).get::<nanometer>()
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{millimeter, nanometer, position_distributions::Hexapolar};
    use approx::assert_relative_eq;
    use nalgebra::{point, vector};

    fn two_rays() -> RayBatch {
        RayBatch::new(
            &[millimeter!(0.0, 0.0, 0.0), millimeter!(0.0, 1.0, 0.0)],
            &[vector![0.0, 0.0, 2.0], vector![0.0, 1.0, 1.0]],
            nanometer!(1053.0),
        )
        .unwrap()
    }
    #[test]
    fn new() {
        let rays = two_rays();
        assert_eq!(rays.len(), 2);
        assert!(!rays.is_empty());
        assert_eq!(rays.direction(0), vector![0.0, 0.0, 1.0]);
        assert_relative_eq!(rays.direction(1).norm(), 1.0);
        assert_eq!(rays.intensity()[0], 1.0);
        assert_eq!(rays.opl()[1], 0.0);
        assert_relative_eq!(rays.wavelength(0).get::<nanometer>(), 1053.0);
        assert_eq!(rays.position(1), millimeter!(0.0, 1.0, 0.0));
    }
    #[test]
    fn new_wrong() {
        let p = [millimeter!(0.0, 0.0, 0.0)];
        let d = [vector![0.0, 0.0, 1.0]];
        assert!(RayBatch::new(&p, &d, nanometer!(0.0)).is_err());
        assert!(RayBatch::new(&p, &d, nanometer!(-1.0)).is_err());
        assert!(RayBatch::new(&p, &d, nanometer!(f64::NAN)).is_err());
        assert!(RayBatch::new(&p, &[vector![0.0, 0.0, 0.0]], nanometer!(500.0)).is_err());
        assert!(RayBatch::new(&p, &[], nanometer!(500.0)).is_err());
        assert!(RayBatch::new(
            &[millimeter!(f64::NAN, 0.0, 0.0)],
            &d,
            nanometer!(500.0)
        )
        .is_err());
    }
    #[test]
    fn new_collimated() {
        let dist = Hexapolar::new(millimeter!(1.0), 2).unwrap();
        let rays = RayBatch::new_collimated(
            &dist,
            vector![0.0, 0.0, 1.0],
            millimeter!(-10.0),
            nanometer!(500.0),
        )
        .unwrap();
        assert_eq!(rays.len(), 19);
        assert!(rays.z().iter().all(|z| (*z + 0.01).abs() < 1e-15));
    }
    #[test]
    fn from_arrays() {
        let one = DVector::from_element(2, 1.0);
        let zero = DVector::zeros(2);
        let wvl = DVector::from_element(2, 500e-9);
        let rays = RayBatch::from_arrays(
            zero.clone(),
            zero.clone(),
            zero.clone(),
            zero.clone(),
            one.clone(),
            one.clone(),
            one.clone(),
            wvl.clone(),
        )
        .unwrap();
        assert_relative_eq!(rays.m()[0], 1.0 / 2.0_f64.sqrt());
        assert!(RayBatch::from_arrays(
            zero.clone(),
            zero.clone(),
            zero.clone(),
            zero.clone(),
            zero.clone(),
            zero.clone(),
            one.clone(),
            wvl.clone(),
        )
        .is_err());
        assert!(RayBatch::from_arrays(
            zero.clone(),
            zero.clone(),
            zero.clone(),
            zero.clone(),
            zero.clone(),
            one.clone(),
            DVector::from_element(2, 2.0),
            wvl.clone(),
        )
        .is_err());
        assert!(RayBatch::from_arrays(
            DVector::zeros(3),
            zero.clone(),
            zero.clone(),
            zero.clone(),
            zero,
            one.clone(),
            one,
            wvl,
        )
        .is_err());
    }
    #[test]
    fn propagate() {
        let mut rays = two_rays();
        rays.propagate(&[Some(1.0), None], &[1.5, 1.5]).unwrap();
        assert_eq!(rays.position_m(0), point![0.0, 0.0, 1.0]);
        assert_relative_eq!(rays.opl()[0], 1.5);
        assert!(!rays.is_valid(1));
        assert_eq!(rays.position_m(1), point![0.0, 0.001, 0.0]);
        // invalid rays are not moved anymore
        rays.propagate(&[Some(1.0), Some(1.0)], &[1.0, 1.0]).unwrap();
        assert_eq!(rays.position_m(1), point![0.0, 0.001, 0.0]);
        assert!(rays.propagate(&[Some(1.0)], &[1.0, 1.0]).is_err());
    }
    #[test]
    fn propagate_non_finite() {
        let mut rays = two_rays();
        rays.propagate(&[Some(f64::INFINITY), Some(f64::NAN)], &[1.0, 1.0])
            .unwrap();
        assert_eq!(rays.nr_of_valid_rays(), 0);
        assert_eq!(rays.position_m(0), point![0.0, 0.0, 0.0]);
    }
    #[test]
    fn attenuate_and_invalidate() {
        let mut rays = two_rays();
        rays.attenuate(0, 0.5);
        assert_eq!(rays.intensity()[0], 0.5);
        rays.attenuate(0, 2.0);
        assert_eq!(rays.intensity()[0], 0.5);
        rays.attenuate(1, f64::NAN);
        assert!(!rays.is_valid(1));
        assert_eq!(rays.valid_mask(), vec![true, false]);
        assert_eq!(rays.nr_of_valid_rays(), 1);
        assert_relative_eq!(rays.total_intensity(), 0.5);
        rays.invalidate(0);
        assert_eq!(rays.nr_of_valid_rays(), 0);
    }
    #[test]
    fn normalize_and_sanitize() {
        let mut rays = two_rays();
        rays.set_direction(0, &vector![0.0, 3.0, 4.0]);
        rays.set_direction(1, &vector![0.0, 0.0, 0.0]);
        rays.normalize_directions();
        assert_relative_eq!(rays.direction(0), vector![0.0, 0.6, 0.8]);
        assert!(!rays.is_valid(1));
        let mut rays = two_rays();
        rays.add_opl(0, f64::NAN);
        rays.sanitize();
        assert_eq!(rays.valid_mask(), vec![false, true]);
    }
    #[test]
    fn display() {
        let rays = two_rays();
        let s = format!("{rays}");
        assert!(s.starts_with("2 rays (2 valid)"));
    }
}
