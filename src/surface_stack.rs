#![warn(missing_docs)]
//! Sequential optical system
//!
//! A [`SurfaceStack`] is an ordered list of [`OpticSurface`]s. Surface 0 is the object surface, the last surface is
//! the image surface. All surfaces in between are called interior surfaces; exactly one of them is the aperture
//! stop. Surface 1 sits at the origin of the base frame, every further surface is placed along the z axis at the
//! accumulated (signed) thicknesses of its predecessors. Decenter and tilt of a surface only affect the surface
//! itself, not the following ones.
//!
//! The stack keeps the material chain consistent: the material behind surface i is the material in front of
//! surface i + 1.
//!
//! ```rust
//! use seqtrace::{
//!     config::TraceConfig, environment::Environment, interaction::InteractionModel, material::Material,
//!     millimeter, nanometer, rays::RayBatch, surface::{Conic, OpticSurface, Plane},
//!     surface_stack::SurfaceStack,
//! };
//! use nalgebra::Vector3;
//!
//! let mut stack = SurfaceStack::new(Material::default(), millimeter!(100.0)).unwrap();
//! let front = OpticSurface::new(
//!     Conic::new(millimeter!(50.0), 0.0).unwrap().into(),
//!     InteractionModel::Refractive,
//! );
//! stack.add_surface(front, Material::constant(1.5).unwrap()).unwrap();
//! stack.add_surface(OpticSurface::new(Plane.into(), InteractionModel::Refractive), Material::default()).unwrap();
//! stack.set_thickness(1, millimeter!(5.0)).unwrap();
//! stack.set_thickness(2, millimeter!(95.0)).unwrap();
//! let rays = RayBatch::new(&[millimeter!(0.0, 1.0, -100.0)], &[Vector3::z()], nanometer!(587.6)).unwrap();
//! let history = stack.trace(&rays, &TraceConfig::default(), &Environment::default()).unwrap();
//! assert_eq!(history.nr_of_surfaces(), 4);
//! assert!(history.final_rays().unwrap().is_valid(0));
//! ```
use crate::{
    config::TraceConfig,
    environment::Environment,
    error::{TraceError, TraceResult},
    frame::Frame,
    interaction::InteractionModel,
    material::Material,
    meter,
    rays::RayBatch,
    surface::{
        optic_surface::{SurfaceStatistics, TraceContext},
        OpticSurface, Plane,
    },
    trace_history::TraceHistory,
    utils::usize_to_f64,
};
use log::{debug, warn};
use nalgebra::{Point2, Point3};
use num::Zero;
use serde::{de, Deserialize, Deserializer, Serialize};
use uom::si::f64::{Angle, Length};

/// fraction of rays lost during a trace above which a warning is emitted
const LOST_RAYS_WARNING_LEVEL: f64 = 0.5;

/// Ordered list of optical surfaces from the object to the image.
///
/// The frames of the surfaces are not serialized. They are rebuilt from thicknesses, decenters and tilts when a
/// stack is deserialized.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SurfaceStack {
    surfaces: Vec<OpticSurface>,
    base_frame: Frame,
}
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct SurfaceStackData {
    surfaces: Vec<OpticSurface>,
    #[serde(default)]
    base_frame: Frame,
}
impl<'de> Deserialize<'de> for SurfaceStack {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let data = SurfaceStackData::deserialize(deserializer)?;
        if data.surfaces.len() < 2 {
            return Err(de::Error::custom(
                "stack must contain at least an object and an image surface",
            ));
        }
        let mut stack = Self {
            surfaces: data.surfaces,
            base_frame: data.base_frame,
        };
        stack
            .update_frames()
            .and_then(|()| stack.validate())
            .map_err(|e| de::Error::custom(e.to_string()))?;
        Ok(stack)
    }
}
impl SurfaceStack {
    /// Creates a new [`SurfaceStack`] consisting of an object and an image surface.
    ///
    /// The object surface lies `object_distance` in front of the first interior surface. An infinite distance
    /// denotes an object at infinity.
    ///
    /// # Errors
    ///
    /// This function will return an error if the object distance is `NaN`.
    pub fn new(object_medium: Material, object_distance: Length) -> TraceResult<Self> {
        if object_distance.is_nan() {
            return Err(TraceError::Stack("object distance must not be NaN".into()));
        }
        let mut object = OpticSurface::new(Plane.into(), InteractionModel::Refractive);
        object.set_comment("object");
        object.set_material_pre(object_medium.clone());
        object.set_material_post(object_medium.clone());
        object.set_thickness(object_distance);
        let mut image = OpticSurface::new(Plane.into(), InteractionModel::Refractive);
        image.set_comment("image");
        image.set_material_pre(object_medium.clone());
        image.set_material_post(object_medium);
        let mut stack = Self {
            surfaces: vec![object, image],
            base_frame: Frame::identity(),
        };
        stack.update_frames()?;
        Ok(stack)
    }
    /// Returns the surfaces of this [`SurfaceStack`].
    #[must_use]
    pub fn surfaces(&self) -> &[OpticSurface] {
        &self.surfaces
    }
    /// Returns the surface with the given index.
    ///
    /// # Errors
    ///
    /// This function will return an error if the index is out of range.
    pub fn surface(&self, index: usize) -> TraceResult<&OpticSurface> {
        self.surfaces
            .get(index)
            .ok_or_else(|| TraceError::Stack(format!("surface index {index} out of range")))
    }
    /// Returns the number of surfaces including object and image surface.
    #[must_use]
    pub fn len(&self) -> usize {
        self.surfaces.len()
    }
    /// Returns `true` if the stack has no interior surface.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.surfaces.len() <= 2
    }
    /// Returns the index of the object surface (always 0).
    #[must_use]
    pub const fn object_index(&self) -> usize {
        0
    }
    /// Returns the index of the image surface.
    #[must_use]
    pub fn image_index(&self) -> usize {
        self.surfaces.len() - 1
    }
    /// Returns the index of the aperture stop (if any).
    #[must_use]
    pub fn stop_index(&self) -> Option<usize> {
        self.surfaces.iter().position(OpticSurface::is_stop)
    }
    /// Returns `true` if at least one surface reflects.
    #[must_use]
    pub fn is_reflective(&self) -> bool {
        self.surfaces.iter().any(OpticSurface::is_reflective)
    }
    /// Returns the sum of the thicknesses from the first interior surface to the image surface.
    #[must_use]
    pub fn total_track(&self) -> Length {
        self.surfaces[1..self.image_index()]
            .iter()
            .map(OpticSurface::thickness)
            .fold(Length::zero(), |acc, t| acc + t)
    }
    /// Returns the frame placing the whole system in space.
    #[must_use]
    pub const fn base_frame(&self) -> &Frame {
        &self.base_frame
    }
    /// Places the whole system in space. All surface frames are children of this frame.
    ///
    /// # Errors
    ///
    /// This function will return an error if the surface frames cannot be recalculated.
    pub fn set_base_frame(&mut self, frame: Frame) -> TraceResult<()> {
        self.base_frame = frame;
        self.update_frames()
    }
    /// Returns the propagation direction (+1.0 or -1.0 along z) behind each surface.
    ///
    /// The direction changes its sign after each reflecting surface.
    #[must_use]
    pub fn propagation_signs(&self) -> Vec<f64> {
        let mut sign = 1.0;
        self.surfaces
            .iter()
            .map(|surface| {
                if surface.is_reflective() {
                    sign = -sign;
                }
                sign
            })
            .collect()
    }
    /// Log a warning for each interior surface whose thickness points against the propagation direction.
    fn warn_thickness_signs(&self) {
        let image_index = self.image_index();
        for (idx, (surface, sign)) in self
            .surfaces
            .iter()
            .zip(self.propagation_signs())
            .enumerate()
        {
            let thickness = surface.thickness().value;
            if idx > 0 && idx < image_index && thickness != 0.0 && thickness.signum() != sign {
                warn!("thickness of surface {idx} does not match the propagation direction");
            }
        }
    }
    fn check_interior(&self, index: usize) -> TraceResult<()> {
        if index == 0 || index >= self.image_index() {
            return Err(TraceError::Stack(format!(
                "index {index} does not denote an interior surface"
            )));
        }
        Ok(())
    }
    /// Appends a surface in front of the image surface. Returns its index.
    ///
    /// # Errors
    ///
    /// This function will return an error if the surface cannot be inserted (see [`insert_surface`](Self::insert_surface)).
    pub fn add_surface(
        &mut self,
        surface: OpticSurface,
        material_after: Material,
    ) -> TraceResult<usize> {
        let index = self.image_index();
        self.insert_surface(index, surface, material_after)?;
        Ok(index)
    }
    /// Inserts a surface at the given index.
    ///
    /// The material in front of the surface is taken from its predecessor, `material_after` fills the space up to
    /// the next surface. The first interior surface inserted into a stack without a stop becomes the stop.
    ///
    /// # Errors
    ///
    /// This function will return an error if
    ///   - the index is not in the range `1..=image_index`
    ///   - a reflecting surface is given a `material_after` different from the medium in front of it
    ///   - the new surface is marked as stop while the stack already has one
    pub fn insert_surface(
        &mut self,
        index: usize,
        mut surface: OpticSurface,
        material_after: Material,
    ) -> TraceResult<()> {
        if index == 0 || index > self.image_index() {
            return Err(TraceError::Stack(format!(
                "cannot insert a surface at index {index}"
            )));
        }
        let material_before = self.surfaces[index - 1].material_post().clone();
        if surface.is_reflective() && material_after != material_before {
            return Err(TraceError::Stack(
                "a reflecting surface cannot change the medium".into(),
            ));
        }
        if surface.is_stop() && self.stop_index().is_some() {
            return Err(TraceError::Stack("the stack already has a stop".into()));
        }
        if self.stop_index().is_none() {
            surface.set_stop(true);
        }
        surface.set_material_pre(material_before);
        surface.set_material_post(material_after.clone());
        self.surfaces[index].set_material_pre(material_after);
        self.surfaces.insert(index, surface);
        self.update_frames()
    }
    /// Removes the interior surface with the given index and returns it.
    ///
    /// Its thickness is added to the thickness of the preceding surface so that all following surfaces keep their
    /// position. The medium in front of the removed surface extends up to the next surface.
    ///
    /// # Errors
    ///
    /// This function will return an error if the index does not denote an interior surface or the surface is the stop.
    pub fn remove_surface(&mut self, index: usize) -> TraceResult<OpticSurface> {
        self.check_interior(index)?;
        if self.surfaces[index].is_stop() {
            return Err(TraceError::Stack("the stop surface cannot be removed".into()));
        }
        let removed = self.surfaces.remove(index);
        let previous = &mut self.surfaces[index - 1];
        previous.set_thickness(previous.thickness() + removed.thickness());
        let medium = previous.material_post().clone();
        self.surfaces[index].set_material_pre(medium);
        self.update_frames()?;
        Ok(removed)
    }
    /// Moves an interior surface to another interior position.
    ///
    /// The surface keeps its thickness and the medium behind it. The material chain is repaired at both the old and
    /// the new position.
    ///
    /// # Errors
    ///
    /// This function will return an error if one of the indices does not denote an interior surface.
    pub fn move_surface(&mut self, from: usize, to: usize) -> TraceResult<()> {
        self.check_interior(from)?;
        self.check_interior(to)?;
        if from == to {
            return Ok(());
        }
        let mut surface = self.surfaces.remove(from);
        let medium = self.surfaces[from - 1].material_post().clone();
        self.surfaces[from].set_material_pre(medium);
        let material_before = self.surfaces[to - 1].material_post().clone();
        if surface.is_reflective() {
            surface.set_material_post(material_before.clone());
        }
        surface.set_material_pre(material_before);
        let material_after = surface.material_post().clone();
        self.surfaces[to].set_material_pre(material_after);
        self.surfaces.insert(to, surface);
        self.update_frames()
    }
    /// Makes the interior surface with the given index the aperture stop.
    ///
    /// # Errors
    ///
    /// This function will return an error if the index does not denote an interior surface.
    pub fn set_stop(&mut self, index: usize) -> TraceResult<()> {
        self.check_interior(index)?;
        for (idx, surface) in self.surfaces.iter_mut().enumerate() {
            surface.set_stop(idx == index);
        }
        Ok(())
    }
    /// Sets the distance between the surface with the given index and its successor.
    ///
    /// # Errors
    ///
    /// This function will return an error if
    ///   - the index does not denote the object or an interior surface
    ///   - the thickness is `NaN` or, for interior surfaces, not finite
    pub fn set_thickness(&mut self, index: usize, thickness: Length) -> TraceResult<()> {
        if index >= self.image_index() {
            return Err(TraceError::Stack(format!(
                "cannot set the thickness of surface {index}"
            )));
        }
        if thickness.is_nan() || (index > 0 && !thickness.is_finite()) {
            return Err(TraceError::Stack(
                "thickness of interior surfaces must be finite".into(),
            ));
        }
        self.surfaces[index].set_thickness(thickness);
        self.update_frames()
    }
    /// Sets the lateral offset of an interior surface.
    ///
    /// # Errors
    ///
    /// This function will return an error if the index does not denote an interior surface or the offset is not finite.
    pub fn set_decenter(&mut self, index: usize, decenter: Point2<Length>) -> TraceResult<()> {
        self.check_interior(index)?;
        if !decenter.x.is_finite() || !decenter.y.is_finite() {
            return Err(TraceError::Stack("decenter must be finite".into()));
        }
        self.surfaces[index].set_decenter(decenter);
        self.update_frames()
    }
    /// Sets the tilt angles (around x, y, z) of an interior surface.
    ///
    /// # Errors
    ///
    /// This function will return an error if the index does not denote an interior surface or an angle is not finite.
    pub fn set_tilt(&mut self, index: usize, tilt: Point3<Angle>) -> TraceResult<()> {
        self.check_interior(index)?;
        if tilt.iter().any(|a| !a.is_finite()) {
            return Err(TraceError::Stack("tilt angles must be finite".into()));
        }
        self.surfaces[index].set_tilt(tilt);
        self.update_frames()
    }
    /// Returns a mutable reference to the surface with the given index.
    ///
    /// Placement and media are managed by the stack, the remaining properties (aperture, coating, shape) may be
    /// edited through this reference.
    ///
    /// # Errors
    ///
    /// This function will return an error if the index is out of range.
    pub fn surface_mut(&mut self, index: usize) -> TraceResult<&mut OpticSurface> {
        self.surfaces
            .get_mut(index)
            .ok_or_else(|| TraceError::Stack(format!("surface index {index} out of range")))
    }
    /// Reverses the order of the interior surfaces.
    ///
    /// Each surface is mirrored at its vertex plane and the media are swapped. The object and image media are
    /// exchanged, the gap in front of the image is kept.
    ///
    /// # Errors
    ///
    /// This function will return an error if
    ///   - the stack contains reflecting surfaces
    ///   - a gradient-index medium has an axial index profile
    pub fn flip(&mut self) -> TraceResult<()> {
        if self.is_reflective() {
            return Err(TraceError::Stack(
                "stacks with reflecting surfaces cannot be flipped".into(),
            ));
        }
        if self.surfaces.iter().any(|s| {
            s.material_post()
                .grin()
                .is_some_and(|g| g.axial().iter().any(|c| *c != 0.0))
        }) {
            return Err(TraceError::Stack(
                "gradient-index media with an axial profile cannot be flipped".into(),
            ));
        }
        let image_index = self.image_index();
        let image_gap = self.surfaces[image_index - 1].thickness();
        let gaps: Vec<Length> = self.surfaces[1..image_index - 1]
            .iter()
            .map(OpticSurface::thickness)
            .collect();
        self.surfaces[1..image_index].reverse();
        for surface in &mut self.surfaces[1..image_index] {
            surface.flip();
        }
        // the gaps between interior surfaces appear in reverse order
        for (surface, gap) in self.surfaces[1..image_index - 1]
            .iter_mut()
            .zip(gaps.into_iter().rev())
        {
            surface.set_thickness(gap);
        }
        self.surfaces[image_index - 1].set_thickness(image_gap);
        let object_medium = self.surfaces[0].material_post().clone();
        let image_medium = self.surfaces[image_index].material_pre().clone();
        self.surfaces[0].set_material_pre(image_medium.clone());
        self.surfaces[0].set_material_post(image_medium);
        self.surfaces[image_index].set_material_pre(object_medium.clone());
        self.surfaces[image_index].set_material_post(object_medium);
        self.update_frames()
    }
    /// Scales all linear dimensions of the system by the given factor.
    ///
    /// This includes thicknesses, shapes, apertures, semi-apertures, decenters, phase profiles and gradient-index
    /// profiles. Grating periods are kept.
    ///
    /// # Errors
    ///
    /// This function will return an error if the factor is not positive and finite.
    pub fn scale(&mut self, factor: f64) -> TraceResult<()> {
        if !factor.is_normal() || factor.is_sign_negative() {
            return Err(TraceError::Stack(
                "scaling factor must be positive and finite".into(),
            ));
        }
        for surface in &mut self.surfaces {
            surface.scale(factor)?;
        }
        self.update_frames()
    }
    /// Sets the semi-aperture of each surface to the largest radial distance of the valid rays of a trace.
    ///
    /// The radial distance is measured in the local coordinate system of each surface. Surfaces without valid rays
    /// keep their semi-aperture.
    ///
    /// # Errors
    ///
    /// This function will return an error if the history does not belong to this stack.
    pub fn update_semi_apertures(&mut self, history: &TraceHistory) -> TraceResult<()> {
        if history.nr_of_surfaces() != self.surfaces.len() {
            return Err(TraceError::Stack(
                "trace history does not match the number of surfaces".into(),
            ));
        }
        for (idx, surface) in self.surfaces.iter_mut().enumerate() {
            let rays = history.surface_rays(idx)?;
            let max_radius = (0..rays.len())
                .filter(|i| rays.is_valid(*i))
                .map(|i| {
                    let p = surface.frame().inverse_transform_point(&rays.position_m(i));
                    p.x.hypot(p.y)
                })
                .reduce(f64::max);
            if let Some(radius) = max_radius {
                surface.set_semi_aperture(Some(meter!(radius)));
            }
        }
        Ok(())
    }
    /// Check the structural consistency of the stack.
    ///
    /// # Errors
    ///
    /// This function will return an error if
    ///   - the stack has interior surfaces but not exactly one stop
    ///   - the material behind a surface differs from the material in front of the next one
    ///   - an interior thickness is not finite
    pub fn validate(&self) -> TraceResult<()> {
        let nr_of_stops = self.surfaces.iter().filter(|s| s.is_stop()).count();
        if !self.is_empty() && nr_of_stops != 1 {
            return Err(TraceError::Stack(format!(
                "stack must have exactly one stop surface, found {nr_of_stops}"
            )));
        }
        if self.surfaces[0].is_stop() || self.surfaces[self.image_index()].is_stop() {
            return Err(TraceError::Stack(
                "object or image surface cannot be the stop".into(),
            ));
        }
        for (idx, pair) in self.surfaces.windows(2).enumerate() {
            if pair[0].material_post() != pair[1].material_pre() {
                return Err(TraceError::Stack(format!(
                    "material behind surface {idx} does not match the material in front of surface {}",
                    idx + 1
                )));
            }
        }
        if self.surfaces[1..self.image_index()]
            .iter()
            .any(|s| !s.thickness().is_finite())
        {
            return Err(TraceError::Stack(
                "thickness of interior surfaces must be finite".into(),
            ));
        }
        Ok(())
    }
    /// Recalculate the frames of all surfaces.
    fn update_frames(&mut self) -> TraceResult<()> {
        let object_distance = self.surfaces[0].thickness();
        let object_z = if object_distance.is_finite() {
            -object_distance
        } else {
            Length::zero()
        };
        let mut z = Length::zero();
        for (idx, surface) in self.surfaces.iter_mut().enumerate() {
            let surface_z = if idx == 0 { object_z } else { z };
            let decenter = surface.decenter();
            let mut frame = Frame::new(
                Point3::new(decenter.x, decenter.y, surface_z),
                surface.tilt(),
            )?;
            frame.set_parent(Some(self.base_frame.clone()));
            surface.set_frame(frame);
            if idx > 0 {
                z += surface.thickness();
            }
        }
        Ok(())
    }
    /// Trace a [`RayBatch`] (in global coordinates) through all surfaces.
    ///
    /// The rays are expected to start at (or in front of) the object surface. The stack is not modified so that
    /// several traces may run concurrently on the same stack.
    ///
    /// # Errors
    ///
    /// This function will return an error if
    ///   - the configuration or the stack is inconsistent
    ///   - a material cannot be evaluated for the wavelengths of the rays
    pub fn trace(
        &self,
        rays: &RayBatch,
        config: &TraceConfig,
        environment: &Environment,
    ) -> TraceResult<TraceHistory> {
        config.validate()?;
        self.validate()?;
        self.warn_thickness_signs();
        let mut history = TraceHistory::new(self.surfaces.len(), rays);
        history.record(0, rays);
        let mut current = rays.clone();
        let valid_at_start = rays.nr_of_valid_rays();
        let mut total = SurfaceStatistics::default();
        for idx in 1..self.surfaces.len() {
            let context = TraceContext {
                config,
                environment,
                entry_frame: Some(self.surfaces[idx - 1].frame()),
            };
            let statistics = self.surfaces[idx].trace(&mut current, &context)?;
            debug!(
                "surface {idx}: {} of {} rays valid ({} lost)",
                current.nr_of_valid_rays(),
                current.len(),
                statistics.lost()
            );
            total.grin_exhausted += statistics.grin_exhausted;
            history.record(idx, &current);
        }
        if total.grin_exhausted > 0 {
            warn!(
                "{} rays exhausted the step budget in gradient-index media",
                total.grin_exhausted
            );
        }
        let lost = valid_at_start.saturating_sub(current.nr_of_valid_rays());
        if valid_at_start > 0
            && usize_to_f64(lost) > LOST_RAYS_WARNING_LEVEL * usize_to_f64(valid_at_start)
        {
            warn!("{lost} of {valid_at_start} rays lost during trace");
        }
        Ok(history)
    }
}
