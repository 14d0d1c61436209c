#![warn(missing_docs)]
//! Coordinate frames of optical surfaces
//!
//! A [`Frame`] is a rigid transformation (translation followed by a rotation) that maps points and directions
//! from the local coordinate system of a surface into the global system. Frames can be nested: a frame may have a
//! parent frame, in which case its placement is relative to the parent. The [`effective_isometry`](Frame::effective_isometry)
//! composes the whole chain of ancestors.
//!
//! Rotations are given as angles around the x, y and z axis. The combined rotation is `Rz * Ry * Rx`, i.e. a point is
//! first rotated around the x axis.
use crate::{
    error::{TraceError, TraceResult},
    rays::RayBatch,
};
use nalgebra::{Isometry3, Point3, Translation3, UnitQuaternion, Vector3};
use num::Zero;
use serde::{de, Deserialize, Deserializer, Serialize};
use uom::si::{
    angle::radian,
    f64::{Angle, Length},
};

/// Placement of a local coordinate system with respect to its parent (or the global) coordinate system.
///
/// Only translation, rotation and parent are serialized. The isometry is recalculated during deserialization.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Frame {
    translation: Point3<Length>,
    rotation: Point3<Angle>,
    #[serde(skip)]
    isometry: Isometry3<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    parent: Option<Box<Frame>>,
}
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct FrameData {
    translation: Point3<Length>,
    rotation: Point3<Angle>,
    #[serde(default)]
    parent: Option<Box<Frame>>,
}
impl<'de> Deserialize<'de> for Frame {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let data = FrameData::deserialize(deserializer)?;
        let mut frame = Self::new(data.translation, data.rotation)
            .map_err(|e| de::Error::custom(e.to_string()))?;
        frame.parent = data.parent;
        Ok(frame)
    }
}
impl Default for Frame {
    fn default() -> Self {
        Self::identity()
    }
}
impl Frame {
    /// Creates a new [`Frame`] from a translation and rotation angles around the x, y and z axis.
    ///
    /// # Errors
    ///
    /// This function will return an error if any of the given values is not finite.
    pub fn new(translation: Point3<Length>, rotation: Point3<Angle>) -> TraceResult<Self> {
        if translation.iter().any(|c| !c.is_finite()) {
            return Err(TraceError::Frame(
                "translation entries must be finite".into(),
            ));
        }
        if rotation.iter().any(|c| !c.is_finite()) {
            return Err(TraceError::Frame("rotation angles must be finite".into()));
        }
        Ok(Self {
            translation,
            rotation,
            isometry: Self::calc_isometry(&translation, &rotation),
            parent: None,
        })
    }
    /// Creates a [`Frame`] located on the z axis at the given position without any rotation.
    ///
    /// # Errors
    ///
    /// This function will return an error if the given z position is not finite.
    pub fn along_z(z: Length) -> TraceResult<Self> {
        Self::new(
            Point3::new(Length::zero(), Length::zero(), z),
            Point3::new(Angle::zero(), Angle::zero(), Angle::zero()),
        )
    }
    /// Returns the identity [`Frame`] (no translation, no rotation).
    #[must_use]
    pub fn identity() -> Self {
        Self {
            translation: Point3::new(Length::zero(), Length::zero(), Length::zero()),
            rotation: Point3::new(Angle::zero(), Angle::zero(), Angle::zero()),
            isometry: Isometry3::identity(),
            parent: None,
        }
    }
    fn calc_isometry(translation: &Point3<Length>, rotation: &Point3<Angle>) -> Isometry3<f64> {
        Isometry3::from_parts(
            Translation3::new(
                translation.x.value,
                translation.y.value,
                translation.z.value,
            ),
            UnitQuaternion::from_euler_angles(
                rotation.x.get::<radian>(),
                rotation.y.get::<radian>(),
                rotation.z.get::<radian>(),
            ),
        )
    }
    /// Returns the translation of this [`Frame`] relative to its parent.
    #[must_use]
    pub const fn translation(&self) -> Point3<Length> {
        self.translation
    }
    /// Returns the rotation angles (around x, y, z) of this [`Frame`] relative to its parent.
    #[must_use]
    pub const fn rotation(&self) -> Point3<Angle> {
        self.rotation
    }
    /// Returns the parent of this [`Frame`] (if any).
    #[must_use]
    pub fn parent(&self) -> Option<&Self> {
        self.parent.as_deref()
    }
    /// Sets (or removes) the parent of this [`Frame`].
    pub fn set_parent(&mut self, parent: Option<Self>) {
        self.parent = parent.map(Box::new);
    }
    /// Returns the isometry of this [`Frame`] relative to its parent (in meters).
    #[must_use]
    pub const fn local_isometry(&self) -> &Isometry3<f64> {
        &self.isometry
    }
    /// Returns the isometry mapping local coordinates into global coordinates.
    ///
    /// This composes the isometries of all ancestor frames: `parent.effective * self`.
    #[must_use]
    pub fn effective_isometry(&self) -> Isometry3<f64> {
        self.parent.as_ref().map_or(self.isometry, |parent| {
            parent.effective_isometry() * self.isometry
        })
    }
    /// Transform a point (in meters) from local into global coordinates.
    #[must_use]
    pub fn transform_point(&self, p: &Point3<f64>) -> Point3<f64> {
        self.effective_isometry().transform_point(p)
    }
    /// Transform a point (in meters) from global into local coordinates.
    #[must_use]
    pub fn inverse_transform_point(&self, p: &Point3<f64>) -> Point3<f64> {
        self.effective_isometry().inverse_transform_point(p)
    }
    /// Transform a direction vector from local into global coordinates.
    #[must_use]
    pub fn transform_vector(&self, v: &Vector3<f64>) -> Vector3<f64> {
        self.effective_isometry().transform_vector(v)
    }
    /// Transform a direction vector from global into local coordinates.
    #[must_use]
    pub fn inverse_transform_vector(&self, v: &Vector3<f64>) -> Vector3<f64> {
        self.effective_isometry().inverse_transform_vector(v)
    }
    /// Transform all rays of a [`RayBatch`] from global coordinates into the local coordinates of this [`Frame`].
    pub fn to_local(&self, rays: &mut RayBatch) {
        rays.transform(&self.effective_isometry().inverse());
    }
    /// Transform all rays of a [`RayBatch`] from the local coordinates of this [`Frame`] into global coordinates.
    pub fn to_global(&self, rays: &mut RayBatch) {
        rays.transform(&self.effective_isometry());
    }
    /// Returns the isometry mapping coordinates of this [`Frame`] into the coordinates of `other`.
    #[must_use]
    pub fn relative_isometry(&self, other: &Self) -> Isometry3<f64> {
        other.effective_isometry().inverse() * self.effective_isometry()
    }
}
