#![warn(missing_docs)]
//! Module for handling optical (2D) apertures
//!
//! An [`Aperture`] limits the clear area of an optical surface. It is evaluated in the local coordinate system of
//! its surface at the intersection point of a ray. There are "binary" shapes which either fully transmit or fully
//! block a ray at a given point, a Gaussian aperture with continuous transmission and a stack of apertures whose
//! transmissions multiply.
//!
//! ```rust
//! use seqtrace::{millimeter, aperture::{Aperture, CircleConfig}};
//!
//! let c = CircleConfig::new(millimeter!(1.0), millimeter!(1.0, 1.0)).unwrap();
//! let ap = Aperture::BinaryCircle(c);
//! assert_eq!(ap.apodization_factor(&millimeter!(1.0, 1.0)), 1.0);
//! assert_eq!(ap.apodization_factor(&millimeter!(0.0, 0.0)), 0.0);
//! ```
//! Furthermore, each aperture can act as a "hole" or as an "obstruction". By default,
//! all configurations are created as "holes".
//! ```rust
//! use seqtrace::{millimeter, aperture::{Aperture, ApertureType, Apodize, CircleConfig}};
//!
//! let mut c = CircleConfig::new(millimeter!(1.0), millimeter!(1.0, 1.0)).unwrap();
//! c.set_aperture_type(ApertureType::Obstruction);
//! let ap = Aperture::BinaryCircle(c);
//! assert_eq!(ap.apodization_factor(&millimeter!(1.0, 1.0)), 0.0);
//! assert_eq!(ap.apodization_factor(&millimeter!(0.0, 0.0)), 1.0);
//! ```
use crate::{
    error::{TraceError, TraceResult},
    rays::RayBatch,
};
use nalgebra::Point2;
use num::Zero;
use serde::{Deserialize, Serialize};
use uom::si::{f64::Length, ratio::ratio};

/// The apodization type of an [`Aperture`].
///
/// Each aperture can act as a "hole" or "obstruction"
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApertureType {
    /// the [`Aperture`] shape acts as a hole. The inner part of the shape is transparent.
    #[default]
    Hole,
    /// the [`Aperture`] shape represents an obstruction. The inner part of the shape is opaque.
    Obstruction,
}
impl ApertureType {
    fn apply(self, transmission: f64) -> f64 {
        match self {
            Self::Hole => transmission,
            Self::Obstruction => 1.0 - transmission,
        }
    }
}

/// Different aperture types
#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Aperture {
    /// completely transparent aperture. This is the default.
    #[default]
    None,
    /// binary circular (or annular) aperture defined by a radius, an optional inner radius and a center point
    BinaryCircle(CircleConfig),
    /// binary rectangular aperture defined by width and height as well as its center point
    BinaryRectangle(RectangleConfig),
    /// binary elliptical aperture defined by its two semi axes and its center point
    BinaryEllipse(EllipseConfig),
    /// binary polygonal aperture defined by a set of 2D points. This polygon can also be
    /// non-convex but should not intersect itself.
    BinaryPolygon(PolygonConfig),
    /// variable transmission aperture using a 2D Gaussian function.
    Gaussian(GaussianConfig),
    /// a stack of an arbitrary number of the above apertures. The transmission factor at a given point is the
    /// product of all individual apertures on the stack (subtractive apodization).
    Stack(StackConfig),
}
impl Aperture {
    /// Calculate the transmission factor of a given point on the [`Aperture`]. The value is in the range (0.0..=1.0)
    /// 0.0 is fully opaque, 1.0 fully transparent.
    #[must_use]
    pub fn apodization_factor(&self, point: &Point2<Length>) -> f64 {
        match self {
            Self::None => 1.0,
            Self::BinaryCircle(circle) => circle.apodize(point),
            Self::BinaryRectangle(rectangle) => rectangle.apodize(point),
            Self::BinaryEllipse(ellipse) => ellipse.apodize(point),
            Self::BinaryPolygon(p) => p.apodize(point),
            Self::Gaussian(g) => g.apodize(point),
            Self::Stack(s) => s.apodize(point),
        }
    }
    /// Returns `true` if the given point is not fully blocked by this [`Aperture`].
    #[must_use]
    pub fn contains(&self, point: &Point2<Length>) -> bool {
        self.apodization_factor(point) > 0.0
    }
    /// Apply this [`Aperture`] to all valid rays of a [`RayBatch`].
    ///
    /// The rays are expected to be in the local coordinate system of the surface carrying this aperture. The intensity
    /// of each ray is multiplied with the apodization factor at its (x, y) position. Blocked rays are invalidated and
    /// keep their position. Returns the number of rays that have been blocked by this call.
    pub fn clip(&self, rays: &mut RayBatch) -> usize {
        if matches!(self, Self::None) {
            return 0;
        }
        let mut blocked = 0;
        for idx in 0..rays.len() {
            if !rays.is_valid(idx) {
                continue;
            }
            let p = rays.position(idx);
            let factor = self.apodization_factor(&Point2::new(p.x, p.y));
            rays.attenuate(idx, factor);
            if !rays.is_valid(idx) {
                blocked += 1;
            }
        }
        blocked
    }
    /// Returns a copy of this [`Aperture`] with all lengths multiplied by the given factor.
    ///
    /// # Errors
    ///
    /// This function returns an error if the factor is not positive and finite.
    pub fn scaled(&self, factor: f64) -> TraceResult<Self> {
        if !factor.is_normal() || factor.is_sign_negative() {
            return Err(TraceError::Aperture(
                "scaling factor must be positive and finite".into(),
            ));
        }
        let scale_point = |p: &Point2<Length>| Point2::new(p.x * factor, p.y * factor);
        Ok(match self {
            Self::None => Self::None,
            Self::BinaryCircle(c) => Self::BinaryCircle(CircleConfig {
                radius: c.radius * factor,
                inner_radius: c.inner_radius * factor,
                center: scale_point(&c.center),
                aperture_type: c.aperture_type,
            }),
            Self::BinaryRectangle(r) => Self::BinaryRectangle(RectangleConfig {
                width: r.width * factor,
                height: r.height * factor,
                center: scale_point(&r.center),
                aperture_type: r.aperture_type,
            }),
            Self::BinaryEllipse(e) => Self::BinaryEllipse(EllipseConfig {
                semi_axes: (e.semi_axes.0 * factor, e.semi_axes.1 * factor),
                center: scale_point(&e.center),
                aperture_type: e.aperture_type,
            }),
            Self::BinaryPolygon(p) => Self::BinaryPolygon(PolygonConfig {
                points: p.points.iter().map(scale_point).collect(),
                aperture_type: p.aperture_type,
            }),
            Self::Gaussian(g) => Self::Gaussian(GaussianConfig {
                sigma: (g.sigma.0 * factor, g.sigma.1 * factor),
                center: scale_point(&g.center),
                aperture_type: g.aperture_type,
            }),
            Self::Stack(s) => Self::Stack(StackConfig {
                apertures: s
                    .apertures
                    .iter()
                    .map(|a| a.scaled(factor))
                    .collect::<TraceResult<Vec<_>>>()?,
                aperture_type: s.aperture_type,
            }),
        })
    }
}
/// Trait for all aperture configurations.
pub trait Apodize {
    /// Set the apodization type of the aperture.
    fn set_aperture_type(&mut self, aperture_type: ApertureType);
    /// Calculate the transmission (0.0..=1.0) at the given point.
    fn apodize(&self, point: &Point2<Length>) -> f64;
}
fn binary(inside: bool) -> f64 {
    if inside {
        1.0
    } else {
        0.0
    }
}
fn check_center(center: &Point2<Length>) -> TraceResult<()> {
    if center.iter().any(|c| !c.is_finite()) {
        return Err(TraceError::Aperture("center must be finite".into()));
    }
    Ok(())
}
/// Configuration data for a circular or annular aperture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CircleConfig {
    radius: Length,
    inner_radius: Length,
    center: Point2<Length>,
    aperture_type: ApertureType,
}
impl CircleConfig {
    /// Create a new [`CircleConfig`] from a given radius and a center point.
    ///
    /// By default the aperture has the aperture type [`ApertureType::Hole`].
    ///
    /// # Errors
    ///
    /// This function will return an error if the given radius is negative, zero, NaN or Infinity or the center is not finite.
    pub fn new(radius: Length, center: Point2<Length>) -> TraceResult<Self> {
        if !radius.is_normal() || radius.is_sign_negative() {
            return Err(TraceError::Aperture(
                "radius must be positive and finite".into(),
            ));
        }
        check_center(&center)?;
        Ok(Self {
            radius,
            inner_radius: Length::zero(),
            center,
            aperture_type: ApertureType::default(),
        })
    }
    /// Create a new annular aperture (ring) between `inner_radius` and `radius`.
    ///
    /// # Errors
    ///
    /// This function will return an error if
    ///   - the outer radius is not positive and finite
    ///   - the inner radius is negative, not finite or not smaller than the outer radius.
    pub fn new_annulus(
        radius: Length,
        inner_radius: Length,
        center: Point2<Length>,
    ) -> TraceResult<Self> {
        let mut config = Self::new(radius, center)?;
        if inner_radius.is_sign_negative() || !inner_radius.is_finite() || inner_radius >= radius
        {
            return Err(TraceError::Aperture(
                "inner radius must be >= 0.0, finite and smaller than the outer radius".into(),
            ));
        }
        config.inner_radius = inner_radius;
        Ok(config)
    }
    /// Returns the (outer) radius of this [`CircleConfig`].
    #[must_use]
    pub const fn radius(&self) -> Length {
        self.radius
    }
    /// Returns the inner radius of this [`CircleConfig`] (zero for a plain circle).
    #[must_use]
    pub const fn inner_radius(&self) -> Length {
        self.inner_radius
    }
}
impl Apodize for CircleConfig {
    fn set_aperture_type(&mut self, aperture_type: ApertureType) {
        self.aperture_type = aperture_type;
    }
    fn apodize(&self, point: &Point2<Length>) -> f64 {
        let dx = (point.x - self.center.x).value;
        let dy = (point.y - self.center.y).value;
        let r_sq = dx.mul_add(dx, dy * dy);
        let inside = r_sq <= self.radius.value * self.radius.value
            && (self.inner_radius.is_zero() || r_sq >= self.inner_radius.value * self.inner_radius.value);
        self.aperture_type.apply(binary(inside))
    }
}
/// Configuration data for a rectangular aperture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RectangleConfig {
    width: Length,
    height: Length,
    center: Point2<Length>,
    aperture_type: ApertureType,
}
impl RectangleConfig {
    /// Create a new [`RectangleConfig`] from a given width, height and center point.
    ///
    /// # Errors
    ///
    /// This function will return an error if width or height are not positive and finite or the center is not finite.
    pub fn new(width: Length, height: Length, center: Point2<Length>) -> TraceResult<Self> {
        if !width.is_normal() || width.is_sign_negative() {
            return Err(TraceError::Aperture(
                "width must be positive and finite".into(),
            ));
        }
        if !height.is_normal() || height.is_sign_negative() {
            return Err(TraceError::Aperture(
                "height must be positive and finite".into(),
            ));
        }
        check_center(&center)?;
        Ok(Self {
            width,
            height,
            center,
            aperture_type: ApertureType::default(),
        })
    }
}
impl Apodize for RectangleConfig {
    fn set_aperture_type(&mut self, aperture_type: ApertureType) {
        self.aperture_type = aperture_type;
    }
    fn apodize(&self, point: &Point2<Length>) -> f64 {
        let inside = (point.x - self.center.x).abs() <= self.width / 2.0
            && (point.y - self.center.y).abs() <= self.height / 2.0;
        self.aperture_type.apply(binary(inside))
    }
}
/// Configuration data for an elliptical aperture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EllipseConfig {
    semi_axes: (Length, Length),
    center: Point2<Length>,
    aperture_type: ApertureType,
}
impl EllipseConfig {
    /// Create a new [`EllipseConfig`] from the semi axes along x and y and a center point.
    ///
    /// # Errors
    ///
    /// This function will return an error if a semi axis is not positive and finite or the center is not finite.
    pub fn new(semi_axes: (Length, Length), center: Point2<Length>) -> TraceResult<Self> {
        for axis in [semi_axes.0, semi_axes.1] {
            if !axis.is_normal() || axis.is_sign_negative() {
                return Err(TraceError::Aperture(
                    "semi axes must be positive and finite".into(),
                ));
            }
        }
        check_center(&center)?;
        Ok(Self {
            semi_axes,
            center,
            aperture_type: ApertureType::default(),
        })
    }
}
impl Apodize for EllipseConfig {
    fn set_aperture_type(&mut self, aperture_type: ApertureType) {
        self.aperture_type = aperture_type;
    }
    fn apodize(&self, point: &Point2<Length>) -> f64 {
        let u = ((point.x - self.center.x) / self.semi_axes.0).get::<ratio>();
        let v = ((point.y - self.center.y) / self.semi_axes.1).get::<ratio>();
        self.aperture_type.apply(binary(u.mul_add(u, v * v) <= 1.0))
    }
}
/// Configuration of a polygonal aperture defined by a given set of points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolygonConfig {
    points: Vec<Point2<Length>>,
    aperture_type: ApertureType,
}
impl PolygonConfig {
    /// Create a new polygonal aperture configuration by a set of given 2D points.
    ///
    /// The order of the points must follow the outline of the polygon. Otherwise intersections may occur.
    /// By default the aperture has the aperture type [`ApertureType::Hole`].
    ///
    /// # Errors
    ///
    /// This function will return an error if the number of points is less than three or a point is not finite.
    pub fn new(points: Vec<Point2<Length>>) -> TraceResult<Self> {
        if points.len() < 3 {
            return Err(TraceError::Aperture("less than 3 points given".into()));
        }
        for p in &points {
            check_center(p)?;
        }
        Ok(Self {
            points,
            aperture_type: ApertureType::default(),
        })
    }
}
impl Apodize for PolygonConfig {
    fn set_aperture_type(&mut self, aperture_type: ApertureType) {
        self.aperture_type = aperture_type;
    }
    fn apodize(&self, point: &Point2<Length>) -> f64 {
        // even-odd rule: count the edges crossed by a ray from the point towards +x
        let (px, py) = (point.x.value, point.y.value);
        let mut inside = false;
        let mut j = self.points.len() - 1;
        for i in 0..self.points.len() {
            let (xi, yi) = (self.points[i].x.value, self.points[i].y.value);
            let (xj, yj) = (self.points[j].x.value, self.points[j].y.value);
            if (yi > py) != (yj > py) && px < (xj - xi) * (py - yi) / (yj - yi) + xi {
                inside = !inside;
            }
            j = i;
        }
        self.aperture_type.apply(binary(inside))
    }
}
/// Configuration data for a Gaussian aperture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GaussianConfig {
    sigma: (Length, Length),
    center: Point2<Length>,
    aperture_type: ApertureType,
}
impl GaussianConfig {
    /// Create a new [`GaussianConfig`] from the widths (sigma) along x and y and a center point.
    ///
    /// # Errors
    ///
    /// This function will return an error if a width is not positive and finite or the center is not finite.
    pub fn new(sigma: (Length, Length), center: Point2<Length>) -> TraceResult<Self> {
        for s in [sigma.0, sigma.1] {
            if !s.is_normal() || s.is_sign_negative() {
                return Err(TraceError::Aperture(
                    "sigma must be positive and finite".into(),
                ));
            }
        }
        check_center(&center)?;
        Ok(Self {
            sigma,
            center,
            aperture_type: ApertureType::default(),
        })
    }
}
impl Apodize for GaussianConfig {
    fn set_aperture_type(&mut self, aperture_type: ApertureType) {
        self.aperture_type = aperture_type;
    }
    fn apodize(&self, point: &Point2<Length>) -> f64 {
        let u = ((point.x - self.center.x) / self.sigma.0).get::<ratio>();
        let v = ((point.y - self.center.y) / self.sigma.1).get::<ratio>();
        self.aperture_type
            .apply((-0.5 * u.mul_add(u, v * v)).exp())
    }
}
/// Configuration of an aperture stack
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StackConfig {
    apertures: Vec<Aperture>,
    aperture_type: ApertureType,
}
impl StackConfig {
    /// Creates a new [`StackConfig`] by a given set of apertures.
    ///
    /// All aperture transmissions are multiplied, thus realizing a "subtractive" aperture. After that the transmission can be "inverted"
    /// (`transmission = 1.0 - transmission`) by setting the aperture type to [`ApertureType::Obstruction`].
    #[must_use]
    pub fn new(apertures: Vec<Aperture>) -> Self {
        Self {
            apertures,
            aperture_type: ApertureType::default(),
        }
    }
}
impl Apodize for StackConfig {
    fn set_aperture_type(&mut self, aperture_type: ApertureType) {
        self.aperture_type = aperture_type;
    }
    fn apodize(&self, point: &Point2<Length>) -> f64 {
        let transmission: f64 = self
            .apertures
            .iter()
            .map(|a| a.apodization_factor(point))
            .product();
        self.aperture_type.apply(transmission)
    }
}
