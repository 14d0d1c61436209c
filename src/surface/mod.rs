#![warn(missing_docs)]
//! Module for handling geometric surface shapes
//!
//! Every shape is described in its local coordinate system: the vertex lies at the origin and the surface is given
//! as a height field z = sag(x, y). The [`GeoSurface`] trait provides the sag, its gradient, the surface normal and
//! the distance along a ray to the intersection point. Shapes with a closed-form intersection (planes and conics)
//! override [`GeoSurface::distance`], all other shapes use the Newton-Raphson solver of the [`newton`] module.
//!
//! All values are plain `f64` in meters (polynomial coefficients in the matching SI powers).
use crate::{config::TraceConfig, error::TraceResult};
use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};
use std::fmt::Display;

mod biconic;
mod chebyshev;
mod conic;
mod even_asphere;
mod forbes;
mod grid_sag;
pub mod newton;
mod nurbs;
mod odd_asphere;
pub mod optic_surface;
mod plane;
mod toroidal;
mod xy_polynomial;
mod zernike;

pub use biconic::Biconic;
pub use chebyshev::Chebyshev;
pub use conic::Conic;
pub use even_asphere::EvenAsphere;
pub use forbes::ForbesQbfs;
pub use grid_sag::GridSag;
pub use nurbs::Nurbs;
pub use odd_asphere::OddAsphere;
pub use optic_surface::OpticSurface;
pub use plane::Plane;
pub use toroidal::Toroidal;
pub use xy_polynomial::XyPolynomial;
pub use zernike::{Zernike, ZernikeOrdering};

/// Trait for handling geometric surfaces.
pub trait GeoSurface {
    /// Returns the sag z(x, y) of the surface.
    ///
    /// Outside the domain of a shape (e.g. beyond the rim of a strongly curved conic) this function returns `NaN`.
    fn sag(&self, x: f64, y: f64) -> f64;
    /// Returns the partial derivatives (∂z/∂x, ∂z/∂y) of the sag.
    fn gradient(&self, x: f64, y: f64) -> (f64, f64);
    /// Returns the unit surface normal at (x, y).
    ///
    /// The normal points towards +z, i.e. into the half space behind the vertex plane.
    fn normal(&self, x: f64, y: f64) -> Vector3<f64> {
        let (fx, fy) = self.gradient(x, y);
        Vector3::new(-fx, -fy, 1.0).normalize()
    }
    /// Calculate the geometric distance between `position` and the surface along the unit vector `direction`.
    ///
    /// This function returns `None` if the ray does not hit the surface in forward direction.
    fn distance(
        &self,
        position: &Point3<f64>,
        direction: &Vector3<f64>,
        config: &TraceConfig,
    ) -> Option<f64> {
        newton::intersect(self, position, direction, config)
    }
    /// Mirror the surface at its vertex plane (z -> -z).
    fn flip(&mut self);
    /// Scale all linear dimensions of the surface by the given factor.
    ///
    /// The new sag fulfills `sag'(f x, f y) = f sag(x, y)`.
    ///
    /// # Errors
    ///
    /// This function returns an error if the factor is not positive and finite.
    fn scale(&mut self, factor: f64) -> TraceResult<()>;
}
pub(crate) fn check_scale_factor(factor: f64) -> TraceResult<()> {
    if !factor.is_normal() || factor.is_sign_negative() {
        return Err(crate::error::TraceError::Shape(
            "scaling factor must be positive and finite".into(),
        ));
    }
    Ok(())
}

/// Enum of all available surface shapes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GeometricSurface {
    /// flat surface
    Plane(Plane),
    /// sphere or conic section of revolution
    Conic(Conic),
    /// conic with even polynomial terms in r
    EvenAsphere(EvenAsphere),
    /// conic with polynomial terms of all orders in r
    OddAsphere(OddAsphere),
    /// conic with a polynomial in x and y
    XyPolynomial(XyPolynomial),
    /// conic with a product of Chebyshev polynomials in x and y
    Chebyshev(Chebyshev),
    /// conic with Zernike polynomial terms
    Zernike(Zernike),
    /// anamorphic conic with separate curvatures along x and y
    Biconic(Biconic),
    /// surface of revolution of a y profile around an axis parallel to y
    Toroidal(Toroidal),
    /// best-fit sphere with Forbes Q-bfs departure
    ForbesQbfs(ForbesQbfs),
    /// rational B-spline height field
    Nurbs(Nurbs),
    /// interpolated height grid on top of a conic
    GridSag(GridSag),
}
impl Default for GeometricSurface {
    fn default() -> Self {
        Self::Plane(Plane)
    }
}
macro_rules! dispatch {
    ($self:expr, $s:ident => $body:expr) => {
        match $self {
            GeometricSurface::Plane($s) => $body,
            GeometricSurface::Conic($s) => $body,
            GeometricSurface::EvenAsphere($s) => $body,
            GeometricSurface::OddAsphere($s) => $body,
            GeometricSurface::XyPolynomial($s) => $body,
            GeometricSurface::Chebyshev($s) => $body,
            GeometricSurface::Zernike($s) => $body,
            GeometricSurface::Biconic($s) => $body,
            GeometricSurface::Toroidal($s) => $body,
            GeometricSurface::ForbesQbfs($s) => $body,
            GeometricSurface::Nurbs($s) => $body,
            GeometricSurface::GridSag($s) => $body,
        }
    };
}
impl GeoSurface for GeometricSurface {
    fn sag(&self, x: f64, y: f64) -> f64 {
        dispatch!(self, s => s.sag(x, y))
    }
    fn gradient(&self, x: f64, y: f64) -> (f64, f64) {
        dispatch!(self, s => s.gradient(x, y))
    }
    fn normal(&self, x: f64, y: f64) -> Vector3<f64> {
        dispatch!(self, s => s.normal(x, y))
    }
    fn distance(
        &self,
        position: &Point3<f64>,
        direction: &Vector3<f64>,
        config: &TraceConfig,
    ) -> Option<f64> {
        dispatch!(self, s => s.distance(position, direction, config))
    }
    fn flip(&mut self) {
        dispatch!(self, s => s.flip());
    }
    fn scale(&mut self, factor: f64) -> TraceResult<()> {
        dispatch!(self, s => s.scale(factor))
    }
}
impl GeometricSurface {
    /// Returns the vertex radius of curvature (in meters) of the base conic, `None` for flat or free-form surfaces
    /// without a base curvature. An infinite value denotes a flat base.
    #[must_use]
    pub fn radius(&self) -> Option<f64> {
        let curvature = match self {
            Self::Plane(_) | Self::Nurbs(_) => return None,
            Self::Conic(s) => s.curvature(),
            Self::EvenAsphere(s) => s.base().curvature(),
            Self::OddAsphere(s) => s.base().curvature(),
            Self::XyPolynomial(s) => s.base().curvature(),
            Self::Chebyshev(s) => s.base().curvature(),
            Self::Zernike(s) => s.base().curvature(),
            Self::Biconic(s) => s.curvature_y(),
            Self::Toroidal(s) => s.profile().curvature(),
            Self::ForbesQbfs(s) => s.base().curvature(),
            Self::GridSag(s) => s.base().curvature(),
        };
        Some(1.0 / curvature)
    }
    /// Returns the conic constant of the base conic (if any).
    #[must_use]
    pub fn conic_constant(&self) -> Option<f64> {
        match self {
            Self::Plane(_) | Self::Nurbs(_) => None,
            Self::Conic(s) => Some(s.conic_constant()),
            Self::EvenAsphere(s) => Some(s.base().conic_constant()),
            Self::OddAsphere(s) => Some(s.base().conic_constant()),
            Self::XyPolynomial(s) => Some(s.base().conic_constant()),
            Self::Chebyshev(s) => Some(s.base().conic_constant()),
            Self::Zernike(s) => Some(s.base().conic_constant()),
            Self::Biconic(s) => Some(s.conic_constant_y()),
            Self::Toroidal(s) => Some(s.profile().conic_constant()),
            Self::ForbesQbfs(s) => Some(s.base().conic_constant()),
            Self::GridSag(s) => Some(s.base().conic_constant()),
        }
    }
}
impl Display for GeometricSurface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Plane(_) => "plane",
            Self::Conic(_) => "conic",
            Self::EvenAsphere(_) => "even asphere",
            Self::OddAsphere(_) => "odd asphere",
            Self::XyPolynomial(_) => "xy polynomial",
            Self::Chebyshev(_) => "Chebyshev",
            Self::Zernike(_) => "Zernike",
            Self::Biconic(_) => "biconic",
            Self::Toroidal(_) => "toroidal",
            Self::ForbesQbfs(_) => "Forbes Q-bfs",
            Self::Nurbs(_) => "NURBS",
            Self::GridSag(_) => "grid sag",
        };
        write!(f, "{name}")
    }
}
macro_rules! impl_from_shape {
    ($($shape:ident),*) => {
        $(impl From<$shape> for GeometricSurface {
            fn from(s: $shape) -> Self {
                Self::$shape(s)
            }
        })*
    };
}
impl_from_shape!(
    Plane,
    Conic,
    EvenAsphere,
    OddAsphere,
    XyPolynomial,
    Chebyshev,
    Zernike,
    Biconic,
    Toroidal,
    ForbesQbfs,
    Nurbs,
    GridSag
);
