#![warn(missing_docs)]
//! Module for sampling the entrance pupil
//!
//! A [`PositionDistribution`] generates the transverse start coordinates of a ray bundle. The points lie in a plane
//! perpendicular to the bundle axis and are used by [`RayBatch::new_collimated`](crate::rays::RayBatch::new_collimated).
//!
//! ## Example
//!
//! ```rust
//! use seqtrace::{millimeter, position_distributions::{Hexapolar, PositionDistribution}};
//!
//! let pupil = Hexapolar::new(millimeter!(5.0), 3).unwrap();
//! assert_eq!(pupil.generate().len(), 37);
//! ```
use nalgebra::Point2;
use serde::{Deserialize, Serialize};
use uom::si::f64::Length;

mod fibonacci;
mod grid;
mod hexapolar;

pub use fibonacci::FibonacciEllipse;
pub use grid::Grid;
pub use hexapolar::Hexapolar;

/// Trait for the generation of pupil sampling points
pub trait PositionDistribution {
    /// Generate the point distribution.
    ///
    /// This function generates a vector of 2D points (of dimension [`Length`]) with the parameters given during construction.
    fn generate(&self) -> Vec<Point2<Length>>;
}

/// Serializable selection of a pupil sampling scheme.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PupilSampling {
    /// concentric rings with 6, 12, 18, ... points
    Hexapolar(Hexapolar),
    /// rectangular grid
    Grid(Grid),
    /// quasi-uniform Fibonacci (sunflower) pattern inside an ellipse
    Fibonacci(FibonacciEllipse),
}
impl PupilSampling {
    /// Returns a reference to the underlying [`PositionDistribution`].
    #[must_use]
    pub fn distribution(&self) -> &dyn PositionDistribution {
        match self {
            Self::Hexapolar(d) => d,
            Self::Grid(d) => d,
            Self::Fibonacci(d) => d,
        }
    }
}
impl Default for PupilSampling {
    fn default() -> Self {
        Self::Hexapolar(Hexapolar::default())
    }
}
impl From<Hexapolar> for PupilSampling {
    fn from(dist: Hexapolar) -> Self {
        Self::Hexapolar(dist)
    }
}
impl From<Grid> for PupilSampling {
    fn from(dist: Grid) -> Self {
        Self::Grid(dist)
    }
}
impl From<FibonacciEllipse> for PupilSampling {
    fn from(dist: FibonacciEllipse) -> Self {
        Self::Fibonacci(dist)
    }
}
