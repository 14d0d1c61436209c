//! Elliptical Fibonacci (sunflower) pupil sampling
use super::PositionDistribution;
use crate::{
    error::{TraceError, TraceResult},
    utils::usize_to_f64,
};
use nalgebra::{point, Point2};
use num::Zero;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use uom::si::f64::Length;

/// Quasi-uniform sampling of an ellipse using the golden angle.
///
/// Point `i` of `N` lies at the normalized radius `sqrt((i + 0.5) / N)` and the azimuth `i * golden_angle`, so that every
/// point represents the same pupil area.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Copy)]
pub struct FibonacciEllipse {
    nr_of_points: usize,
    radius_x: Length,
    radius_y: Length,
}
impl FibonacciEllipse {
    /// Create a new [`FibonacciEllipse`] distribution generator.
    ///
    /// # Errors
    ///
    /// This function will return an error if
    ///  - a radius is negative or not finite or both radii are zero.
    ///  - the number of points is zero.
    pub fn new(radius_x: Length, radius_y: Length, nr_of_points: usize) -> TraceResult<Self> {
        if radius_x.is_sign_negative()
            || !radius_x.is_finite()
            || radius_y.is_sign_negative()
            || !radius_y.is_finite()
            || (radius_x.is_zero() && radius_y.is_zero())
        {
            return Err(TraceError::Other(
                "radii must be positive and finite".into(),
            ));
        }
        if nr_of_points.is_zero() {
            return Err(TraceError::Other(
                "number of points must be greater than zero".into(),
            ));
        }
        Ok(Self {
            nr_of_points,
            radius_x,
            radius_y,
        })
    }
}
impl PositionDistribution for FibonacciEllipse {
    fn generate(&self) -> Vec<Point2<Length>> {
        let golden_angle = PI * (3.0 - 5.0_f64.sqrt());
        let n = usize_to_f64(self.nr_of_points);
        (0..self.nr_of_points)
            .map(|i| {
                let i = usize_to_f64(i);
                let r = ((i + 0.5) / n).sqrt();
                let (sin, cos) = (i * golden_angle).sin_cos();
                point![self.radius_x * r * cos, self.radius_y * r * sin]
            })
            .collect()
    }
}
