#![warn(missing_docs)]
//! Rectangular, evenly-spaced pupil sampling
use super::PositionDistribution;
use crate::{
    error::{TraceError, TraceResult},
    utils::usize_to_f64,
};
use nalgebra::{point, Point2};
use num::Zero;
use serde::{Deserialize, Serialize};
use uom::si::f64::Length;

/// Rectangular, evenly-spaced grid centered at the origin
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Copy)]
pub struct Grid {
    nr_of_points: (usize, usize),
    side_length: (Length, Length),
}
impl Grid {
    /// Create a new [`Grid`] distribution generator.
    ///
    /// # Errors
    ///
    /// This function will return an error if
    ///  - both side lengths are zero.
    ///  - one `side_length` component is negative or not finite.
    ///  - one `nr_of_points` component is zero.
    pub fn new(side_length: (Length, Length), nr_of_points: (usize, usize)) -> TraceResult<Self> {
        if side_length.0.is_zero() && side_length.1.is_zero() {
            return Err(TraceError::Other(
                "at least one side length must be > zero".into(),
            ));
        }
        for side in [side_length.0, side_length.1] {
            if side.is_sign_negative() || !side.is_finite() {
                return Err(TraceError::Other(
                    "side lengths must be >= zero and finite".into(),
                ));
            }
        }
        if nr_of_points.0.is_zero() || nr_of_points.1.is_zero() {
            return Err(TraceError::Other(
                "both components of nr_of_points must be > 0".into(),
            ));
        }
        Ok(Self {
            nr_of_points,
            side_length,
        })
    }
    /// Returns the number of points along the x and y axes.
    #[must_use]
    pub const fn nr_of_points(&self) -> (usize, usize) {
        self.nr_of_points
    }
    /// Returns the side lengths along the x and y axes.
    #[must_use]
    pub const fn side_length(&self) -> (Length, Length) {
        self.side_length
    }
}
fn axis_coordinates(side_length: Length, nr_of_points: usize) -> Vec<Length> {
    if nr_of_points < 2 {
        return vec![Length::zero()];
    }
    let step = side_length / usize_to_f64(nr_of_points - 1);
    (0..nr_of_points)
        .map(|i| usize_to_f64(i) * step - side_length / 2.0)
        .collect()
}
impl PositionDistribution for Grid {
    fn generate(&self) -> Vec<Point2<Length>> {
        let xs = axis_coordinates(self.side_length.0, self.nr_of_points.0);
        let ys = axis_coordinates(self.side_length.1, self.nr_of_points.1);
        let mut points = Vec::with_capacity(xs.len() * ys.len());
        for x in &xs {
            for y in &ys {
                points.push(point![*x, *y]);
            }
        }
        points
    }
}
