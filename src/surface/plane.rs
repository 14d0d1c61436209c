//! Flat surface
use super::{check_scale_factor, newton, GeoSurface};
use crate::{config::TraceConfig, error::TraceResult};
use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};

/// A flat surface coinciding with the local xy plane.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plane;

impl GeoSurface for Plane {
    fn sag(&self, _x: f64, _y: f64) -> f64 {
        0.0
    }
    fn gradient(&self, _x: f64, _y: f64) -> (f64, f64) {
        (0.0, 0.0)
    }
    fn normal(&self, _x: f64, _y: f64) -> Vector3<f64> {
        Vector3::z()
    }
    fn distance(
        &self,
        position: &Point3<f64>,
        direction: &Vector3<f64>,
        config: &TraceConfig,
    ) -> Option<f64> {
        // z(t) = p_z + t * d_z = 0
        if direction.z == 0.0 {
            return None;
        }
        newton::accept(-position.z / direction.z, config)
    }
    fn flip(&mut self) {}
    fn scale(&mut self, factor: f64) -> TraceResult<()> {
        check_scale_factor(factor)
    }
}
