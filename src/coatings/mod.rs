#![warn(missing_docs)]
//! Module for handling optical surface coatings
//!
//! A coating determines how much of the intensity of a ray is transmitted through (refraction) or reflected by
//! (reflection) an optical surface. Since the sequential trace only follows one path at each surface, the other
//! part of the intensity is lost.
use serde::{Deserialize, Serialize};
use strum::Display;

mod constant_r;
mod fresnel;
mod ideal_ar;

pub use constant_r::ConstantR;
pub use fresnel::Fresnel;
pub use ideal_ar::IdealAR;

use crate::error::{TraceError, TraceResult};

/// Geometry of a single ray hitting a coated interface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Incidence {
    /// cosine of the angle of incidence (>= 0.0)
    pub cos_incidence: f64,
    /// refractive index in front of the surface
    pub n1: f64,
    /// refractive index behind the surface
    pub n2: f64,
}

/// Available coating models.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, Display)]
pub enum CoatingType {
    /// Perfect anti-reflective coating. Reflectivity is always 0.0. This is the default.
    #[default]
    IdealAR,
    /// Ideal coating with a constant given reflectivity
    ConstantR {
        /// reflectivity of the coating (0.0..=1.0)
        reflectivity: f64,
    },
    /// Fresnel reflection of an uncoated surface (unpolarized light)
    Fresnel,
}
impl CoatingType {
    /// Create a [`CoatingType::ConstantR`] with the given reflectivity.
    ///
    /// # Errors
    ///
    /// This function returns an error if the reflectivity is outside the range `0.0..=1.0`.
    pub fn constant_r(reflectivity: f64) -> TraceResult<Self> {
        ConstantR::new(reflectivity)?;
        Ok(Self::ConstantR { reflectivity })
    }
    /// Returns the reflectivity (0.0..=1.0) of this coating for the given [`Incidence`].
    #[must_use]
    pub fn reflectivity(&self, incidence: &Incidence) -> f64 {
        let r = match self {
            Self::IdealAR => IdealAR.calc_reflectivity(incidence),
            Self::ConstantR { reflectivity } => ConstantR {
                reflectivity: *reflectivity,
            }
            .calc_reflectivity(incidence),
            Self::Fresnel => Fresnel.calc_reflectivity(incidence),
        };
        r.clamp(0.0, 1.0)
    }
    /// Returns the fraction of intensity transmitted through the coated interface.
    #[must_use]
    pub fn transmittance(&self, incidence: &Incidence) -> f64 {
        1.0 - self.reflectivity(incidence)
    }
    /// Returns the fraction of intensity kept by a mirror carrying this coating.
    ///
    /// [`CoatingType::IdealAR`] stands for a loss-free interface, which makes it a perfect mirror.
    #[must_use]
    pub fn mirror_reflectivity(&self, incidence: &Incidence) -> f64 {
        match self {
            Self::IdealAR => 1.0,
            _ => self.reflectivity(incidence),
        }
    }
}
/// All coating models must implement this trait.
pub trait Coating {
    /// Calculate the reflectivity for the given incidence.
    fn calc_reflectivity(&self, incidence: &Incidence) -> f64;
}
fn check_reflectivity(reflectivity: f64) -> TraceResult<()> {
    if !(0.0..=1.0).contains(&reflectivity) {
        return Err(TraceError::Surface(
            "reflectivity must be within (0.0..=1.0)".into(),
        ));
    }
    Ok(())
}
