#![warn(missing_docs)]
//! Interaction of rays with optical surfaces
//!
//! An [`InteractionModel`] describes what happens to a ray at the intersection point with a surface: refraction,
//! specular reflection, diffraction at a grating or deflection by a phase profile. The model is independent of the
//! surface shape, so each shape can carry each kind of interaction.
//!
//! Propagation through gradient-index media is not a point interaction. It is handled by the [`grin`] integrator,
//! which is selected automatically if the medium in front of a surface is a gradient-index material.
use crate::{
    config::TirPolicy,
    error::{TraceError, TraceResult},
};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

mod diffraction;
pub mod grin;
mod phase;
pub mod refraction;

pub use diffraction::{deflect, GratingConfig};
pub use phase::PhaseProfile;

/// The kind of interaction of a ray with a surface.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub enum InteractionModel {
    /// refraction following Snell's law. This is the default.
    #[default]
    Refractive,
    /// specular reflection (mirror)
    Reflective,
    /// diffraction into a given order of a linear grating
    Diffractive(GratingConfig),
    /// thin phase plate adding an optical path profile
    Phase(PhaseProfile),
}

/// Local geometry and media of a ray hitting a surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Incident {
    /// local x coordinate of the intersection point (in meters)
    pub x: f64,
    /// local y coordinate of the intersection point (in meters)
    pub y: f64,
    /// unit direction of the incoming ray
    pub direction: Vector3<f64>,
    /// unit surface normal
    pub normal: Vector3<f64>,
    /// refractive index in front of the surface
    pub n1: f64,
    /// refractive index behind the surface
    pub n2: f64,
    /// vacuum wavelength (in meters)
    pub wavelength: f64,
}

/// Result of an interaction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Deflection {
    /// the ray passes into the medium behind the surface
    Transmitted(Vector3<f64>),
    /// the ray is sent back into the incident medium
    Reflected(Vector3<f64>),
    /// the ray exceeded the critical angle and was reflected without loss
    TotalInternalReflection(Vector3<f64>),
    /// the ray is lost (total internal reflection with [`TirPolicy::Invalidate`] or an evanescent order)
    Blocked,
}
impl InteractionModel {
    /// Returns `true` if rays leave this surface into the incident medium.
    #[must_use]
    pub const fn is_reflective(&self) -> bool {
        match self {
            Self::Reflective => true,
            Self::Diffractive(g) => g.is_reflective(),
            _ => false,
        }
    }
    /// Calculate the outgoing direction of a ray.
    #[must_use]
    pub fn deflect(&self, incident: &Incident, tir_policy: TirPolicy) -> Deflection {
        let d = &incident.direction;
        let n = &incident.normal;
        match self {
            Self::Refractive => refraction::refract(d, n, incident.n1 / incident.n2).map_or_else(
                || total_internal_reflection(d, n, tir_policy),
                Deflection::Transmitted,
            ),
            Self::Reflective => Deflection::Reflected(refraction::reflect(d, n)),
            Self::Diffractive(grating) => {
                let gradient = grating.phase_gradient(incident.wavelength);
                deflect(d, n, incident.n1, incident.n2, &gradient, grating.is_reflective()).map_or(
                    Deflection::Blocked,
                    |out| {
                        if grating.is_reflective() {
                            Deflection::Reflected(out)
                        } else {
                            Deflection::Transmitted(out)
                        }
                    },
                )
            }
            Self::Phase(profile) => {
                let gradient = profile.gradient(incident.x, incident.y);
                deflect(d, n, incident.n1, incident.n2, &gradient, false).map_or_else(
                    || total_internal_reflection(d, n, tir_policy),
                    Deflection::Transmitted,
                )
            }
        }
    }
    /// Returns the optical path (in meters) added by the surface at the given local position.
    #[must_use]
    pub fn added_opl(&self, x: f64, y: f64, wavelength: f64) -> f64 {
        match self {
            Self::Refractive | Self::Reflective => 0.0,
            Self::Diffractive(grating) => grating.added_opl(x, y, wavelength),
            Self::Phase(profile) => profile.opl(x, y),
        }
    }
    /// Returns a copy with all linear dimensions multiplied by the given factor.
    ///
    /// Grating periods are kept since they are tied to the wavelength.
    ///
    /// # Errors
    ///
    /// This function will return an error if the factor is not positive and finite.
    pub fn scaled(&self, factor: f64) -> TraceResult<Self> {
        if !factor.is_normal() || factor.is_sign_negative() {
            return Err(TraceError::Surface(
                "scaling factor must be positive and finite".into(),
            ));
        }
        Ok(match self {
            Self::Phase(profile) => Self::Phase(profile.scaled(factor)),
            other => other.clone(),
        })
    }
}
fn total_internal_reflection(
    direction: &Vector3<f64>,
    normal: &Vector3<f64>,
    tir_policy: TirPolicy,
) -> Deflection {
    match tir_policy {
        TirPolicy::Invalidate => Deflection::Blocked,
        TirPolicy::Reflect => {
            Deflection::TotalInternalReflection(refraction::reflect(direction, normal))
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{degree, micrometer};
    use approx::assert_relative_eq;
    use assert_matches::assert_matches;
    use nalgebra::vector;
    fn incident(angle: f64, n1: f64, n2: f64) -> Incident {
        Incident {
            x: 0.0,
            y: 0.0,
            direction: vector![0.0, angle.sin(), angle.cos()],
            normal: Vector3::z(),
            n1,
            n2,
            wavelength: 1e-6,
        }
    }
    #[test]
    fn default() {
        assert_eq!(InteractionModel::default(), InteractionModel::Refractive);
        assert!(!InteractionModel::default().is_reflective());
        assert!(InteractionModel::Reflective.is_reflective());
    }
    #[test]
    fn refraction() {
        let i = incident(0.5, 1.0, 1.5);
        let Deflection::Transmitted(d) = InteractionModel::Refractive.deflect(&i, TirPolicy::Invalidate) else {
            panic!("ray should be transmitted");
        };
        assert_relative_eq!(d.y * 1.5, 0.5f64.sin(), epsilon = 1e-14);
    }
    #[test]
    fn tir_policy() {
        let i = incident(1.0, 1.5, 1.0);
        assert_matches!(
            InteractionModel::Refractive.deflect(&i, TirPolicy::Invalidate),
            Deflection::Blocked
        );
        let Deflection::TotalInternalReflection(d) =
            InteractionModel::Refractive.deflect(&i, TirPolicy::Reflect)
        else {
            panic!("ray should be totally reflected");
        };
        assert_relative_eq!(d, vector![0.0, 1.0f64.sin(), -(1.0f64.cos())], epsilon = 1e-15);
    }
    #[test]
    fn mirror() {
        let i = incident(0.2, 1.0, 1.5);
        assert_matches!(
            InteractionModel::Reflective.deflect(&i, TirPolicy::Invalidate),
            Deflection::Reflected(_)
        );
    }
    #[test]
    fn grating() {
        let g = GratingConfig::new(1, micrometer!(4.0), degree!(90.0), true).unwrap();
        let model = InteractionModel::Diffractive(g);
        assert!(model.is_reflective());
        let Deflection::Reflected(d) = model.deflect(&incident(0.0, 1.0, 1.0), TirPolicy::Invalidate) else {
            panic!("ray should be diffracted");
        };
        assert_relative_eq!(d.y, 0.25, epsilon = 1e-14);
        assert!(d.z < 0.0);
        assert_relative_eq!(model.added_opl(0.0, 4e-6, 1e-6), 1e-6, epsilon = 1e-20);
        assert_eq!(model.scaled(3.0).unwrap(), model);
        assert!(model.scaled(0.0).is_err());
    }
    #[test]
    fn phase_plate() {
        let model = InteractionModel::Phase(PhaseProfile::linear(0.1, 0.0).unwrap());
        let Deflection::Transmitted(d) = model.deflect(&incident(0.0, 1.0, 1.0), TirPolicy::Invalidate) else {
            panic!("ray should be transmitted");
        };
        assert_relative_eq!(d.x, 0.1, epsilon = 1e-15);
        assert_relative_eq!(model.added_opl(2.0, 0.0, 1e-6), 0.2);
        let strong = InteractionModel::Phase(PhaseProfile::linear(1.5, 0.0).unwrap());
        assert_matches!(
            strong.deflect(&incident(0.0, 1.0, 1.0), TirPolicy::Invalidate),
            Deflection::Blocked
        );
    }
}
