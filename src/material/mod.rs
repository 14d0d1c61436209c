#![warn(missing_docs)]
//! Module for handling the refractive index of optical materials
//!
//! The ray-tracing kernel only consumes refractive indices. A [`Material`] evaluates its index for a given wavelength
//! and the [`Environment`] passed in by the caller. Gradient-index materials additionally provide the index and its
//! spatial gradient at a point of their local coordinate system.
use crate::{
    environment::Environment,
    error::{TraceError, TraceResult},
    meter,
};
use nalgebra::DVector;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use uom::si::f64::Length;

mod grin;
mod refr_index_air;
mod refr_index_conrady;
mod refr_index_const;
mod refr_index_sellmeier1;

pub use grin::GradientIndex;
pub use refr_index_air::RefrIndexAir;
pub use refr_index_conrady::RefrIndexConrady;
pub use refr_index_const::{refr_index_vacuum, RefrIndexConst};
pub use refr_index_sellmeier1::RefrIndexSellmeier1;

/// All refractive index models must implement this trait.
pub trait RefractiveIndex {
    /// Get the refractive index value of the current model for the given wavelength.
    ///
    /// # Errors
    ///
    /// This function returns an error if the refractive index could not be calculated e.g.:
    ///   - the given wavelength is outside defined limits.
    ///   - the model would calculate a value below 1.0, NaN or infinity
    fn get_refractive_index(&self, wavelength: Length, environment: &Environment)
        -> TraceResult<f64>;
    /// Get the extinction coefficient (imaginary part of the complex refractive index).
    ///
    /// The geometric trace does not use this value. Models without absorption data return 0.0.
    fn get_extinction_coefficient(&self, _wavelength: Length) -> f64 {
        0.0
    }
}

/// Available material models
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub enum Material {
    /// Trivial model returning a wavelength-independent constant
    Const(RefrIndexConst),
    /// Sellmeier 1 model
    Sellmeier1(RefrIndexSellmeier1),
    /// Conrady model
    Conrady(RefrIndexConrady),
    /// Ambient air following the updated Edlén equation
    Air(RefrIndexAir),
    /// Gradient-index material
    Grin(GradientIndex),
}
impl Default for Material {
    fn default() -> Self {
        Self::Const(refr_index_vacuum())
    }
}
impl Material {
    /// Create a constant-index material.
    ///
    /// # Errors
    ///
    /// This function returns an error if the given index is < 1.0 or not finite.
    pub fn constant(refractive_index: f64) -> TraceResult<Self> {
        Ok(Self::Const(RefrIndexConst::new(refractive_index)?))
    }
    /// Get the refractive index of this [`Material`] for the given wavelength.
    ///
    /// For a gradient-index material this is the index on its axis at the vertex of the entry surface.
    ///
    /// # Errors
    ///
    /// This function returns an error if the model cannot be evaluated for the given wavelength or the
    /// result is below 1.0, NaN or infinity.
    pub fn n(&self, wavelength: Length, environment: &Environment) -> TraceResult<f64> {
        let refr_index = match self {
            Self::Const(m) => m.get_refractive_index(wavelength, environment)?,
            Self::Sellmeier1(m) => m.get_refractive_index(wavelength, environment)?,
            Self::Conrady(m) => m.get_refractive_index(wavelength, environment)?,
            Self::Air(m) => m.get_refractive_index(wavelength, environment)?,
            Self::Grin(m) => m.get_refractive_index(wavelength, environment)?,
        };
        if refr_index < 1.0 || !refr_index.is_finite() {
            return Err(TraceError::Material(format!(
                "refractive index calculated by model ({refr_index}) is < 1.0 or not finite"
            )));
        }
        Ok(refr_index)
    }
    /// Get the extinction coefficient of this [`Material`] for the given wavelength.
    #[must_use]
    pub fn k(&self, wavelength: Length) -> f64 {
        match self {
            Self::Const(m) => m.get_extinction_coefficient(wavelength),
            Self::Sellmeier1(m) => m.get_extinction_coefficient(wavelength),
            Self::Conrady(m) => m.get_extinction_coefficient(wavelength),
            Self::Air(m) => m.get_extinction_coefficient(wavelength),
            Self::Grin(m) => m.get_extinction_coefficient(wavelength),
        }
    }
    /// Evaluate the refractive index for a set of wavelengths (in meters).
    ///
    /// Each distinct wavelength is evaluated only once.
    ///
    /// # Errors
    ///
    /// This function returns an error if the model cannot be evaluated for one of the given wavelengths.
    pub fn refractive_indices(
        &self,
        wavelengths: &DVector<f64>,
        environment: &Environment,
    ) -> TraceResult<Vec<f64>> {
        let mut cache: Vec<(f64, f64)> = Vec::new();
        let mut indices = Vec::with_capacity(wavelengths.len());
        for wvl in wavelengths {
            let n = if let Some((_, n)) = cache.iter().find(|(w, _)| w == wvl) {
                *n
            } else {
                let n = self.n(meter!(*wvl), environment)?;
                cache.push((*wvl, n));
                n
            };
            indices.push(n);
        }
        Ok(indices)
    }
    /// Returns the gradient-index model if this is a [`Material::Grin`].
    #[must_use]
    pub const fn grin(&self) -> Option<&GradientIndex> {
        if let Self::Grin(g) = self {
            Some(g)
        } else {
            None
        }
    }
    /// Returns `true` if this is a gradient-index material.
    #[must_use]
    pub const fn is_grin(&self) -> bool {
        matches!(self, Self::Grin(_))
    }
}
impl Display for Material {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Const(c) => write!(f, "Constant (n={})", c.refractive_index()),
            Self::Sellmeier1(_) => write!(f, "Sellmeier equation"),
            Self::Conrady(_) => write!(f, "Conrady equation"),
            Self::Air(_) => write!(f, "Air"),
            Self::Grin(g) => write!(f, "Gradient index (n0={})", g.n0()),
        }
    }
}
impl From<RefrIndexConst> for Material {
    fn from(m: RefrIndexConst) -> Self {
        Self::Const(m)
    }
}
impl From<RefrIndexSellmeier1> for Material {
    fn from(m: RefrIndexSellmeier1) -> Self {
        Self::Sellmeier1(m)
    }
}
impl From<RefrIndexConrady> for Material {
    fn from(m: RefrIndexConrady) -> Self {
        Self::Conrady(m)
    }
}
impl From<RefrIndexAir> for Material {
    fn from(m: RefrIndexAir) -> Self {
        Self::Air(m)
    }
}
impl From<GradientIndex> for Material {
    fn from(m: GradientIndex) -> Self {
        Self::Grin(m)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::nanometer;
    use approx::assert_relative_eq;
    use assert_matches::assert_matches;
    #[test]
    fn default() {
        let m = Material::default();
        assert_eq!(
            m.n(nanometer!(500.0), &Environment::default()).unwrap(),
            1.0
        );
        assert_eq!(m.k(nanometer!(500.0)), 0.0);
        assert!(!m.is_grin());
        assert!(m.grin().is_none());
    }
    #[test]
    fn n_out_of_range() {
        let m: Material =
            RefrIndexConrady::new(1.0, 1.0, 1.0, nanometer!(500.0)..nanometer!(2000.0))
                .unwrap()
                .into();
        assert_matches!(
            m.n(nanometer!(400.0), &Environment::default()),
            Err(TraceError::Material(_))
        );
        let m: Material =
            RefrIndexConrady::new(0.1, 0.0, 0.0, nanometer!(500.0)..nanometer!(2000.0))
                .unwrap()
                .into();
        assert!(m.n(nanometer!(1000.0), &Environment::default()).is_err());
    }
    #[test]
    fn refractive_indices() {
        let m: Material = RefrIndexSellmeier1::default().into();
        let env = Environment::default();
        let wvls = DVector::from_vec(vec![500e-9, 1000e-9, 500e-9]);
        let n = m.refractive_indices(&wvls, &env).unwrap();
        assert_eq!(n.len(), 3);
        assert_eq!(n[0], n[2]);
        assert!(n[0] > n[1]);
        assert_relative_eq!(n[1], m.n(nanometer!(1000.0), &env).unwrap());
    }
    #[test]
    fn grin() {
        let m: Material = GradientIndex::new(1.5, [0.0; 3], [0.0; 3]).unwrap().into();
        assert!(m.is_grin());
        assert_eq!(m.grin().unwrap().n0(), 1.5);
        assert_eq!(m.n(nanometer!(500.0), &Environment::default()).unwrap(), 1.5);
    }
    #[test]
    fn display() {
        assert_eq!(format!("{}", Material::constant(1.5).unwrap()), "Constant (n=1.5)");
        assert_eq!(format!("{}", Material::Air(RefrIndexAir)), "Air");
    }
}
