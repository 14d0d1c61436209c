//! Wavelength-independent refractive index
use super::RefractiveIndex;
use crate::{
    environment::Environment,
    error::{TraceError, TraceResult},
};
use serde::{Deserialize, Serialize};
use uom::si::f64::Length;

/// Refractive index model returning a constant value.
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq)]
pub struct RefrIndexConst {
    refractive_index: f64,
}
impl RefrIndexConst {
    /// Create a new constant refractive index model.
    ///
    /// # Errors
    ///
    /// This function will return an error if the given index is < 1.0 or not finite.
    pub fn new(refractive_index: f64) -> TraceResult<Self> {
        if refractive_index < 1.0 || !refractive_index.is_finite() {
            return Err(TraceError::Material(
                "refractive index must be >= 1.0 and finite".into(),
            ));
        }
        Ok(Self { refractive_index })
    }
    /// Returns the refractive index of this model.
    #[must_use]
    pub const fn refractive_index(&self) -> f64 {
        self.refractive_index
    }
}
impl Default for RefrIndexConst {
    fn default() -> Self {
        refr_index_vacuum()
    }
}
/// Refractive index of vacuum (n=1.0).
#[must_use]
pub const fn refr_index_vacuum() -> RefrIndexConst {
    RefrIndexConst {
        refractive_index: 1.0,
    }
}
impl RefractiveIndex for RefrIndexConst {
    fn get_refractive_index(
        &self,
        _wavelength: Length,
        _environment: &Environment,
    ) -> TraceResult<f64> {
        Ok(self.refractive_index)
    }
}
