//! Sellmeier 1 model
use super::RefractiveIndex;
use crate::{
    environment::Environment,
    error::{TraceError, TraceResult},
};
use serde::{Deserialize, Serialize};
use uom::si::{f64::Length, length::micrometer};

/// relative distance of λ² to a resonance lᵢ below which the model is not evaluated
const POLE_TOLERANCE: f64 = 1e-9;

/// Refractive index model following the Sellmeier 1 equation
///
/// n² = 1 + Σ kᵢ λ² / (λ² - lᵢ) with λ in µm and lᵢ in µm².
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq)]
pub struct RefrIndexSellmeier1 {
    k1: f64,
    k2: f64,
    k3: f64,
    l1: f64,
    l2: f64,
    l3: f64,
}
impl RefrIndexSellmeier1 {
    /// Create a new Sellmeier 1 refractive index model.
    ///
    /// # Errors
    ///
    /// This function will return an error if one of the coefficients is not finite.
    pub fn new(k1: f64, k2: f64, k3: f64, l1: f64, l2: f64, l3: f64) -> TraceResult<Self> {
        if [k1, k2, k3, l1, l2, l3].iter().any(|c| !c.is_finite()) {
            return Err(TraceError::Material(
                "all coefficients must be finite".into(),
            ));
        }
        Ok(Self {
            k1,
            k2,
            k3,
            l1,
            l2,
            l3,
        })
    }
}
impl Default for RefrIndexSellmeier1 {
    /// N-BK7
    fn default() -> Self {
        Self {
            k1: 1.039_612_12,
            k2: 0.231_792_344,
            k3: 1.010_469_45,
            l1: 0.006_000_698_67,
            l2: 0.020_017_914_4,
            l3: 103.560_653,
        }
    }
}
impl RefractiveIndex for RefrIndexSellmeier1 {
    fn get_refractive_index(
        &self,
        wavelength: Length,
        _environment: &Environment,
    ) -> TraceResult<f64> {
        let lambda = wavelength.get::<micrometer>();
        let l_sq = lambda * lambda;
        let terms = [(self.k1, self.l1), (self.k2, self.l2), (self.k3, self.l3)];
        let near_pole = terms.iter().any(|(k, l)| {
            *k != 0.0 && (l_sq - l).abs() <= POLE_TOLERANCE * l_sq.max(l.abs())
        });
        let n_sq = 1.0 + terms.iter().map(|(k, l)| k * l_sq / (l_sq - l)).sum::<f64>();
        if near_pole || n_sq.is_sign_negative() || !n_sq.is_finite() {
            return Err(TraceError::Material(format!(
                "Sellmeier equation cannot be evaluated at {lambda} µm"
            )));
        }
        Ok(n_sq.sqrt())
    }
}
