//! Conrady model
use super::RefractiveIndex;
use crate::{
    environment::Environment,
    error::{TraceError, TraceResult},
    nanometer,
};
use serde::{Deserialize, Serialize};
use std::ops::Range;
use uom::si::{f64::Length, length::micrometer};

/// Refractive index model following the Conrady formula n = n0 + a/λ + b/λ^3.5 (λ in µm).
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct RefrIndexConrady {
    n0: f64,
    a: f64,
    b: f64,
    wvl_range: Range<Length>,
}
impl Default for RefrIndexConrady {
    //SiO2
    fn default() -> Self {
        Self {
            n0: 1.427,
            a: 11.1,
            b: 5.13e6,
            wvl_range: nanometer!(1000.)..nanometer!(1100.),
        }
    }
}
impl RefrIndexConrady {
    /// Create a new refractive index model following the Conrady formula.
    ///
    /// This formula is useful if only a few index / wavelength pairs are known and need to be fit to a
    /// smooth curve.
    ///
    /// # Errors
    ///
    /// This function will return an error if the given coefficients are not finite or the wavelength range is invalid.
    pub fn new(n0: f64, a: f64, b: f64, wavelength_range: Range<Length>) -> TraceResult<Self> {
        if !n0.is_finite() || !a.is_finite() || !b.is_finite() {
            return Err(TraceError::Material(
                "all coefficients must be finite".into(),
            ));
        }
        for limit in [wavelength_range.start, wavelength_range.end] {
            if limit.is_sign_negative() || !limit.is_finite() {
                return Err(TraceError::Material(
                    "wavelength limits must be >= 0.0 and finite".into(),
                ));
            }
        }
        Ok(Self {
            n0,
            a,
            b,
            wvl_range: wavelength_range,
        })
    }
    /// Returns the wavelength range over which the Conrady equation is valid.
    #[must_use]
    pub const fn wavelength_range(&self) -> &Range<Length> {
        &self.wvl_range
    }
}
impl RefractiveIndex for RefrIndexConrady {
    fn get_refractive_index(
        &self,
        wavelength: Length,
        _environment: &Environment,
    ) -> TraceResult<f64> {
        if !self.wvl_range.contains(&wavelength) {
            return Err(TraceError::Material(
                "wavelength outside valid range".into(),
            ));
        }
        let lambda = wavelength.get::<micrometer>();
        Ok(self.n0 + (self.a / lambda) + (self.b / lambda.powf(3.5)))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;
    #[test]
    fn new_wrong() {
        let valid_wvl = nanometer!(500.0)..nanometer!(2000.0);
        assert!(RefrIndexConrady::new(1.0, 1.0, f64::NAN, valid_wvl.clone()).is_err());
        assert!(RefrIndexConrady::new(1.0, f64::INFINITY, 1.0, valid_wvl.clone()).is_err());
        assert!(RefrIndexConrady::new(f64::NAN, 1.0, 1.0, valid_wvl).is_err());
        assert!(
            RefrIndexConrady::new(1.0, 1.0, 1.0, nanometer!(-1.0)..nanometer!(2000.0)).is_err()
        );
        assert!(
            RefrIndexConrady::new(1.0, 1.0, 1.0, nanometer!(1000.0)..nanometer!(f64::NAN))
                .is_err()
        );
    }
    #[test]
    fn get_refractive_index() {
        let i =
            RefrIndexConrady::new(1.0, 1.0, 1.0, nanometer!(500.0)..nanometer!(2000.0)).unwrap();
        let env = Environment::default();
        assert_relative_eq!(
            i.get_refractive_index(nanometer!(1054.0), &env).unwrap(),
            2.7806,
            max_relative = 0.0001
        );
        assert!(i.get_refractive_index(nanometer!(499.0), &env).is_err());
        assert!(i.get_refractive_index(nanometer!(2001.0), &env).is_err());
        assert_eq!(
            i.wavelength_range(),
            &(nanometer!(500.0)..nanometer!(2000.0))
        );
    }
}
