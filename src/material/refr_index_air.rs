//! Refractive index of ambient air
use super::RefractiveIndex;
use crate::{
    environment::Environment,
    error::{TraceError, TraceResult},
};
use serde::{Deserialize, Serialize};
use uom::si::{f64::Length, length::micrometer};

/// Refractive index of dry air following the updated Edlén equation of Birch & Downs (1993/1994).
///
/// The index is evaluated at the temperature and pressure of the [`Environment`] passed into the calculation.
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq, Default)]
pub struct RefrIndexAir;

impl RefractiveIndex for RefrIndexAir {
    fn get_refractive_index(
        &self,
        wavelength: Length,
        environment: &Environment,
    ) -> TraceResult<f64> {
        let sigma_sq = wavelength.get::<micrometer>().powi(-2);
        if sigma_sq >= 38.9 || !sigma_sq.is_finite() {
            return Err(TraceError::Material(
                "wavelength outside valid range of air model".into(),
            ));
        }
        // standard air (15 °C, 101 325 Pa)
        let n_s = 1e-8 * (8342.54 + 2_406_147.0 / (130.0 - sigma_sq) + 15998.0 / (38.9 - sigma_sq));
        let t = environment.temperature_celsius();
        let p = environment.pressure_pascal();
        let n_tp = p * n_s / 96095.43 * (1.0 + 1e-8 * 0.00972f64.mul_add(-t, 0.601) * p)
            / 0.003_661_0f64.mul_add(t, 1.0);
        Ok(1.0 + n_tp)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{degree_celsius, nanometer, pascal};
    use approx::assert_abs_diff_eq;
    #[test]
    fn standard_conditions() {
        let n = RefrIndexAir
            .get_refractive_index(nanometer!(633.0), &Environment::default())
            .unwrap();
        assert_abs_diff_eq!(n - 1.0, 2.718e-4, epsilon = 1e-6);
    }
    #[test]
    fn vacuum() {
        let env = Environment::new(degree_celsius!(20.0), pascal!(0.0)).unwrap();
        let n = RefrIndexAir
            .get_refractive_index(nanometer!(633.0), &env)
            .unwrap();
        assert_eq!(n, 1.0);
    }
    #[test]
    fn temperature_dependence() {
        let cold = Environment::new(degree_celsius!(0.0), pascal!(101_325.0)).unwrap();
        let hot = Environment::new(degree_celsius!(40.0), pascal!(101_325.0)).unwrap();
        let n_cold = RefrIndexAir
            .get_refractive_index(nanometer!(633.0), &cold)
            .unwrap();
        let n_hot = RefrIndexAir
            .get_refractive_index(nanometer!(633.0), &hot)
            .unwrap();
        assert!(n_cold > n_hot);
    }
    #[test]
    fn out_of_range() {
        assert!(RefrIndexAir
            .get_refractive_index(nanometer!(100.0), &Environment::default())
            .is_err());
    }
}
