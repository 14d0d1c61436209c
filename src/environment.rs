#![warn(missing_docs)]
//! Ambient conditions for material evaluation
//!
//! The [`Environment`] is passed explicitly into every refractive index calculation. It is part of the
//! trace call and never stored globally.
use crate::error::{TraceError, TraceResult};
use serde::{Deserialize, Serialize};
use uom::si::{
    f64::{Pressure, ThermodynamicTemperature},
    pressure::pascal,
    thermodynamic_temperature::{degree_celsius, kelvin},
};

/// Temperature and pressure of the medium surrounding an optical system.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Environment {
    temperature: ThermodynamicTemperature,
    pressure: Pressure,
}
impl Default for Environment {
    /// Returns an environment of 20 °C at standard pressure (101325 Pa).
    fn default() -> Self {
        Self {
            temperature: crate::degree_celsius!(20.0),
            pressure: crate::pascal!(101_325.0),
        }
    }
}
impl Environment {
    /// Creates a new [`Environment`].
    ///
    /// # Errors
    ///
    /// This function will return an error if
    ///   - the temperature is not finite or below 0 K
    ///   - the pressure is negative or not finite
    pub fn new(temperature: ThermodynamicTemperature, pressure: Pressure) -> TraceResult<Self> {
        if !temperature.get::<kelvin>().is_finite() || temperature.get::<kelvin>() < 0.0 {
            return Err(TraceError::Material(
                "temperature must be finite and >= 0 K".into(),
            ));
        }
        if pressure.is_sign_negative() || !pressure.is_finite() {
            return Err(TraceError::Material(
                "pressure must be >= 0.0 and finite".into(),
            ));
        }
        Ok(Self {
            temperature,
            pressure,
        })
    }
    /// Returns the temperature of this [`Environment`].
    #[must_use]
    pub const fn temperature(&self) -> ThermodynamicTemperature {
        self.temperature
    }
    /// Returns the pressure of this [`Environment`].
    #[must_use]
    pub const fn pressure(&self) -> Pressure {
        self.pressure
    }
    /// Returns the temperature in degree celsius.
    #[must_use]
    pub fn temperature_celsius(&self) -> f64 {
        self.temperature.get::<degree_celsius>()
    }
    /// Returns the pressure in pascal.
    #[must_use]
    pub fn pressure_pascal(&self) -> f64 {
        self.pressure.get::<pascal>()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{degree_celsius, pascal};
    use approx::assert_relative_eq;
    #[test]
    fn default() {
        let env = Environment::default();
        assert_relative_eq!(env.temperature_celsius(), 20.0, epsilon = 1e-12);
        assert_relative_eq!(env.pressure_pascal(), 101_325.0);
    }
    #[test]
    fn new() {
        assert!(Environment::new(degree_celsius!(-300.0), pascal!(1.0)).is_err());
        assert!(Environment::new(degree_celsius!(f64::NAN), pascal!(1.0)).is_err());
        assert!(Environment::new(degree_celsius!(20.0), pascal!(-1.0)).is_err());
        assert!(Environment::new(degree_celsius!(20.0), pascal!(f64::INFINITY)).is_err());
        let env = Environment::new(degree_celsius!(25.0), pascal!(0.0)).unwrap();
        assert_relative_eq!(env.temperature_celsius(), 25.0, epsilon = 1e-12);
        assert_eq!(env.pressure_pascal(), 0.0);
    }
}
