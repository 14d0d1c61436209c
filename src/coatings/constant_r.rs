use super::{check_reflectivity, Coating, Incidence};
use crate::error::TraceResult;

/// Ideal coating with a reflectivity independent of angle, wavelength and polarization
pub struct ConstantR {
    pub(super) reflectivity: f64,
}
impl ConstantR {
    /// Create a new [`ConstantR`] coating.
    ///
    /// # Errors
    ///
    /// This function returns an error if the reflectivity is outside the range `0.0..=1.0`.
    pub fn new(reflectivity: f64) -> TraceResult<Self> {
        check_reflectivity(reflectivity)?;
        Ok(Self { reflectivity })
    }
}
impl Coating for ConstantR {
    fn calc_reflectivity(&self, _incidence: &Incidence) -> f64 {
        self.reflectivity
    }
}

#[cfg(test)]
mod test {
    use super::*;
    #[test]
    fn new() {
        assert!(ConstantR::new(-0.01).is_err());
        assert!(ConstantR::new(1.01).is_err());
        assert!(ConstantR::new(0.0).is_ok());
        assert!(ConstantR::new(1.0).is_ok());
    }
    #[test]
    fn calc_refl() {
        let inc = Incidence {
            cos_incidence: 0.2,
            n1: 1.0,
            n2: 1.5,
        };
        assert_eq!(ConstantR::new(0.5).unwrap().calc_reflectivity(&inc), 0.5);
    }
}
