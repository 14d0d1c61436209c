use super::{Coating, Incidence};

/// Perfect anti-reflective coating
pub struct IdealAR;

impl Coating for IdealAR {
    fn calc_reflectivity(&self, _incidence: &Incidence) -> f64 {
        0.0
    }
}
