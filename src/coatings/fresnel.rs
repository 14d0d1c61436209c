use super::{Coating, Incidence};

/// Fresnel reflection of an uncoated interface for unpolarized light
pub struct Fresnel;

impl Coating for Fresnel {
    /// Formulas taken from `https://de.wikipedia.org/wiki/Fresnelsche_Formeln`
    fn calc_reflectivity(&self, incidence: &Incidence) -> f64 {
        let Incidence {
            cos_incidence,
            n1,
            n2,
        } = *incidence;
        let cos_alpha = cos_incidence.abs().min(1.0);
        let sin_beta_sq = (n1 / n2).powi(2) * cos_alpha.mul_add(-cos_alpha, 1.0);
        if sin_beta_sq >= 1.0 {
            // total internal reflection
            return 1.0;
        }
        let cos_beta = (1.0 - sin_beta_sq).sqrt();
        // s-polarization
        let r_s = n1.mul_add(cos_alpha, -n2 * cos_beta) / n1.mul_add(cos_alpha, n2 * cos_beta);
        // p-polarization
        let r_p = n2.mul_add(cos_alpha, -n1 * cos_beta) / n2.mul_add(cos_alpha, n1 * cos_beta);
        // unpolarized (50/50) light -> take average
        let r = r_s.mul_add(r_s, r_p * r_p) / 2.0;
        if r.is_finite() {
            r
        } else {
            1.0
        }
    }
}
