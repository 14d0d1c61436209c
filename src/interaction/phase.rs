//! Phase profiles of thin phase plates
use crate::{
    error::{TraceError, TraceResult},
    utils::usize_to_f64,
};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use uom::si::{f64::Length, length::meter};

/// Optical path Ψ(x, y) (in meters) added by a phase surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PhaseProfile {
    /// Ψ = sx x + sy y, i.e. a prism-like tilt
    Linear {
        /// slope along x
        slope_x: f64,
        /// slope along y
        slope_y: f64,
    },
    /// Ψ = Σᵢ aᵢ (r / r₀)^(2i+2), an even polynomial in the normalized radius
    Radial {
        /// coefficients aᵢ in meters
        coefficients: Vec<f64>,
        /// normalization radius r₀ in meters
        norm_radius: f64,
    },
}
impl PhaseProfile {
    /// Create a linear phase profile.
    ///
    /// # Errors
    ///
    /// This function will return an error if a slope is not finite.
    pub fn linear(slope_x: f64, slope_y: f64) -> TraceResult<Self> {
        if !slope_x.is_finite() || !slope_y.is_finite() {
            return Err(TraceError::Surface("phase slopes must be finite".into()));
        }
        Ok(Self::Linear { slope_x, slope_y })
    }
    /// Create a radially symmetric phase profile.
    ///
    /// # Errors
    ///
    /// This function will return an error if a coefficient is not finite or the normalization radius is not
    /// positive and finite.
    pub fn radial(coefficients: Vec<f64>, norm_radius: Length) -> TraceResult<Self> {
        if coefficients.iter().any(|c| !c.is_finite()) {
            return Err(TraceError::Surface(
                "phase coefficients must be finite".into(),
            ));
        }
        if !norm_radius.is_normal() || norm_radius.is_sign_negative() {
            return Err(TraceError::Surface(
                "normalization radius must be positive and finite".into(),
            ));
        }
        Ok(Self::Radial {
            coefficients,
            norm_radius: norm_radius.get::<meter>(),
        })
    }
    /// Returns the added optical path at (x, y).
    #[must_use]
    pub fn opl(&self, x: f64, y: f64) -> f64 {
        match self {
            Self::Linear { slope_x, slope_y } => slope_x.mul_add(x, slope_y * y),
            Self::Radial {
                coefficients,
                norm_radius,
            } => {
                let rho_sq = x.mul_add(x, y * y) / (norm_radius * norm_radius);
                coefficients
                    .iter()
                    .rev()
                    .fold(0.0_f64, |acc, a| acc.mul_add(rho_sq, *a))
                    * rho_sq
            }
        }
    }
    /// Returns the gradient (∂Ψ/∂x, ∂Ψ/∂y, 0) at (x, y).
    #[must_use]
    pub fn gradient(&self, x: f64, y: f64) -> Vector3<f64> {
        match self {
            Self::Linear { slope_x, slope_y } => Vector3::new(*slope_x, *slope_y, 0.0),
            Self::Radial {
                coefficients,
                norm_radius,
            } => {
                let r0_sq = norm_radius * norm_radius;
                let rho_sq = x.mul_add(x, y * y) / r0_sq;
                // ∂/∂x aᵢ ρ^(2i+2) = aᵢ (2i+2) ρ^(2i) x / r₀²
                let f = coefficients
                    .iter()
                    .enumerate()
                    .rev()
                    .fold(0.0_f64, |acc, (i, a)| acc.mul_add(rho_sq, usize_to_f64(2 * i + 2) * a))
                    / r0_sq;
                Vector3::new(x * f, y * f, 0.0)
            }
        }
    }
    /// Returns a copy with all linear dimensions multiplied by the given factor.
    #[must_use]
    pub fn scaled(&self, factor: f64) -> Self {
        match self {
            Self::Linear { .. } => self.clone(),
            Self::Radial {
                coefficients,
                norm_radius,
            } => Self::Radial {
                coefficients: coefficients.iter().map(|a| a * factor).collect(),
                norm_radius: norm_radius * factor,
            },
        }
    }
}
