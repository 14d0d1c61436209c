#![warn(missing_docs)]
//! Configuration of the ray-tracing kernel
//!
//! The [`TraceConfig`] bundles all numerical knobs of a trace: tolerances and iteration budgets of the
//! intersection solver, the step control of the gradient-index integrator and the policy for total
//! internal reflection. A configuration can be created in code or read from a YAML document:
//! ```rust
//! use seqtrace::config::{TirPolicy, TraceConfig};
//!
//! let config = TraceConfig::from_yaml_str("newton_max_iterations: 20\ntir_policy: Reflect").unwrap();
//! assert_eq!(config.newton_max_iterations, 20);
//! assert_eq!(config.tir_policy, TirPolicy::Reflect);
//! ```
use crate::{
    error::{TraceError, TraceResult},
    millimeter,
};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};
use strum::{Display, EnumIter};
use uom::si::f64::Length;

/// Behaviour of a refracting surface if a ray exceeds the critical angle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumIter)]
pub enum TirPolicy {
    /// mark the ray as invalid (intensity 0.0). This is the default.
    #[default]
    Invalidate,
    /// redirect the ray as a specular reflection and keep propagating it
    Reflect,
}

/// Numerical parameters of a trace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TraceConfig {
    /// convergence limit of the Newton-Raphson intersection solver (in meters)
    pub newton_tolerance: f64,
    /// maximum number of Newton-Raphson iterations before a ray is declared invalid
    pub newton_max_iterations: usize,
    /// rays whose direction cosine with respect to the surface normal is smaller than this value are treated as grazing
    pub grazing_threshold: f64,
    /// arc length of a single integration step inside a gradient-index medium
    pub grin_step: Length,
    /// maximum number of integration steps inside a gradient-index medium
    pub grin_max_steps: usize,
    /// handling of total internal reflection
    pub tir_policy: TirPolicy,
    /// solve the per-ray intersection problems in parallel
    pub parallel: bool,
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            newton_tolerance: 1e-12,
            newton_max_iterations: 50,
            grazing_threshold: 1e-9,
            grin_step: millimeter!(0.1),
            grin_max_steps: 100_000,
            tir_policy: TirPolicy::default(),
            parallel: true,
        }
    }
}
impl TraceConfig {
    /// Check the configuration for consistency.
    ///
    /// # Errors
    ///
    /// This function returns an error if
    ///   - the Newton tolerance is not positive and finite
    ///   - one of the iteration / step budgets is zero
    ///   - the grazing threshold is negative or not finite
    ///   - the GRIN step length is not positive and finite
    pub fn validate(&self) -> TraceResult<()> {
        if !self.newton_tolerance.is_normal() || self.newton_tolerance.is_sign_negative() {
            return Err(TraceError::Config(
                "newton tolerance must be positive and finite".into(),
            ));
        }
        if self.newton_max_iterations == 0 {
            return Err(TraceError::Config(
                "maximum number of newton iterations must be > 0".into(),
            ));
        }
        if self.grazing_threshold.is_sign_negative() || !self.grazing_threshold.is_finite() {
            return Err(TraceError::Config(
                "grazing threshold must be >= 0.0 and finite".into(),
            ));
        }
        if !self.grin_step.is_normal() || self.grin_step.is_sign_negative() {
            return Err(TraceError::Config(
                "GRIN step length must be positive and finite".into(),
            ));
        }
        if self.grin_max_steps == 0 {
            return Err(TraceError::Config(
                "maximum number of GRIN steps must be > 0".into(),
            ));
        }
        Ok(())
    }
    /// Create a [`TraceConfig`] from a YAML document.
    ///
    /// Missing entries are filled with their default values.
    ///
    /// # Errors
    ///
    /// This function will return an error if the document cannot be parsed or the resulting configuration is invalid.
    pub fn from_yaml_str(yaml: &str) -> TraceResult<Self> {
        let config: Self = serde_yaml::from_str(yaml)
            .map_err(|e| TraceError::Config(format!("parsing of configuration failed: {e}")))?;
        config.validate()?;
        Ok(config)
    }
    /// Read a [`TraceConfig`] from a YAML file.
    ///
    /// # Errors
    ///
    /// This function will return an error if the file cannot be read or its content is not a valid configuration.
    pub fn from_file(path: &Path) -> TraceResult<Self> {
        let contents = fs::read_to_string(path).map_err(|e| {
            TraceError::Config(format!("cannot read file {} : {}", path.display(), e))
        })?;
        Self::from_yaml_str(&contents)
    }
    /// Serialize this [`TraceConfig`] into a YAML document.
    ///
    /// # Errors
    ///
    /// This function will return an error if the serialization fails.
    pub fn to_yaml_string(&self) -> TraceResult<String> {
        serde_yaml::to_string(self)
            .map_err(|e| TraceError::Config(format!("serialization of configuration failed: {e}")))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::meter;
    use std::io::Write;
    #[test]
    fn default() {
        let c = TraceConfig::default();
        assert_eq!(c.newton_tolerance, 1e-12);
        assert_eq!(c.newton_max_iterations, 50);
        assert_eq!(c.grin_step, millimeter!(0.1));
        assert_eq!(c.tir_policy, TirPolicy::Invalidate);
        assert!(c.parallel);
        assert!(c.validate().is_ok());
    }
    #[test]
    fn validate() {
        let mut c = TraceConfig {
            newton_tolerance: 0.0,
            ..Default::default()
        };
        assert!(c.validate().is_err());
        c.newton_tolerance = f64::NAN;
        assert!(c.validate().is_err());
        c.newton_tolerance = 1e-10;
        c.newton_max_iterations = 0;
        assert!(c.validate().is_err());
        c.newton_max_iterations = 10;
        c.grazing_threshold = -1.0;
        assert!(c.validate().is_err());
        c.grazing_threshold = 0.0;
        c.grin_step = meter!(-1.0);
        assert!(c.validate().is_err());
        c.grin_step = meter!(1e-4);
        c.grin_max_steps = 0;
        assert!(c.validate().is_err());
        c.grin_max_steps = 10;
        assert!(c.validate().is_ok());
    }
    #[test]
    fn from_yaml_str() {
        let c = TraceConfig::from_yaml_str("newton_max_iterations: 7\nparallel: false").unwrap();
        assert_eq!(c.newton_max_iterations, 7);
        assert!(!c.parallel);
        assert_eq!(c.newton_tolerance, 1e-12);
        assert!(TraceConfig::from_yaml_str("newton_max_iterations: 0").is_err());
        assert!(TraceConfig::from_yaml_str("newton_max_iterations: [").is_err());
    }
    #[test]
    fn yaml_roundtrip() {
        let c = TraceConfig {
            tir_policy: TirPolicy::Reflect,
            ..Default::default()
        };
        let yaml = c.to_yaml_string().unwrap();
        assert_eq!(TraceConfig::from_yaml_str(&yaml).unwrap(), c);
    }
    #[test]
    fn from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "grazing_threshold: 1.0e-6").unwrap();
        let c = TraceConfig::from_file(file.path()).unwrap();
        assert_eq!(c.grazing_threshold, 1e-6);
        assert!(TraceConfig::from_file(Path::new("./does_not_exist.yaml")).is_err());
    }
}
