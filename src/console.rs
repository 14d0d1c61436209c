//! Handling the seqtrace CLI
//!
//! This module handles the command line parsing and the demonstration system traced by the binary.
use crate::{
    config::TraceConfig,
    degree,
    environment::Environment,
    error::{TraceError, TraceResult},
    interaction::InteractionModel,
    material::{Material, RefrIndexAir, RefrIndexSellmeier1},
    millimeter, nanometer,
    position_distributions::Hexapolar,
    rays::RayBatch,
    surface::{Conic, OpticSurface},
    surface_stack::SurfaceStack,
    trace_history::TraceHistory,
};
use clap::Parser;
use nalgebra::Vector3;
use std::{
    fmt::Write,
    path::{Path, PathBuf},
};
use uom::si::{angle::radian, length::millimeter, f64::Angle};

/// Command line arguments of the seqtrace application.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// YAML file with the trace configuration. If not given, the default configuration is used
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// number of rings of the hexapolar pupil sampling
    #[arg(short, long, default_value_t = 7)]
    pub rings: u8,

    /// field angle of the collimated input beam in degrees
    #[arg(short, long, default_value_t = 0.0, allow_negative_numbers = true)]
    pub field_angle: f64,
}

/// Checks if the passed file path points to an existing YAML file.
fn config_path_is_valid(path: &Path) -> bool {
    path.is_file()
        && path
            .extension()
            .is_some_and(|ext| ext == "yaml" || ext == "yml")
}

impl Args {
    /// Returns the trace configuration given on the command line.
    ///
    /// # Errors
    ///
    /// This function will return an error if the configuration file is not a readable YAML file or contains an invalid
    /// configuration.
    pub fn trace_config(&self) -> TraceResult<TraceConfig> {
        self.config.as_ref().map_or_else(
            || Ok(TraceConfig::default()),
            |path| {
                if !config_path_is_valid(path) {
                    return Err(TraceError::Console(format!(
                        "{} is not a valid configuration file",
                        path.display()
                    )));
                }
                TraceConfig::from_file(path)
            },
        )
    }
    /// Returns the field angle.
    ///
    /// # Errors
    ///
    /// This function will return an error if the angle is not within ]-90°, 90°[.
    pub fn field_angle(&self) -> TraceResult<Angle> {
        if !self.field_angle.is_finite() || self.field_angle.abs() >= 90.0 {
            return Err(TraceError::Console(
                "field angle must be within ]-90°, 90°[".into(),
            ));
        }
        Ok(degree!(self.field_angle))
    }
}

/// Creates the demonstration system: a biconvex N-BK7 like singlet (f ≈ 100 mm) focussing a collimated beam.
///
/// # Errors
///
/// This function will return an error if the system cannot be set up.
pub fn demo_singlet() -> TraceResult<SurfaceStack> {
    let mut stack = SurfaceStack::new(Material::Air(RefrIndexAir), millimeter!(f64::INFINITY))?;
    let mut front = OpticSurface::new(
        Conic::new(millimeter!(102.0), 0.0)?.into(),
        InteractionModel::Refractive,
    );
    front.set_comment("front");
    let mut back = OpticSurface::new(
        Conic::new(millimeter!(-102.0), 0.0)?.into(),
        InteractionModel::Refractive,
    );
    back.set_comment("back");
    stack.add_surface(front, Material::Sellmeier1(RefrIndexSellmeier1::default()))?;
    stack.add_surface(back, Material::Air(RefrIndexAir))?;
    stack.set_thickness(1, millimeter!(5.0))?;
    stack.set_thickness(2, millimeter!(96.8))?;
    Ok(stack)
}

/// Trace a collimated hexapolar bundle (pupil radius 10 mm) through the given system.
///
/// # Errors
///
/// This function will return an error if the rays cannot be created or the trace fails.
pub fn trace_bundle(
    stack: &SurfaceStack,
    nr_of_rings: u8,
    field_angle: Angle,
    config: &TraceConfig,
) -> TraceResult<TraceHistory> {
    let angle = field_angle.get::<radian>();
    let direction = Vector3::new(0.0, angle.sin(), angle.cos());
    let rays = RayBatch::new_collimated(
        &Hexapolar::new(millimeter!(10.0), nr_of_rings)?,
        direction,
        millimeter!(-10.0),
        nanometer!(587.6),
    )?;
    stack.trace(&rays, config, &Environment::default())
}

/// Creates the text summary of a trace: the number of valid rays at each surface and the RMS spot radius at the image.
///
/// # Errors
///
/// This function will return an error if the history does not belong to the given stack.
pub fn summary(stack: &SurfaceStack, history: &TraceHistory) -> TraceResult<String> {
    let mut text = String::new();
    let write_err = |e: std::fmt::Error| TraceError::Console(format!("formatting failed: {e}"));
    for (idx, surface) in stack.surfaces().iter().enumerate() {
        let valid = history.valid_mask(idx)?.iter().filter(|v| **v).count();
        writeln!(
            text,
            "surface {idx:>3} {:<8} {valid:>6} / {} rays valid",
            surface.comment(),
            history.nr_of_rays()
        )
        .map_err(write_err)?;
    }
    let image = stack.image_index();
    match history.rms_spot_radius(image)? {
        Some(radius) => writeln!(
            text,
            "RMS spot radius at image: {:.6} mm",
            radius.get::<millimeter>()
        ),
        None => writeln!(text, "no valid rays at image"),
    }
    .map_err(write_err)?;
    Ok(text)
}

#[cfg(test)]
mod test {
    use super::*;
    use assert_matches::assert_matches;
    use std::io::Write as IoWrite;
    #[test]
    fn parse_args() {
        let args = Args::try_parse_from(["seqtrace"]).unwrap();
        assert_eq!(args.rings, 7);
        assert_eq!(args.field_angle, 0.0);
        assert!(args.config.is_none());
        let args =
            Args::try_parse_from(["seqtrace", "--rings", "3", "--field-angle", "-2.5"]).unwrap();
        assert_eq!(args.rings, 3);
        assert_eq!(args.field_angle, -2.5);
        assert!(Args::try_parse_from(["seqtrace", "--rings", "-1"]).is_err());
    }
    #[test]
    fn field_angle() {
        let mut args = Args::try_parse_from(["seqtrace"]).unwrap();
        assert_eq!(args.field_angle().unwrap(), degree!(0.0));
        args.field_angle = 90.0;
        assert_matches!(args.field_angle(), Err(TraceError::Console(_)));
        args.field_angle = f64::NAN;
        assert!(args.field_angle().is_err());
    }
    #[test]
    fn trace_config() {
        let mut args = Args::try_parse_from(["seqtrace"]).unwrap();
        assert_eq!(args.trace_config().unwrap(), TraceConfig::default());
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(file, "newton_max_iterations: 20\nparallel: false").unwrap();
        args.config = Some(file.path().to_path_buf());
        let config = args.trace_config().unwrap();
        assert_eq!(config.newton_max_iterations, 20);
        assert!(!config.parallel);
        let file = tempfile::Builder::new().suffix(".txt").tempfile().unwrap();
        args.config = Some(file.path().to_path_buf());
        assert_matches!(args.trace_config(), Err(TraceError::Console(_)));
        args.config = Some(PathBuf::from("./does_not_exist.yaml"));
        assert!(args.trace_config().is_err());
    }
    #[test]
    fn demo() {
        let stack = demo_singlet().unwrap();
        assert_eq!(stack.len(), 4);
        assert_eq!(stack.stop_index(), Some(1));
        let history = trace_bundle(&stack, 3, degree!(0.0), &TraceConfig::default()).unwrap();
        assert_eq!(history.nr_of_rays(), 37);
        let spot = history.rms_spot_radius(3).unwrap().unwrap();
        assert!(spot < millimeter!(0.5));
        let text = summary(&stack, &history).unwrap();
        assert!(text.contains("surface   3 image        37 / 37 rays valid"));
        assert!(text.contains("RMS spot radius at image"));
        let tilted = trace_bundle(&stack, 3, degree!(5.0), &TraceConfig::default()).unwrap();
        assert!(tilted.y()[(3, 0)] > 0.008);
    }
}
