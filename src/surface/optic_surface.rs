//! Module handling optical surfaces
//!
//! An [`OpticSurface`] combines a geometric shape ([`GeometricSurface`]) with an [`InteractionModel`], an [`Aperture`],
//! a [`CoatingType`] and the materials in front of and behind the surface. Its placement in space is given by a
//! [`Frame`] which is managed by the [`SurfaceStack`](crate::surface_stack::SurfaceStack).
use super::{GeoSurface, GeometricSurface};
use crate::{
    aperture::Aperture,
    coatings::{CoatingType, Incidence},
    config::TraceConfig,
    environment::Environment,
    error::TraceResult,
    frame::Frame,
    interaction::{
        grin::integrate_to_surface, refraction::cos_incidence, Deflection, Incident,
        InteractionModel,
    },
    material::{GradientIndex, Material},
    rays::RayBatch,
    utils::math_utils::is_finite_vector,
};
use nalgebra::{Point2, Point3};
use num::Zero;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use uom::si::f64::{Angle, Length};

/// Shared, read-only parameters of a trace call.
#[derive(Debug, Clone, Copy)]
pub struct TraceContext<'a> {
    /// numerical parameters
    pub config: &'a TraceConfig,
    /// ambient conditions for the evaluation of the materials
    pub environment: &'a Environment,
    /// frame of the preceding surface. A gradient-index medium in front of this surface is evaluated in this frame.
    pub entry_frame: Option<&'a Frame>,
}

/// Number of rays lost (or redirected) at a single surface.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SurfaceStatistics {
    /// rays without a (forward) intersection
    pub missed: usize,
    /// rays hitting the surface at grazing incidence
    pub grazing: usize,
    /// rays blocked by the aperture
    pub clipped: usize,
    /// rays lost by total internal reflection or an evanescent diffraction order
    pub blocked: usize,
    /// rays redirected by total internal reflection ([`TirPolicy::Reflect`](crate::config::TirPolicy::Reflect))
    pub total_internal_reflections: usize,
    /// rays not reaching the surface through a gradient-index medium within the step budget
    pub grin_exhausted: usize,
}
impl SurfaceStatistics {
    /// Returns the total number of rays lost at this surface.
    #[must_use]
    pub const fn lost(&self) -> usize {
        self.missed + self.grazing + self.clipped + self.blocked + self.grin_exhausted
    }
}

/// This struct represents an optical surface, which consists of the geometric surface shape ([`GeoSurface`]) and further
/// properties such as the [`InteractionModel`] and the [`CoatingType`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpticSurface {
    shape: GeometricSurface,
    interaction: InteractionModel,
    aperture: Aperture,
    coating: CoatingType,
    material_pre: Material,
    material_post: Material,
    thickness: Length,
    decenter: Point2<Length>,
    tilt: Point3<Angle>,
    #[serde(skip)]
    frame: Frame,
    is_stop: bool,
    semi_aperture: Option<Length>,
    comment: String,
}
impl Default for OpticSurface {
    /// Returns a default [`OpticSurface`].
    ///
    /// The default is a refracting flat surface in vacuum with an ideal antireflective coating (=no reflection) and
    /// no limiting aperture.
    fn default() -> Self {
        Self {
            shape: GeometricSurface::default(),
            interaction: InteractionModel::default(),
            aperture: Aperture::default(),
            coating: CoatingType::IdealAR,
            material_pre: Material::default(),
            material_post: Material::default(),
            thickness: Length::zero(),
            decenter: Point2::new(Length::zero(), Length::zero()),
            tilt: Point3::new(Angle::zero(), Angle::zero(), Angle::zero()),
            frame: Frame::identity(),
            is_stop: false,
            semi_aperture: None,
            comment: String::new(),
        }
    }
}
impl OpticSurface {
    /// Creates a new [`OpticSurface`] with the given shape and interaction model.
    #[must_use]
    pub fn new(shape: GeometricSurface, interaction: InteractionModel) -> Self {
        Self {
            shape,
            interaction,
            ..Default::default()
        }
    }
    /// Returns a reference to the shape of this [`OpticSurface`].
    #[must_use]
    pub const fn shape(&self) -> &GeometricSurface {
        &self.shape
    }
    /// Sets the shape of this [`OpticSurface`].
    pub fn set_shape(&mut self, shape: GeometricSurface) {
        self.shape = shape;
    }
    /// Returns a reference to the interaction model of this [`OpticSurface`].
    #[must_use]
    pub const fn interaction(&self) -> &InteractionModel {
        &self.interaction
    }
    /// Sets the aperture of this [`OpticSurface`].
    pub fn set_aperture(&mut self, aperture: Aperture) {
        self.aperture = aperture;
    }
    /// Returns a reference to the aperture of this [`OpticSurface`].
    #[must_use]
    pub const fn aperture(&self) -> &Aperture {
        &self.aperture
    }
    /// Sets the coating of this [`OpticSurface`].
    pub fn set_coating(&mut self, coating: CoatingType) {
        self.coating = coating;
    }
    /// Returns a reference to the coating of this [`OpticSurface`].
    #[must_use]
    pub const fn coating(&self) -> &CoatingType {
        &self.coating
    }
    /// Returns the material in front of this [`OpticSurface`].
    #[must_use]
    pub const fn material_pre(&self) -> &Material {
        &self.material_pre
    }
    /// Returns the material behind this [`OpticSurface`].
    ///
    /// For a reflecting surface this is the same medium as in front of it.
    #[must_use]
    pub const fn material_post(&self) -> &Material {
        &self.material_post
    }
    pub(crate) fn set_material_pre(&mut self, material: Material) {
        self.material_pre = material;
    }
    pub(crate) fn set_material_post(&mut self, material: Material) {
        self.material_post = material;
    }
    /// Returns the distance to the next surface along the local z axis.
    #[must_use]
    pub const fn thickness(&self) -> Length {
        self.thickness
    }
    pub(crate) fn set_thickness(&mut self, thickness: Length) {
        self.thickness = thickness;
    }
    /// Returns the lateral offset of this [`OpticSurface`] from the optical axis.
    #[must_use]
    pub const fn decenter(&self) -> Point2<Length> {
        self.decenter
    }
    pub(crate) fn set_decenter(&mut self, decenter: Point2<Length>) {
        self.decenter = decenter;
    }
    /// Returns the tilt angles (around x, y, z) of this [`OpticSurface`].
    #[must_use]
    pub const fn tilt(&self) -> Point3<Angle> {
        self.tilt
    }
    pub(crate) fn set_tilt(&mut self, tilt: Point3<Angle>) {
        self.tilt = tilt;
    }
    /// Returns the coordinate frame of this [`OpticSurface`].
    #[must_use]
    pub const fn frame(&self) -> &Frame {
        &self.frame
    }
    /// Places this [`OpticSurface`] in space.
    ///
    /// **Note**: Inside a [`SurfaceStack`](crate::surface_stack::SurfaceStack) the frame is recalculated after each
    /// structural edit.
    pub fn set_frame(&mut self, frame: Frame) {
        self.frame = frame;
    }
    /// Returns `true` if this [`OpticSurface`] is the aperture stop of its stack.
    #[must_use]
    pub const fn is_stop(&self) -> bool {
        self.is_stop
    }
    pub(crate) fn set_stop(&mut self, is_stop: bool) {
        self.is_stop = is_stop;
    }
    /// Returns the semi-aperture (clear radius) of this [`OpticSurface`], if known.
    #[must_use]
    pub const fn semi_aperture(&self) -> Option<Length> {
        self.semi_aperture
    }
    /// Sets the semi-aperture of this [`OpticSurface`].
    pub fn set_semi_aperture(&mut self, semi_aperture: Option<Length>) {
        self.semi_aperture = semi_aperture;
    }
    /// Returns the comment of this [`OpticSurface`].
    #[must_use]
    pub fn comment(&self) -> &str {
        &self.comment
    }
    /// Sets the comment of this [`OpticSurface`].
    pub fn set_comment(&mut self, comment: &str) {
        self.comment = comment.to_owned();
    }
    /// Returns `true` if rays leave this surface into the incident medium.
    #[must_use]
    pub const fn is_reflective(&self) -> bool {
        self.interaction.is_reflective()
    }
    /// Mirror this surface at its vertex plane and swap the media on both sides.
    pub(crate) fn flip(&mut self) {
        self.shape.flip();
        std::mem::swap(&mut self.material_pre, &mut self.material_post);
        self.tilt = Point3::new(-self.tilt.x, -self.tilt.y, self.tilt.z);
    }
    /// Scale all linear dimensions of this surface by the given factor.
    pub(crate) fn scale(&mut self, factor: f64) -> TraceResult<()> {
        self.shape.scale(factor)?;
        self.aperture = self.aperture.scaled(factor)?;
        self.interaction = self.interaction.scaled(factor)?;
        self.thickness *= factor;
        self.decenter = Point2::new(self.decenter.x * factor, self.decenter.y * factor);
        self.semi_aperture = self.semi_aperture.map(|s| s * factor);
        for material in [&mut self.material_pre, &mut self.material_post] {
            if let Material::Grin(g) = material {
                *material = Material::Grin(g.scaled(factor));
            }
        }
        Ok(())
    }
    /// Trace a [`RayBatch`] (in global coordinates) through this [`OpticSurface`].
    ///
    /// The rays are moved to their intersection points, clipped by the aperture and deflected according to the
    /// [`InteractionModel`]. If the material in front of the surface is a gradient-index medium and an entry frame
    /// is given, the curved ray paths through this medium are integrated instead of straight propagation.
    ///
    /// Rays failing at this surface are invalidated (intensity 0.0) but stay in the batch.
    ///
    /// # Errors
    ///
    /// This function will return an error if one of the materials cannot be evaluated for the wavelengths of the rays.
    pub fn trace(
        &self,
        rays: &mut RayBatch,
        context: &TraceContext<'_>,
    ) -> TraceResult<SurfaceStatistics> {
        let mut n_pre = self
            .material_pre
            .refractive_indices(rays.wavelengths(), context.environment)?;
        let n_post = self
            .material_post
            .refractive_indices(rays.wavelengths(), context.environment)?;
        let mut statistics = SurfaceStatistics::default();
        self.frame.to_local(rays);
        match (self.material_pre.grin(), context.entry_frame) {
            (Some(medium), Some(entry)) => {
                statistics.grin_exhausted =
                    self.propagate_grin(rays, &mut n_pre, medium, entry, context.config);
            }
            _ => {
                statistics.missed = self.propagate_straight(rays, &n_pre, context.config)?;
            }
        }
        statistics.clipped = self.aperture.clip(rays);
        self.interact(rays, &n_pre, &n_post, context.config, &mut statistics);
        rays.normalize_directions();
        rays.sanitize();
        self.frame.to_global(rays);
        Ok(statistics)
    }
    /// Move all valid rays (in local coordinates) to their intersection points. Returns the number of missed rays.
    fn propagate_straight(
        &self,
        rays: &mut RayBatch,
        refractive_indices: &[f64],
        config: &TraceConfig,
    ) -> TraceResult<usize> {
        let distance = |idx: usize| {
            if rays.is_valid(idx) {
                self.shape
                    .distance(&rays.position_m(idx), &rays.direction(idx), config)
            } else {
                Some(0.0)
            }
        };
        let distances: Vec<Option<f64>> = if config.parallel {
            (0..rays.len()).into_par_iter().map(distance).collect()
        } else {
            (0..rays.len()).map(distance).collect()
        };
        let missed = distances.iter().filter(|d| d.is_none()).count();
        rays.propagate(&distances, refractive_indices)?;
        Ok(missed)
    }
    /// Integrate all valid rays through a gradient-index medium up to this surface.
    ///
    /// The medium is evaluated in the coordinates of the entry frame. The local index at the end point of each path
    /// replaces the entry of `refractive_indices`. Returns the number of rays which did not reach the surface within
    /// the step budget.
    fn propagate_grin(
        &self,
        rays: &mut RayBatch,
        refractive_indices: &mut [f64],
        medium: &GradientIndex,
        entry: &Frame,
        config: &TraceConfig,
    ) -> usize {
        // maps local coordinates of this surface into coordinates of the entry frame
        let to_entry = self.frame.relative_isometry(entry);
        let surface = |p: &Point3<f64>| {
            let q = to_entry.inverse_transform_point(p);
            q.z - self.shape.sag(q.x, q.y)
        };
        let mut exhausted = 0;
        for idx in 0..rays.len() {
            if !rays.is_valid(idx) {
                continue;
            }
            let start = to_entry.transform_point(&rays.position_m(idx));
            let direction = to_entry.transform_vector(&rays.direction(idx));
            if let Some(path) = integrate_to_surface(medium, &start, &direction, surface, config) {
                rays.set_position(idx, &to_entry.inverse_transform_point(&path.position));
                rays.set_direction(idx, &to_entry.inverse_transform_vector(&path.direction));
                rays.add_opl(idx, path.opl);
                refractive_indices[idx] = medium.index_and_gradient(&path.position).0;
            } else {
                rays.invalidate(idx);
                exhausted += 1;
            }
        }
        exhausted
    }
    fn interact(
        &self,
        rays: &mut RayBatch,
        n_pre: &[f64],
        n_post: &[f64],
        config: &TraceConfig,
        statistics: &mut SurfaceStatistics,
    ) {
        for idx in 0..rays.len() {
            if !rays.is_valid(idx) {
                continue;
            }
            let p = rays.position_m(idx);
            let direction = rays.direction(idx);
            let normal = self.shape.normal(p.x, p.y);
            if !is_finite_vector(&normal)
                || cos_incidence(&direction, &normal) < config.grazing_threshold
            {
                rays.invalidate(idx);
                statistics.grazing += 1;
                continue;
            }
            let wavelength = rays.wavelengths()[idx];
            let n1 = n_pre[idx];
            // a gradient-index medium behind the surface is evaluated in the frame of this surface
            let n2 = if self.is_reflective() {
                n1
            } else {
                self.material_post
                    .grin()
                    .map_or(n_post[idx], |medium| medium.index_and_gradient(&p).0)
            };
            let incident = Incident {
                x: p.x,
                y: p.y,
                direction,
                normal,
                n1,
                n2,
                wavelength,
            };
            let incidence = Incidence {
                cos_incidence: cos_incidence(&direction, &normal),
                n1,
                n2,
            };
            match self.interaction.deflect(&incident, config.tir_policy) {
                Deflection::Transmitted(d) => {
                    rays.set_direction(idx, &d);
                    rays.attenuate(idx, self.coating.transmittance(&incidence));
                }
                Deflection::Reflected(d) => {
                    rays.set_direction(idx, &d);
                    rays.attenuate(idx, self.coating.mirror_reflectivity(&incidence));
                }
                Deflection::TotalInternalReflection(d) => {
                    rays.set_direction(idx, &d);
                    statistics.total_internal_reflections += 1;
                }
                Deflection::Blocked => {
                    rays.invalidate(idx);
                    statistics.blocked += 1;
                    continue;
                }
            }
            rays.add_opl(idx, self.interaction.added_opl(p.x, p.y, wavelength));
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        aperture::CircleConfig,
        config::TirPolicy,
        degree,
        interaction::PhaseProfile,
        millimeter, nanometer,
        surface::{Conic, Plane},
    };
    use approx::assert_relative_eq;
    use nalgebra::{vector, Vector3};
    fn single_ray(position: Point3<Length>, direction: Vector3<f64>) -> RayBatch {
        RayBatch::new(&[position], &[direction], nanometer!(1000.0)).unwrap()
    }
    fn context<'a>(config: &'a TraceConfig, environment: &'a Environment) -> TraceContext<'a> {
        TraceContext {
            config,
            environment,
            entry_frame: None,
        }
    }
    fn interface(n1: f64, n2: f64) -> OpticSurface {
        let mut s = OpticSurface::new(Plane.into(), InteractionModel::Refractive);
        s.set_material_pre(Material::constant(n1).unwrap());
        s.set_material_post(Material::constant(n2).unwrap());
        s
    }
    #[test]
    fn default() {
        let s = OpticSurface::default();
        assert_eq!(s.shape(), &GeometricSurface::Plane(Plane));
        assert_eq!(s.interaction(), &InteractionModel::Refractive);
        assert_eq!(s.coating(), &CoatingType::IdealAR);
        assert_eq!(s.aperture(), &Aperture::None);
        assert!(!s.is_stop());
        assert!(!s.is_reflective());
        assert!(s.semi_aperture().is_none());
        assert_eq!(s.comment(), "");
    }
    #[test]
    fn planar_no_op() {
        let mut s = interface(1.0, 1.0);
        s.set_frame(Frame::along_z(millimeter!(5.0)).unwrap());
        let dir = vector![0.1, 0.0, 1.0].normalize();
        let mut rays = single_ray(millimeter!(1.0, 2.0, 0.0), dir);
        let config = TraceConfig::default();
        let env = Environment::default();
        let stats = s.trace(&mut rays, &context(&config, &env)).unwrap();
        assert_eq!(stats, SurfaceStatistics::default());
        assert_relative_eq!(rays.direction(0), dir, epsilon = 1e-15);
        let p = rays.position_m(0);
        assert_relative_eq!(p.x, 0.0015, epsilon = 1e-15);
        assert_relative_eq!(p.y, 0.002, epsilon = 1e-15);
        assert_relative_eq!(p.z, 0.005, epsilon = 1e-15);
        assert_relative_eq!(rays.opl()[0], 0.005 / dir.z, epsilon = 1e-15);
    }
    #[test]
    fn snell() {
        let s = interface(1.0, 1.5);
        let config = TraceConfig::default();
        let env = Environment::default();
        for angle in [0.0f64, 10.0, 30.0, 60.0, 85.0] {
            let a = angle.to_radians();
            let mut rays = single_ray(
                millimeter!(0.0, 0.0, -1.0),
                vector![0.0, a.sin(), a.cos()],
            );
            s.trace(&mut rays, &context(&config, &env)).unwrap();
            assert!(rays.is_valid(0));
            let d = rays.direction(0);
            assert_relative_eq!(d.norm(), 1.0, epsilon = 1e-15);
            assert_relative_eq!(1.5 * d.y, a.sin(), epsilon = 1e-14);
        }
    }
    #[test]
    fn total_internal_reflection() {
        let s = interface(1.5, 1.0);
        let env = Environment::default();
        let dir = vector![0.0, 45f64.to_radians().sin(), 45f64.to_radians().cos()];
        let mut config = TraceConfig::default();
        let mut rays = single_ray(millimeter!(0.0, 0.0, -1.0), dir);
        let stats = s.trace(&mut rays, &context(&config, &env)).unwrap();
        assert!(!rays.is_valid(0));
        assert_eq!(stats.blocked, 1);
        config.tir_policy = TirPolicy::Reflect;
        let mut rays = single_ray(millimeter!(0.0, 0.0, -1.0), dir);
        let stats = s.trace(&mut rays, &context(&config, &env)).unwrap();
        assert_eq!(stats.total_internal_reflections, 1);
        assert_eq!(stats.lost(), 0);
        assert_eq!(rays.intensity()[0], 1.0);
        assert_relative_eq!(rays.direction(0), vector![0.0, dir.y, -dir.z], epsilon = 1e-15);
    }
    #[test]
    fn aperture() {
        let mut s = interface(1.0, 1.0);
        s.set_aperture(Aperture::BinaryCircle(
            CircleConfig::new(millimeter!(1.0), millimeter!(0.0, 0.0)).unwrap(),
        ));
        let mut rays = RayBatch::new(
            &[millimeter!(0.0, 0.5, -1.0), millimeter!(0.0, 2.0, -1.0)],
            &[Vector3::z(), Vector3::z()],
            nanometer!(1000.0),
        )
        .unwrap();
        let config = TraceConfig::default();
        let env = Environment::default();
        let stats = s.trace(&mut rays, &context(&config, &env)).unwrap();
        assert_eq!(stats.clipped, 1);
        assert_eq!(rays.valid_mask(), vec![true, false]);
        // the blocked ray stays in the batch
        assert_eq!(rays.len(), 2);
        assert_relative_eq!(rays.position_m(1).y, 0.002);
    }
    #[test]
    fn grazing_and_missed() {
        let s = OpticSurface::new(
            Conic::new(millimeter!(10.0), 0.0).unwrap().into(),
            InteractionModel::Refractive,
        );
        let mut config = TraceConfig::default();
        let env = Environment::default();
        let mut rays = single_ray(millimeter!(0.0, 20.0, -1.0), Vector3::z());
        let stats = s.trace(&mut rays, &context(&config, &env)).unwrap();
        assert_eq!(stats.missed, 1);
        assert!(!rays.is_valid(0));
        config.grazing_threshold = 0.5;
        let mut rays = single_ray(millimeter!(0.0, 9.5, -1.0), Vector3::z());
        let stats = s.trace(&mut rays, &context(&config, &env)).unwrap();
        assert_eq!(stats.grazing, 1);
        assert_eq!(stats.lost(), 1);
    }
    #[test]
    fn mirror() {
        let mut s = OpticSurface::new(Plane.into(), InteractionModel::Reflective);
        s.set_coating(CoatingType::constant_r(0.9).unwrap());
        s.set_frame(Frame::new(millimeter!(0.0, 0.0, 10.0), degree!(0.0, 0.0, 0.0)).unwrap());
        let mut rays = single_ray(millimeter!(0.0, 1.0, 0.0), Vector3::z());
        let config = TraceConfig::default();
        let env = Environment::default();
        s.trace(&mut rays, &context(&config, &env)).unwrap();
        assert_relative_eq!(rays.direction(0), vector![0.0, 0.0, -1.0]);
        assert_relative_eq!(rays.intensity()[0], 0.9);
        assert_relative_eq!(rays.position_m(0).z, 0.01);
    }
    #[test]
    fn phase_opl() {
        let mut s = OpticSurface::new(
            Plane.into(),
            InteractionModel::Phase(PhaseProfile::linear(0.01, 0.0).unwrap()),
        );
        s.set_frame(Frame::along_z(millimeter!(1.0)).unwrap());
        let mut rays = single_ray(millimeter!(2.0, 0.0, 0.0), Vector3::z());
        let config = TraceConfig::default();
        let env = Environment::default();
        s.trace(&mut rays, &context(&config, &env)).unwrap();
        assert_relative_eq!(rays.opl()[0], 0.001 + 0.01 * 0.002, epsilon = 1e-15);
        assert_relative_eq!(rays.direction(0).x, 0.01, epsilon = 1e-15);
    }
    #[test]
    fn homogeneous_grin() {
        let mut s = interface(1.0, 1.0);
        s.set_material_pre(Material::Grin(
            GradientIndex::new(1.6, [0.0; 3], [0.0; 3]).unwrap(),
        ));
        s.set_frame(Frame::along_z(millimeter!(10.0)).unwrap());
        let entry = Frame::identity();
        let dir = vector![0.0, 0.05, 1.0].normalize();
        let mut rays = single_ray(millimeter!(0.0, 1.0, 0.0), dir);
        let config = TraceConfig::default();
        let env = Environment::default();
        let stats = s
            .trace(
                &mut rays,
                &TraceContext {
                    config: &config,
                    environment: &env,
                    entry_frame: Some(&entry),
                },
            )
            .unwrap();
        assert_eq!(stats.grin_exhausted, 0);
        let p = rays.position_m(0);
        assert_relative_eq!(p.z, 0.01, epsilon = 1e-11);
        assert_relative_eq!(p.y, 0.001 + 0.01 * dir.y / dir.z, epsilon = 1e-11);
        assert_relative_eq!(rays.opl()[0], 1.6 * 0.01 / dir.z, epsilon = 1e-10);
        // refraction 1.6 -> 1.0 at the exit surface
        assert_relative_eq!(rays.direction(0).y, 1.6 * dir.y, epsilon = 1e-12);
    }
    #[test]
    fn radial_grin_boundaries() {
        let medium = GradientIndex::new(1.5, [-1000.0, 0.0, 0.0], [0.0; 3]).unwrap();
        let mut entry = interface(1.0, 1.0);
        entry.set_material_post(Material::Grin(medium));
        let mut exit = interface(1.0, 1.0);
        exit.set_material_pre(Material::Grin(medium));
        exit.set_frame(Frame::along_z(millimeter!(10.0)).unwrap());
        let config = TraceConfig::default();
        let env = Environment::default();
        let dir = vector![0.0, 0.1, 1.0].normalize();
        // hits the entry face at y = 2 mm
        let mut rays = single_ray(millimeter!(0.0, 1.9, -1.0), dir);
        entry.trace(&mut rays, &context(&config, &env)).unwrap();
        // n at r = 2 mm: 1.5 - 1000 * 4e-6
        let inside = rays.direction(0);
        assert_relative_eq!(inside.y, dir.y / 1.496, epsilon = 1e-12);

        let path = integrate_to_surface(
            &medium,
            &rays.position_m(0),
            &inside,
            |p| p.z - 0.01,
            &config,
        )
        .unwrap();
        let n_exit = medium.index_and_gradient(&path.position).0;
        assert!((n_exit - 1.5).abs() > 1e-4);
        exit.trace(
            &mut rays,
            &TraceContext {
                config: &config,
                environment: &env,
                entry_frame: Some(entry.frame()),
            },
        )
        .unwrap();
        assert!(rays.is_valid(0));
        assert_relative_eq!(rays.direction(0).y, n_exit * path.direction.y, epsilon = 1e-10);
        assert!((rays.direction(0).y - 1.5 * path.direction.y).abs() > 1e-6);
    }
    #[test]
    fn scale_and_flip() {
        let mut s = OpticSurface::new(
            Conic::new(millimeter!(50.0), 0.0).unwrap().into(),
            InteractionModel::Refractive,
        );
        s.set_material_post(Material::constant(1.5).unwrap());
        s.set_thickness(millimeter!(5.0));
        s.set_semi_aperture(Some(millimeter!(10.0)));
        s.scale(2.0).unwrap();
        assert_relative_eq!(s.thickness().value, 0.01);
        assert_relative_eq!(s.semi_aperture().unwrap().value, 0.02);
        assert_relative_eq!(s.shape().radius().unwrap(), 0.1);
        assert!(s.scale(0.0).is_err());
        s.flip();
        assert_relative_eq!(s.shape().radius().unwrap(), -0.1);
        assert_eq!(s.material_pre(), &Material::constant(1.5).unwrap());
        assert_eq!(s.material_post(), &Material::default());
    }
}
