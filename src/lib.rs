//! This is the documentation for the **seqtrace** software package, a kernel for sequential geometric ray
//! tracing through optical systems.
//!
//! An optical system is modelled as a [`SurfaceStack`](surface_stack::SurfaceStack): an ordered list of
//! [`OpticSurface`](surface::OpticSurface)s, each with its own [`Frame`](frame::Frame), shape, aperture, coating
//! and media on both sides. A [`RayBatch`](rays::RayBatch) is traced through the stack surface after surface. The
//! state of all rays at every surface is stored in a [`TraceHistory`](trace_history::TraceHistory).
//!
//! Ray failures (missed surfaces, vignetting, total internal reflection, evanescent diffraction orders) never
//! abort a trace. Such rays are marked invalid by setting their intensity to zero.
#![allow(clippy::module_name_repetitions)]

pub mod aperture;
pub mod coatings;
pub mod config;
pub mod console;
pub mod environment;
pub mod error;
pub mod frame;
pub mod interaction;
pub mod material;
pub mod position_distributions;
pub mod rays;
pub mod surface;
pub mod surface_stack;
pub mod trace_history;
pub mod utils;

pub use surface_stack::SurfaceStack;
pub use trace_history::TraceHistory;
