#![warn(missing_docs)]
//! seqtrace specific error structures
use std::{error::Error, fmt::Display};

/// seqtrace specific Result type
pub type TraceResult<T> = std::result::Result<T, TraceError>;

/// Errors that can be returned by various seqtrace functions.
///
/// These are configuration or structural errors only. Failures of individual rays (missed apertures,
/// total internal reflection, non-converging intersections) are never reported as errors but encoded
/// in the intensity channel of a [`RayBatch`](crate::rays::RayBatch).
#[derive(Debug, PartialEq, Eq)]
pub enum TraceError {
    /// error while setting up a coordinate [`Frame`](crate::frame::Frame)
    Frame(String),
    /// invalid parameters of a geometric surface shape
    Shape(String),
    /// errors while evaluating or constructing an optical material
    Material(String),
    /// invalid aperture configuration
    Aperture(String),
    /// errors while setting up or tracing a single optical surface
    Surface(String),
    /// structural errors of a [`SurfaceStack`](crate::surface_stack::SurfaceStack) (stop surface, material chain, indices)
    Stack(String),
    /// errors in connection with the trace configuration
    Config(String),
    /// errors console io
    Console(String),
    /// errors not falling in one of the categories above
    Other(String),
}

impl Display for TraceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Frame(m) => {
                write!(f, "Frame:{m}")
            }
            Self::Shape(m) => {
                write!(f, "Shape:{m}")
            }
            Self::Material(m) => {
                write!(f, "Material:{m}")
            }
            Self::Aperture(m) => {
                write!(f, "Aperture:{m}")
            }
            Self::Surface(m) => {
                write!(f, "Surface:{m}")
            }
            Self::Stack(m) => {
                write!(f, "Stack:{m}")
            }
            Self::Config(m) => {
                write!(f, "Config:{m}")
            }
            Self::Console(m) => {
                write!(f, "Console:{m}")
            }
            Self::Other(m) => write!(f, "seqtrace Error:Other:{m}"),
        }
    }
}
impl Error for TraceError {}

impl std::convert::From<String> for TraceError {
    fn from(msg: String) -> Self {
        Self::Other(msg)
    }
}
