//! sphproj - spherical video projection library
//!
//! Maps 360-degree video between sphere projections (equirectangular, equal-area,
//! Craster parabolic, cube map, octahedron, icosahedron, viewport), with sphere-aware
//! padding, fixed-point resampling and frame packing.

// Configuration and shared types
pub mod config;
pub mod error;
pub mod frame;

// Sampling primitives
pub mod chroma;
pub mod face_buffer;
pub mod filters;

// Projections and the conversion engine
pub mod engine;
pub mod geometry;

// Probe front-end
pub mod cli;
pub mod sample_points;

pub use config::{
    ChromaFormat, CompactVariant, FaceSlot, FramePackStruct, GeometryType, InterpolationKind,
    InterpolationParams, ProbeConfig, Rotation, VideoDescriptor, ViewportParams,
};
pub use engine::{Geometry, SamplePosition};
pub use error::{ErrorKind, GeoError, GeoResult};
pub use frame::{Plane, RasterFrame};
pub use geometry::{GeometryKind, Position, Projection};
pub use sample_points::{load_sample_points, parse_sample_points, SpherePoint};
