//! Error type shared by every geometry operation.
//!
//! Configuration problems, raster size mismatches and allocation failures are
//! reported before any pixel is touched, so a failed call never leaves a face
//! buffer half written.

use std::fmt;

/// Coarse error category, for callers that only need to branch on the kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    UnsupportedConfiguration,
    DimensionMismatch,
    Allocation,
    MalformedInput,
    Io,
}

/// Geometry engine errors
#[derive(Debug)]
pub enum GeoError {
    /// Geometry / chroma format / filter combination the engine cannot run
    UnsupportedConfiguration(String),
    /// Raster or plane size inconsistent with the face layout
    DimensionMismatch {
        what: String,
        expected: (usize, usize),
        actual: (usize, usize),
    },
    /// Face buffer or weight map allocation failed
    Allocation { bytes: usize },
    /// Bad line in an external text file (sample points)
    MalformedInput { line: usize, reason: String },
    Io(std::io::Error),
    Json(serde_json::Error),
}

pub type GeoResult<T> = Result<T, GeoError>;

impl GeoError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GeoError::UnsupportedConfiguration(_) | GeoError::Json(_) => {
                ErrorKind::UnsupportedConfiguration
            }
            GeoError::DimensionMismatch { .. } => ErrorKind::DimensionMismatch,
            GeoError::Allocation { .. } => ErrorKind::Allocation,
            GeoError::MalformedInput { .. } => ErrorKind::MalformedInput,
            GeoError::Io(_) => ErrorKind::Io,
        }
    }

    pub(crate) fn unsupported(msg: impl Into<String>) -> Self {
        GeoError::UnsupportedConfiguration(msg.into())
    }

    pub(crate) fn mismatch(
        what: impl Into<String>,
        expected: (usize, usize),
        actual: (usize, usize),
    ) -> Self {
        GeoError::DimensionMismatch {
            what: what.into(),
            expected,
            actual,
        }
    }
}

impl fmt::Display for GeoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GeoError::UnsupportedConfiguration(e) => write!(f, "Unsupported configuration: {}", e),
            GeoError::DimensionMismatch {
                what,
                expected,
                actual,
            } => write!(
                f,
                "Dimension mismatch for {}: expected {}x{}, got {}x{}",
                what, expected.0, expected.1, actual.0, actual.1
            ),
            GeoError::Allocation { bytes } => write!(f, "Failed to allocate {} bytes", bytes),
            GeoError::MalformedInput { line, reason } => {
                write!(f, "Malformed input at line {}: {}", line, reason)
            }
            GeoError::Io(e) => write!(f, "I/O error: {}", e),
            GeoError::Json(e) => write!(f, "Config error: {}", e),
        }
    }
}

impl std::error::Error for GeoError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GeoError::Io(e) => Some(e),
            GeoError::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for GeoError {
    fn from(e: std::io::Error) -> Self {
        GeoError::Io(e)
    }
}

impl From<serde_json::Error> for GeoError {
    fn from(e: serde_json::Error) -> Self {
        GeoError::Json(e)
    }
}

/// Allocate a zero-filled vector, reporting allocation failure instead of aborting.
pub(crate) fn try_alloc<T: Copy + Default>(len: usize) -> GeoResult<Vec<T>> {
    let mut v = Vec::new();
    v.try_reserve_exact(len).map_err(|_| GeoError::Allocation {
        bytes: len.saturating_mul(std::mem::size_of::<T>()),
    })?;
    v.resize(len, T::default());
    Ok(v)
}
