//! Error and warning types shared by every horizon computation.

use std::fmt;

/// Precondition violations. Every variant is a caller bug; nothing here is retried.
#[derive(Debug, thiserror::Error, Clone, PartialEq)]
pub enum SvfError {
    #[error("phi must be in [0, 180) degrees, got {0}")]
    PhiOutOfRange(f64),

    #[error("cannot derive a direction from a zero-length vector ({x}, {y}, {z})")]
    ZeroRadius { x: f64, y: f64, z: f64 },

    #[error("rotation axis must be non-zero")]
    ZeroAxis,

    #[error("dip must be in [0, 90] degrees, got {0}")]
    DipOutOfRange(f64),

    #[error("profile needs at least {required} distinct azimuths, got {found}")]
    TooFewAzimuths { required: usize, found: usize },

    #[error("azimuth and elevation lengths differ ({azimuths} vs {elevations})")]
    LengthMismatch { azimuths: usize, elevations: usize },

    #[error("non-finite value in {0}")]
    NonFinite(&'static str),

    #[error("{name} must be positive, got {value}")]
    NonPositive { name: &'static str, value: f64 },

    #[error("{name} must be in [{min}, {max}], got {value}")]
    OutOfRange {
        name: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("{name} must be at least {min}, got {value}")]
    TooSmall {
        name: &'static str,
        value: u32,
        min: u32,
    },

    #[error("sample at azimuth {azimuth} overhangs the zenith (elevation {elevation})")]
    Overhanging { azimuth: f64, elevation: f64 },

    #[error("unknown obscured-band strategy {0:?}, expected \"inject\", \"clamp\" or \"both\"")]
    UnknownStrategy(String),
}

pub type Result<T> = std::result::Result<T, SvfError>;

/// Recoverable geometry issue found while analysing a profile.
///
/// Produced when the ray cast for one sample crosses the horizon ring more
/// than twice. The analysis continues with the farthest crossing.
#[derive(Debug, Clone, PartialEq)]
pub struct GeometryWarning {
    pub index: usize,
    pub azimuth: f64,
    pub crossings: usize,
}

impl fmt::Display for GeometryWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "azimuth {:.3} (sample {}) has {} horizon intersections; the horizon geometry \
             may be overly complex or coarsely digitized",
            self.azimuth, self.index, self.crossings
        )
    }
}

#[cfg(feature = "python")]
impl From<SvfError> for pyo3::PyErr {
    fn from(e: SvfError) -> Self {
        pyo3::exceptions::PyValueError::new_err(e.to_string())
    }
}
