//! Crate-level error types.

use std::fmt;

/// Errors produced by the trajview crate.
#[derive(Debug)]
pub enum TrajviewError {
    /// A periodic box length is zero, negative or not finite. Cyclic
    /// correction is skipped for that axis.
    Configuration {
        /// Axis index (0 = x, 1 = y, 2 = z).
        axis: usize,
        /// The offending box length.
        length: f32,
    },
    /// Fewer than two timesteps; no spline can be built.
    InsufficientData {
        /// Number of timesteps that were available.
        timesteps: usize,
    },
    /// An upload sink failed to create a render-side resource.
    ResourceCreation(String),
    /// Malformed trajectory data.
    Format(String),
    /// Generic I/O failure.
    Io(std::io::Error),
    /// Failed to spawn a background thread.
    ThreadSpawn(std::io::Error),
    /// TOML options parsing/serialization failure.
    OptionsParse(String),
    /// The loader thread is gone.
    LoaderDisconnected,
}

impl fmt::Display for TrajviewError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration { axis, length } => write!(
                f,
                "invalid box length {length} on axis {}",
                axis_name(*axis)
            ),
            Self::InsufficientData { timesteps } => write!(
                f,
                "insufficient data: {timesteps} timestep(s), need at least 2"
            ),
            Self::ResourceCreation(msg) => {
                write!(f, "resource creation error: {msg}")
            }
            Self::Format(msg) => write!(f, "trajectory format error: {msg}"),
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::ThreadSpawn(e) => {
                write!(f, "failed to spawn thread: {e}")
            }
            Self::OptionsParse(msg) => {
                write!(f, "options parse error: {msg}")
            }
            Self::LoaderDisconnected => {
                write!(f, "trajectory loader thread disconnected")
            }
        }
    }
}

impl std::error::Error for TrajviewError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) | Self::ThreadSpawn(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for TrajviewError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

/// Human-readable axis label.
pub(crate) fn axis_name(axis: usize) -> &'static str {
    match axis {
        0 => "x",
        1 => "y",
        2 => "z",
        _ => "?",
    }
}
