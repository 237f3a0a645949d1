//! Error types for dawg-core.

use crate::{ClipId, TrackId};
use thiserror::Error;

/// Error type for dawg-core operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Engine not initialized")]
    NotInitialized,

    #[error("Track not found: {0}")]
    TrackNotFound(TrackId),

    #[error("Clip not found: {0}")]
    ClipNotFound(ClipId),

    #[error("Invalid track type: {0}")]
    InvalidTrackType(String),

    #[error("Parameter '{name}' out of range: {value} (expected {min}..={max})")]
    ParameterOutOfRange {
        name: String,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("Invalid clip data: {0}")]
    InvalidClipData(String),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Unknown parameter: {0}")]
    UnknownParameter(String),

    #[error("Effect error: {0}")]
    Effect(String),
}

impl Error {
    /// Build a [`Error::ParameterOutOfRange`] for `name`.
    pub fn out_of_range(name: impl Into<String>, value: f64, min: f64, max: f64) -> Self {
        Error::ParameterOutOfRange {
            name: name.into(),
            value,
            min,
            max,
        }
    }
}

/// Result type alias.
pub type Result<T> = core::result::Result<T, Error>;

/// Check that `value` lies in `min..=max`, failing with
/// [`Error::ParameterOutOfRange`] otherwise. NaN is always out of range.
pub fn check_range(name: &str, value: f64, min: f64, max: f64) -> Result<()> {
    if value >= min && value <= max {
        Ok(())
    } else {
        Err(Error::out_of_range(name, value, min, max))
    }
}
