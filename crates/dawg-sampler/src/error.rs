//! Error types.

use thiserror::Error;

/// Error type.
#[derive(Error, Debug)]
pub enum Error {
    /// `start` while a recording is already running.
    #[error("Already recording")]
    AlreadyRecording,

    /// `stop` without a running recording.
    #[error("Not recording")]
    NotRecording,

    /// The user or platform refused microphone access.
    #[error("Recording device access denied: {0}")]
    DeviceAccessDenied(String),

    #[error("Recording device unavailable: {0}")]
    DeviceUnavailable(String),

    /// The payload could not be turned into samples.
    #[error("Decode error: {0}")]
    Decode(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Hound error: {0}")]
    Hound(#[from] hound::Error),

    #[error(transparent)]
    Core(#[from] dawg_core::Error),
}

/// Result type.
pub type Result<T> = std::result::Result<T, Error>;
