//! Error types for dawg-export

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Format outside the supported set, or its feature is disabled.
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Encoding failed: {0}")]
    Encoding(String),

    /// The mixdown could not be produced (e.g. a realtime-only effect).
    #[error("Render failed: {0}")]
    Render(String),

    /// Job or buffer parameters that cannot be rendered or encoded.
    #[error("Invalid render data: {0}")]
    InvalidData(String),
}

pub type Result<T> = std::result::Result<T, ExportError>;

#[cfg(feature = "wav")]
impl From<hound::Error> for ExportError {
    fn from(e: hound::Error) -> Self {
        match e {
            hound::Error::IoError(io) => ExportError::Io(io),
            other => ExportError::Encoding(other.to_string()),
        }
    }
}

/// Effect failures during an offline pass surface as render errors.
impl From<dawg_core::Error> for ExportError {
    fn from(e: dawg_core::Error) -> Self {
        ExportError::Render(e.to_string())
    }
}
