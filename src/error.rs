//! Centralized error type for the dawg umbrella crate.
//!
//! Wraps all subsystem errors so `?` propagates naturally across crate boundaries.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Core(#[from] dawg_core::Error),

    #[error("DSP: {0}")]
    Dsp(#[from] dawg_dsp::Error),

    #[error("Sampler: {0}")]
    Sampler(#[from] dawg_sampler::Error),

    #[error("Export: {0}")]
    Export(#[from] dawg_export::ExportError),

    #[error("MIDI: {0}")]
    Midi(String),

    #[error("No MIDI manager configured")]
    MidiUnavailable,

    #[error("Serialization: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// The core error behind this one, if any.
    pub fn as_core(&self) -> Option<&dawg_core::Error> {
        match self {
            Error::Core(e) => Some(e),
            Error::Dsp(dawg_dsp::Error::Core(e)) => Some(e),
            Error::Sampler(dawg_sampler::Error::Core(e)) => Some(e),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
