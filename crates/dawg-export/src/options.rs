//! Export options.

use crate::error::{ExportError, Result};
use std::path::Path;

/// Audio format. The set is closed; new formats are added here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AudioFormat {
    #[default]
    Wav,
}

impl AudioFormat {
    /// File extension (without dot).
    pub fn extension(&self) -> &'static str {
        match self {
            AudioFormat::Wav => "wav",
        }
    }

    /// Pick the format from a path's extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("wav") | Some("wave") => Ok(AudioFormat::Wav),
            Some(other) => Err(ExportError::UnsupportedFormat(other.to_string())),
            None => Err(ExportError::UnsupportedFormat(format!(
                "no extension on {}",
                path.display()
            ))),
        }
    }
}

/// Bit depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BitDepth {
    Int16,
    #[default]
    Int24,
    Float32,
}

impl BitDepth {
    /// Bits per sample.
    pub fn bits(&self) -> u16 {
        match self {
            BitDepth::Int16 => 16,
            BitDepth::Int24 => 24,
            BitDepth::Float32 => 32,
        }
    }
}

/// Export options.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ExportOptions {
    pub format: AudioFormat,
    pub bit_depth: BitDepth,
    /// Downmix to mono.
    pub mono: bool,
}

impl ExportOptions {
    pub fn wav(bit_depth: BitDepth) -> Self {
        Self {
            format: AudioFormat::Wav,
            bit_depth,
            mono: false,
        }
    }

    pub fn with_mono(mut self, mono: bool) -> Self {
        self.mono = mono;
        self
    }
}
