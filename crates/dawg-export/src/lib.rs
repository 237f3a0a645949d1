//! # dawg-export
//!
//! Offline mixdown and export for the dawg engine.
//!
//! - **Rendering**: [`OfflineRenderer`] turns a [`RenderJob`] snapshot into a
//!   stereo [`AudioBuffer`](dawg_core::AudioBuffer), deterministically
//! - **Format encoding**: WAV via hound
//!
//! ```
//! use dawg_export::{OfflineRenderer, RenderJob, RenderTrack};
//!
//! let job = RenderJob::new(48000.0, 1.0).with_track(RenderTrack::audio("tone"));
//! let result = OfflineRenderer::default().render(&job)?;
//! assert_eq!(result.length_samples(), 3 * 48000);
//! # Ok::<(), dawg_export::ExportError>(())
//! ```
//!
//! ## Feature Flags
//!
//! - `wav` (default): WAV export via hound (pure Rust)

pub mod error;
mod options;
mod renderer;
mod types;

pub mod format;

pub use error::{ExportError, Result};
pub use options::{AudioFormat, BitDepth, ExportOptions};
pub use renderer::{
    baseline_gain, master_gain, OfflineRenderer, RenderProgressCallback,
    RenderResult, DEFAULT_RENDER_BLOCK, FALLBACK_TONE_FADE, FALLBACK_TONE_HZ,
    FALLBACK_TONE_SPREAD_HZ, LIVENESS_AMPLITUDE,
};
pub use types::{RenderJob, RenderSend, RenderTrack, DEFAULT_TAIL_SECONDS};

use dawg_core::AudioBuffer;
use std::path::Path;

/// Encode a rendered buffer in the format selected by `options`.
#[allow(unused_variables)]
pub fn encode(buffer: &AudioBuffer, options: &ExportOptions) -> Result<Vec<u8>> {
    match options.format {
        AudioFormat::Wav => {
            #[cfg(feature = "wav")]
            return format::wav::encode_wav_memory(
                buffer,
                &format::wav::WavConfig::for_buffer(buffer, options),
            );
            #[cfg(not(feature = "wav"))]
            return Err(ExportError::UnsupportedFormat(
                "WAV support not enabled".into(),
            ));
        }
    }
}

/// Write a rendered buffer to `path`. The path's extension must match
/// `options.format`.
#[allow(unused_variables)]
pub fn export_to_file(path: &Path, buffer: &AudioBuffer, options: &ExportOptions) -> Result<()> {
    let detected = AudioFormat::from_path(path)?;
    if detected != options.format {
        return Err(ExportError::UnsupportedFormat(format!(
            "{} does not match requested format .{}",
            path.display(),
            options.format.extension()
        )));
    }

    match options.format {
        AudioFormat::Wav => {
            #[cfg(feature = "wav")]
            return format::wav::encode_wav_file(
                buffer,
                path,
                &format::wav::WavConfig::for_buffer(buffer, options),
            );
            #[cfg(not(feature = "wav"))]
            return Err(ExportError::UnsupportedFormat(
                "WAV support not enabled".into(),
            ));
        }
    }
}
