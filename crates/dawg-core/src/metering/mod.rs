//! Level metering and analysis taps.
//!
//! - [`AtomicAmplitude`]: lock-free per-track peak/RMS published by the audio path
//! - [`LevelMeter`]: master meter with peak hold, decay and clip detection
//! - [`AnalyzerTap`]: waveform and spectrum snapshots of the master output

mod amplitude;
mod analyzer;
mod meter;

pub use amplitude::{block_levels, AtomicAmplitude, TrackLevel};
pub use analyzer::{AnalyzerTap, FFT_SIZE, MIN_DB, SPECTRUM_BINS, WAVEFORM_SIZE};
pub use meter::{
    ClipDetector, LevelMeter, MasterLevel, PeakHold, CLIP_DEBOUNCE_SECONDS, CLIP_THRESHOLD,
    PEAK_DECAY, PEAK_HOLD_SECONDS,
};
