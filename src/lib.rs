//! # dawg - Multi-track Audio Engine
//!
//! Tracks, clip timelines, effect routing and a deterministic offline mixdown.
//!
//! ## Architecture
//!
//! dawg is an umbrella crate that coordinates:
//! - **dawg-core** - Buffers, buffer pool, clips, scheduler, transport, metering
//! - **dawg-dsp** - Built-in effects (gain, compressor, limiter, delay)
//! - **dawg-sampler** - Recording state machine, sample loading
//! - **dawg-export** - Offline rendering and WAV export
//!
//! ## Quick Start
//!
//! ```
//! use dawg::prelude::*;
//! use std::sync::Arc;
//!
//! let mut engine = AudioEngine::builder().sample_rate(48000.0).build()?;
//!
//! let drums = engine.add_track(TrackConfig::audio("Drums").volume_db(-3.0))?;
//! let reverb = engine.add_track(TrackConfig::aux("Reverb"))?;
//! engine.send(drums, reverb, 0.3)?;
//!
//! let hit = Arc::new(AudioBuffer::constant(0.5, 4800, 48000.0));
//! engine.add_clip(drums, ClipSpec::new(hit).start_time(1.0))?;
//!
//! engine.play()?;
//! let mut block = vec![0.0f32; 2 * engine.block_size()];
//! engine.process_block(&mut block)?;
//!
//! let mixdown = engine.render(2.0)?;
//! assert_eq!(mixdown.duration_seconds(), 4.0);
//! # Ok::<(), dawg::Error>(())
//! ```
//!
//! ## Feature Flags
//!
//! - `wav` (default) - WAV export via hound

/// Re-export of dawg-core for direct access
pub use dawg_core as core;

/// Built-in effects
pub use dawg_dsp as dsp;

/// Recording and sample loading
pub use dawg_sampler as sampler;

/// Offline rendering and export
pub use dawg_export as export;

pub use dawg_core::{
    AudioBuffer, BufferPool, Clip, ClipId, ClipSpec, Effect, EffectCapability, EngineConfig,
    EngineEvent, LatencyHint, MasterLevel, PoolStats, RenderConfig, TimeSignature, TrackId,
    TrackKind, TrackLevel, TransportState,
};
pub use dawg_export::{AudioFormat, BitDepth, ExportOptions, RenderResult};

mod builder;
mod engine;
mod error;
mod master;
pub mod midi;
pub mod snapshot;
mod track;

pub use builder::EngineBuilder;
pub use engine::AudioEngine;
pub use error::{Error, Result};
pub use master::MasterBus;
pub use midi::{MidiClip, MidiManager, MidiNote};
pub use snapshot::{ClipSnapshot, EffectSnapshot, ProjectSnapshot, TrackSnapshot};
pub use track::{ChannelControls, Track, TrackConfig, MAX_VOLUME_DB, MIN_VOLUME_DB};

/// Convenience prelude for common imports
pub mod prelude {
    // Main engine
    pub use crate::{AudioEngine, EngineBuilder, Error, Result};

    // Tracks and clips
    pub use crate::{AudioBuffer, ClipId, ClipSpec, TrackConfig, TrackId, TrackKind};

    // Effects
    pub use crate::dsp::{Compressor, Delay, Gain, Limiter};
    pub use crate::Effect;

    // Transport and config
    pub use crate::{LatencyHint, TransportState};

    // Export
    pub use crate::{AudioFormat, BitDepth, ExportOptions};

    // MIDI
    pub use crate::{MidiClip, MidiManager, MidiNote};
}
