//! Builder for configuring and constructing an `AudioEngine`.

use crate::midi::MidiManager;
use crate::{AudioEngine, Result};
use dawg_core::{AudioSession, EngineConfig, HeadlessSession, LatencyHint, RenderConfig};
use dawg_sampler::{DeviceFactory, FileSampleLoader, SampleLoader};
use std::sync::Arc;

/// Configuration is fixed once [`build`](Self::build) returns.
///
/// Without an explicit session the engine runs headless at the configured
/// sample rate. Recording needs a device factory; MIDI tracks need a
/// [`MidiManager`].
///
/// # Example
///
/// ```
/// use dawg::prelude::*;
///
/// let engine = AudioEngine::builder()
///     .sample_rate(48000.0)
///     .latency(LatencyHint::Interactive)
///     .limiter_ceiling(-0.3)
///     .build()?;
///
/// assert_eq!(engine.block_size(), 128);
/// # Ok::<(), dawg::Error>(())
/// ```
#[derive(Default)]
pub struct EngineBuilder {
    config: EngineConfig,
    session: Option<Box<dyn AudioSession>>,
    devices: Option<DeviceFactory>,
    midi: Option<Box<dyn MidiManager>>,
    loader: Option<Arc<dyn SampleLoader>>,
}

impl EngineBuilder {
    /// Start from a complete config, e.g. one deserialized from disk.
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Default: 44100
    pub fn sample_rate(mut self, sample_rate: f64) -> Self {
        self.config.sample_rate = sample_rate;
        self
    }

    pub fn latency(mut self, latency: LatencyHint) -> Self {
        self.config.latency = latency;
        self
    }

    /// Overrides the block size implied by the latency class.
    pub fn max_block_size(mut self, frames: usize) -> Self {
        self.config.max_block_size = Some(frames);
        self
    }

    /// Default: 32
    pub fn buffer_pool_size(mut self, size: usize) -> Self {
        self.config.buffer_pool_size = size;
        self
    }

    /// Master limiter ceiling in dBFS. Default: -1.0
    pub fn limiter_ceiling(mut self, ceiling_db: f32) -> Self {
        self.config.limiter_ceiling_db = ceiling_db;
        self
    }

    pub fn render_config(mut self, render: RenderConfig) -> Self {
        self.config.render = render;
        self
    }

    /// Whether the offline mixdown synthesizes a tone for empty audio tracks.
    pub fn fallback_tone(mut self, enabled: bool) -> Self {
        self.config.render.fallback_tone = enabled;
        self
    }

    pub fn render_seed(mut self, seed: u64) -> Self {
        self.config.render.seed = seed;
        self
    }

    /// Its sample rate must match the configured one.
    pub fn session(mut self, session: impl AudioSession + 'static) -> Self {
        self.session = Some(Box::new(session));
        self
    }

    pub fn recording_devices(mut self, factory: DeviceFactory) -> Self {
        self.devices = Some(factory);
        self
    }

    pub fn midi_manager(mut self, manager: impl MidiManager + 'static) -> Self {
        self.midi = Some(Box::new(manager));
        self
    }

    /// Default: [`FileSampleLoader`]
    pub fn sample_loader(mut self, loader: impl SampleLoader + 'static) -> Self {
        self.loader = Some(Arc::new(loader));
        self
    }

    pub fn build(self) -> Result<AudioEngine> {
        self.config.validate()?;
        let sample_rate = self.config.sample_rate;

        let session = match self.session {
            Some(session) if session.sample_rate() != sample_rate => {
                return Err(dawg_core::Error::InvalidConfig(format!(
                    "session runs at {} Hz, engine configured for {} Hz",
                    session.sample_rate(),
                    sample_rate
                ))
                .into());
            }
            Some(session) => session,
            None => Box::new(HeadlessSession::new(sample_rate)),
        };
        let loader = self
            .loader
            .unwrap_or_else(|| Arc::new(FileSampleLoader::new()));

        AudioEngine::from_parts(self.config, session, self.devices, self.midi, loader)
    }
}
