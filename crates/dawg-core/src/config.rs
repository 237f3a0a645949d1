//! Engine configuration.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Target latency class for the audio session.
///
/// Maps to the block size used when none is given explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LatencyHint {
    Interactive,
    #[default]
    Balanced,
    Playback,
}

impl LatencyHint {
    pub fn block_size(self) -> usize {
        match self {
            LatencyHint::Interactive => 128,
            LatencyHint::Balanced => 512,
            LatencyHint::Playback => 2048,
        }
    }
}

/// Offline-render behavior.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Synthesize a test tone for audio tracks without clips.
    pub fallback_tone: bool,
    /// Seed for the fallback tone frequency.
    pub seed: u64,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            fallback_tone: true,
            seed: 0x00da_3a11,
        }
    }
}

/// Configuration for the audio engine. Fixed once the engine is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub sample_rate: f64,
    pub latency: LatencyHint,
    /// Largest block `process_block` handles in one pass. Defaults to the
    /// latency class block size.
    pub max_block_size: Option<usize>,
    pub buffer_pool_size: usize,
    pub limiter_ceiling_db: f32,
    pub render: RenderConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44100.0,
            latency: LatencyHint::default(),
            max_block_size: None,
            buffer_pool_size: 32,
            limiter_ceiling_db: -1.0,
            render: RenderConfig::default(),
        }
    }
}

impl EngineConfig {
    pub fn block_size(&self) -> usize {
        self.max_block_size
            .unwrap_or_else(|| self.latency.block_size())
    }

    pub fn validate(&self) -> Result<()> {
        if !(8000.0..=384000.0).contains(&self.sample_rate) {
            return Err(Error::InvalidConfig(format!(
                "sample_rate {} out of range (8000-384000 Hz)",
                self.sample_rate
            )));
        }
        let block = self.block_size();
        if block == 0 || block > 16384 {
            return Err(Error::InvalidConfig(format!(
                "max_block_size {} out of range (1-16384)",
                block
            )));
        }
        if self.buffer_pool_size == 0 {
            return Err(Error::InvalidConfig(
                "buffer_pool_size must be at least 1".into(),
            ));
        }
        if !(self.limiter_ceiling_db <= 0.0 && self.limiter_ceiling_db >= -60.0) {
            return Err(Error::InvalidConfig(format!(
                "limiter_ceiling_db {} out of range (-60-0 dB)",
                self.limiter_ceiling_db
            )));
        }
        Ok(())
    }
}
