//! Multichannel sample buffers.

use crate::{BufferId, Error, Result};
use serde::{Deserialize, Serialize};

/// Largest channel count a buffer may carry.
pub const MAX_CHANNELS: usize = 32;

/// Planar (non-interleaved) multichannel f32 buffer.
///
/// Clips share buffers through `Arc<AudioBuffer>`; the samples are freed once
/// the last clip, pool entry or render job referencing them is dropped.
#[derive(Debug)]
pub struct AudioBuffer {
    id: BufferId,
    sample_rate: f64,
    channels: Vec<Vec<f32>>,
    reuse_count: u32,
}

/// Buffer metadata as exposed in serialized clips.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BufferInfo {
    pub duration: f64,
    pub number_of_channels: usize,
    pub sample_rate: f64,
}

impl AudioBuffer {
    /// Allocate a zeroed buffer.
    pub fn new(channels: usize, length: usize, sample_rate: f64) -> Self {
        Self {
            id: BufferId::next(),
            sample_rate,
            channels: (0..channels).map(|_| vec![0.0; length]).collect(),
            reuse_count: 0,
        }
    }

    /// Wrap existing planar channel data. All channels must share one length.
    pub fn from_channels(channels: Vec<Vec<f32>>, sample_rate: f64) -> Result<Self> {
        if channels.is_empty() || channels.len() > MAX_CHANNELS {
            return Err(Error::out_of_range(
                "channels",
                channels.len() as f64,
                1.0,
                MAX_CHANNELS as f64,
            ));
        }
        let length = channels[0].len();
        if channels.iter().any(|c| c.len() != length) {
            return Err(Error::InvalidConfig(
                "all channels must have the same length".into(),
            ));
        }
        if !(sample_rate > 0.0) {
            return Err(Error::out_of_range("sample_rate", sample_rate, 1.0, f64::MAX));
        }
        Ok(Self {
            id: BufferId::next(),
            sample_rate,
            channels,
            reuse_count: 0,
        })
    }

    /// Build a buffer from interleaved samples.
    pub fn from_interleaved(samples: &[f32], channels: usize, sample_rate: f64) -> Result<Self> {
        if channels == 0 || channels > MAX_CHANNELS {
            return Err(Error::out_of_range(
                "channels",
                channels as f64,
                1.0,
                MAX_CHANNELS as f64,
            ));
        }
        let frames = samples.len() / channels;
        let mut planar: Vec<Vec<f32>> = (0..channels).map(|_| Vec::with_capacity(frames)).collect();
        for frame in samples.chunks_exact(channels) {
            for (ch, sample) in frame.iter().enumerate() {
                planar[ch].push(*sample);
            }
        }
        Self::from_channels(planar, sample_rate)
    }

    /// Mono buffer filled with a constant value.
    pub fn constant(value: f32, length: usize, sample_rate: f64) -> Self {
        Self {
            id: BufferId::next(),
            sample_rate,
            channels: vec![vec![value; length]],
            reuse_count: 0,
        }
    }

    pub fn id(&self) -> BufferId {
        self.id
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    pub(crate) fn set_sample_rate(&mut self, sample_rate: f64) {
        self.sample_rate = sample_rate;
    }

    /// How many times the pool has handed this allocation out again.
    pub fn reuse_count(&self) -> u32 {
        self.reuse_count
    }

    pub(crate) fn mark_reused(&mut self) {
        self.reuse_count += 1;
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Length in frames.
    pub fn len(&self) -> usize {
        self.channels.first().map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Duration in seconds.
    pub fn duration(&self) -> f64 {
        self.len() as f64 / self.sample_rate
    }

    pub fn info(&self) -> BufferInfo {
        BufferInfo {
            duration: self.duration(),
            number_of_channels: self.channel_count(),
            sample_rate: self.sample_rate,
        }
    }

    pub fn channel(&self, index: usize) -> &[f32] {
        &self.channels[index]
    }

    pub fn channel_mut(&mut self, index: usize) -> &mut [f32] {
        &mut self.channels[index]
    }

    pub fn channels(&self) -> &[Vec<f32>] {
        &self.channels
    }

    /// Mutable left/right views of the first two channels. `None` for mono.
    pub fn stereo_mut(&mut self) -> Option<(&mut [f32], &mut [f32])> {
        match self.channels.as_mut_slice() {
            [left, right, ..] => Some((left.as_mut_slice(), right.as_mut_slice())),
            _ => None,
        }
    }

    /// Zero every channel.
    pub fn clear(&mut self) {
        for channel in &mut self.channels {
            channel.fill(0.0);
        }
    }

    /// Largest absolute sample across all channels.
    pub fn peak(&self) -> f32 {
        self.channels
            .iter()
            .flat_map(|c| c.iter())
            .fold(0.0f32, |acc, s| acc.max(s.abs()))
    }

    /// Linearly interpolated read at a fractional frame position.
    /// Positions outside the buffer read as silence.
    #[inline]
    pub fn sample_at(&self, channel: usize, position: f64) -> f32 {
        let data = &self.channels[channel];
        if position < 0.0 {
            return 0.0;
        }
        let index = position as usize;
        if index >= data.len() {
            return 0.0;
        }
        let frac = (position - index as f64) as f32;
        let a = data[index];
        if frac == 0.0 {
            return a;
        }
        let b = data.get(index + 1).copied().unwrap_or(0.0);
        a + (b - a) * frac
    }

    /// Interleave all channels `[c0, c1, .., c0, c1, ..]`.
    pub fn to_interleaved(&self) -> Vec<f32> {
        let channels = self.channel_count();
        let mut out = Vec::with_capacity(self.len() * channels);
        for frame in 0..self.len() {
            for channel in &self.channels {
                out.push(channel[frame]);
            }
        }
        out
    }

    /// Compare sample data (not identity).
    pub fn samples_eq(&self, other: &AudioBuffer) -> bool {
        self.channels == other.channels && self.sample_rate == other.sample_rate
    }
}

impl Clone for AudioBuffer {
    /// A clone is a new allocation and gets its own id.
    fn clone(&self) -> Self {
        Self {
            id: BufferId::next(),
            sample_rate: self.sample_rate,
            channels: self.channels.clone(),
            reuse_count: 0,
        }
    }
}
