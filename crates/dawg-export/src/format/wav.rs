//! WAV format encoder using hound
//!
//! Supports 16-bit, 24-bit, and 32-bit float WAV files.

use crate::error::{ExportError, Result};
use crate::options::{BitDepth, ExportOptions};
use dawg_core::AudioBuffer;
use hound::{SampleFormat, WavSpec, WavWriter};
use std::io::{Seek, Write};
use std::path::Path;

/// WAV encoder configuration
#[derive(Debug, Clone)]
pub struct WavConfig {
    pub sample_rate: u32,
    pub bit_depth: BitDepth,
    /// Downmix every channel to one.
    pub mono: bool,
}

impl WavConfig {
    pub fn new(sample_rate: u32, bit_depth: BitDepth) -> Self {
        Self {
            sample_rate,
            bit_depth,
            mono: false,
        }
    }

    /// Config for writing `buffer` with `options`.
    pub fn for_buffer(buffer: &AudioBuffer, options: &ExportOptions) -> Self {
        Self {
            sample_rate: buffer.sample_rate().round() as u32,
            bit_depth: options.bit_depth,
            mono: options.mono,
        }
    }
}

/// Encode a buffer to WAV bytes in memory.
pub fn encode_wav_memory(buffer: &AudioBuffer, config: &WavConfig) -> Result<Vec<u8>> {
    let frames = frames_of(buffer, config)?;
    let spec = create_wav_spec(config, frames.channels);

    let mut bytes = Vec::new();
    {
        let cursor = std::io::Cursor::new(&mut bytes);
        let mut writer = WavWriter::new(cursor, spec)?;
        write_samples(&mut writer, &frames.samples, config.bit_depth)?;
        writer.finalize()?;
    }
    Ok(bytes)
}

/// Encode a buffer to a WAV file.
pub fn encode_wav_file(buffer: &AudioBuffer, path: &Path, config: &WavConfig) -> Result<()> {
    let frames = frames_of(buffer, config)?;
    let spec = create_wav_spec(config, frames.channels);

    let mut writer = WavWriter::create(path, spec)?;
    write_samples(&mut writer, &frames.samples, config.bit_depth)?;
    writer.finalize()?;
    Ok(())
}

struct Interleaved {
    samples: Vec<f32>,
    channels: u16,
}

fn frames_of(buffer: &AudioBuffer, config: &WavConfig) -> Result<Interleaved> {
    let channels = buffer.channel_count();
    if channels == 0 {
        return Err(ExportError::InvalidData("buffer has no channels".into()));
    }
    if config.sample_rate == 0 {
        return Err(ExportError::InvalidData("sample rate must be positive".into()));
    }

    if config.mono && channels > 1 {
        let scale = 1.0 / channels as f32;
        let samples = (0..buffer.len())
            .map(|i| buffer.channels().iter().map(|ch| ch[i]).sum::<f32>() * scale)
            .collect();
        return Ok(Interleaved {
            samples,
            channels: 1,
        });
    }

    Ok(Interleaved {
        samples: buffer.to_interleaved(),
        channels: channels as u16,
    })
}

fn create_wav_spec(config: &WavConfig, channels: u16) -> WavSpec {
    let sample_format = match config.bit_depth {
        BitDepth::Float32 => SampleFormat::Float,
        _ => SampleFormat::Int,
    };

    WavSpec {
        channels,
        sample_rate: config.sample_rate,
        bits_per_sample: config.bit_depth.bits(),
        sample_format,
    }
}

fn write_samples<W: Write + Seek>(
    writer: &mut WavWriter<W>,
    samples: &[f32],
    bit_depth: BitDepth,
) -> Result<()> {
    match bit_depth {
        BitDepth::Int16 => {
            for &s in samples {
                writer.write_sample(float_to_i16(s))?;
            }
        }
        BitDepth::Int24 => {
            for &s in samples {
                writer.write_sample(float_to_i24(s))?;
            }
        }
        BitDepth::Float32 => {
            for &s in samples {
                writer.write_sample(s)?;
            }
        }
    }
    Ok(())
}

/// Convert float sample to 16-bit integer with clipping
#[inline]
fn float_to_i16(sample: f32) -> i16 {
    let clamped = sample.clamp(-1.0, 1.0);
    (clamped * 32767.0) as i16
}

/// Convert float sample to 24-bit integer (stored as i32) with clipping
#[inline]
fn float_to_i24(sample: f32) -> i32 {
    let clamped = sample.clamp(-1.0, 1.0);
    (clamped * 8388607.0) as i32
}
