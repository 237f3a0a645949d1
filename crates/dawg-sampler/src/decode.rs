//! WAV payload decoding and encoding.

use crate::{Error, Result};
use dawg_core::AudioBuffer;
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use std::io::Cursor;

/// Decode a WAV byte payload into a planar buffer.
pub fn decode_wav(bytes: &[u8]) -> Result<AudioBuffer> {
    if bytes.is_empty() {
        return Err(Error::Decode("empty payload".into()));
    }
    let mut reader =
        WavReader::new(Cursor::new(bytes)).map_err(|e| Error::Decode(e.to_string()))?;
    let spec = reader.spec();
    let channels = spec.channels as usize;
    if channels == 0 {
        return Err(Error::Decode("no channels".into()));
    }

    let interleaved: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<std::result::Result<_, _>>()?,
        SampleFormat::Int => {
            let scale = 1.0 / (1u64 << (spec.bits_per_sample.saturating_sub(1))) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 * scale))
                .collect::<std::result::Result<_, _>>()?
        }
    };

    if interleaved.is_empty() {
        return Err(Error::Decode("payload contains no samples".into()));
    }

    tracing::debug!(
        channels,
        sample_rate = spec.sample_rate,
        frames = interleaved.len() / channels,
        "decoded wav payload"
    );
    Ok(AudioBuffer::from_interleaved(
        &interleaved,
        channels,
        spec.sample_rate as f64,
    )?)
}

/// Encode a buffer as 32-bit float WAV bytes.
pub fn encode_wav(buffer: &AudioBuffer) -> Result<Vec<u8>> {
    let spec = WavSpec {
        channels: buffer.channel_count() as u16,
        sample_rate: buffer.sample_rate() as u32,
        bits_per_sample: 32,
        sample_format: SampleFormat::Float,
    };

    let mut bytes = Vec::new();
    {
        let mut writer = WavWriter::new(Cursor::new(&mut bytes), spec)?;
        for sample in buffer.to_interleaved() {
            writer.write_sample(sample)?;
        }
        writer.finalize()?;
    }
    Ok(bytes)
}
