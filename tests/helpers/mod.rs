//! Test helpers and fixtures for dawg integration tests
//!
//! Engines run headless: tests drive `process_block` by hand, so every
//! block is deterministic and no audio device is needed.
//!
//! ## Tolerance Levels
//!
//! Use the appropriate tolerance from [`tolerances`] module:
//! - `FLOAT_EPSILON` (1e-6): Exact operations (passthrough, unity gain)
//! - `DSP_EPSILON` (1e-4): DSP processing (gain chains, pan law)
//! - `PERCEPTUAL_EPSILON` (0.001): Perceptual equivalence (-60dB)
//! - `SILENCE_THRESHOLD` (0.0001): Silence detection (-80dB)

#![allow(dead_code)]


use dawg::midi::{MidiClip, MidiManager};
use dawg::prelude::*;
use dawg::sampler::{BufferDevice, DeviceFactory, RecordingDevice};
use std::sync::{Arc, Mutex};

/// Default test sample rate (matches common hardware)
pub const TEST_SAMPLE_RATE: f64 = 48000.0;

/// Standard block size for deterministic testing
pub const TEST_BLOCK_SIZE: usize = 512;

/// Create a headless test engine.
pub fn test_engine() -> AudioEngine {
    test_engine_with_sr(TEST_SAMPLE_RATE)
}

/// Route engine logs to the test harness. Filter with `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Create a test engine with specific sample rate.
pub fn test_engine_with_sr(sample_rate: f64) -> AudioEngine {
    init_tracing();
    AudioEngine::builder()
        .sample_rate(sample_rate)
        .max_block_size(TEST_BLOCK_SIZE)
        .build()
        .expect("Failed to create test engine")
}

/// Mono buffer holding a constant value.
pub fn dc_buffer(value: f32, seconds: f64, sample_rate: f64) -> Arc<AudioBuffer> {
    let frames = (seconds * sample_rate).round() as usize;
    Arc::new(AudioBuffer::constant(value, frames, sample_rate))
}

/// Generate a test signal: sine wave at given frequency for specified samples.
pub fn generate_sine(frequency: f64, sample_rate: f64, num_samples: usize) -> Vec<f32> {
    (0..num_samples)
        .map(|i| {
            let t = i as f64 / sample_rate;
            (2.0 * std::f64::consts::PI * frequency * t).sin() as f32
        })
        .collect()
}

/// Process `frames` frames through the engine and return de-interleaved
/// `(left, right)` output.
pub fn run_frames(engine: &mut AudioEngine, frames: usize) -> (Vec<f32>, Vec<f32>) {
    let mut interleaved = vec![0.0f32; frames * 2];
    engine
        .process_block(&mut interleaved)
        .expect("process_block failed");
    let left = interleaved.iter().step_by(2).copied().collect();
    let right = interleaved.iter().skip(1).step_by(2).copied().collect();
    (left, right)
}

/// Index of the first sample whose magnitude exceeds the silence threshold.
pub fn first_audible(samples: &[f32]) -> Option<usize> {
    samples
        .iter()
        .position(|s| s.abs() > tolerances::SILENCE_THRESHOLD)
}

/// Calculate RMS of a signal.
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_sq: f32 = samples.iter().map(|s| s * s).sum();
    (sum_sq / samples.len() as f32).sqrt()
}

/// Calculate peak amplitude of a signal.
pub fn peak(samples: &[f32]) -> f32 {
    samples
        .iter()
        .map(|s| s.abs())
        .fold(0.0_f32, |a, b| a.max(b))
}

/// Check if audio is silent (all samples below threshold).
pub fn is_silent(samples: &[f32], threshold: f32) -> bool {
    samples.iter().all(|&s| s.abs() <= threshold)
}

/// Assert signal is silent within threshold.
pub fn assert_is_silent(samples: &[f32], threshold: f32, context: &str) {
    let max_val = peak(samples);
    assert!(
        max_val <= threshold,
        "{}: Expected silence (threshold {}), but peak was {}",
        context,
        threshold,
        max_val
    );
}

/// Assert signal is NOT silent (has content above threshold).
pub fn assert_not_silent(samples: &[f32], min_peak: f32, context: &str) {
    let max_val = peak(samples);
    assert!(
        max_val >= min_peak,
        "{}: Expected audio (min_peak {}), but peak was only {}",
        context,
        min_peak,
        max_val
    );
}

/// Assert every sample equals `expected` within `epsilon`.
pub fn assert_constant(samples: &[f32], expected: f32, epsilon: f32, context: &str) {
    if let Some((i, s)) = samples
        .iter()
        .enumerate()
        .find(|(_, s)| (**s - expected).abs() > epsilon)
    {
        panic!("{context}: sample {i} is {s}, expected {expected} (epsilon {epsilon})");
    }
}

// =============================================================================
// Recording devices
// =============================================================================

/// Device factory that "captures" `take` on every recording.
pub fn take_factory(take: AudioBuffer) -> DeviceFactory {
    Arc::new(move || Box::new(BufferDevice::new(take.clone())) as Box<dyn RecordingDevice>)
}

/// Device that refuses to open, like a denied microphone permission.
pub struct DeniedDevice;

impl RecordingDevice for DeniedDevice {
    fn open(&mut self, _sample_rate: f64) -> dawg::sampler::Result<()> {
        Err(dawg::sampler::Error::DeviceAccessDenied(
            "permission denied".into(),
        ))
    }

    fn close(&mut self) -> dawg::sampler::Result<Vec<u8>> {
        Err(dawg::sampler::Error::NotRecording)
    }

    fn abort(&mut self) {}
}

pub fn denied_factory() -> DeviceFactory {
    Arc::new(|| Box::new(DeniedDevice) as Box<dyn RecordingDevice>)
}

// =============================================================================
// MIDI manager double
// =============================================================================

/// Calls seen by [`FakeMidi`], in order.
#[derive(Debug, Clone, PartialEq)]
pub enum MidiCall {
    Schedule(TrackId, ClipId),
    Stop(TrackId, ClipId),
    CreateInstrument(TrackId, String),
    DisposeInstrument(TrackId),
    StartNotes(TrackId),
    StopNotes(TrackId),
}

/// MIDI manager that records every call. `take` is handed back by
/// `stop_note_recording`.
#[derive(Clone, Default)]
pub struct FakeMidi {
    pub calls: Arc<Mutex<Vec<MidiCall>>>,
    pub take: Option<MidiClip>,
}

impl FakeMidi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_take(mut self, take: MidiClip) -> Self {
        self.take = Some(take);
        self
    }

    pub fn calls(&self) -> Vec<MidiCall> {
        self.calls.lock().unwrap().clone()
    }

    fn log(&self, call: MidiCall) {
        self.calls.lock().unwrap().push(call);
    }
}

impl MidiManager for FakeMidi {
    fn schedule_clip(&mut self, track: TrackId, clip: &MidiClip) -> dawg::Result<()> {
        self.log(MidiCall::Schedule(track, clip.id));
        Ok(())
    }

    fn stop_clip(&mut self, track: TrackId, clip: ClipId) {
        self.log(MidiCall::Stop(track, clip));
    }

    fn create_instrument(&mut self, track: TrackId, instrument: &str) -> dawg::Result<()> {
        self.log(MidiCall::CreateInstrument(track, instrument.to_string()));
        Ok(())
    }

    fn dispose_instrument(&mut self, track: TrackId) {
        self.log(MidiCall::DisposeInstrument(track));
    }

    fn start_note_recording(&mut self, track: TrackId) -> dawg::Result<()> {
        self.log(MidiCall::StartNotes(track));
        Ok(())
    }

    fn stop_note_recording(&mut self, track: TrackId) -> dawg::Result<MidiClip> {
        self.log(MidiCall::StopNotes(track));
        self.take
            .clone()
            .ok_or_else(|| dawg::Error::Midi("nothing recorded".into()))
    }
}
