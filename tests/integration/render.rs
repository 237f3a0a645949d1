//! Offline render and export integration tests
//!
//! Tests mixdown gain staging, determinism, solo handling and the WAV
//! export paths.

use crate::helpers::tolerances::*;
use crate::helpers::*;
use dawg::core::{EffectCapability, EngineEvent, ParameterSet};
use dawg::export::ExportError;
use dawg::prelude::*;

const SR: f64 = 8000.0;

fn render_engine() -> AudioEngine {
    test_engine_with_sr(SR)
}

fn add_dc_track(engine: &mut AudioEngine, name: &str, value: f32) -> TrackId {
    let track = engine.add_track(TrackConfig::audio(name)).unwrap();
    engine
        .add_clip(track, ClipSpec::new(dc_buffer(value, 1.0, SR)))
        .unwrap();
    track
}

/// Effect that only runs on the live path.
#[derive(Clone)]
struct LiveOnly {
    params: ParameterSet,
}

impl Effect for LiveOnly {
    fn name(&self) -> &str {
        "live-only"
    }

    fn parameters(&self) -> &ParameterSet {
        &self.params
    }

    fn prepare(&mut self, _sample_rate: f64, _max_block: usize) {}

    fn reset(&mut self) {}

    fn process(&mut self, _left: &mut [f32], _right: &mut [f32]) {}

    fn capability(&self) -> EffectCapability {
        EffectCapability::Realtime
    }
}

#[test]
fn test_single_clip_gain_staging() {
    let mut engine = render_engine();
    add_dc_track(&mut engine, "dc", 1.0);

    let result = engine.render_offline(1.0, 0.0).unwrap();
    assert_eq!(result.active_tracks, 1);
    assert_eq!(result.length_samples(), 8000);
    // 0.32 headroom stage times 0.5 master gain.
    assert_constant(result.buffer.channel(0), 0.16, FLOAT_EPSILON, "left");
    assert_constant(result.buffer.channel(1), 0.16, FLOAT_EPSILON, "right");
    approx::assert_relative_eq!(result.peak_level, 0.16, epsilon = FLOAT_EPSILON);
}

#[test]
fn test_two_tracks_share_headroom() {
    let mut engine = render_engine();
    add_dc_track(&mut engine, "a", 1.0);
    add_dc_track(&mut engine, "b", 1.0);

    let result = engine.render_offline(1.0, 0.0).unwrap();
    assert_eq!(result.active_tracks, 2);
    // Each track: 0.20 stage; master 0.8.
    assert_constant(result.buffer.channel(0), 0.32, DSP_EPSILON, "two tracks");
}

#[test]
fn test_tail_is_silent_after_clip() {
    let mut engine = render_engine();
    add_dc_track(&mut engine, "dc", 1.0);

    let result = engine.render(1.0).unwrap();
    approx::assert_relative_eq!(result.duration_seconds(), 3.0, epsilon = 1e-9);
    let left = result.buffer.channel(0);
    assert_constant(&left[..8000], 0.16, FLOAT_EPSILON, "clip");
    assert_is_silent(&left[8000..], SILENCE_THRESHOLD, "tail");
}

#[test]
fn test_render_is_deterministic() {
    let mut engine = render_engine();
    add_dc_track(&mut engine, "dc", 0.5);
    // Empty audio track gets the seeded fallback tone.
    engine.add_track(TrackConfig::audio("empty")).unwrap();

    let first = engine.render_offline(0.5, 0.1).unwrap();
    let second = engine.render_offline(0.5, 0.1).unwrap();
    assert!(first.buffer.samples_eq(&second.buffer));
    assert_eq!(first.peak_level, second.peak_level);
}

#[test]
fn test_fallback_tone_can_be_disabled() {
    let mut with_tone = render_engine();
    with_tone.add_track(TrackConfig::audio("empty")).unwrap();
    let result = with_tone.render_offline(0.5, 0.0).unwrap();
    assert_eq!(result.active_tracks, 1);
    assert_not_silent(result.buffer.channel(0), 0.1, "fallback tone");
    // Unit tone through the 0.32 stage and 0.5 master gain.
    assert!(result.peak_level <= 0.16 + DSP_EPSILON);

    let mut silent = AudioEngine::builder()
        .sample_rate(SR)
        .fallback_tone(false)
        .build()
        .unwrap();
    silent.add_track(TrackConfig::audio("empty")).unwrap();
    let result = silent.render_offline(0.5, 0.0).unwrap();
    assert_is_silent(result.buffer.channel(0), 0.0, "no fallback");
}

#[test]
fn test_empty_project_renders_liveness_tone() {
    let engine = render_engine();
    let result = engine.render_offline(0.5, 0.0).unwrap();
    assert_eq!(result.active_tracks, 0);
    approx::assert_relative_eq!(result.peak_level, 0.05, epsilon = 1e-3);
}

#[test]
fn test_solo_and_mute_pick_active_tracks() {
    let mut engine = render_engine();
    let a = add_dc_track(&mut engine, "a", 1.0);
    let b = add_dc_track(&mut engine, "b", 1.0);

    engine.track_mut(b).unwrap().set_solo(true);
    let result = engine.render_offline(0.5, 0.0).unwrap();
    assert_eq!(result.active_tracks, 1);
    assert_constant(result.buffer.channel(0), 0.16, FLOAT_EPSILON, "solo");

    engine.track_mut(b).unwrap().set_solo(false);
    engine.track_mut(a).unwrap().set_mute(true);
    let result = engine.render_offline(0.5, 0.0).unwrap();
    assert_eq!(result.active_tracks, 1);
    assert_constant(result.buffer.channel(0), 0.16, FLOAT_EPSILON, "mute");
}

#[test]
fn test_midi_track_counts_but_is_silent() {
    let mut engine = render_engine();
    engine.add_track(TrackConfig::midi("keys")).unwrap();

    let result = engine.render_offline(0.5, 0.0).unwrap();
    assert_eq!(result.active_tracks, 1);
    assert_is_silent(result.buffer.channel(0), 0.0, "midi only");
    assert_eq!(result.peak_level, 0.0);
}

#[test]
fn test_render_leaves_live_state_alone() {
    let mut engine = render_engine();
    add_dc_track(&mut engine, "dc", 1.0);
    engine.set_current_time(0.25).unwrap();

    engine.render_offline(1.0, 0.0).unwrap();
    assert_eq!(engine.transport_state(), TransportState::Stopped);
    approx::assert_relative_eq!(engine.current_time(), 0.25, epsilon = 1e-9);
}

#[test]
fn test_render_completed_event() {
    let mut engine = render_engine();
    add_dc_track(&mut engine, "dc", 1.0);
    let events = engine.subscribe();

    engine.render_offline(1.0, 0.5).unwrap();
    let seen: Vec<EngineEvent> = events.try_iter().collect();
    match seen.as_slice() {
        [EngineEvent::RenderCompleted { duration, peak }] => {
            approx::assert_relative_eq!(*duration, 1.5, epsilon = 1e-9);
            approx::assert_relative_eq!(*peak, 0.16, epsilon = FLOAT_EPSILON);
        }
        other => panic!("unexpected events: {other:?}"),
    }
}

#[test]
fn test_realtime_effect_blocks_render() {
    let mut engine = render_engine();
    let track = add_dc_track(&mut engine, "dc", 1.0);
    engine.track_mut(track).unwrap().add_effect(Box::new(LiveOnly {
        params: ParameterSet::new(),
    }));

    assert!(matches!(
        engine.render_offline(1.0, 0.0),
        Err(Error::Export(ExportError::Render(_)))
    ));

    // A muted track's effects are not rendered.
    engine.track_mut(track).unwrap().set_mute(true);
    assert!(engine.render_offline(1.0, 0.0).is_ok());
}

#[test]
fn test_send_reaches_bus_added_before_source() {
    let mut engine = render_engine();
    let bus = engine.add_track(TrackConfig::aux("bus")).unwrap();
    let source = add_dc_track(&mut engine, "dc", 1.0);

    let dry = engine.render_offline(0.5, 0.0).unwrap();
    engine.send(source, bus, 1.0).unwrap();
    let wet = engine.render_offline(0.5, 0.0).unwrap();

    // Source 0.20, bus 0.20 * 0.20, master 0.8.
    assert_constant(dry.buffer.channel(0), 0.2 * 0.8, FLOAT_EPSILON, "dry");
    assert_constant(wet.buffer.channel(0), (0.2 + 0.04) * 0.8, FLOAT_EPSILON, "wet");
}

#[test]
fn test_send_cycle_fails_render() {
    let mut engine = render_engine();
    let a = engine.add_track(TrackConfig::aux("a")).unwrap();
    let b = engine.add_track(TrackConfig::aux("b")).unwrap();
    engine.send(a, b, 0.5).unwrap();
    engine.send(b, a, 0.5).unwrap();

    assert!(matches!(
        engine.render_offline(0.5, 0.0),
        Err(Error::Export(ExportError::Render(_)))
    ));
}

#[test]
fn test_export_produces_wav_bytes() {
    let mut engine = render_engine();
    add_dc_track(&mut engine, "dc", 1.0);

    let bytes = engine
        .export(0.5, 0.0, &ExportOptions::wav(BitDepth::Int16))
        .unwrap();
    assert_eq!(&bytes[..4], b"RIFF");
    assert_eq!(&bytes[8..12], b"WAVE");

    let mut reader = hound::WavReader::new(std::io::Cursor::new(bytes)).unwrap();
    let spec = reader.spec();
    assert_eq!(spec.channels, 2);
    assert_eq!(spec.sample_rate, 8000);
    assert_eq!(spec.bits_per_sample, 16);
    assert_eq!(reader.len(), 8000);

    let samples: Vec<f32> = reader
        .samples::<i16>()
        .map(|s| s.unwrap() as f32 / 32768.0)
        .collect();
    assert_constant(&samples, 0.16, 2.0 * INT16_EPSILON, "16-bit contents");
}

#[test]
fn test_export_to_file_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mix.wav");

    let mut engine = render_engine();
    add_dc_track(&mut engine, "dc", 1.0);
    engine
        .export_to_file(&path, 0.25, 0.0, &ExportOptions::wav(BitDepth::Float32))
        .unwrap();

    let mut reader = hound::WavReader::open(&path).unwrap();
    assert_eq!(reader.spec().sample_format, hound::SampleFormat::Float);
    let samples: Vec<f32> = reader.samples::<f32>().map(|s| s.unwrap()).collect();
    assert_eq!(samples.len(), 2 * 2000);
    assert_constant(&samples, 0.16, FLOAT_EPSILON, "file contents");
}

#[test]
fn test_export_rejects_unknown_extension() {
    let dir = tempfile::tempdir().unwrap();
    let mut engine = render_engine();
    add_dc_track(&mut engine, "dc", 1.0);

    let result = engine.export_to_file(
        dir.path().join("mix.mp3"),
        0.25,
        0.0,
        &ExportOptions::default(),
    );
    assert!(matches!(
        result,
        Err(Error::Export(ExportError::UnsupportedFormat(_)))
    ));
    assert!(!dir.path().join("mix.mp3").exists());
}
