//! Engine lifecycle integration tests
//!
//! Tests engine creation, track registry, events, buffer reuse and disposal.

use crate::helpers::*;
use dawg::core::{EngineEvent, Error as CoreError};
use dawg::prelude::*;
use std::sync::Arc;

fn is_not_initialized<T>(result: dawg::Result<T>) -> bool {
    matches!(result, Err(Error::Core(CoreError::NotInitialized)))
}

#[test]
fn test_engine_reports_config() {
    let engine = test_engine();
    assert_eq!(engine.sample_rate(), TEST_SAMPLE_RATE);
    assert_eq!(engine.block_size(), TEST_BLOCK_SIZE);
    assert_eq!(engine.track_count(), 0);
    assert!(engine.is_initialized());
}

#[test]
fn test_tracks_keep_insertion_order() {
    let mut engine = test_engine();
    let a = engine.add_track(TrackConfig::audio("a")).unwrap();
    let b = engine.add_track(TrackConfig::midi("b")).unwrap();
    let c = engine.add_track(TrackConfig::aux("c")).unwrap();

    let names: Vec<_> = engine.tracks().map(|t| t.name().to_string()).collect();
    assert_eq!(names, ["a", "b", "c"]);
    assert_eq!(engine.track(b).unwrap().kind(), TrackKind::Midi);

    engine.remove_track(b).unwrap();
    assert_eq!(engine.track_ids(), vec![a, c]);
    assert!(matches!(
        engine.track(b),
        Err(Error::Core(CoreError::TrackNotFound(_)))
    ));
}

#[test]
fn test_track_config_is_validated() {
    let mut engine = test_engine();
    assert!(engine
        .add_track(TrackConfig::audio("loud").volume_db(20.0))
        .is_err());
    assert!(engine.add_track(TrackConfig::audio("wide").pan(2.0)).is_err());
    assert_eq!(engine.track_count(), 0);
}

#[test]
fn test_dispose_then_everything_fails() {
    let mut engine = test_engine();
    let track = engine.add_track(TrackConfig::audio("a")).unwrap();
    engine
        .add_clip(track, ClipSpec::new(dc_buffer(0.5, 0.1, TEST_SAMPLE_RATE)))
        .unwrap();
    engine.play().unwrap();

    engine.dispose();
    assert!(!engine.is_initialized());
    assert_eq!(engine.transport_state(), TransportState::Stopped);
    assert_eq!(engine.track_count(), 0);

    assert!(is_not_initialized(engine.play()));
    assert!(is_not_initialized(engine.stop()));
    assert!(is_not_initialized(engine.set_tempo(100.0)));
    assert!(is_not_initialized(engine.add_track(TrackConfig::audio("b"))));
    assert!(is_not_initialized(engine.track(track)));
    assert!(is_not_initialized(engine.render_offline(1.0, 0.0)));
    let mut block = vec![0.0; 64];
    assert!(is_not_initialized(engine.process_block(&mut block)));

    // Second dispose is a no-op.
    engine.dispose();
    assert!(!engine.is_initialized());
}

#[test]
fn test_events_are_published() {
    let mut engine = test_engine();
    let events = engine.subscribe();

    let id = engine.add_track(TrackConfig::audio("Bass")).unwrap();
    engine.play().unwrap();
    engine.set_tempo(90.0).unwrap();
    engine.pause().unwrap();
    engine.stop().unwrap();
    engine.remove_track(id).unwrap();

    let seen: Vec<EngineEvent> = events.try_iter().collect();
    assert_eq!(
        seen,
        vec![
            EngineEvent::TrackCreated {
                id,
                name: "Bass".into()
            },
            EngineEvent::PlaybackStarted,
            EngineEvent::TempoChanged { bpm: 90.0 },
            EngineEvent::PlaybackPaused { position: 0.0 },
            EngineEvent::PlaybackStopped,
            EngineEvent::TrackDeleted { id },
        ]
    );
}

#[test]
fn test_removed_clip_buffer_returns_to_pool() {
    let mut engine = test_engine();
    let track = engine.add_track(TrackConfig::audio("a")).unwrap();

    let buffer = engine.acquire_buffer(4800, 2).unwrap();
    let buffer_id = buffer.id();
    let clip = engine
        .add_clip(track, ClipSpec::new(Arc::new(buffer)))
        .unwrap();
    assert_eq!(engine.pooled_buffers(), 0);

    engine.remove_clip(track, clip).unwrap();
    assert_eq!(engine.pooled_buffers(), 1);

    let reused = engine.acquire_buffer(4800, 2).unwrap();
    assert_eq!(reused.id(), buffer_id);
    assert_eq!(engine.pool_stats().reuses, 1);
}

#[test]
fn test_shared_buffer_stays_with_remaining_owner() {
    let mut engine = test_engine();
    let track = engine.add_track(TrackConfig::audio("a")).unwrap();
    let buffer = dc_buffer(0.5, 0.1, TEST_SAMPLE_RATE);

    let clip = engine
        .add_clip(track, ClipSpec::new(Arc::clone(&buffer)))
        .unwrap();
    engine.remove_clip(track, clip).unwrap();

    assert_eq!(engine.pooled_buffers(), 0);
    assert!(buffer.channel(0).iter().all(|&s| s == 0.5));
}

#[test]
fn test_load_sample_is_cached() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("kick.wav");
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 48000,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut writer = hound::WavWriter::create(&path, spec).unwrap();
    for s in generate_sine(100.0, TEST_SAMPLE_RATE, 480) {
        writer.write_sample(s).unwrap();
    }
    writer.finalize().unwrap();

    let mut engine = test_engine();
    let url = path.to_str().unwrap();
    let first = engine.load_sample(url).unwrap();
    let second = engine.load_sample(url).unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(first.len(), 480);
    assert_eq!(first.sample_rate(), TEST_SAMPLE_RATE);

    assert!(matches!(
        engine.load_sample("https://example.com/kick.wav"),
        Err(Error::Sampler(_))
    ));
}

#[test]
fn test_cpu_load_counts_tracks_and_effects() {
    let mut engine = test_engine();
    let a = engine.add_track(TrackConfig::audio("a")).unwrap();
    let b = engine.add_track(TrackConfig::audio("b")).unwrap();
    engine
        .track_mut(a)
        .unwrap()
        .add_effect(Box::new(Gain::new(-3.0).unwrap()));
    approx::assert_relative_eq!(engine.cpu_load(), 0.09, epsilon = 1e-6);

    engine.track_mut(b).unwrap().set_mute(true);
    approx::assert_relative_eq!(engine.cpu_load(), 0.07, epsilon = 1e-6);
}

#[test]
fn test_clip_edits_route_through_track() {
    let mut engine = test_engine();
    let track = engine.add_track(TrackConfig::audio("a")).unwrap();
    let clip = engine
        .add_clip(track, ClipSpec::new(dc_buffer(0.5, 2.0, TEST_SAMPLE_RATE)))
        .unwrap();

    engine.move_clip(track, clip, 1.0).unwrap();
    engine.trim_clip_start(track, clip, 0.5).unwrap();
    engine.trim_clip_end(track, clip, 0.5).unwrap();
    let second = engine.split_clip(track, clip, 2.0).unwrap();

    let t = engine.track(track).unwrap();
    let first = t.clip(clip).unwrap();
    let tail = t.clip(second).unwrap();
    approx::assert_relative_eq!(first.start_time(), 1.5, epsilon = 1e-9);
    approx::assert_relative_eq!(first.duration(), 0.5, epsilon = 1e-9);
    approx::assert_relative_eq!(tail.start_time(), 2.0, epsilon = 1e-9);
    approx::assert_relative_eq!(tail.duration(), 0.5, epsilon = 1e-9);

    assert!(matches!(
        engine.move_clip(track, clip, -1.0),
        Err(Error::Core(CoreError::InvalidClipData(_)))
    ));
}
