//! Transport integration tests
//!
//! Tests the transport state machine, seeking, looping and sample-accurate
//! clip starts through `process_block`.

use crate::helpers::tolerances::*;
use crate::helpers::*;
use dawg::core::Error as CoreError;
use dawg::prelude::*;

const SR: f64 = TEST_SAMPLE_RATE;

fn engine_with_clip(value: f32, start: f64, seconds: f64) -> (AudioEngine, TrackId, ClipId) {
    let mut engine = test_engine();
    let track = engine.add_track(TrackConfig::audio("clip")).unwrap();
    let clip = engine
        .add_clip(
            track,
            ClipSpec::new(dc_buffer(value, seconds, SR)).start_time(start),
        )
        .unwrap();
    (engine, track, clip)
}

#[test]
fn test_transport_state_machine() {
    let mut engine = test_engine();
    assert_eq!(engine.transport_state(), TransportState::Stopped);

    // Stop and pause while stopped are no-ops.
    engine.stop().unwrap();
    engine.pause().unwrap();
    assert_eq!(engine.transport_state(), TransportState::Stopped);

    engine.play().unwrap();
    assert!(engine.is_playing());

    // Play while playing is a warned no-op.
    engine.play().unwrap();
    assert_eq!(engine.transport_state(), TransportState::Playing);

    run_frames(&mut engine, 4800);
    engine.pause().unwrap();
    assert_eq!(engine.transport_state(), TransportState::Paused);
    approx::assert_relative_eq!(engine.current_time(), 0.1, epsilon = 1e-9);

    // The playhead does not move while paused.
    run_frames(&mut engine, 4800);
    approx::assert_relative_eq!(engine.current_time(), 0.1, epsilon = 1e-9);

    engine.play().unwrap();
    engine.stop().unwrap();
    assert_eq!(engine.transport_state(), TransportState::Stopped);
    assert_eq!(engine.current_time(), 0.0);
}

#[test]
fn test_tempo_bounds() {
    let mut engine = test_engine();
    assert_eq!(engine.tempo(), 120.0);
    assert!(matches!(
        engine.set_tempo(19.9),
        Err(Error::Core(CoreError::ParameterOutOfRange { .. }))
    ));
    assert!(engine.set_tempo(1000.0).is_err());
    engine.set_tempo(20.0).unwrap();
    engine.set_tempo(999.0).unwrap();
    assert_eq!(engine.tempo(), 999.0);
    assert_eq!(engine.transport().tempo(), 999.0);
}

#[test]
fn test_negative_seek_is_rejected() {
    let mut engine = test_engine();
    engine.set_current_time(2.5).unwrap();
    assert_eq!(engine.current_time(), 2.5);
    assert!(matches!(
        engine.set_current_time(-1.0),
        Err(Error::Core(CoreError::ParameterOutOfRange { .. }))
    ));
    assert_eq!(engine.current_time(), 2.5);
}

#[test]
fn test_clip_starts_on_exact_sample() {
    let start = 0.0123;
    let (mut engine, _, _) = engine_with_clip(0.5, start, 0.5);
    engine.play().unwrap();

    let (left, right) = run_frames(&mut engine, 2048);
    let expected = (start * SR).round() as usize;
    assert_eq!(first_audible(&left), Some(expected));
    assert_eq!(first_audible(&right), Some(expected));
    assert!((left[expected] - 0.5).abs() < FLOAT_EPSILON);
}

#[test]
fn test_clip_start_across_block_boundary() {
    // 1000 frames in: inside the second 512-frame block.
    let start = 1000.0 / SR;
    let (mut engine, _, _) = engine_with_clip(0.5, start, 0.5);
    engine.play().unwrap();

    let (left, _) = run_frames(&mut engine, 2048);
    assert_eq!(first_audible(&left), Some(1000));
    assert_is_silent(&left[..1000], SILENCE_THRESHOLD, "before clip start");
    assert_constant(&left[1000..], 0.5, FLOAT_EPSILON, "clip body");
}

#[test]
fn test_removed_clip_never_sounds() {
    let (mut engine, track, clip) = engine_with_clip(0.5, 0.02, 0.5);
    engine.play().unwrap();

    let (before, _) = run_frames(&mut engine, 512);
    assert_is_silent(&before, SILENCE_THRESHOLD, "before clip start");

    engine.remove_clip(track, clip).unwrap();
    let (after, _) = run_frames(&mut engine, 4096);
    assert_is_silent(&after, SILENCE_THRESHOLD, "after removal");
}

#[test]
fn test_moved_clip_starts_at_new_position() {
    let (mut engine, track, clip) = engine_with_clip(0.5, 0.01, 0.5);
    engine.move_clip(track, clip, 0.03).unwrap();
    engine.play().unwrap();

    let (left, _) = run_frames(&mut engine, 2048);
    assert_eq!(first_audible(&left), Some(1440));
}

#[test]
fn test_edits_during_playback_keep_clip_sounding() {
    let (mut engine, track, clip) = engine_with_clip(0.5, 0.0, 1.0);
    engine.play().unwrap();
    run_frames(&mut engine, 4096);

    let second = engine.split_clip(track, clip, 0.5).unwrap();
    let (left, _) = run_frames(&mut engine, 512);
    assert_constant(&left, 0.5, FLOAT_EPSILON, "after split");

    engine.trim_clip_end(track, clip, 0.1).unwrap();
    let (left, _) = run_frames(&mut engine, 512);
    assert_constant(&left, 0.5, FLOAT_EPSILON, "after trim end");

    engine.trim_clip_start(track, clip, 0.05).unwrap();
    let (left, _) = run_frames(&mut engine, 512);
    assert_constant(&left, 0.5, FLOAT_EPSILON, "after trim start");

    // Second half moved under the playhead joins mid-way.
    engine.move_clip(track, clip, 0.6).unwrap();
    engine.move_clip(track, second, 0.0).unwrap();
    let (left, _) = run_frames(&mut engine, 512);
    assert_constant(&left, 0.5, FLOAT_EPSILON, "after move");
}

#[test]
fn test_split_behind_playhead_sounds_second_half() {
    let (mut engine, track, clip) = engine_with_clip(0.5, 0.0, 1.0);
    engine.play().unwrap();
    run_frames(&mut engine, 24_576);

    engine.split_clip(track, clip, 0.25).unwrap();
    let (left, _) = run_frames(&mut engine, 512);
    assert_constant(&left, 0.5, FLOAT_EPSILON, "second half");
}

#[test]
fn test_clip_moved_ahead_of_playhead_goes_quiet() {
    let (mut engine, track, clip) = engine_with_clip(0.5, 0.0, 1.0);
    engine.play().unwrap();
    run_frames(&mut engine, 4096);

    engine.move_clip(track, clip, 2.0).unwrap();
    let (left, _) = run_frames(&mut engine, 512);
    assert_is_silent(&left, SILENCE_THRESHOLD, "clip moved away");
}

#[test]
fn test_loop_wrap_refires_clip() {
    // 50 ms clip at 0 in a 100 ms loop: audible, silent, audible, silent.
    let (mut engine, _, _) = engine_with_clip(0.5, 0.0, 0.05);
    engine.set_loop(0.0, 0.1, true).unwrap();
    engine.play().unwrap();

    let (left, _) = run_frames(&mut engine, 9600);
    assert_constant(&left[..2400], 0.5, FLOAT_EPSILON, "first pass");
    assert_is_silent(&left[2400..4800], SILENCE_THRESHOLD, "first gap");
    assert_constant(&left[4800..7200], 0.5, FLOAT_EPSILON, "second pass");
    assert_is_silent(&left[7200..], SILENCE_THRESHOLD, "second gap");
    assert!(engine.current_time() < 0.1);
}

#[test]
fn test_loop_wrap_on_block_boundary() {
    // Loop length is exactly eight blocks.
    let loop_end = (8 * TEST_BLOCK_SIZE) as f64 / SR;
    let (mut engine, _, _) = engine_with_clip(0.5, 0.0, loop_end);
    engine.set_loop(0.0, loop_end, true).unwrap();
    engine.play().unwrap();

    let (left, _) = run_frames(&mut engine, 16 * TEST_BLOCK_SIZE);
    assert_constant(&left, 0.5, FLOAT_EPSILON, "two loop passes");
}

#[test]
fn test_seek_resumes_mid_clip() {
    let (mut engine, _, _) = engine_with_clip(0.5, 0.0, 1.0);
    engine.set_current_time(0.5).unwrap();
    engine.play().unwrap();

    let (left, _) = run_frames(&mut engine, 512);
    assert_constant(&left, 0.5, FLOAT_EPSILON, "chased clip");

    // Seeking past the end silences it.
    engine.set_current_time(1.5).unwrap();
    let (left, _) = run_frames(&mut engine, 512);
    assert_is_silent(&left, SILENCE_THRESHOLD, "after clip end");
}

#[test]
fn test_pause_and_resume() {
    let (mut engine, _, _) = engine_with_clip(0.5, 0.0, 1.0);
    engine.play().unwrap();
    run_frames(&mut engine, 1024);

    engine.pause().unwrap();
    let (paused, _) = run_frames(&mut engine, 512);
    assert_is_silent(&paused, SILENCE_THRESHOLD, "paused");

    engine.play().unwrap();
    let (resumed, _) = run_frames(&mut engine, 512);
    assert_constant(&resumed, 0.5, FLOAT_EPSILON, "resumed");
}

#[test]
fn test_looped_clip_fills_its_slot() {
    let mut engine = test_engine();
    let track = engine.add_track(TrackConfig::audio("loop")).unwrap();
    // 20 ms region at double speed: 10 ms per pass, repeated over 20 ms.
    let spec = ClipSpec::new(dc_buffer(0.5, 0.02, SR))
        .playback_rate(2.0)
        .looped(true);
    engine.add_clip(track, spec).unwrap();
    engine.play().unwrap();

    let (left, _) = run_frames(&mut engine, 2048);
    assert_constant(&left[..960], 0.5, FLOAT_EPSILON, "looped slot");
    assert_is_silent(&left[960..], SILENCE_THRESHOLD, "after slot");
}

#[test]
fn test_unlooped_fast_clip_plays_once() {
    let mut engine = test_engine();
    let track = engine.add_track(TrackConfig::audio("once")).unwrap();
    let spec = ClipSpec::new(dc_buffer(0.5, 0.02, SR)).playback_rate(2.0);
    engine.add_clip(track, spec).unwrap();
    engine.play().unwrap();

    let (left, _) = run_frames(&mut engine, 2048);
    assert_constant(&left[..480], 0.5, FLOAT_EPSILON, "single pass");
    assert_is_silent(&left[480..], SILENCE_THRESHOLD, "after single pass");
}

proptest::proptest! {
    #![proptest_config(proptest::prelude::ProptestConfig::with_cases(32))]

    #[test]
    fn prop_clip_start_is_sample_accurate(start in 0.0f64..0.05) {
        let (mut engine, _, _) = engine_with_clip(0.5, start, 0.1);
        engine.play().unwrap();
        let (left, _) = run_frames(&mut engine, 4096);
        let expected = (start * SR).round() as usize;
        proptest::prop_assert_eq!(first_audible(&left), Some(expected));
    }
}
