//! Recording integration tests
//!
//! Tests audio takes through injected devices and MIDI capture through a
//! recording `MidiManager` double.

use crate::helpers::tolerances::*;
use crate::helpers::*;
use dawg::core::{EngineEvent, Error as CoreError};
use dawg::prelude::*;
use dawg::sampler::{Error as SamplerError, RecordingState};

const SR: f64 = TEST_SAMPLE_RATE;

fn stereo_take() -> AudioBuffer {
    AudioBuffer::from_channels(vec![vec![0.25; 480], vec![-0.25; 480]], SR).unwrap()
}

fn recording_engine() -> AudioEngine {
    AudioEngine::builder()
        .sample_rate(SR)
        .max_block_size(TEST_BLOCK_SIZE)
        .recording_devices(take_factory(stereo_take()))
        .build()
        .unwrap()
}

#[test]
fn test_take_becomes_clip_at_playhead() {
    let mut engine = recording_engine();
    let track = engine.add_track(TrackConfig::audio("vox")).unwrap();
    let events = engine.subscribe();

    engine.start_recording(track).unwrap();
    assert!(engine.track(track).unwrap().is_recording());
    engine.set_current_time(1.5).unwrap();
    let clip = engine.stop_recording(track).unwrap();

    let t = engine.track(track).unwrap();
    assert_eq!(t.recording_state(), RecordingState::Idle);
    let recorded = t.clip(clip).unwrap();
    approx::assert_relative_eq!(recorded.start_time(), 1.5, epsilon = 1e-9);
    approx::assert_relative_eq!(recorded.duration(), 0.01, epsilon = 1e-9);
    assert_eq!(recorded.buffer().channel_count(), 2);
    assert_eq!(recorded.buffer().channel(1)[0], -0.25);

    let seen: Vec<EngineEvent> = events.try_iter().collect();
    assert_eq!(
        seen,
        vec![
            EngineEvent::RecordingStarted { track },
            EngineEvent::RecordingStopped { track, clip },
        ]
    );
}

#[test]
fn test_recorded_take_plays_back() {
    let mut engine = recording_engine();
    let track = engine.add_track(TrackConfig::audio("vox")).unwrap();
    engine.start_recording(track).unwrap();
    engine.stop_recording(track).unwrap();

    engine.play().unwrap();
    let (left, right) = run_frames(&mut engine, 1024);
    assert_constant(&left[..480], 0.25, FLOAT_EPSILON, "take left");
    assert_constant(&right[..480], -0.25, FLOAT_EPSILON, "take right");
    assert_is_silent(&left[480..], SILENCE_THRESHOLD, "after take");
}

#[test]
fn test_input_is_monitored_through_track() {
    let mut engine = recording_engine();
    let track = engine.add_track(TrackConfig::audio("vox")).unwrap();
    engine.start_recording(track).unwrap();

    let (left, right) = run_frames(&mut engine, 512);
    assert_constant(&left[..480], 0.25, FLOAT_EPSILON, "monitor left");
    assert_constant(&right[..480], -0.25, FLOAT_EPSILON, "monitor right");
    assert_is_silent(&left[480..], SILENCE_THRESHOLD, "monitor after take");
    approx::assert_relative_eq!(
        engine.track(track).unwrap().level().peak_left,
        0.25,
        epsilon = FLOAT_EPSILON
    );

    engine.stop_recording(track).unwrap();
    let (left, _) = run_frames(&mut engine, 512);
    assert_is_silent(&left, SILENCE_THRESHOLD, "after stop");
}

#[test]
fn test_muted_track_silences_monitor() {
    let mut engine = recording_engine();
    let track = engine.add_track(TrackConfig::audio("vox")).unwrap();
    engine.track_mut(track).unwrap().set_mute(true);
    engine.start_recording(track).unwrap();

    let (left, right) = run_frames(&mut engine, 512);
    assert_is_silent(&left, SILENCE_THRESHOLD, "muted left");
    assert_is_silent(&right, SILENCE_THRESHOLD, "muted right");
}

#[test]
fn test_recording_state_errors() {
    let mut engine = recording_engine();
    let track = engine.add_track(TrackConfig::audio("vox")).unwrap();

    assert!(matches!(
        engine.stop_recording(track),
        Err(Error::Sampler(SamplerError::NotRecording))
    ));

    engine.start_recording(track).unwrap();
    assert!(matches!(
        engine.start_recording(track),
        Err(Error::Sampler(SamplerError::AlreadyRecording))
    ));
}

#[test]
fn test_cancel_discards_take() {
    let mut engine = recording_engine();
    let track = engine.add_track(TrackConfig::audio("vox")).unwrap();

    engine.start_recording(track).unwrap();
    assert!(engine.cancel_recording(track).unwrap());
    assert!(!engine.cancel_recording(track).unwrap());
    assert_eq!(engine.track(track).unwrap().clip_count(), 0);
    assert!(engine.stop_recording(track).is_err());
}

#[test]
fn test_only_audio_tracks_record() {
    let mut engine = recording_engine();
    let keys = engine.add_track(TrackConfig::midi("keys")).unwrap();
    let bus = engine.add_track(TrackConfig::aux("bus")).unwrap();

    for track in [keys, bus] {
        assert!(matches!(
            engine.start_recording(track),
            Err(Error::Core(CoreError::InvalidTrackType(_)))
        ));
    }
}

#[test]
fn test_denied_device_leaves_track_idle() {
    let mut engine = AudioEngine::builder()
        .sample_rate(SR)
        .recording_devices(denied_factory())
        .build()
        .unwrap();
    let track = engine.add_track(TrackConfig::audio("vox")).unwrap();

    assert!(matches!(
        engine.start_recording(track),
        Err(Error::Sampler(SamplerError::DeviceAccessDenied(_)))
    ));
    assert_eq!(
        engine.track(track).unwrap().recording_state(),
        RecordingState::Idle
    );
}

#[test]
fn test_removing_track_cancels_recording() {
    let mut engine = recording_engine();
    let track = engine.add_track(TrackConfig::audio("vox")).unwrap();
    engine.start_recording(track).unwrap();
    engine.remove_track(track).unwrap();
    assert_eq!(engine.track_count(), 0);
}

// =============================================================================
// MIDI
// =============================================================================

fn midi_engine(midi: FakeMidi) -> AudioEngine {
    AudioEngine::builder()
        .sample_rate(SR)
        .midi_manager(midi)
        .build()
        .unwrap()
}

#[test]
fn test_midi_clip_is_scheduled() {
    let midi = FakeMidi::new();
    let mut engine = midi_engine(midi.clone());
    let track = engine.add_track(TrackConfig::midi("keys")).unwrap();

    let clip = MidiClip::new(0.0, 2.0).with_note(MidiNote::new(60, 100, 0.0, 0.5));
    let id = engine.add_midi_clip(track, clip).unwrap();
    assert_eq!(engine.track(track).unwrap().midi_clips().len(), 1);

    let removed = engine.remove_midi_clip(track, id).unwrap();
    assert_eq!(removed.notes.len(), 1);
    assert_eq!(
        midi.calls(),
        vec![MidiCall::Schedule(track, id), MidiCall::Stop(track, id)]
    );
}

#[test]
fn test_invalid_midi_clip_is_not_scheduled() {
    let midi = FakeMidi::new();
    let mut engine = midi_engine(midi.clone());
    let track = engine.add_track(TrackConfig::midi("keys")).unwrap();

    let clip = MidiClip::new(0.0, 1.0).with_note(MidiNote::new(128, 100, 0.0, 0.5));
    assert!(matches!(
        engine.add_midi_clip(track, clip),
        Err(Error::Core(CoreError::InvalidClipData(_)))
    ));
    assert!(midi.calls().is_empty());
}

#[test]
fn test_midi_needs_midi_track() {
    let mut engine = midi_engine(FakeMidi::new());
    let audio = engine.add_track(TrackConfig::audio("a")).unwrap();
    assert!(matches!(
        engine.add_midi_clip(audio, MidiClip::new(0.0, 1.0)),
        Err(Error::Core(CoreError::InvalidTrackType(_)))
    ));
    assert!(matches!(
        engine.create_instrument(audio, "piano"),
        Err(Error::Core(CoreError::InvalidTrackType(_)))
    ));
}

#[test]
fn test_instrument_replacement_disposes_previous() {
    let midi = FakeMidi::new();
    let mut engine = midi_engine(midi.clone());
    let track = engine.add_track(TrackConfig::midi("keys")).unwrap();

    engine.create_instrument(track, "piano").unwrap();
    engine.create_instrument(track, "strings").unwrap();
    assert_eq!(engine.track(track).unwrap().instrument(), Some("strings"));
    assert_eq!(
        midi.calls(),
        vec![
            MidiCall::CreateInstrument(track, "piano".into()),
            MidiCall::DisposeInstrument(track),
            MidiCall::CreateInstrument(track, "strings".into()),
        ]
    );
}

#[test]
fn test_note_recording_keeps_take() {
    let take = MidiClip::new(0.5, 1.0).with_note(MidiNote::new(64, 90, 0.0, 0.25));
    let take_id = take.id;
    let midi = FakeMidi::new().with_take(take);
    let mut engine = midi_engine(midi.clone());
    let track = engine.add_track(TrackConfig::midi("keys")).unwrap();

    engine.start_note_recording(track).unwrap();
    let id = engine.stop_note_recording(track).unwrap();
    assert_eq!(id, take_id);
    assert_eq!(engine.track(track).unwrap().midi_clips()[0].notes[0].pitch, 64);
    assert_eq!(
        midi.calls(),
        vec![MidiCall::StartNotes(track), MidiCall::StopNotes(track)]
    );
}

#[test]
fn test_removing_midi_track_releases_midi_resources() {
    let midi = FakeMidi::new();
    let mut engine = midi_engine(midi.clone());
    let track = engine.add_track(TrackConfig::midi("keys")).unwrap();
    let clip = engine
        .add_midi_clip(track, MidiClip::new(0.0, 1.0))
        .unwrap();
    engine.create_instrument(track, "piano").unwrap();

    engine.remove_track(track).unwrap();
    let calls = midi.calls();
    assert_eq!(
        &calls[calls.len() - 2..],
        &[MidiCall::Stop(track, clip), MidiCall::DisposeInstrument(track)]
    );
}
