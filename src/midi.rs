//! MIDI capability for midi-kind tracks.
//!
//! Instruments, note scheduling and note capture live outside the engine.
//! The engine keeps the clip data for serialization and calls into a
//! [`MidiManager`] for everything that makes sound.

use crate::Result;
use dawg_core::{ClipId, TrackId};
use serde::{Deserialize, Serialize};

/// One note, timed relative to the start of its clip.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MidiNote {
    pub pitch: u8,
    pub velocity: u8,
    pub start: f64,
    pub duration: f64,
}

impl MidiNote {
    pub fn new(pitch: u8, velocity: u8, start: f64, duration: f64) -> Self {
        Self {
            pitch,
            velocity,
            start,
            duration,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MidiClip {
    pub id: ClipId,
    pub start_time: f64,
    pub duration: f64,
    pub notes: Vec<MidiNote>,
}

impl MidiClip {
    pub fn new(start_time: f64, duration: f64) -> Self {
        Self {
            id: ClipId::next(),
            start_time,
            duration,
            notes: Vec::new(),
        }
    }

    pub fn with_note(mut self, note: MidiNote) -> Self {
        self.notes.push(note);
        self
    }

    pub fn end_time(&self) -> f64 {
        self.start_time + self.duration
    }

    /// Reject negative placement, empty length and notes outside `0..=127`.
    pub fn validate(&self) -> dawg_core::Result<()> {
        let invalid = |msg: String| dawg_core::Error::InvalidClipData(msg);
        if !(self.start_time.is_finite() && self.start_time >= 0.0) {
            return Err(invalid(format!(
                "start time must be >= 0, got {}",
                self.start_time
            )));
        }
        if !(self.duration.is_finite() && self.duration > 0.0) {
            return Err(invalid(format!(
                "duration must be > 0, got {}",
                self.duration
            )));
        }
        if let Some(note) = self
            .notes
            .iter()
            .find(|n| n.pitch > 127 || n.velocity > 127 || n.start < 0.0 || n.duration <= 0.0)
        {
            return Err(invalid(format!("invalid note {note:?}")));
        }
        Ok(())
    }
}

/// External MIDI instrument and clip manager.
pub trait MidiManager: Send {
    /// Start playback of `clip` on the track's instrument.
    fn schedule_clip(&mut self, track: TrackId, clip: &MidiClip) -> Result<()>;

    fn stop_clip(&mut self, track: TrackId, clip: ClipId);

    fn create_instrument(&mut self, track: TrackId, instrument: &str) -> Result<()>;

    fn dispose_instrument(&mut self, track: TrackId);

    fn start_note_recording(&mut self, track: TrackId) -> Result<()>;

    /// Finish capture and hand back the recorded clip.
    fn stop_note_recording(&mut self, track: TrackId) -> Result<MidiClip>;
}
