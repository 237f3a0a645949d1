//! Serializable project shape.
//!
//! Snapshots are read-only views built from live engine state. Field names
//! follow the project JSON layout (`camelCase`, track kind under `type`).

use crate::midi::MidiClip;
use crate::track::Track;
use dawg_core::{BufferInfo, Clip, ClipId, Effect, TimeSignature, TrackId, TrackKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSnapshot {
    pub sample_rate: f64,
    pub tempo: f64,
    pub time_signature: TimeSignature,
    pub tracks: Vec<TrackSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackSnapshot {
    pub id: TrackId,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: TrackKind,
    pub color: String,
    pub volume: f32,
    pub pan: f32,
    pub mute: bool,
    pub solo: bool,
    pub effects: Vec<EffectSnapshot>,
    pub clips: Vec<ClipSnapshot>,
    pub midi_clips: Vec<MidiClip>,
}

impl From<&Track> for TrackSnapshot {
    fn from(track: &Track) -> Self {
        Self {
            id: track.id(),
            name: track.name().to_string(),
            kind: track.kind(),
            color: track.color().to_string(),
            volume: track.volume(),
            pan: track.pan(),
            mute: track.is_muted(),
            solo: track.is_soloed(),
            effects: track.effects().iter().map(|e| EffectSnapshot::from(&**e)).collect(),
            clips: track.clips().iter().map(ClipSnapshot::from).collect(),
            midi_clips: track.midi_clips().to_vec(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectSnapshot {
    pub name: String,
    pub parameters: BTreeMap<String, f32>,
}

impl From<&dyn Effect> for EffectSnapshot {
    fn from(effect: &dyn Effect) -> Self {
        Self {
            name: effect.name().to_string(),
            parameters: effect.parameters().values(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClipSnapshot {
    pub id: ClipId,
    pub track_id: TrackId,
    pub start_time: f64,
    pub duration: f64,
    pub offset: f64,
    pub gain: f32,
    pub fade_in: f64,
    pub fade_out: f64,
    pub playback_rate: f64,
    #[serde(rename = "loop")]
    pub looped: bool,
    pub buffer: BufferInfo,
}

impl From<&Clip> for ClipSnapshot {
    fn from(clip: &Clip) -> Self {
        Self {
            id: clip.id(),
            track_id: clip.track_id(),
            start_time: clip.start_time(),
            duration: clip.duration(),
            offset: clip.offset(),
            gain: clip.gain(),
            fade_in: clip.fade_in(),
            fade_out: clip.fade_out(),
            playback_rate: clip.playback_rate(),
            looped: clip.is_looped(),
            buffer: clip.buffer().info(),
        }
    }
}
