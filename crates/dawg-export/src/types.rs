//! Render job types for offline mixdown
//!
//! A `RenderJob` is a detached snapshot of the project: clips share their
//! buffers through `Arc`, effects are cloned instances. Rendering a job never
//! touches live engine state.

use dawg_core::{Clip, Effect, RenderConfig, TrackKind};
use std::fmt;

/// Default tail rendered after the project duration, in seconds.
pub const DEFAULT_TAIL_SECONDS: f64 = 2.0;

/// Everything an offline pass needs, detached from live state
#[derive(Clone)]
pub struct RenderJob {
    /// Output sample rate
    pub sample_rate: f64,
    /// Project length in seconds
    pub duration: f64,
    /// Extra seconds rendered after `duration` (effect tails)
    pub tail: f64,
    /// Tracks in insertion order
    pub tracks: Vec<RenderTrack>,
    /// Fallback tone and seed
    pub config: RenderConfig,
}

impl RenderJob {
    pub fn new(sample_rate: f64, duration: f64) -> Self {
        Self {
            sample_rate,
            duration,
            tail: DEFAULT_TAIL_SECONDS,
            tracks: Vec::new(),
            config: RenderConfig::default(),
        }
    }

    pub fn with_tail(mut self, tail: f64) -> Self {
        self.tail = tail;
        self
    }

    pub fn with_track(mut self, track: RenderTrack) -> Self {
        self.tracks.push(track);
        self
    }

    pub fn with_config(mut self, config: RenderConfig) -> Self {
        self.config = config;
        self
    }

    /// Rendered length in seconds (`duration + tail`).
    pub fn total_seconds(&self) -> f64 {
        self.duration + self.tail
    }

    /// Rendered length in samples.
    pub fn total_samples(&self) -> usize {
        (self.total_seconds() * self.sample_rate).round().max(0.0) as usize
    }
}

impl fmt::Debug for RenderJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderJob")
            .field("sample_rate", &self.sample_rate)
            .field("duration", &self.duration)
            .field("tail", &self.tail)
            .field("tracks", &self.tracks)
            .field("config", &self.config)
            .finish()
    }
}

/// Post-fader send to another track in the same job, by index.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderSend {
    /// Index into `RenderJob::tracks`
    pub target: usize,
    pub amount: f32,
}

/// A track to render
#[derive(Clone)]
pub struct RenderTrack {
    pub name: String,
    pub kind: TrackKind,
    pub clips: Vec<Clip>,
    /// Serial effect chain, applied in order
    pub effects: Vec<Box<dyn Effect>>,
    /// Track volume in dB
    pub volume_db: f32,
    /// Whether `volume_db` was set explicitly (scales the fallback tone)
    pub volume_explicit: bool,
    /// Track pan (-1.0 = left, 0.0 = center, 1.0 = right)
    pub pan: f32,
    pub muted: bool,
    pub soloed: bool,
    pub sends: Vec<RenderSend>,
}

impl RenderTrack {
    pub fn new(name: impl Into<String>, kind: TrackKind) -> Self {
        Self {
            name: name.into(),
            kind,
            clips: Vec::new(),
            effects: Vec::new(),
            volume_db: 0.0,
            volume_explicit: false,
            pan: 0.0,
            muted: false,
            soloed: false,
            sends: Vec::new(),
        }
    }

    pub fn audio(name: impl Into<String>) -> Self {
        Self::new(name, TrackKind::Audio)
    }

    pub fn with_clip(mut self, clip: Clip) -> Self {
        self.clips.push(clip);
        self
    }

    pub fn with_effect(mut self, effect: Box<dyn Effect>) -> Self {
        self.effects.push(effect);
        self
    }

    /// Set an explicit volume in dB.
    pub fn with_volume_db(mut self, volume_db: f32) -> Self {
        self.volume_db = volume_db;
        self.volume_explicit = true;
        self
    }

    pub fn with_pan(mut self, pan: f32) -> Self {
        self.pan = pan;
        self
    }

    pub fn with_muted(mut self, muted: bool) -> Self {
        self.muted = muted;
        self
    }

    pub fn with_soloed(mut self, soloed: bool) -> Self {
        self.soloed = soloed;
        self
    }

    pub fn with_send(mut self, target: usize, amount: f32) -> Self {
        self.sends.push(RenderSend { target, amount });
        self
    }

    /// Audible in a mix where `any_solo` tracks are soloed.
    pub fn is_active(&self, any_solo: bool) -> bool {
        !self.muted && (!any_solo || self.soloed)
    }
}

impl fmt::Debug for RenderTrack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let effects: Vec<&str> = self.effects.iter().map(|e| e.name()).collect();
        f.debug_struct("RenderTrack")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("clips", &self.clips.len())
            .field("effects", &effects)
            .field("volume_db", &self.volume_db)
            .field("volume_explicit", &self.volume_explicit)
            .field("pan", &self.pan)
            .field("muted", &self.muted)
            .field("soloed", &self.soloed)
            .field("sends", &self.sends)
            .finish()
    }
}
