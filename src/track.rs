//! Tracks: clip timeline, effect chain and channel strip.
//!
//! Signal flow per block:
//!
//! ```text
//! clip voices + monitored input + send input -> effects -> volume/mute/solo -> pan -> meter -> output
//! ```
//!
//! Clip starts are registered in a per-track [`Scheduler`] at the exact
//! transport sample of the clip's start time. Editing or removing a clip
//! updates or cancels that registration, so a removed clip never sounds.

use crate::midi::MidiClip;
use crate::Result;
use dawg_core::transport::seconds_to_samples;
use dawg_core::{
    check_range, db_to_linear, stereo_pan, AtomicAmplitude, AtomicFlag, AtomicFloat, AudioBuffer,
    Clip, ClipId, ClipSpec, Effect, EventId, Scheduler, TrackId, TrackKind, TrackLevel,
    TransportSegment,
};
use dawg_sampler::{Recorder, RecordingDevice, RecordingState};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

pub const MIN_VOLUME_DB: f32 = -60.0;
pub const MAX_VOLUME_DB: f32 = 12.0;

const VOICE_CAPACITY: usize = 64;

/// Settings for [`AudioEngine::add_track`](crate::AudioEngine::add_track).
#[derive(Debug, Clone, PartialEq)]
pub struct TrackConfig {
    pub name: String,
    pub kind: TrackKind,
    pub color: String,
    /// `None` leaves the volume at 0 dB and marks it as not explicitly set.
    pub volume_db: Option<f32>,
    pub pan: f32,
}

impl Default for TrackConfig {
    fn default() -> Self {
        Self {
            name: "Track".into(),
            kind: TrackKind::Audio,
            color: "#4a90d9".into(),
            volume_db: None,
            pan: 0.0,
        }
    }
}

impl TrackConfig {
    pub fn new(name: impl Into<String>, kind: TrackKind) -> Self {
        Self {
            name: name.into(),
            kind,
            ..Default::default()
        }
    }

    pub fn audio(name: impl Into<String>) -> Self {
        Self::new(name, TrackKind::Audio)
    }

    pub fn midi(name: impl Into<String>) -> Self {
        Self::new(name, TrackKind::Midi)
    }

    pub fn aux(name: impl Into<String>) -> Self {
        Self::new(name, TrackKind::Aux)
    }

    pub fn color(mut self, color: impl Into<String>) -> Self {
        self.color = color.into();
        self
    }

    pub fn volume_db(mut self, db: f32) -> Self {
        self.volume_db = Some(db);
        self
    }

    pub fn pan(mut self, pan: f32) -> Self {
        self.pan = pan;
        self
    }
}

/// Channel-strip values shared with the audio path.
#[derive(Debug)]
pub struct ChannelControls {
    volume_db: AtomicFloat,
    volume_explicit: AtomicFlag,
    pan: AtomicFloat,
    muted: AtomicFlag,
    soloed: AtomicFlag,
}

impl ChannelControls {
    fn new() -> Self {
        Self {
            volume_db: AtomicFloat::new(0.0),
            volume_explicit: AtomicFlag::new(false),
            pan: AtomicFloat::new(0.0),
            muted: AtomicFlag::new(false),
            soloed: AtomicFlag::new(false),
        }
    }

    pub fn volume_db(&self) -> f32 {
        self.volume_db.get()
    }

    /// Whether the volume was ever set explicitly.
    pub fn volume_explicit(&self) -> bool {
        self.volume_explicit.get()
    }

    pub fn set_volume_db(&self, db: f32) -> dawg_core::Result<()> {
        check_range("volume", db as f64, MIN_VOLUME_DB as f64, MAX_VOLUME_DB as f64)?;
        self.volume_db.set(db);
        self.volume_explicit.set(true);
        Ok(())
    }

    pub fn pan(&self) -> f32 {
        self.pan.get()
    }

    pub fn set_pan(&self, pan: f32) -> dawg_core::Result<()> {
        check_range("pan", pan as f64, -1.0, 1.0)?;
        self.pan.set(pan);
        Ok(())
    }

    pub fn is_muted(&self) -> bool {
        self.muted.get()
    }

    pub fn set_muted(&self, muted: bool) {
        self.muted.set(muted);
    }

    pub fn is_soloed(&self) -> bool {
        self.soloed.get()
    }

    pub fn set_soloed(&self, soloed: bool) {
        self.soloed.set(soloed);
    }

    /// Audible in a mix where `any_solo` says whether some track is soloed.
    pub fn is_audible(&self, any_solo: bool) -> bool {
        !self.is_muted() && (!any_solo || self.is_soloed())
    }
}

/// A clip that is currently sounding.
#[derive(Debug, Clone, Copy)]
struct Voice {
    clip: ClipId,
    /// Transport sample the clip's first frame lines up with.
    start: u64,
}

/// Stereo scratch pair sized to the engine's max block.
#[derive(Debug, Clone)]
struct Stereo {
    left: Vec<f32>,
    right: Vec<f32>,
}

impl Stereo {
    fn new(frames: usize) -> Self {
        Self {
            left: vec![0.0; frames],
            right: vec![0.0; frames],
        }
    }

    fn clear(&mut self) {
        self.left.fill(0.0);
        self.right.fill(0.0);
    }
}

pub struct Track {
    id: TrackId,
    name: String,
    kind: TrackKind,
    color: String,
    controls: Arc<ChannelControls>,
    effects: Vec<Box<dyn Effect>>,
    clips: Vec<Clip>,
    midi_clips: Vec<MidiClip>,
    instrument: Option<String>,
    scheduler: Scheduler<ClipId>,
    scheduled: HashMap<ClipId, EventId>,
    voices: Vec<Voice>,
    sends: BTreeMap<TrackId, Arc<AtomicFloat>>,
    recorder: Recorder,
    meter: Arc<AtomicAmplitude>,
    sample_rate: f64,
    max_block: usize,
    output: Stereo,
    send_input: Stereo,
    send_accum: Stereo,
}

impl std::fmt::Debug for Track {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Track")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("clips", &self.clips.len())
            .field("effects", &self.effects.len())
            .finish()
    }
}

impl Track {
    pub(crate) fn new(
        id: TrackId,
        config: TrackConfig,
        sample_rate: f64,
        max_block: usize,
    ) -> Result<Self> {
        let controls = Arc::new(ChannelControls::new());
        if let Some(db) = config.volume_db {
            controls.set_volume_db(db)?;
        }
        controls.set_pan(config.pan)?;

        Ok(Self {
            id,
            name: config.name,
            kind: config.kind,
            color: config.color,
            controls,
            effects: Vec::new(),
            clips: Vec::new(),
            midi_clips: Vec::new(),
            instrument: None,
            scheduler: Scheduler::new(),
            scheduled: HashMap::new(),
            voices: Vec::with_capacity(VOICE_CAPACITY),
            sends: BTreeMap::new(),
            recorder: Recorder::new(sample_rate),
            meter: Arc::new(AtomicAmplitude::new()),
            sample_rate,
            max_block,
            output: Stereo::new(max_block),
            send_input: Stereo::new(max_block),
            send_accum: Stereo::new(max_block),
        })
    }

    pub fn id(&self) -> TrackId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn kind(&self) -> TrackKind {
        self.kind
    }

    pub fn color(&self) -> &str {
        &self.color
    }

    pub fn set_color(&mut self, color: impl Into<String>) {
        self.color = color.into();
    }

    // =========================================================================
    // Channel strip
    // =========================================================================

    /// Shared control cells, usable from other threads.
    pub fn controls(&self) -> Arc<ChannelControls> {
        Arc::clone(&self.controls)
    }

    pub fn volume(&self) -> f32 {
        self.controls.volume_db()
    }

    /// Volume in dB, `-60.0..=12.0`. Out-of-range values fail.
    pub fn set_volume(&mut self, db: f32) -> Result<()> {
        Ok(self.controls.set_volume_db(db)?)
    }

    pub fn pan(&self) -> f32 {
        self.controls.pan()
    }

    /// Pan in `-1.0..=1.0`. Out-of-range values fail.
    pub fn set_pan(&mut self, pan: f32) -> Result<()> {
        Ok(self.controls.set_pan(pan)?)
    }

    pub fn is_muted(&self) -> bool {
        self.controls.is_muted()
    }

    pub fn set_mute(&mut self, muted: bool) {
        self.controls.set_muted(muted);
    }

    pub fn is_soloed(&self) -> bool {
        self.controls.is_soloed()
    }

    pub fn set_solo(&mut self, soloed: bool) {
        self.controls.set_soloed(soloed);
    }

    /// Latest post-fader peak/RMS.
    pub fn level(&self) -> TrackLevel {
        self.meter.get()
    }

    // =========================================================================
    // Effects
    // =========================================================================

    pub fn effects(&self) -> &[Box<dyn Effect>] {
        &self.effects
    }

    pub fn effect_count(&self) -> usize {
        self.effects.len()
    }

    pub fn add_effect(&mut self, effect: Box<dyn Effect>) {
        let index = self.effects.len();
        self.insert_prepared(index, effect);
    }

    pub fn insert_effect(&mut self, index: usize, effect: Box<dyn Effect>) -> Result<()> {
        check_range("effect index", index as f64, 0.0, self.effects.len() as f64)?;
        self.insert_prepared(index, effect);
        Ok(())
    }

    fn insert_prepared(&mut self, index: usize, mut effect: Box<dyn Effect>) {
        effect.prepare(self.sample_rate, self.max_block);
        tracing::debug!(track = %self.id, effect = effect.name(), index, "effect added");
        self.effects.insert(index, effect);
    }

    pub fn remove_effect(&mut self, index: usize) -> Result<Box<dyn Effect>> {
        self.check_effect_index(index)?;
        Ok(self.effects.remove(index))
    }

    /// Move the effect at `from` so it ends up at `to`.
    pub fn move_effect(&mut self, from: usize, to: usize) -> Result<()> {
        self.check_effect_index(from)?;
        self.check_effect_index(to)?;
        let effect = self.effects.remove(from);
        self.effects.insert(to, effect);
        Ok(())
    }

    pub fn set_effect_parameter(&mut self, index: usize, name: &str, value: f32) -> Result<()> {
        self.check_effect_index(index)?;
        Ok(self.effects[index].set_parameter(name, value)?)
    }

    fn check_effect_index(&self, index: usize) -> Result<()> {
        if index >= self.effects.len() {
            return Err(dawg_core::Error::out_of_range(
                "effect index",
                index as f64,
                0.0,
                self.effects.len() as f64 - 1.0,
            )
            .into());
        }
        Ok(())
    }

    // =========================================================================
    // Clips
    // =========================================================================

    pub fn clips(&self) -> &[Clip] {
        &self.clips
    }

    pub fn clip(&self, id: ClipId) -> Option<&Clip> {
        self.clips.iter().find(|c| c.id() == id)
    }

    pub fn clip_count(&self) -> usize {
        self.clips.len()
    }

    /// Build a clip from `spec` and schedule it.
    pub fn add_clip(&mut self, spec: ClipSpec) -> Result<ClipId> {
        self.require_kind(TrackKind::Audio, "audio clips")?;
        let clip = Clip::new(self.id, spec)?;
        Ok(self.insert_clip(clip))
    }

    fn insert_clip(&mut self, clip: Clip) -> ClipId {
        let id = clip.id();
        let at = seconds_to_samples(clip.start_time(), self.sample_rate);
        self.scheduled.insert(id, self.scheduler.schedule(at, id));
        tracing::debug!(track = %self.id, clip = %id, at, "clip scheduled");
        self.clips.push(clip);
        id
    }

    /// Remove a clip and cancel its pending start.
    pub fn remove_clip(&mut self, id: ClipId) -> Result<Clip> {
        let index = self.clip_index(id)?;
        if let Some(event) = self.scheduled.remove(&id) {
            self.scheduler.cancel(event);
        }
        self.voices.retain(|v| v.clip != id);
        Ok(self.clips.remove(index))
    }

    /// Apply a geometry edit and keep the schedule in step with the result.
    pub fn edit_clip(
        &mut self,
        id: ClipId,
        edit: impl FnOnce(&mut Clip) -> dawg_core::Result<()>,
    ) -> Result<()> {
        let index = self.clip_index(id)?;
        edit(&mut self.clips[index])?;
        let at = seconds_to_samples(self.clips[index].start_time(), self.sample_rate);
        if let Some(&event) = self.scheduled.get(&id) {
            self.scheduler.reschedule(event, at);
        }
        self.voices.retain(|v| v.clip != id);
        Ok(())
    }

    pub fn move_clip(&mut self, id: ClipId, start_time: f64) -> Result<()> {
        self.edit_clip(id, |clip| clip.move_to(start_time))
    }

    pub fn trim_clip_start(&mut self, id: ClipId, amount: f64) -> Result<()> {
        self.edit_clip(id, |clip| clip.trim_start(amount))
    }

    pub fn trim_clip_end(&mut self, id: ClipId, amount: f64) -> Result<()> {
        self.edit_clip(id, |clip| clip.trim_end(amount))
    }

    /// Split a clip at timeline position `time`; returns the id of the new
    /// second half.
    pub fn split_clip(&mut self, id: ClipId, time: f64) -> Result<ClipId> {
        let index = self.clip_index(id)?;
        let (first, second) = self.clips[index].split(time).ok_or_else(|| {
            dawg_core::Error::InvalidClipData(format!("split point {time} is outside {id}"))
        })?;
        self.clips[index] = first;
        self.voices.retain(|v| v.clip != id);
        Ok(self.insert_clip(second))
    }

    fn clip_index(&self, id: ClipId) -> Result<usize> {
        self.clips
            .iter()
            .position(|c| c.id() == id)
            .ok_or_else(|| dawg_core::Error::ClipNotFound(id).into())
    }

    /// Number of pending clip starts.
    pub fn scheduled_count(&self) -> usize {
        self.scheduler.len()
    }

    // =========================================================================
    // MIDI
    // =========================================================================

    pub fn midi_clips(&self) -> &[MidiClip] {
        &self.midi_clips
    }

    pub fn instrument(&self) -> Option<&str> {
        self.instrument.as_deref()
    }

    pub(crate) fn push_midi_clip(&mut self, clip: MidiClip) {
        self.midi_clips.push(clip);
    }

    pub(crate) fn take_midi_clip(&mut self, id: ClipId) -> Result<MidiClip> {
        let index = self
            .midi_clips
            .iter()
            .position(|c| c.id == id)
            .ok_or(dawg_core::Error::ClipNotFound(id))?;
        Ok(self.midi_clips.remove(index))
    }

    pub(crate) fn set_instrument(&mut self, instrument: Option<String>) {
        self.instrument = instrument;
    }

    pub(crate) fn require_kind(&self, kind: TrackKind, what: &str) -> Result<()> {
        if self.kind != kind {
            return Err(dawg_core::Error::InvalidTrackType(format!(
                "{what} need a {kind} track, {} is {}",
                self.id, self.kind
            ))
            .into());
        }
        Ok(())
    }

    // =========================================================================
    // Sends
    // =========================================================================

    /// Create or replace a post-fader send to `target`.
    pub fn send_to(&mut self, target: TrackId, amount: f32) -> Result<()> {
        if target == self.id {
            return Err(dawg_core::Error::InvalidTrackType(format!(
                "{} cannot send to itself",
                self.id
            ))
            .into());
        }
        check_range("send amount", amount as f64, 0.0, 1.0)?;
        match self.sends.get(&target) {
            Some(cell) => cell.set(amount),
            None => {
                self.sends.insert(target, Arc::new(AtomicFloat::new(amount)));
            }
        }
        Ok(())
    }

    pub fn remove_send(&mut self, target: TrackId) -> bool {
        self.sends.remove(&target).is_some()
    }

    /// `(target, amount)` for every send, ordered by target id.
    pub fn sends(&self) -> Vec<(TrackId, f32)> {
        self.sends.iter().map(|(&t, cell)| (t, cell.get())).collect()
    }

    pub(crate) fn send_cells(&self) -> impl Iterator<Item = (TrackId, f32)> + '_ {
        self.sends.iter().map(|(&t, cell)| (t, cell.get()))
    }

    // =========================================================================
    // Recording
    // =========================================================================

    pub fn recording_state(&self) -> RecordingState {
        self.recorder.state()
    }

    pub fn is_recording(&self) -> bool {
        self.recorder.is_recording()
    }

    pub fn start_recording(&mut self, device: Box<dyn RecordingDevice>) -> Result<()> {
        self.require_kind(TrackKind::Audio, "audio recordings")?;
        self.recorder.start(device)?;
        Ok(())
    }

    /// Finish the take and place it as a new clip at `at_time`.
    pub fn stop_recording(&mut self, at_time: f64) -> Result<ClipId> {
        let take = self.recorder.stop()?;
        let spec = ClipSpec::new(Arc::new(take)).start_time(at_time.max(0.0));
        let clip = Clip::new(self.id, spec)?;
        Ok(self.insert_clip(clip))
    }

    pub fn cancel_recording(&mut self) -> bool {
        self.recorder.cancel()
    }

    // =========================================================================
    // Audio path
    // =========================================================================

    /// Start voices for clips already sounding at transport sample `position`.
    ///
    /// Clips starting exactly at `position` are left to the scheduler.
    pub(crate) fn chase(&mut self, position: u64) {
        self.voices.clear();
        for clip in &self.clips {
            let start = seconds_to_samples(clip.start_time(), self.sample_rate);
            if start < position && position < start + clip_frames(clip, self.sample_rate) {
                self.voices.push(Voice {
                    clip: clip.id(),
                    start,
                });
            }
        }
    }

    pub(crate) fn stop_voices(&mut self) {
        self.voices.clear();
    }

    /// Make last block's send input current.
    pub(crate) fn begin_block(&mut self) {
        std::mem::swap(&mut self.send_input, &mut self.send_accum);
        self.send_accum.clear();
    }

    pub(crate) fn accumulate_send(&mut self, left: &[f32], right: &[f32], amount: f32) {
        for (d, s) in self.send_accum.left.iter_mut().zip(left) {
            *d += s * amount;
        }
        for (d, s) in self.send_accum.right.iter_mut().zip(right) {
            *d += s * amount;
        }
    }

    /// Render `frames` into the track output.
    pub(crate) fn process(&mut self, frames: usize, segments: &[TransportSegment], audible: bool) {
        let frames = frames.min(self.max_block);
        self.output.left[..frames].fill(0.0);
        self.output.right[..frames].fill(0.0);

        for segment in segments {
            if segment.wrapped {
                self.chase(segment.start);
            }
            self.render_segment(segment);
        }
        self.recorder.monitor(
            &mut self.output.left[..frames],
            &mut self.output.right[..frames],
        );

        let Self {
            output,
            send_input,
            effects,
            controls,
            meter,
            ..
        } = self;
        let left = &mut output.left[..frames];
        let right = &mut output.right[..frames];

        for (d, s) in left.iter_mut().zip(&send_input.left) {
            *d += s;
        }
        for (d, s) in right.iter_mut().zip(&send_input.right) {
            *d += s;
        }

        for effect in effects.iter_mut() {
            effect.process(left, right);
        }

        let gain = if audible {
            db_to_linear(controls.volume_db())
        } else {
            0.0
        };
        for s in left.iter_mut().chain(right.iter_mut()) {
            *s *= gain;
        }
        stereo_pan(controls.pan(), left, right);
        meter.measure(left, right);
    }

    fn render_segment(&mut self, segment: &TransportSegment) {
        let Self {
            scheduler,
            voices,
            clips,
            output,
            sample_rate,
            ..
        } = self;
        let sr = *sample_rate;

        scheduler.for_each_in(segment.start..segment.end(), |at, &clip| {
            voices.push(Voice { clip, start: at });
        });

        let range = segment.offset..segment.offset + segment.len;
        let left = &mut output.left[range.clone()];
        let right = &mut output.right[range];

        voices.retain(|voice| {
            let Some(clip) = clips.iter().find(|c| c.id() == voice.clip) else {
                return false;
            };
            let first = voice.start.saturating_sub(segment.start) as usize;
            if first >= segment.len {
                return true;
            }
            let voice_end = voice.start + clip_frames(clip, sr);
            let end = (voice_end.saturating_sub(segment.start) as usize).min(segment.len);
            if end <= first {
                return false;
            }
            let elapsed = segment.start + first as u64 - voice.start;
            let sounding = clip.mix_into(
                &mut left[first..end],
                &mut right[first..end],
                elapsed,
                sr,
                1.0,
            );
            sounding && voice_end > segment.end()
        });
    }

    pub(crate) fn output(&self, frames: usize) -> (&[f32], &[f32]) {
        let frames = frames.min(self.max_block);
        (&self.output.left[..frames], &self.output.right[..frames])
    }

    /// Tear the track down in dependency order. Returns the removed clips so
    /// the caller can recycle their buffers.
    pub(crate) fn dispose(&mut self) -> Vec<Clip> {
        if self.recorder.cancel() {
            tracing::debug!(track = %self.id, "recording cancelled on dispose");
        }
        self.voices.clear();
        self.scheduler.clear();
        self.scheduled.clear();
        self.midi_clips.clear();
        self.instrument = None;
        self.sends.clear();
        for effect in &mut self.effects {
            effect.reset();
        }
        self.effects.clear();
        self.send_input.clear();
        self.send_accum.clear();
        self.output.clear();
        self.meter.reset();
        std::mem::take(&mut self.clips)
    }

    /// Buffers referenced by this track's clips.
    pub fn buffers(&self) -> impl Iterator<Item = &Arc<AudioBuffer>> {
        self.clips.iter().map(Clip::buffer)
    }
}

/// Frames a clip occupies on the timeline once started.
///
/// Looped clips fill their `duration`; others play their region once.
fn clip_frames(clip: &Clip, sample_rate: f64) -> u64 {
    let seconds = if clip.is_looped() {
        clip.duration()
    } else {
        clip.audible_span()
    };
    (seconds * sample_rate).round() as u64
}
