//! Timeline clips: placed, trimmed regions of a shared sample buffer.
//!
//! All geometry is in seconds. A clip reads `duration` seconds of its buffer
//! starting at `offset` and is placed at `start_time` on the track timeline.
//! `playback_rate` scales how fast the region is read, so the audible span is
//! `duration / playback_rate`.

use crate::{AudioBuffer, ClipId, Error, Result, TrackId};
use std::sync::Arc;

/// Tolerance for geometry comparisons (float drift from repeated edits).
pub const TIME_EPSILON: f64 = 1e-9;

/// Constructor input for [`Clip::new`].
#[derive(Debug, Clone)]
pub struct ClipSpec {
    pub buffer: Arc<AudioBuffer>,
    pub start_time: f64,
    /// `None` plays the buffer from `offset` to its end.
    pub duration: Option<f64>,
    pub offset: f64,
    pub gain: f32,
    pub fade_in: f64,
    pub fade_out: f64,
    pub playback_rate: f64,
    pub looped: bool,
}

impl ClipSpec {
    pub fn new(buffer: Arc<AudioBuffer>) -> Self {
        Self {
            buffer,
            start_time: 0.0,
            duration: None,
            offset: 0.0,
            gain: 1.0,
            fade_in: 0.0,
            fade_out: 0.0,
            playback_rate: 1.0,
            looped: false,
        }
    }

    pub fn start_time(mut self, start_time: f64) -> Self {
        self.start_time = start_time;
        self
    }

    pub fn duration(mut self, duration: f64) -> Self {
        self.duration = Some(duration);
        self
    }

    pub fn offset(mut self, offset: f64) -> Self {
        self.offset = offset;
        self
    }

    pub fn gain(mut self, gain: f32) -> Self {
        self.gain = gain;
        self
    }

    pub fn fades(mut self, fade_in: f64, fade_out: f64) -> Self {
        self.fade_in = fade_in;
        self.fade_out = fade_out;
        self
    }

    pub fn playback_rate(mut self, rate: f64) -> Self {
        self.playback_rate = rate;
        self
    }

    pub fn looped(mut self, looped: bool) -> Self {
        self.looped = looped;
        self
    }
}

/// A region of an [`AudioBuffer`] placed on a track.
///
/// `Clone` keeps the id (same clip); use [`Clip::duplicate`] for a new clip.
#[derive(Debug, Clone)]
pub struct Clip {
    id: ClipId,
    track_id: TrackId,
    buffer: Arc<AudioBuffer>,
    start_time: f64,
    duration: f64,
    offset: f64,
    gain: f32,
    fade_in: f64,
    fade_out: f64,
    playback_rate: f64,
    looped: bool,
}

fn invalid(message: impl Into<String>) -> Error {
    Error::InvalidClipData(message.into())
}

impl Clip {
    pub fn new(track_id: TrackId, spec: ClipSpec) -> Result<Self> {
        let buffer_duration = spec.buffer.duration();
        let duration = spec.duration.unwrap_or(buffer_duration - spec.offset);

        let clip = Self {
            id: ClipId::next(),
            track_id,
            buffer: spec.buffer,
            start_time: spec.start_time,
            duration,
            offset: spec.offset,
            gain: spec.gain,
            fade_in: spec.fade_in,
            fade_out: spec.fade_out,
            playback_rate: spec.playback_rate,
            looped: spec.looped,
        };
        clip.validate()?;
        Ok(clip)
    }

    /// Check every geometry invariant.
    fn validate(&self) -> Result<()> {
        if !self.start_time.is_finite() || self.start_time < 0.0 {
            return Err(invalid(format!(
                "start time must be >= 0, got {}",
                self.start_time
            )));
        }
        if !self.duration.is_finite() || self.duration <= 0.0 {
            return Err(invalid(format!(
                "duration must be > 0, got {}",
                self.duration
            )));
        }
        if !self.offset.is_finite() || self.offset < 0.0 {
            return Err(invalid(format!("offset must be >= 0, got {}", self.offset)));
        }
        let buffer_duration = self.buffer.duration();
        if self.offset + self.duration > buffer_duration + TIME_EPSILON {
            return Err(invalid(format!(
                "offset + duration ({}) exceeds buffer duration ({buffer_duration})",
                self.offset + self.duration
            )));
        }
        if !self.gain.is_finite() || self.gain < 0.0 {
            return Err(invalid(format!("gain must be >= 0, got {}", self.gain)));
        }
        for (name, fade) in [("fade in", self.fade_in), ("fade out", self.fade_out)] {
            if !fade.is_finite() || fade < 0.0 || fade > self.duration + TIME_EPSILON {
                return Err(invalid(format!(
                    "{name} must be within 0..={}, got {fade}",
                    self.duration
                )));
            }
        }
        if !self.playback_rate.is_finite() || self.playback_rate <= 0.0 {
            return Err(invalid(format!(
                "playback rate must be > 0, got {}",
                self.playback_rate
            )));
        }
        Ok(())
    }

    /// Apply `edit` to a copy and commit only if the result is valid.
    fn edit(&mut self, edit: impl FnOnce(&mut Self)) -> Result<()> {
        let mut next = self.clone();
        edit(&mut next);
        next.validate()?;
        *self = next;
        Ok(())
    }

    pub fn id(&self) -> ClipId {
        self.id
    }

    pub fn track_id(&self) -> TrackId {
        self.track_id
    }

    pub fn buffer(&self) -> &Arc<AudioBuffer> {
        &self.buffer
    }

    pub fn start_time(&self) -> f64 {
        self.start_time
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn end_time(&self) -> f64 {
        self.start_time + self.duration
    }

    pub fn offset(&self) -> f64 {
        self.offset
    }

    pub fn gain(&self) -> f32 {
        self.gain
    }

    pub fn fade_in(&self) -> f64 {
        self.fade_in
    }

    pub fn fade_out(&self) -> f64 {
        self.fade_out
    }

    pub fn playback_rate(&self) -> f64 {
        self.playback_rate
    }

    pub fn is_looped(&self) -> bool {
        self.looped
    }

    /// Seconds of timeline the region occupies when played once.
    pub fn audible_span(&self) -> f64 {
        self.duration / self.playback_rate
    }

    /// `start_time <= t < end_time`.
    pub fn contains(&self, time: f64) -> bool {
        time >= self.start_time && time < self.end_time()
    }

    /// Half-open interval overlap; clips that only touch do not overlap.
    pub fn overlaps(&self, other: &Clip) -> bool {
        self.start_time < other.end_time() && other.start_time < self.end_time()
    }

    pub fn move_to(&mut self, start_time: f64) -> Result<()> {
        self.edit(|clip| clip.start_time = start_time)
    }

    /// Cut `amount` seconds off the front, keeping the remaining audio in place.
    pub fn trim_start(&mut self, amount: f64) -> Result<()> {
        if !(amount >= 0.0) {
            return Err(invalid(format!("trim amount must be >= 0, got {amount}")));
        }
        if amount >= self.duration {
            return Err(invalid(format!(
                "trimming {amount}s would leave no audio (duration {})",
                self.duration
            )));
        }
        self.edit(|clip| {
            clip.start_time += amount;
            clip.offset += amount;
            clip.duration -= amount;
            clip.clamp_fades();
        })
    }

    /// Cut `amount` seconds off the end.
    pub fn trim_end(&mut self, amount: f64) -> Result<()> {
        if !(amount >= 0.0) {
            return Err(invalid(format!("trim amount must be >= 0, got {amount}")));
        }
        if amount >= self.duration {
            return Err(invalid(format!(
                "trimming {amount}s would leave no audio (duration {})",
                self.duration
            )));
        }
        self.edit(|clip| {
            clip.duration -= amount;
            clip.clamp_fades();
        })
    }

    fn clamp_fades(&mut self) {
        self.fade_in = self.fade_in.min(self.duration);
        self.fade_out = self.fade_out.min(self.duration);
    }

    /// Split at timeline position `time`. The first half keeps this clip's id.
    ///
    /// Returns `None` unless `start_time < time < end_time`.
    pub fn split(&self, time: f64) -> Option<(Clip, Clip)> {
        if !(time > self.start_time + TIME_EPSILON && time < self.end_time() - TIME_EPSILON) {
            return None;
        }
        let head = time - self.start_time;

        let mut first = self.clone();
        first.duration = head;
        first.fade_out = 0.0;
        first.clamp_fades();

        let mut second = self.duplicate();
        second.start_time = time;
        second.offset = self.offset + head;
        second.duration = self.duration - head;
        second.fade_in = 0.0;
        second.clamp_fades();

        Some((first, second))
    }

    /// Copy with a fresh id.
    pub fn duplicate(&self) -> Clip {
        Clip {
            id: ClipId::next(),
            ..self.clone()
        }
    }

    pub fn set_gain(&mut self, gain: f32) -> Result<()> {
        self.edit(|clip| clip.gain = gain)
    }

    pub fn set_fades(&mut self, fade_in: f64, fade_out: f64) -> Result<()> {
        self.edit(|clip| {
            clip.fade_in = fade_in;
            clip.fade_out = fade_out;
        })
    }

    pub fn set_playback_rate(&mut self, rate: f64) -> Result<()> {
        self.edit(|clip| clip.playback_rate = rate)
    }

    pub fn set_looped(&mut self, looped: bool) {
        self.looped = looped;
    }

    /// Fade envelope at `elapsed` seconds into one pass of the region.
    fn envelope(&self, elapsed: f64) -> f32 {
        let span = self.audible_span();
        let mut env = 1.0;
        if self.fade_in > 0.0 && elapsed < self.fade_in {
            env = elapsed / self.fade_in;
        }
        let remaining = span - elapsed;
        if self.fade_out > 0.0 && remaining < self.fade_out {
            env = env.min(remaining / self.fade_out);
        }
        env.clamp(0.0, 1.0) as f32
    }

    /// Add this clip's output into `left`/`right`.
    ///
    /// `elapsed_frames` is how many frames (at `sample_rate`) have passed
    /// since the clip started; index 0 of the slices is that frame. Mono
    /// buffers feed both sides. Returns `false` once a non-looped clip has
    /// played its whole region.
    pub fn mix_into(
        &self,
        left: &mut [f32],
        right: &mut [f32],
        elapsed_frames: u64,
        sample_rate: f64,
        gain: f32,
    ) -> bool {
        let frames = left.len().min(right.len());
        let buffer = &*self.buffer;
        if buffer.is_empty() {
            return false;
        }
        let stereo = buffer.channel_count() > 1;
        let span_frames = self.audible_span() * sample_rate;
        let start = self.offset * buffer.sample_rate();
        let step = self.playback_rate * buffer.sample_rate() / sample_rate;

        for i in 0..frames {
            let mut frame = (elapsed_frames + i as u64) as f64;
            if self.looped {
                frame %= span_frames;
            } else if frame >= span_frames {
                return false;
            }
            let position = start + frame * step;
            let amp = gain * self.gain * self.envelope(frame / sample_rate);

            let l = buffer.sample_at(0, position);
            let r = if stereo {
                buffer.sample_at(1, position)
            } else {
                l
            };
            left[i] += l * amp;
            right[i] += r * amp;
        }

        self.looped || ((elapsed_frames + frames as u64) as f64) < span_frames
    }
}
