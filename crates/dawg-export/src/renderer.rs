//! Offline renderer for audio export
//!
//! The `OfflineRenderer` mixes a `RenderJob` down to a stereo buffer in one
//! synchronous pass. Output is bit-identical for identical jobs: the only
//! randomness (fallback tone frequency) comes from a seeded generator.
//!
//! Gain staging, per active track:
//!
//! ```text
//! source -> effects -> headroom stage -> pan -> master (gain by track count)
//! ```

use crate::error::{ExportError, Result};
use crate::types::{RenderJob, RenderSend, RenderTrack};
use dawg_core::{
    db_to_linear, stereo_pan, AudioBuffer, EffectCapability, OfflineContext, TrackKind,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeSet;
use std::f64::consts::TAU;

/// Progress callback for render operations (0.0 to 1.0)
pub type RenderProgressCallback = Box<dyn Fn(f32) + Send>;

/// Block size handed to effects when none is configured.
pub const DEFAULT_RENDER_BLOCK: usize = 512;

/// Centre frequency of the fallback test tone.
pub const FALLBACK_TONE_HZ: f64 = 440.0;
/// Maximum deviation from [`FALLBACK_TONE_HZ`].
pub const FALLBACK_TONE_SPREAD_HZ: f64 = 50.0;
/// Fade in/out length of the fallback tone, in seconds.
pub const FALLBACK_TONE_FADE: f64 = 0.05;
/// Amplitude of the liveness sine rendered when no track is active.
pub const LIVENESS_AMPLITUDE: f32 = 0.5;

/// Master gain for `active` audible tracks.
pub fn master_gain(active: usize) -> f32 {
    match active {
        0 => 0.1,
        1 => 0.5,
        2 | 3 => 0.8,
        n => 0.6 / (n as f32).sqrt(),
    }
}

/// Per-track headroom stage for `active` audible tracks.
pub fn baseline_gain(active: usize) -> f32 {
    match active {
        0 | 1 => 0.32,
        2 | 3 => 0.20,
        _ => 0.15,
    }
}

/// Result of a render operation
#[derive(Debug, Clone)]
pub struct RenderResult {
    /// Stereo mixdown
    pub buffer: AudioBuffer,
    /// Peak level (linear)
    pub peak_level: f32,
    /// Tracks that contributed to the mix
    pub active_tracks: usize,
}

impl RenderResult {
    pub fn duration_seconds(&self) -> f64 {
        self.buffer.duration()
    }

    pub fn length_samples(&self) -> usize {
        self.buffer.len()
    }

    /// Interleaved stereo data [L, R, L, R, ...]
    pub fn interleaved(&self) -> Vec<f32> {
        self.buffer.to_interleaved()
    }
}

/// Offline audio renderer
pub struct OfflineRenderer {
    block_size: usize,
    progress: Option<RenderProgressCallback>,
}

impl Default for OfflineRenderer {
    fn default() -> Self {
        Self::new(DEFAULT_RENDER_BLOCK)
    }
}

impl OfflineRenderer {
    pub fn new(block_size: usize) -> Self {
        Self {
            block_size: block_size.max(1),
            progress: None,
        }
    }

    /// Report progress after each track.
    pub fn with_progress(mut self, callback: RenderProgressCallback) -> Self {
        self.progress = Some(callback);
        self
    }

    /// Render a job to a stereo buffer.
    pub fn render(&self, job: &RenderJob) -> Result<RenderResult> {
        validate(job)?;

        let sr = job.sample_rate;
        let total = job.total_samples();
        let any_solo = job.tracks.iter().any(|t| t.soloed);
        let active: Vec<bool> = job.tracks.iter().map(|t| t.is_active(any_solo)).collect();
        let active_count = active.iter().filter(|&&a| a).count();

        for (track, _) in job.tracks.iter().zip(&active).filter(|(_, on)| **on) {
            if let Some(fx) = track
                .effects
                .iter()
                .find(|fx| fx.capability() != EffectCapability::OfflineCapable)
            {
                return Err(ExportError::Render(format!(
                    "effect '{}' on track '{}' is not offline-capable",
                    fx.name(),
                    track.name
                )));
            }
        }

        let mut master = AudioBuffer::new(2, total, sr);
        let master_scale = master_gain(active_count);

        if active_count == 0 {
            liveness_tone(&mut master, sr);
        } else {
            let ctx = OfflineContext {
                sample_rate: sr,
                block_size: self.block_size,
            };
            let baseline = baseline_gain(active_count);
            let mut send_inputs: Vec<Option<AudioBuffer>> = vec![None; job.tracks.len()];
            let mut done = 0usize;

            for index in render_order(job, &active)? {
                let track = &job.tracks[index];
                let mut signal = AudioBuffer::new(2, total, sr);
                let stage = render_source(track, index, job, baseline, &mut signal);
                if let Some(input) = send_inputs[index].take() {
                    mix(&mut signal, &input, 1.0);
                }

                let mut scratch = AudioBuffer::new(2, total, sr);
                for effect in &track.effects {
                    let mut fx = effect.clone();
                    fx.apply_offline(&ctx, &signal, &mut scratch)?;
                    std::mem::swap(&mut signal, &mut scratch);
                }

                if let Some((left, right)) = signal.stereo_mut() {
                    for s in left.iter_mut().chain(right.iter_mut()) {
                        *s *= stage;
                    }
                    stereo_pan(track.pan, left, right);
                }

                for send in feeding_sends(track, &active) {
                    let input = send_inputs[send.target]
                        .get_or_insert_with(|| AudioBuffer::new(2, total, sr));
                    mix(input, &signal, send.amount);
                }

                mix(&mut master, &signal, 1.0);

                done += 1;
                if let Some(ref callback) = self.progress {
                    callback(done as f32 / active_count as f32);
                }
            }
        }

        if let Some((left, right)) = master.stereo_mut() {
            for s in left.iter_mut().chain(right.iter_mut()) {
                *s *= master_scale;
            }
        }

        let peak_level = master.peak();
        tracing::info!(
            samples = total,
            active_tracks = active_count,
            peak = peak_level,
            "offline render complete"
        );

        if let Some(ref callback) = self.progress {
            callback(1.0);
        }

        Ok(RenderResult {
            buffer: master,
            peak_level,
            active_tracks: active_count,
        })
    }
}

fn validate(job: &RenderJob) -> Result<()> {
    if !(job.sample_rate.is_finite() && job.sample_rate > 0.0) {
        return Err(ExportError::InvalidData(format!(
            "sample rate must be positive, got {}",
            job.sample_rate
        )));
    }
    if !(job.duration.is_finite() && job.duration >= 0.0) {
        return Err(ExportError::InvalidData(format!(
            "duration must be >= 0, got {}",
            job.duration
        )));
    }
    if !(job.tail.is_finite() && job.tail >= 0.0) {
        return Err(ExportError::InvalidData(format!(
            "tail must be >= 0, got {}",
            job.tail
        )));
    }
    for track in &job.tracks {
        if let Some(send) = track.sends.iter().find(|s| s.target >= job.tracks.len()) {
            return Err(ExportError::InvalidData(format!(
                "track '{}' sends to missing track {}",
                track.name, send.target
            )));
        }
    }
    Ok(())
}

/// Sends from `track` whose target takes part in the mix.
fn feeding_sends<'a>(
    track: &'a RenderTrack,
    active: &'a [bool],
) -> impl Iterator<Item = &'a RenderSend> + 'a {
    track.sends.iter().filter(|send| active[send.target])
}

/// Active track indices, every send source ahead of its target and ties
/// broken by insertion order.
///
/// A send cycle has no offline order and fails the render.
fn render_order(job: &RenderJob, active: &[bool]) -> Result<Vec<usize>> {
    let mut incoming = vec![0usize; job.tracks.len()];
    for (track, _) in job.tracks.iter().zip(active).filter(|(_, on)| **on) {
        for send in feeding_sends(track, active) {
            incoming[send.target] += 1;
        }
    }

    let mut ready: BTreeSet<usize> = (0..job.tracks.len())
        .filter(|&i| active[i] && incoming[i] == 0)
        .collect();
    let mut order = Vec::with_capacity(ready.len());
    while let Some(index) = ready.pop_first() {
        order.push(index);
        for send in feeding_sends(&job.tracks[index], active) {
            incoming[send.target] -= 1;
            if incoming[send.target] == 0 {
                ready.insert(send.target);
            }
        }
    }

    let expected = active.iter().filter(|&&a| a).count();
    if order.len() != expected {
        let stuck: Vec<&str> = job
            .tracks
            .iter()
            .zip(&incoming)
            .filter(|(_, n)| **n > 0)
            .map(|(t, _)| t.name.as_str())
            .collect();
        return Err(ExportError::Render(format!(
            "send cycle between tracks {stuck:?}"
        )));
    }
    Ok(order)
}

/// Write the track's source signal into `out` and return the stage gain
/// applied after its effects.
fn render_source(
    track: &RenderTrack,
    index: usize,
    job: &RenderJob,
    baseline: f32,
    out: &mut AudioBuffer,
) -> f32 {
    let sr = job.sample_rate;
    let total_seconds = job.total_seconds();
    let total = out.len();

    if !track.clips.is_empty() {
        let gain = db_to_linear(track.volume_db);
        let Some((left, right)) = out.stereo_mut() else {
            return baseline;
        };
        for clip in track.clips.iter().filter(|c| c.start_time() < total_seconds) {
            let start = ((clip.start_time() * sr).round() as usize).min(total);
            let end = if clip.is_looped() {
                ((clip.end_time() * sr).round() as usize).clamp(start, total)
            } else {
                total
            };
            clip.mix_into(&mut left[start..end], &mut right[start..end], 0, sr, gain);
        }
        return baseline;
    }

    if track.kind == TrackKind::Audio && job.config.fallback_tone {
        let mut rng = StdRng::seed_from_u64(job.config.seed ^ index as u64);
        let freq = FALLBACK_TONE_HZ + rng.gen_range(-1.0..=1.0) * FALLBACK_TONE_SPREAD_HZ;
        tracing::debug!(track = %track.name, freq, "rendering fallback tone");
        fallback_tone(out, freq, sr);
    }

    if track.volume_explicit {
        db_to_linear(track.volume_db)
    } else {
        baseline
    }
}

fn fallback_tone(out: &mut AudioBuffer, freq: f64, sr: f64) {
    let total = out.len();
    let fade = ((FALLBACK_TONE_FADE * sr).round() as usize).max(1);
    let Some((left, right)) = out.stereo_mut() else {
        return;
    };
    for (n, (l, r)) in left.iter_mut().zip(right.iter_mut()).enumerate() {
        let env = (n as f64 / fade as f64)
            .min((total - n) as f64 / fade as f64)
            .min(1.0);
        let s = ((TAU * freq * n as f64 / sr).sin() * env) as f32;
        *l = s;
        *r = s;
    }
}

fn liveness_tone(out: &mut AudioBuffer, sr: f64) {
    let Some((left, right)) = out.stereo_mut() else {
        return;
    };
    for (n, (l, r)) in left.iter_mut().zip(right.iter_mut()).enumerate() {
        let s = (TAU * FALLBACK_TONE_HZ * n as f64 / sr).sin() as f32 * LIVENESS_AMPLITUDE;
        *l = s;
        *r = s;
    }
}

fn mix(dest: &mut AudioBuffer, src: &AudioBuffer, amount: f32) {
    for ch in 0..2 {
        for (d, s) in dest.channel_mut(ch).iter_mut().zip(src.channel(ch)) {
            *d += s * amount;
        }
    }
}
