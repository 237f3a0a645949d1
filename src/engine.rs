//! AudioEngine that coordinates tracks, transport, master bus and export.

use crate::midi::{MidiClip, MidiManager};
use crate::snapshot::{ProjectSnapshot, TrackSnapshot};
use crate::track::{Track, TrackConfig};
use crate::{EngineBuilder, Error, Result};
use dawg_core::{
    AudioBuffer, AudioSession, BufferPool, ClipId, ClipSpec, EngineConfig, EngineEvent, EventBus,
    LoopRange, PoolStats, TimeSignature, TrackId, TrackKind, TransitionResult, Transport,
    TransportHandle, TransportSegment, TransportState,
};
use dawg_export::{
    ExportOptions, OfflineRenderer, RenderJob, RenderResult, RenderSend, RenderTrack,
    DEFAULT_TAIL_SECONDS,
};
use dawg_sampler::{DeviceFactory, SampleLoader};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use crate::master::MasterBus;

/// Per-track cost used by [`AudioEngine::cpu_load`].
const TRACK_LOAD: f32 = 0.02;
/// Per-effect cost used by [`AudioEngine::cpu_load`].
const EFFECT_LOAD: f32 = 0.05;

/// Upper bound on segments per block (one loop wrap is the common case).
const SEGMENT_CAPACITY: usize = 8;

/// Main audio engine.
///
/// Owns the tracks in insertion order, the transport, the master bus, the
/// buffer pool and the audio session. All control operations run on the
/// caller's thread; [`process_block`](Self::process_block) is the real-time
/// entry point and does not allocate.
///
/// # Example
///
/// ```
/// use dawg::prelude::*;
/// use std::sync::Arc;
///
/// let mut engine = AudioEngine::builder().sample_rate(48000.0).build()?;
/// let track = engine.add_track(TrackConfig::audio("Lead"))?;
///
/// let buffer = Arc::new(AudioBuffer::constant(0.5, 48000, 48000.0));
/// engine.add_clip(track, ClipSpec::new(buffer).start_time(0.25))?;
///
/// let mixdown = engine.render_offline(1.0, 0.0)?;
/// assert_eq!(mixdown.length_samples(), 48000);
/// # Ok::<(), dawg::Error>(())
/// ```
pub struct AudioEngine {
    config: EngineConfig,
    tracks: Vec<Track>,
    next_track_id: u32,
    transport: Transport,
    master: MasterBus,
    pool: BufferPool,
    events: EventBus,
    session: Box<dyn AudioSession>,
    devices: Option<DeviceFactory>,
    midi: Option<Box<dyn MidiManager>>,
    loader: Arc<dyn SampleLoader>,
    samples: HashMap<String, Arc<AudioBuffer>>,
    segments: Vec<TransportSegment>,
    mix_left: Vec<f32>,
    mix_right: Vec<f32>,
    initialized: bool,
}

impl std::fmt::Debug for AudioEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioEngine")
            .field("sample_rate", &self.config.sample_rate)
            .field("tracks", &self.tracks.len())
            .field("state", &self.transport.state())
            .field("initialized", &self.initialized)
            .finish()
    }
}

impl AudioEngine {
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    pub(crate) fn from_parts(
        config: EngineConfig,
        session: Box<dyn AudioSession>,
        devices: Option<DeviceFactory>,
        midi: Option<Box<dyn MidiManager>>,
        loader: Arc<dyn SampleLoader>,
    ) -> Result<Self> {
        let sample_rate = config.sample_rate;
        let block = config.block_size();
        let master = MasterBus::new(sample_rate, block, config.limiter_ceiling_db)?;

        tracing::debug!(sample_rate, block, "audio engine created");

        Ok(Self {
            tracks: Vec::new(),
            next_track_id: 1,
            transport: Transport::new(sample_rate),
            master,
            pool: BufferPool::new(config.buffer_pool_size, sample_rate),
            events: EventBus::new(),
            session,
            devices,
            midi,
            loader,
            samples: HashMap::new(),
            segments: Vec::with_capacity(SEGMENT_CAPACITY),
            mix_left: vec![0.0; block],
            mix_right: vec![0.0; block],
            initialized: true,
            config,
        })
    }

    pub fn sample_rate(&self) -> f64 {
        self.config.sample_rate
    }

    pub fn block_size(&self) -> usize {
        self.config.block_size()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    fn ensure_initialized(&self) -> Result<()> {
        if self.initialized {
            Ok(())
        } else {
            Err(dawg_core::Error::NotInitialized.into())
        }
    }

    /// Typed notifications. Each call returns an independent receiver.
    pub fn subscribe(&self) -> crossbeam_channel::Receiver<EngineEvent> {
        self.events.subscribe()
    }

    // =========================================================================
    // Tracks
    // =========================================================================

    /// Create a track, wire it into the master input and return its id.
    pub fn add_track(&mut self, config: TrackConfig) -> Result<TrackId> {
        self.ensure_initialized()?;
        let id = TrackId(self.next_track_id);
        let track = Track::new(id, config, self.sample_rate(), self.block_size())?;
        self.next_track_id += 1;

        let name = track.name().to_string();
        tracing::debug!(track = %id, name = %name, kind = %track.kind(), "track created");
        self.tracks.push(track);
        self.events.emit(EngineEvent::TrackCreated { id, name });
        Ok(id)
    }

    /// Dispose a track and drop every send that pointed at it.
    pub fn remove_track(&mut self, id: TrackId) -> Result<()> {
        self.ensure_initialized()?;
        let index = self.track_index(id)?;
        let mut track = self.tracks.remove(index);
        self.dispose_track(&mut track);

        for other in &mut self.tracks {
            other.remove_send(id);
        }
        tracing::debug!(track = %id, "track removed");
        self.events.emit(EngineEvent::TrackDeleted { id });
        Ok(())
    }

    fn dispose_track(&mut self, track: &mut Track) {
        track.cancel_recording();
        if let Some(midi) = self.midi.as_mut() {
            for clip in track.midi_clips() {
                midi.stop_clip(track.id(), clip.id);
            }
            if track.instrument().is_some() {
                midi.dispose_instrument(track.id());
            }
        }
        let buffers: Vec<_> = track
            .dispose()
            .into_iter()
            .map(|clip| Arc::clone(clip.buffer()))
            .collect();
        for buffer in buffers {
            self.pool.release_shared(buffer);
        }
    }

    pub fn track(&self, id: TrackId) -> Result<&Track> {
        self.ensure_initialized()?;
        self.tracks
            .iter()
            .find(|t| t.id() == id)
            .ok_or_else(|| dawg_core::Error::TrackNotFound(id).into())
    }

    pub fn track_mut(&mut self, id: TrackId) -> Result<&mut Track> {
        self.ensure_initialized()?;
        let index = self.track_index(id)?;
        Ok(&mut self.tracks[index])
    }

    fn track_index(&self, id: TrackId) -> Result<usize> {
        self.tracks
            .iter()
            .position(|t| t.id() == id)
            .ok_or_else(|| dawg_core::Error::TrackNotFound(id).into())
    }

    /// Tracks in insertion order.
    pub fn tracks(&self) -> impl Iterator<Item = &Track> {
        self.tracks.iter()
    }

    pub fn track_ids(&self) -> Vec<TrackId> {
        self.tracks.iter().map(Track::id).collect()
    }

    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    fn any_solo(&self) -> bool {
        self.tracks.iter().any(Track::is_soloed)
    }

    // =========================================================================
    // Clips
    // =========================================================================

    pub fn add_clip(&mut self, track: TrackId, spec: ClipSpec) -> Result<ClipId> {
        self.track_mut(track)?.add_clip(spec)
    }

    /// Remove a clip; its buffer goes back to the pool if nothing else holds it.
    pub fn remove_clip(&mut self, track: TrackId, clip: ClipId) -> Result<()> {
        let removed = self.track_mut(track)?.remove_clip(clip)?;
        let buffer = Arc::clone(removed.buffer());
        drop(removed);
        self.pool.release_shared(buffer);
        Ok(())
    }

    pub fn move_clip(&mut self, track: TrackId, clip: ClipId, start_time: f64) -> Result<()> {
        self.track_mut(track)?.move_clip(clip, start_time)?;
        self.rechase(track)
    }

    pub fn trim_clip_start(&mut self, track: TrackId, clip: ClipId, amount: f64) -> Result<()> {
        self.track_mut(track)?.trim_clip_start(clip, amount)?;
        self.rechase(track)
    }

    pub fn trim_clip_end(&mut self, track: TrackId, clip: ClipId, amount: f64) -> Result<()> {
        self.track_mut(track)?.trim_clip_end(clip, amount)?;
        self.rechase(track)
    }

    /// Split a clip; both halves keep sounding if the playhead is inside.
    pub fn split_clip(&mut self, track: TrackId, clip: ClipId, time: f64) -> Result<ClipId> {
        let second = self.track_mut(track)?.split_clip(clip, time)?;
        self.rechase(track)?;
        Ok(second)
    }

    /// Edited clips under a running playhead resume from the current position.
    fn rechase(&mut self, track: TrackId) -> Result<()> {
        if self.transport.is_playing() {
            let position = self.transport.position_samples();
            self.track_mut(track)?.chase(position);
        }
        Ok(())
    }

    // =========================================================================
    // Routing
    // =========================================================================

    /// Post-fader send from `from` to `to`. Replaces an existing send.
    pub fn send(&mut self, from: TrackId, to: TrackId, amount: f32) -> Result<()> {
        self.ensure_initialized()?;
        self.track_index(to)?;
        self.track_mut(from)?.send_to(to, amount)
    }

    pub fn remove_send(&mut self, from: TrackId, to: TrackId) -> Result<bool> {
        Ok(self.track_mut(from)?.remove_send(to))
    }

    // =========================================================================
    // Transport
    // =========================================================================

    /// Read-only transport view that can cross threads.
    pub fn transport(&self) -> TransportHandle {
        self.transport.handle()
    }

    pub fn transport_state(&self) -> TransportState {
        self.transport.state()
    }

    pub fn is_playing(&self) -> bool {
        self.transport.is_playing()
    }

    /// Start playback from the current position. No-op while playing.
    pub fn play(&mut self) -> Result<()> {
        self.ensure_initialized()?;
        if self.transport.is_playing() {
            tracing::warn!("play() called while already playing");
            return Ok(());
        }
        if !self.session.is_running() {
            self.session.resume()?;
        }
        let position = self.transport.position_samples();
        for track in &mut self.tracks {
            track.chase(position);
        }
        if let TransitionResult::StateChanged(_) = self.transport.play() {
            tracing::debug!(position, "playback started");
            self.events.emit(EngineEvent::PlaybackStarted);
        }
        Ok(())
    }

    /// Halt playback, keeping the playhead.
    pub fn pause(&mut self) -> Result<()> {
        self.ensure_initialized()?;
        if let TransitionResult::StateChanged(_) = self.transport.pause() {
            self.stop_voices();
            let position = self.transport.current_time();
            tracing::debug!(position, "playback paused");
            self.events.emit(EngineEvent::PlaybackPaused { position });
        }
        Ok(())
    }

    /// Halt playback and rewind to zero.
    pub fn stop(&mut self) -> Result<()> {
        self.ensure_initialized()?;
        if let TransitionResult::StateChanged(_) = self.transport.stop() {
            self.stop_voices();
            tracing::debug!("playback stopped");
            self.events.emit(EngineEvent::PlaybackStopped);
        }
        Ok(())
    }

    fn stop_voices(&mut self) {
        for track in &mut self.tracks {
            track.stop_voices();
        }
    }

    pub fn tempo(&self) -> f64 {
        self.transport.tempo()
    }

    /// Fails with `ParameterOutOfRange` outside `20..=999` BPM.
    pub fn set_tempo(&mut self, bpm: f64) -> Result<()> {
        self.ensure_initialized()?;
        self.transport.set_tempo(bpm)?;
        self.events.emit(EngineEvent::TempoChanged { bpm });
        Ok(())
    }

    pub fn time_signature(&self) -> TimeSignature {
        self.transport.time_signature()
    }

    pub fn set_time_signature(&mut self, numerator: u32, denominator: u32) -> Result<()> {
        self.ensure_initialized()?;
        dawg_core::check_range("time signature numerator", numerator as f64, 1.0, 32.0)?;
        dawg_core::check_range("time signature denominator", denominator as f64, 1.0, 32.0)?;
        self.transport
            .set_time_signature(TimeSignature::new(numerator, denominator));
        Ok(())
    }

    /// Time signature over a quarter note.
    pub fn set_time_signature_default(&mut self, numerator: u32) -> Result<()> {
        self.set_time_signature(numerator, 4)
    }

    pub fn set_loop(&mut self, start: f64, end: f64, enabled: bool) -> Result<()> {
        self.ensure_initialized()?;
        self.transport.set_loop(LoopRange::new(start, end), enabled);
        Ok(())
    }

    pub fn current_time(&self) -> f64 {
        self.transport.current_time()
    }

    /// Seek. Clips already under the new playhead resume mid-way.
    ///
    /// Negative times fail with `ParameterOutOfRange`.
    pub fn set_current_time(&mut self, seconds: f64) -> Result<()> {
        self.ensure_initialized()?;
        self.transport.set_current_time(seconds)?;
        if self.transport.is_playing() {
            let position = self.transport.position_samples();
            for track in &mut self.tracks {
                track.chase(position);
            }
        }
        Ok(())
    }

    // =========================================================================
    // Recording
    // =========================================================================

    pub fn start_recording(&mut self, track: TrackId) -> Result<()> {
        self.ensure_initialized()?;
        let device = match &self.devices {
            Some(factory) => factory(),
            None => {
                return Err(dawg_sampler::Error::DeviceUnavailable(
                    "no recording device configured".into(),
                )
                .into())
            }
        };
        self.track_mut(track)?.start_recording(device)?;
        self.events.emit(EngineEvent::RecordingStarted { track });
        Ok(())
    }

    /// Finish recording and place the take at the current transport position.
    pub fn stop_recording(&mut self, track: TrackId) -> Result<ClipId> {
        let at = self.transport.current_time();
        let clip = self.track_mut(track)?.stop_recording(at)?;
        tracing::debug!(track = %track, clip = %clip, at, "recording stopped");
        self.events
            .emit(EngineEvent::RecordingStopped { track, clip });
        Ok(clip)
    }

    pub fn cancel_recording(&mut self, track: TrackId) -> Result<bool> {
        Ok(self.track_mut(track)?.cancel_recording())
    }

    // =========================================================================
    // MIDI
    // =========================================================================

    fn midi_track(&mut self, track: TrackId) -> Result<(&mut Track, &mut dyn MidiManager)> {
        self.ensure_initialized()?;
        let index = self.track_index(track)?;
        let target = &mut self.tracks[index];
        target.require_kind(TrackKind::Midi, "MIDI operations")?;
        let midi = self.midi.as_deref_mut().ok_or(Error::MidiUnavailable)?;
        Ok((target, midi))
    }

    pub fn add_midi_clip(&mut self, track: TrackId, clip: MidiClip) -> Result<ClipId> {
        let (target, midi) = self.midi_track(track)?;
        clip.validate()?;
        midi.schedule_clip(track, &clip)?;
        let id = clip.id;
        target.push_midi_clip(clip);
        Ok(id)
    }

    pub fn remove_midi_clip(&mut self, track: TrackId, clip: ClipId) -> Result<MidiClip> {
        let (target, midi) = self.midi_track(track)?;
        let removed = target.take_midi_clip(clip)?;
        midi.stop_clip(track, clip);
        Ok(removed)
    }

    /// Replace the track's instrument.
    pub fn create_instrument(&mut self, track: TrackId, instrument: &str) -> Result<()> {
        let (target, midi) = self.midi_track(track)?;
        if target.instrument().is_some() {
            midi.dispose_instrument(track);
        }
        midi.create_instrument(track, instrument)?;
        target.set_instrument(Some(instrument.to_string()));
        Ok(())
    }

    pub fn start_note_recording(&mut self, track: TrackId) -> Result<()> {
        let (_, midi) = self.midi_track(track)?;
        midi.start_note_recording(track)
    }

    /// Finish note capture and keep the result as a MIDI clip on the track.
    pub fn stop_note_recording(&mut self, track: TrackId) -> Result<ClipId> {
        let (target, midi) = self.midi_track(track)?;
        let clip = midi.stop_note_recording(track)?;
        clip.validate()?;
        let id = clip.id;
        target.push_midi_clip(clip);
        Ok(id)
    }

    // =========================================================================
    // Samples and buffers
    // =========================================================================

    /// Decode `url` through the sample loader. Repeated loads share one buffer.
    pub fn load_sample(&mut self, url: &str) -> Result<Arc<AudioBuffer>> {
        self.ensure_initialized()?;
        if let Some(buffer) = self.samples.get(url) {
            return Ok(Arc::clone(buffer));
        }
        let buffer = Arc::new(self.loader.load(url)?);
        tracing::debug!(url, frames = buffer.len(), "sample loaded");
        self.samples.insert(url.to_string(), Arc::clone(&buffer));
        Ok(buffer)
    }

    pub fn acquire_buffer(&mut self, length: usize, channels: usize) -> Result<AudioBuffer> {
        self.ensure_initialized()?;
        Ok(self.pool.acquire(length, channels, None)?)
    }

    pub fn release_buffer(&mut self, buffer: AudioBuffer) {
        self.pool.release(buffer);
    }

    pub fn pool_stats(&self) -> PoolStats {
        self.pool.stats()
    }

    pub fn pooled_buffers(&self) -> usize {
        self.pool.len()
    }

    // =========================================================================
    // Master and metering
    // =========================================================================

    pub fn master(&self) -> &MasterBus {
        &self.master
    }

    pub fn master_mut(&mut self) -> &mut MasterBus {
        &mut self.master
    }

    /// Load estimate in `0.0..=1.0` from active tracks and total effects.
    pub fn cpu_load(&self) -> f32 {
        let any_solo = self.any_solo();
        let active = self
            .tracks
            .iter()
            .filter(|t| t.controls().is_audible(any_solo))
            .count();
        let effects: usize = self.tracks.iter().map(Track::effect_count).sum();
        (TRACK_LOAD * active as f32 + EFFECT_LOAD * effects as f32).min(1.0)
    }

    // =========================================================================
    // Live processing
    // =========================================================================

    /// Render interleaved stereo into `output`, advancing the transport.
    pub fn process_block(&mut self, output: &mut [f32]) -> Result<()> {
        self.ensure_initialized()?;
        let block = self.block_size();
        for chunk in output.chunks_mut(block * 2) {
            let frames = chunk.len() / 2;
            self.render_block(frames);
            for (i, frame) in chunk.chunks_exact_mut(2).enumerate() {
                frame[0] = self.mix_left[i];
                frame[1] = self.mix_right[i];
            }
        }
        Ok(())
    }

    fn render_block(&mut self, frames: usize) {
        let Self {
            tracks,
            transport,
            master,
            segments,
            mix_left,
            mix_right,
            ..
        } = self;

        segments.clear();
        transport.advance(frames, |segment| segments.push(segment));

        let any_solo = tracks.iter().any(Track::is_soloed);
        for track in tracks.iter_mut() {
            track.begin_block();
        }
        for track in tracks.iter_mut() {
            let audible = track.controls().is_audible(any_solo);
            track.process(frames, segments, audible);
        }
        route_sends(tracks, frames);

        let left = &mut mix_left[..frames];
        let right = &mut mix_right[..frames];
        left.fill(0.0);
        right.fill(0.0);
        for track in tracks.iter() {
            let (l, r) = track.output(frames);
            for (d, s) in left.iter_mut().zip(l) {
                *d += s;
            }
            for (d, s) in right.iter_mut().zip(r) {
                *d += s;
            }
        }
        master.process(left, right);
    }

    // =========================================================================
    // Offline render and export
    // =========================================================================

    /// Snapshot the current project into a render job.
    pub fn render_job(&self, duration: f64, tail: f64) -> Result<RenderJob> {
        self.ensure_initialized()?;
        let index_of: HashMap<TrackId, usize> = self
            .tracks
            .iter()
            .enumerate()
            .map(|(i, t)| (t.id(), i))
            .collect();

        let tracks = self
            .tracks
            .iter()
            .map(|track| {
                let controls = track.controls();
                RenderTrack {
                    name: track.name().to_string(),
                    kind: track.kind(),
                    clips: track.clips().to_vec(),
                    effects: track.effects().to_vec(),
                    volume_db: controls.volume_db(),
                    volume_explicit: controls.volume_explicit(),
                    pan: controls.pan(),
                    muted: controls.is_muted(),
                    soloed: controls.is_soloed(),
                    sends: track
                        .sends()
                        .into_iter()
                        .filter_map(|(target, amount)| {
                            index_of
                                .get(&target)
                                .map(|&target| RenderSend { target, amount })
                        })
                        .collect(),
                }
            })
            .collect();

        Ok(RenderJob {
            tracks,
            config: self.config.render,
            ..RenderJob::new(self.sample_rate(), duration).with_tail(tail)
        })
    }

    /// Render `duration + tail` seconds of the project. Live state is untouched.
    pub fn render_offline(&self, duration: f64, tail: f64) -> Result<RenderResult> {
        let job = self.render_job(duration, tail)?;
        let result = OfflineRenderer::default().render(&job)?;
        self.events.emit(EngineEvent::RenderCompleted {
            duration: result.duration_seconds(),
            peak: result.peak_level,
        });
        Ok(result)
    }

    /// Render with the default two-second tail.
    pub fn render(&self, duration: f64) -> Result<RenderResult> {
        self.render_offline(duration, DEFAULT_TAIL_SECONDS)
    }

    /// Render and encode to bytes.
    pub fn export(&self, duration: f64, tail: f64, options: &ExportOptions) -> Result<Vec<u8>> {
        let result = self.render_offline(duration, tail)?;
        let bytes = dawg_export::encode(&result.buffer, options)?;
        tracing::info!(bytes = bytes.len(), format = ?options.format, "project exported");
        Ok(bytes)
    }

    /// Render and write to `path`. The extension must match the format.
    pub fn export_to_file(
        &self,
        path: impl AsRef<Path>,
        duration: f64,
        tail: f64,
        options: &ExportOptions,
    ) -> Result<()> {
        let path = path.as_ref();
        let result = self.render_offline(duration, tail)?;
        dawg_export::export_to_file(path, &result.buffer, options)?;
        tracing::info!(path = %path.display(), "project exported");
        Ok(())
    }

    // =========================================================================
    // Serialization
    // =========================================================================

    pub fn snapshot(&self) -> Result<ProjectSnapshot> {
        self.ensure_initialized()?;
        Ok(ProjectSnapshot {
            sample_rate: self.sample_rate(),
            tempo: self.transport.tempo(),
            time_signature: self.transport.time_signature(),
            tracks: self.tracks.iter().map(TrackSnapshot::from).collect(),
        })
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.snapshot()?)?)
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Stop playback, dispose every track and the master bus, close the
    /// session. Calling it again does nothing.
    pub fn dispose(&mut self) {
        if !self.initialized {
            return;
        }
        self.transport.stop();
        let mut tracks = std::mem::take(&mut self.tracks);
        for track in &mut tracks {
            self.dispose_track(track);
        }
        drop(tracks);
        self.master.reset();
        self.samples.clear();
        self.pool.clear();
        self.session.close();
        self.initialized = false;
        tracing::debug!("audio engine disposed");
    }
}

impl Drop for AudioEngine {
    fn drop(&mut self) {
        self.dispose();
    }
}

/// Feed each track's output into its send targets for the next block.
fn route_sends(tracks: &mut [Track], frames: usize) {
    for i in 0..tracks.len() {
        let (head, rest) = tracks.split_at_mut(i);
        let Some((source, tail)) = rest.split_first_mut() else {
            continue;
        };
        for (target, amount) in source.send_cells() {
            if let Some(dest) = head
                .iter_mut()
                .chain(tail.iter_mut())
                .find(|t| t.id() == target)
            {
                let (left, right) = source.output(frames);
                dest.accumulate_send(left, right, amount);
            }
        }
    }
}
