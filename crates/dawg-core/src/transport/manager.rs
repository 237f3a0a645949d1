//! Transport: playhead, tempo, time signature and loop.
//!
//! The control side mutates through `&mut Transport`; every value the audio
//! path or other threads read lives in shared atomics exposed through
//! [`TransportHandle`].

use super::fsm::{TransitionResult, TransportEvent, TransportFSM, TransportState};
use super::position::{seconds_to_samples, LoopRange, TimeSignature};
use crate::{check_range, AtomicDouble, AtomicFlag, Result};
use std::sync::atomic::{AtomicU32, AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;

pub const MIN_TEMPO: f64 = 20.0;
pub const MAX_TEMPO: f64 = 999.0;
pub const DEFAULT_TEMPO: f64 = 120.0;

/// Contiguous run of timeline samples inside one processed block.
///
/// A block is split into several segments when the loop end is crossed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportSegment {
    /// Frame offset inside the block.
    pub offset: usize,
    /// Transport sample at `offset`.
    pub start: u64,
    pub len: usize,
    /// This segment begins right after a loop wrap.
    pub wrapped: bool,
}

impl TransportSegment {
    pub fn end(&self) -> u64 {
        self.start + self.len as u64
    }
}

struct SharedState {
    position: AtomicU64,
    state: AtomicU8,
    tempo: AtomicDouble,
    numerator: AtomicU32,
    denominator: AtomicU32,
    loop_enabled: AtomicFlag,
    loop_start: AtomicDouble,
    loop_end: AtomicDouble,
}

/// Read-only, cloneable view of the transport for other threads.
#[derive(Clone)]
pub struct TransportHandle {
    shared: Arc<SharedState>,
    sample_rate: f64,
}

impl TransportHandle {
    pub fn state(&self) -> TransportState {
        TransportState::from_u8(self.shared.state.load(Ordering::Acquire))
    }

    pub fn is_playing(&self) -> bool {
        self.state() == TransportState::Playing
    }

    pub fn position_samples(&self) -> u64 {
        self.shared.position.load(Ordering::Acquire)
    }

    pub fn current_time(&self) -> f64 {
        self.position_samples() as f64 / self.sample_rate
    }

    pub fn tempo(&self) -> f64 {
        self.shared.tempo.get()
    }

    pub fn time_signature(&self) -> TimeSignature {
        TimeSignature::new(
            self.shared.numerator.load(Ordering::Relaxed),
            self.shared.denominator.load(Ordering::Relaxed),
        )
    }

    pub fn loop_enabled(&self) -> bool {
        self.shared.loop_enabled.get()
    }

    pub fn loop_range(&self) -> LoopRange {
        LoopRange::new(self.shared.loop_start.get(), self.shared.loop_end.get())
    }
}

/// Transport state machine plus its shared atomics.
pub struct Transport {
    fsm: TransportFSM,
    handle: TransportHandle,
    /// The last block ended exactly on the loop end.
    pending_wrap: bool,
}

impl Transport {
    pub fn new(sample_rate: f64) -> Self {
        let shared = Arc::new(SharedState {
            position: AtomicU64::new(0),
            state: AtomicU8::new(TransportState::Stopped.to_u8()),
            tempo: AtomicDouble::new(DEFAULT_TEMPO),
            numerator: AtomicU32::new(4),
            denominator: AtomicU32::new(4),
            loop_enabled: AtomicFlag::new(false),
            loop_start: AtomicDouble::new(0.0),
            loop_end: AtomicDouble::new(0.0),
        });
        Self {
            fsm: TransportFSM::new(),
            handle: TransportHandle {
                shared,
                sample_rate,
            },
            pending_wrap: false,
        }
    }

    pub fn handle(&self) -> TransportHandle {
        self.handle.clone()
    }

    pub fn sample_rate(&self) -> f64 {
        self.handle.sample_rate
    }

    fn shared(&self) -> &SharedState {
        &self.handle.shared
    }

    fn apply(&mut self, event: TransportEvent) -> TransitionResult {
        let result = self.fsm.transition(event);
        if let TransitionResult::StateChanged(state) = result {
            self.shared().state.store(state.to_u8(), Ordering::Release);
        }
        result
    }

    pub fn play(&mut self) -> TransitionResult {
        self.apply(TransportEvent::Play)
    }

    /// Pause keeps the playhead.
    pub fn pause(&mut self) -> TransitionResult {
        self.apply(TransportEvent::Pause)
    }

    /// Stop rewinds to zero.
    pub fn stop(&mut self) -> TransitionResult {
        let result = self.apply(TransportEvent::Stop);
        if result != TransitionResult::None {
            self.shared().position.store(0, Ordering::Release);
            self.pending_wrap = false;
        }
        result
    }

    pub fn state(&self) -> TransportState {
        self.fsm.state()
    }

    pub fn is_playing(&self) -> bool {
        self.state() == TransportState::Playing
    }

    pub fn tempo(&self) -> f64 {
        self.handle.tempo()
    }

    /// Fails with `ParameterOutOfRange` outside `20..=999` BPM.
    pub fn set_tempo(&mut self, bpm: f64) -> Result<()> {
        check_range("tempo", bpm, MIN_TEMPO, MAX_TEMPO)?;
        self.shared().tempo.set(bpm);
        Ok(())
    }

    pub fn time_signature(&self) -> TimeSignature {
        self.handle.time_signature()
    }

    pub fn set_time_signature(&mut self, signature: TimeSignature) {
        self.shared()
            .numerator
            .store(signature.numerator, Ordering::Relaxed);
        self.shared()
            .denominator
            .store(signature.denominator, Ordering::Relaxed);
    }

    /// An empty range never wraps, even when enabled.
    pub fn set_loop(&mut self, range: LoopRange, enabled: bool) {
        self.shared().loop_start.set(range.start);
        self.shared().loop_end.set(range.end);
        self.shared().loop_enabled.set(enabled);
    }

    pub fn loop_enabled(&self) -> bool {
        self.handle.loop_enabled()
    }

    pub fn loop_range(&self) -> LoopRange {
        self.handle.loop_range()
    }

    pub fn position_samples(&self) -> u64 {
        self.handle.position_samples()
    }

    pub fn current_time(&self) -> f64 {
        self.handle.current_time()
    }

    /// Move the playhead. Negative or non-finite times are rejected.
    pub fn set_current_time(&mut self, seconds: f64) -> Result<()> {
        check_range("current time", seconds, 0.0, f64::MAX)?;
        let samples = seconds_to_samples(seconds, self.sample_rate());
        self.shared().position.store(samples, Ordering::Release);
        self.pending_wrap = false;
        Ok(())
    }

    /// Position in quarter-note beats at the current tempo.
    pub fn beats(&self) -> f64 {
        self.current_time() * self.tempo() / 60.0
    }

    /// One-based `(bar, beat)` under the current time signature.
    pub fn bar_beat(&self) -> (u64, f64) {
        let per_bar = self.time_signature().quarters_per_bar().max(f64::EPSILON);
        let beats = self.beats();
        let bar = (beats / per_bar).floor();
        (bar as u64 + 1, beats - bar * per_bar + 1.0)
    }

    /// Advance the playhead by `frames`, reporting each contiguous segment.
    ///
    /// Does nothing unless playing. Crossing the loop end splits the block and
    /// continues from the loop start.
    pub fn advance(&mut self, frames: usize, mut on_segment: impl FnMut(TransportSegment)) {
        if !self.is_playing() || frames == 0 {
            return;
        }
        let loop_bounds = if self.loop_enabled() {
            self.loop_range().to_samples(self.sample_rate())
        } else {
            None
        };

        let mut position = self.position_samples();
        let mut offset = 0;
        let mut wrapped = std::mem::take(&mut self.pending_wrap);

        while offset < frames {
            let remaining = frames - offset;
            let bounds = loop_bounds.filter(|&(_, end)| position < end);
            let len = match bounds {
                Some((_, end)) => remaining.min((end - position) as usize),
                None => remaining,
            };

            on_segment(TransportSegment {
                offset,
                start: position,
                len,
                wrapped,
            });

            position += len as u64;
            offset += len;
            wrapped = false;

            if let Some((start, end)) = bounds {
                if position >= end {
                    position = start;
                    wrapped = true;
                }
            }
        }

        self.pending_wrap = wrapped;
        self.shared().position.store(position, Ordering::Release);
    }
}
