//! Master level meter with peak hold and clip detection.
//!
//! Time is counted in processed samples so behaviour is deterministic.

use super::amplitude::block_levels;

/// Seconds a held peak stays put before it starts decaying.
pub const PEAK_HOLD_SECONDS: f64 = 1.0;
/// Multiplier applied to a held peak once per block after the hold window.
pub const PEAK_DECAY: f32 = 0.95;
/// Linear level above which the master is flagged as clipping.
pub const CLIP_THRESHOLD: f32 = 1.0;
/// Seconds below the threshold before the clipping flag clears.
pub const CLIP_DEBOUNCE_SECONDS: f64 = 2.0;

/// Held peak that decays after a hold window without a new maximum.
#[derive(Debug, Clone)]
pub struct PeakHold {
    held: f32,
    since_peak: u64,
    hold_samples: u64,
    decay: f32,
}

impl PeakHold {
    pub fn new(sample_rate: f64) -> Self {
        Self {
            held: 0.0,
            since_peak: 0,
            hold_samples: (PEAK_HOLD_SECONDS * sample_rate).round() as u64,
            decay: PEAK_DECAY,
        }
    }

    pub fn update(&mut self, block_peak: f32, frames: usize) -> f32 {
        if block_peak >= self.held {
            self.held = block_peak;
            self.since_peak = 0;
        } else {
            self.since_peak += frames as u64;
            if self.since_peak >= self.hold_samples {
                self.held = (self.held * self.decay).max(block_peak);
            }
        }
        self.held
    }

    pub fn held(&self) -> f32 {
        self.held
    }

    pub fn reset(&mut self) {
        self.held = 0.0;
        self.since_peak = 0;
    }
}

/// Clip flag with a reset debounce.
#[derive(Debug, Clone)]
pub struct ClipDetector {
    clipping: bool,
    since_clip: u64,
    debounce_samples: u64,
    threshold: f32,
}

impl ClipDetector {
    pub fn new(sample_rate: f64) -> Self {
        Self {
            clipping: false,
            since_clip: 0,
            debounce_samples: (CLIP_DEBOUNCE_SECONDS * sample_rate).round() as u64,
            threshold: CLIP_THRESHOLD,
        }
    }

    pub fn update(&mut self, block_peak: f32, frames: usize) -> bool {
        if block_peak > self.threshold {
            self.clipping = true;
            self.since_clip = 0;
        } else if self.clipping {
            self.since_clip += frames as u64;
            if self.since_clip >= self.debounce_samples {
                self.clipping = false;
            }
        }
        self.clipping
    }

    pub fn is_clipping(&self) -> bool {
        self.clipping
    }

    pub fn reset(&mut self) {
        self.clipping = false;
        self.since_clip = 0;
    }
}

/// Snapshot returned by the master bus.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MasterLevel {
    /// Instantaneous block peaks.
    pub left: f32,
    pub right: f32,
    /// Held peaks.
    pub peak_left: f32,
    pub peak_right: f32,
    pub rms: f32,
    pub clipping: bool,
}

#[derive(Debug, Clone)]
pub struct LevelMeter {
    hold_left: PeakHold,
    hold_right: PeakHold,
    clip: ClipDetector,
    current: MasterLevel,
}

impl LevelMeter {
    pub fn new(sample_rate: f64) -> Self {
        Self {
            hold_left: PeakHold::new(sample_rate),
            hold_right: PeakHold::new(sample_rate),
            clip: ClipDetector::new(sample_rate),
            current: MasterLevel::default(),
        }
    }

    /// Meter one output block. `input_peak` is the level seen before the
    /// limiter, which is where clipping is judged.
    pub fn process(&mut self, left: &[f32], right: &[f32], input_peak: f32) -> MasterLevel {
        let frames = left.len().min(right.len());
        let level = block_levels(left, right);
        let rms = ((level.rms_left * level.rms_left + level.rms_right * level.rms_right) / 2.0)
            .sqrt();

        self.current = MasterLevel {
            left: level.peak_left,
            right: level.peak_right,
            peak_left: self.hold_left.update(level.peak_left, frames),
            peak_right: self.hold_right.update(level.peak_right, frames),
            rms,
            clipping: self.clip.update(input_peak, frames),
        };
        self.current
    }

    pub fn level(&self) -> MasterLevel {
        self.current
    }

    pub fn reset(&mut self) {
        self.hold_left.reset();
        self.hold_right.reset();
        self.clip.reset();
        self.current = MasterLevel::default();
    }
}
