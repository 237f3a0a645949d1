//! Lock-free amplitude metering.

use crate::AtomicFloat;

/// Peak and RMS per side for one processed block.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TrackLevel {
    pub peak_left: f32,
    pub peak_right: f32,
    pub rms_left: f32,
    pub rms_right: f32,
}

/// Measure one stereo block.
pub fn block_levels(left: &[f32], right: &[f32]) -> TrackLevel {
    fn side(samples: &[f32]) -> (f32, f32) {
        if samples.is_empty() {
            return (0.0, 0.0);
        }
        let mut peak = 0.0f32;
        let mut sum = 0.0f32;
        for &s in samples {
            peak = peak.max(s.abs());
            sum += s * s;
        }
        (peak, (sum / samples.len() as f32).sqrt())
    }

    let (peak_left, rms_left) = side(left);
    let (peak_right, rms_right) = side(right);
    TrackLevel {
        peak_left,
        peak_right,
        rms_left,
        rms_right,
    }
}

/// Lock-free amplitude storage (RMS L/R, Peak L/R).
pub struct AtomicAmplitude {
    rms_left: AtomicFloat,
    rms_right: AtomicFloat,
    peak_left: AtomicFloat,
    peak_right: AtomicFloat,
}

impl Default for AtomicAmplitude {
    fn default() -> Self {
        Self::new()
    }
}

impl AtomicAmplitude {
    pub fn new() -> Self {
        Self {
            rms_left: AtomicFloat::new(0.0),
            rms_right: AtomicFloat::new(0.0),
            peak_left: AtomicFloat::new(0.0),
            peak_right: AtomicFloat::new(0.0),
        }
    }

    #[inline]
    pub fn get(&self) -> TrackLevel {
        TrackLevel {
            peak_left: self.peak_left.get(),
            peak_right: self.peak_right.get(),
            rms_left: self.rms_left.get(),
            rms_right: self.rms_right.get(),
        }
    }

    #[inline]
    pub fn set(&self, level: TrackLevel) {
        self.rms_left.set(level.rms_left);
        self.rms_right.set(level.rms_right);
        self.peak_left.set(level.peak_left);
        self.peak_right.set(level.peak_right);
    }

    /// Measure a block and publish it.
    #[inline]
    pub fn measure(&self, left: &[f32], right: &[f32]) {
        self.set(block_levels(left, right));
    }

    pub fn reset(&self) {
        self.set(TrackLevel::default());
    }
}
