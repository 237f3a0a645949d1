//! Time signature and loop range.

use serde::{Deserialize, Serialize};

/// Convert seconds to the nearest transport sample.
#[inline]
pub fn seconds_to_samples(seconds: f64, sample_rate: f64) -> u64 {
    (seconds.max(0.0) * sample_rate).round() as u64
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSignature {
    pub numerator: u32,
    pub denominator: u32,
}

impl TimeSignature {
    pub const fn new(numerator: u32, denominator: u32) -> Self {
        Self {
            numerator,
            denominator,
        }
    }

    /// Quarter-note beats per bar.
    pub fn quarters_per_bar(&self) -> f64 {
        if self.denominator == 0 {
            return self.numerator as f64;
        }
        self.numerator as f64 * 4.0 / self.denominator as f64
    }
}

impl Default for TimeSignature {
    fn default() -> Self {
        Self::new(4, 4)
    }
}

/// Loop region in seconds. Wrapping happens at `end`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LoopRange {
    pub start: f64,
    pub end: f64,
}

impl LoopRange {
    #[inline]
    pub const fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    pub fn length(&self) -> f64 {
        self.end - self.start
    }

    /// Sample bounds, or `None` if the range is empty.
    pub fn to_samples(&self, sample_rate: f64) -> Option<(u64, u64)> {
        let start = seconds_to_samples(self.start, sample_rate);
        let end = seconds_to_samples(self.end, sample_rate);
        (end > start).then_some((start, end))
    }
}
