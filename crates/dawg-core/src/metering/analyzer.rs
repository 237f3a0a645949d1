//! Waveform and spectrum tap on the master output.
//!
//! The audio path only pushes samples into a ring. The FFT runs when a
//! snapshot is requested.

use realfft::{RealFftPlanner, RealToComplex};
use std::fmt;
use std::sync::Arc;

/// Samples returned by [`AnalyzerTap::waveform`].
pub const WAVEFORM_SIZE: usize = 1024;
/// Real FFT length used for the spectrum.
pub const FFT_SIZE: usize = 2048;
/// Magnitude bins returned by [`AnalyzerTap::spectrum`].
pub const SPECTRUM_BINS: usize = FFT_SIZE / 2;
/// Floor for silent bins.
pub const MIN_DB: f32 = -120.0;

pub struct AnalyzerTap {
    ring: Vec<f32>,
    write: usize,
    fft: Arc<dyn RealToComplex<f32>>,
    window: Vec<f32>,
}

impl fmt::Debug for AnalyzerTap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalyzerTap")
            .field("fft_size", &FFT_SIZE)
            .field("write", &self.write)
            .finish()
    }
}

impl Default for AnalyzerTap {
    fn default() -> Self {
        Self::new()
    }
}

impl AnalyzerTap {
    pub fn new() -> Self {
        let mut planner = RealFftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(FFT_SIZE);

        // Hann window
        let window = (0..FFT_SIZE)
            .map(|i| {
                0.5 * (1.0 - (2.0 * std::f32::consts::PI * i as f32 / FFT_SIZE as f32).cos())
            })
            .collect();

        Self {
            ring: vec![0.0; FFT_SIZE],
            write: 0,
            fft,
            window,
        }
    }

    /// Push a stereo block, stored as its mono average.
    #[inline]
    pub fn push(&mut self, left: &[f32], right: &[f32]) {
        for (l, r) in left.iter().zip(right) {
            self.ring[self.write] = (l + r) * 0.5;
            self.write = (self.write + 1) % FFT_SIZE;
        }
    }

    /// Last `n` samples in chronological order.
    fn latest(&self, n: usize) -> Vec<f32> {
        let n = n.min(FFT_SIZE);
        let start = (self.write + FFT_SIZE - n) % FFT_SIZE;
        (0..n).map(|i| self.ring[(start + i) % FFT_SIZE]).collect()
    }

    /// Latest [`WAVEFORM_SIZE`] mono samples.
    pub fn waveform(&self) -> Vec<f32> {
        self.latest(WAVEFORM_SIZE)
    }

    /// [`SPECTRUM_BINS`] magnitudes in dBFS of the latest [`FFT_SIZE`] samples.
    pub fn spectrum(&self) -> Vec<f32> {
        let mut input: Vec<f32> = self
            .latest(FFT_SIZE)
            .iter()
            .zip(&self.window)
            .map(|(s, w)| s * w)
            .collect();
        let mut output = self.fft.make_output_vec();

        if self.fft.process(&mut input, &mut output).is_err() {
            return vec![MIN_DB; SPECTRUM_BINS];
        }

        // Hann coherent gain is 0.5, so a full-scale sine peaks at N/4.
        let scale = 4.0 / FFT_SIZE as f32;
        output
            .iter()
            .take(SPECTRUM_BINS)
            .map(|bin| {
                let magnitude = bin.norm() * scale;
                if magnitude > 0.0 {
                    (20.0 * magnitude.log10()).max(MIN_DB)
                } else {
                    MIN_DB
                }
            })
            .collect()
    }

    pub fn reset(&mut self) {
        self.ring.fill(0.0);
        self.write = 0;
    }
}
