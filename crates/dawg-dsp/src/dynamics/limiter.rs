//! Brickwall peak limiter.
//!
//! The ceiling is fixed at construction. Attack is instantaneous, so no
//! output sample exceeds the ceiling; only the release is smoothed.

use dawg_core::{db_to_linear, AtomicFloat, Effect, ParameterRange, ParameterSet};
use std::sync::Arc;

use super::utils::time_to_coeff;

#[derive(Clone, Debug)]
pub struct Limiter {
    params: ParameterSet,
    release: Arc<AtomicFloat>,
    ceiling: f32,
    gain: f32,
    sample_rate: f64,
    release_coeff: f32,
    last_release: f32,
}

impl Limiter {
    /// Limiter with a ceiling in dBFS (`-60.0..=0.0`).
    pub fn new(ceiling_db: f32) -> crate::Result<Self> {
        dawg_core::check_range("ceiling", ceiling_db as f64, -60.0, 0.0)?;
        let mut params = ParameterSet::new();
        let release = params.add("release", ParameterRange::new(0.001, 2.0, 0.05));
        Ok(Self {
            params,
            release,
            ceiling: db_to_linear(ceiling_db),
            gain: 1.0,
            sample_rate: 0.0,
            release_coeff: 0.0,
            last_release: 0.0,
        })
    }

    /// Linear ceiling.
    pub fn ceiling(&self) -> f32 {
        self.ceiling
    }

    /// Current gain applied (1.0 = no limiting).
    pub fn gain(&self) -> f32 {
        self.gain
    }
}

impl Effect for Limiter {
    fn name(&self) -> &str {
        "limiter"
    }

    fn parameters(&self) -> &ParameterSet {
        &self.params
    }

    fn prepare(&mut self, sample_rate: f64, _max_block: usize) {
        self.sample_rate = sample_rate;
        self.last_release = self.release.get();
        self.release_coeff = time_to_coeff(self.last_release, sample_rate);
    }

    fn reset(&mut self) {
        self.gain = 1.0;
    }

    fn process(&mut self, left: &mut [f32], right: &mut [f32]) {
        let release = self.release.get();
        if release != self.last_release {
            self.release_coeff = time_to_coeff(release, self.sample_rate);
            self.last_release = release;
        }
        let ceiling = self.ceiling;

        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            let peak = l.abs().max(r.abs());
            let target = if peak > ceiling { ceiling / peak } else { 1.0 };

            if target < self.gain {
                self.gain = target;
            } else if self.gain < target {
                let next = self.release_coeff * self.gain + (1.0 - self.release_coeff) * target;
                self.gain = if target - next < 1e-6 { target } else { next };
            }

            *l = (*l * self.gain).clamp(-ceiling, ceiling);
            *r = (*r * self.gain).clamp(-ceiling, ceiling);
        }
    }
}
