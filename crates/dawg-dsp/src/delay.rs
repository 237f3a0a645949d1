//! Stereo feedback delay.

use dawg_core::{AtomicFloat, Effect, ParameterRange, ParameterSet};
use std::sync::Arc;

/// Longest delay time the lines are sized for.
pub const MAX_DELAY_SECONDS: f32 = 2.0;

#[derive(Clone)]
pub struct Delay {
    params: ParameterSet,
    time: Arc<AtomicFloat>,
    feedback: Arc<AtomicFloat>,
    mix: Arc<AtomicFloat>,

    line_left: Vec<f32>,
    line_right: Vec<f32>,
    write: usize,
    sample_rate: f64,
}

impl Delay {
    pub fn new(time: f32, feedback: f32, mix: f32) -> crate::Result<Self> {
        let mut params = ParameterSet::new();
        let time_cell = params.add("time", ParameterRange::new(0.0, MAX_DELAY_SECONDS, 0.25));
        let feedback_cell = params.add("feedback", ParameterRange::new(0.0, 0.95, 0.3));
        let mix_cell = params.add("mix", ParameterRange::new(0.0, 1.0, 0.3));
        params.set("time", time)?;
        params.set("feedback", feedback)?;
        params.set("mix", mix)?;

        Ok(Self {
            params,
            time: time_cell,
            feedback: feedback_cell,
            mix: mix_cell,
            line_left: Vec::new(),
            line_right: Vec::new(),
            write: 0,
            sample_rate: 0.0,
        })
    }
}

impl Effect for Delay {
    fn name(&self) -> &str {
        "delay"
    }

    fn parameters(&self) -> &ParameterSet {
        &self.params
    }

    fn prepare(&mut self, sample_rate: f64, _max_block: usize) {
        if sample_rate != self.sample_rate || self.line_left.is_empty() {
            let len = (MAX_DELAY_SECONDS as f64 * sample_rate).ceil() as usize + 1;
            self.line_left = vec![0.0; len];
            self.line_right = vec![0.0; len];
            self.write = 0;
            self.sample_rate = sample_rate;
        }
    }

    fn reset(&mut self) {
        self.line_left.fill(0.0);
        self.line_right.fill(0.0);
        self.write = 0;
    }

    fn process(&mut self, left: &mut [f32], right: &mut [f32]) {
        let len = self.line_left.len();
        if len == 0 {
            return;
        }
        let delay = ((self.time.get() as f64 * self.sample_rate).round() as usize).min(len - 1);
        let feedback = self.feedback.get();
        let mix = self.mix.get();

        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            let read = (self.write + len - delay) % len;
            let (wet_l, wet_r) = if delay == 0 {
                (*l, *r)
            } else {
                (self.line_left[read], self.line_right[read])
            };

            self.line_left[self.write] = *l + wet_l * feedback;
            self.line_right[self.write] = *r + wet_r * feedback;
            self.write = (self.write + 1) % len;

            *l = *l * (1.0 - mix) + wet_l * mix;
            *r = *r * (1.0 - mix) + wet_r * mix;
        }
    }
}
