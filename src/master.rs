//! Master bus: volume, mute, brickwall limiter, metering and analysis.

use crate::Result;
use dawg_core::{
    check_range, db_to_linear, AnalyzerTap, Effect, LevelMeter, MasterLevel,
};
use dawg_dsp::Limiter;

use crate::track::{MAX_VOLUME_DB, MIN_VOLUME_DB};

#[derive(Debug)]
pub struct MasterBus {
    volume_db: f32,
    muted: bool,
    limiter: Limiter,
    meter: LevelMeter,
    analyzer: AnalyzerTap,
}

impl MasterBus {
    pub(crate) fn new(sample_rate: f64, max_block: usize, ceiling_db: f32) -> Result<Self> {
        let mut limiter = Limiter::new(ceiling_db)?;
        limiter.prepare(sample_rate, max_block);
        Ok(Self {
            volume_db: 0.0,
            muted: false,
            limiter,
            meter: LevelMeter::new(sample_rate),
            analyzer: AnalyzerTap::new(),
        })
    }

    pub fn volume(&self) -> f32 {
        self.volume_db
    }

    pub fn set_volume(&mut self, db: f32) -> Result<()> {
        check_range("master volume", db as f64, MIN_VOLUME_DB as f64, MAX_VOLUME_DB as f64)?;
        self.volume_db = db;
        Ok(())
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    pub fn set_mute(&mut self, muted: bool) {
        self.muted = muted;
    }

    /// Linear limiter ceiling. Output never exceeds it.
    pub fn ceiling(&self) -> f32 {
        self.limiter.ceiling()
    }

    /// Levels of the last processed block.
    pub fn level(&self) -> MasterLevel {
        self.meter.level()
    }

    pub fn waveform(&self) -> Vec<f32> {
        self.analyzer.waveform()
    }

    pub fn spectrum(&self) -> Vec<f32> {
        self.analyzer.spectrum()
    }

    /// Strip, limiter, meter, analyzer. In place.
    pub(crate) fn process(&mut self, left: &mut [f32], right: &mut [f32]) {
        let gain = if self.muted {
            0.0
        } else {
            db_to_linear(self.volume_db)
        };
        let mut input_peak = 0.0f32;
        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            *l *= gain;
            *r *= gain;
            input_peak = input_peak.max(l.abs()).max(r.abs());
        }

        self.limiter.process(left, right);
        self.meter.process(left, right, input_peak);
        self.analyzer.push(left, right);
    }

    pub(crate) fn reset(&mut self) {
        self.limiter.reset();
        self.meter.reset();
        self.analyzer.reset();
    }
}
