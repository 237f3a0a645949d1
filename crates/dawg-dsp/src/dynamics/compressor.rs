//! Stereo-linked compressor

use dawg_core::{db_to_linear, AtomicFloat, Effect, ParameterRange, ParameterSet};
use std::sync::Arc;

use super::utils::{amplitude_to_db, time_to_coeff};

/// Feed-forward compressor detecting on the louder of the two channels.
pub struct Compressor {
    params: ParameterSet,
    threshold_db: Arc<AtomicFloat>,
    ratio: Arc<AtomicFloat>,
    attack: Arc<AtomicFloat>,
    release: Arc<AtomicFloat>,
    makeup_db: Arc<AtomicFloat>,
    knee_db: Arc<AtomicFloat>,

    gain_reduction: f32,
    sample_rate: f64,
    attack_coeff: f32,
    release_coeff: f32,
    last_attack: f32,
    last_release: f32,
}

impl Compressor {
    pub fn builder() -> CompressorBuilder {
        CompressorBuilder::default()
    }

    pub fn gain_reduction_db(&self) -> f32 {
        self.gain_reduction
    }

    #[inline]
    fn update_coefficients(&mut self) {
        let attack = self.attack.get();
        let release = self.release.get();

        if (attack - self.last_attack).abs() > 0.00001 {
            self.attack_coeff = time_to_coeff(attack, self.sample_rate);
            self.last_attack = attack;
        }

        if (release - self.last_release).abs() > 0.00001 {
            self.release_coeff = time_to_coeff(release, self.sample_rate);
            self.last_release = release;
        }
    }

    #[inline]
    fn compute_gain_reduction(&self, input_db: f32) -> f32 {
        let threshold = self.threshold_db.get();
        let ratio = self.ratio.get();
        let knee = self.knee_db.get();

        if knee <= 0.0 {
            let over_db = (input_db - threshold).max(0.0);
            over_db * (1.0 - 1.0 / ratio)
        } else {
            let half_knee = knee / 2.0;
            let below = threshold - half_knee;
            let above = threshold + half_knee;

            if input_db <= below {
                0.0
            } else if input_db >= above {
                (input_db - threshold) * (1.0 - 1.0 / ratio)
            } else {
                let x = input_db - below;
                let slope = (1.0 - 1.0 / ratio) / (2.0 * knee);
                slope * x * x
            }
        }
    }
}

impl Clone for Compressor {
    fn clone(&self) -> Self {
        Self {
            params: self.params.clone(),
            threshold_db: Arc::clone(&self.threshold_db),
            ratio: Arc::clone(&self.ratio),
            attack: Arc::clone(&self.attack),
            release: Arc::clone(&self.release),
            makeup_db: Arc::clone(&self.makeup_db),
            knee_db: Arc::clone(&self.knee_db),
            gain_reduction: self.gain_reduction,
            sample_rate: self.sample_rate,
            attack_coeff: self.attack_coeff,
            release_coeff: self.release_coeff,
            last_attack: self.last_attack,
            last_release: self.last_release,
        }
    }
}

impl Effect for Compressor {
    fn name(&self) -> &str {
        "compressor"
    }

    fn parameters(&self) -> &ParameterSet {
        &self.params
    }

    fn prepare(&mut self, sample_rate: f64, _max_block: usize) {
        self.sample_rate = sample_rate;
        self.attack_coeff = time_to_coeff(self.attack.get(), sample_rate);
        self.release_coeff = time_to_coeff(self.release.get(), sample_rate);
        self.last_attack = self.attack.get();
        self.last_release = self.release.get();
    }

    fn reset(&mut self) {
        self.gain_reduction = 0.0;
    }

    fn process(&mut self, left: &mut [f32], right: &mut [f32]) {
        self.update_coefficients();
        let makeup = self.makeup_db.get();

        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            let input_db = amplitude_to_db(l.abs().max(r.abs()));
            let target = self.compute_gain_reduction(input_db);

            let coeff = if target > self.gain_reduction {
                self.attack_coeff
            } else {
                self.release_coeff
            };
            self.gain_reduction = coeff * self.gain_reduction + (1.0 - coeff) * target;

            let gain = db_to_linear(makeup - self.gain_reduction);
            *l *= gain;
            *r *= gain;
        }
    }
}

/// Builder for configuring a [`Compressor`].
#[derive(Clone, Debug)]
pub struct CompressorBuilder {
    threshold_db: f32,
    ratio: f32,
    attack_seconds: f32,
    release_seconds: f32,
    makeup_db: f32,
    knee_db: f32,
}

impl Default for CompressorBuilder {
    fn default() -> Self {
        Self {
            threshold_db: -20.0,
            ratio: 4.0,
            attack_seconds: 0.005,
            release_seconds: 0.1,
            makeup_db: 0.0,
            knee_db: 0.0,
        }
    }
}

impl CompressorBuilder {
    /// Threshold in decibels (-60.0 to 0.0)
    pub fn threshold_db(mut self, db: f32) -> Self {
        self.threshold_db = db;
        self
    }

    /// Compression ratio (1.0 to 20.0)
    pub fn ratio(mut self, ratio: f32) -> Self {
        self.ratio = ratio;
        self
    }

    /// Attack time in seconds (0.0 to 1.0)
    pub fn attack_seconds(mut self, seconds: f32) -> Self {
        self.attack_seconds = seconds;
        self
    }

    /// Release time in seconds (0.0 to 2.0)
    pub fn release_seconds(mut self, seconds: f32) -> Self {
        self.release_seconds = seconds;
        self
    }

    /// Soft knee width in decibels (0.0 = hard knee)
    pub fn soft_knee_db(mut self, db: f32) -> Self {
        self.knee_db = db;
        self
    }

    pub fn makeup_gain_db(mut self, db: f32) -> Self {
        self.makeup_db = db;
        self
    }

    /// Build, validating every value against its parameter range.
    pub fn build(self) -> crate::Result<Compressor> {
        let mut params = ParameterSet::new();
        let threshold_db = params.add("threshold", ParameterRange::new(-60.0, 0.0, -20.0));
        let ratio = params.add("ratio", ParameterRange::new(1.0, 20.0, 4.0));
        let attack = params.add("attack", ParameterRange::new(0.0, 1.0, 0.005));
        let release = params.add("release", ParameterRange::new(0.0, 2.0, 0.1));
        let knee_db = params.add("knee", ParameterRange::new(0.0, 24.0, 0.0));
        let makeup_db = params.add("makeup", ParameterRange::new(0.0, 24.0, 0.0));

        params.set("threshold", self.threshold_db)?;
        params.set("ratio", self.ratio)?;
        params.set("attack", self.attack_seconds)?;
        params.set("release", self.release_seconds)?;
        params.set("knee", self.knee_db)?;
        params.set("makeup", self.makeup_db)?;

        Ok(Compressor {
            params,
            threshold_db,
            ratio,
            attack,
            release,
            makeup_db,
            knee_db,
            gain_reduction: 0.0,
            sample_rate: 0.0,
            attack_coeff: 0.0,
            release_coeff: 0.0,
            last_attack: self.attack_seconds,
            last_release: self.release_seconds,
        })
    }
}
