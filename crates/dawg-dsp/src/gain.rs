//! Static gain stage.

use dawg_core::{db_to_linear, AtomicFloat, Effect, ParameterRange, ParameterSet};
use std::sync::Arc;

#[derive(Clone)]
pub struct Gain {
    params: ParameterSet,
    gain_db: Arc<AtomicFloat>,
}

impl Gain {
    pub fn new(gain_db: f32) -> crate::Result<Self> {
        let mut params = ParameterSet::new();
        let cell = params.add("gain", ParameterRange::new(-60.0, 24.0, 0.0));
        params.set("gain", gain_db)?;
        Ok(Self {
            params,
            gain_db: cell,
        })
    }
}

impl Effect for Gain {
    fn name(&self) -> &str {
        "gain"
    }

    fn parameters(&self) -> &ParameterSet {
        &self.params
    }

    fn prepare(&mut self, _sample_rate: f64, _max_block: usize) {}

    fn reset(&mut self) {}

    fn process(&mut self, left: &mut [f32], right: &mut [f32]) {
        let gain = db_to_linear(self.gain_db.get());
        left.iter_mut().for_each(|s| *s *= gain);
        right.iter_mut().for_each(|s| *s *= gain);
    }
}
