//! Effect capability.
//!
//! Any audio processor placed on a track implements [`Effect`]. Built-in
//! effects live in `dawg-dsp`; plugin bridges would be adapters implementing
//! the same trait.

use crate::{AudioBuffer, Error, ParameterSet, Result};
use dyn_clone::DynClone;

/// Whether an effect can run in the non-real-time mixdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectCapability {
    /// Live playback only (e.g. hardware or plugin-bridge backed).
    Realtime,
    /// Also usable by the offline renderer.
    OfflineCapable,
}

/// Settings for one offline application of an effect.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OfflineContext {
    pub sample_rate: f64,
    pub block_size: usize,
}

/// Stereo in-place audio processor with named parameters.
pub trait Effect: DynClone + Send {
    fn name(&self) -> &str;

    fn parameters(&self) -> &ParameterSet;

    /// Set a parameter by name. Out-of-range values fail, never clamp.
    fn set_parameter(&mut self, name: &str, value: f32) -> Result<()> {
        self.parameters().set(name, value)
    }

    /// Called before processing and whenever the sample rate changes.
    fn prepare(&mut self, sample_rate: f64, max_block: usize);

    /// Clear internal state (envelopes, delay lines).
    fn reset(&mut self);

    /// Process one block in place.
    fn process(&mut self, left: &mut [f32], right: &mut [f32]);

    fn capability(&self) -> EffectCapability {
        EffectCapability::OfflineCapable
    }

    /// Run the effect over `source` into `destination` outside the audio thread.
    ///
    /// Both buffers are stereo and of equal length. The default copies the
    /// source and runs [`Effect::process`] block by block from a reset state.
    fn apply_offline(
        &mut self,
        ctx: &OfflineContext,
        source: &AudioBuffer,
        destination: &mut AudioBuffer,
    ) -> Result<()> {
        if self.capability() == EffectCapability::Realtime {
            return Err(Error::Effect(format!(
                "'{}' cannot be rendered offline",
                self.name()
            )));
        }
        if source.channel_count() < 2
            || destination.channel_count() < 2
            || source.len() != destination.len()
        {
            return Err(Error::Effect(format!(
                "'{}' needs matching stereo buffers for offline rendering",
                self.name()
            )));
        }

        let block = ctx.block_size.max(1);
        self.prepare(ctx.sample_rate, block);
        self.reset();

        destination.channel_mut(0).copy_from_slice(source.channel(0));
        destination.channel_mut(1).copy_from_slice(source.channel(1));
        let Some((left, right)) = destination.stereo_mut() else {
            return Ok(());
        };
        for (l, r) in left.chunks_mut(block).zip(right.chunks_mut(block)) {
            self.process(l, r);
        }
        Ok(())
    }
}

dyn_clone::clone_trait_object!(Effect);
