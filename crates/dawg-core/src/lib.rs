//! Core types for the dawg audio engine.
//!
//! # Primary API
//!
//! - [`AudioBuffer`] / [`BufferPool`]: sample storage and reuse
//! - [`Clip`]: placed, trimmed region of a shared buffer
//! - [`Scheduler`]: sample-accurate event register
//! - [`Transport`]: playhead, tempo, time signature and loop
//! - [`Effect`]: effect capability with named parameters
//! - [`LevelMeter`], [`AtomicAmplitude`], [`AnalyzerTap`]: metering
//! - [`EventBus`]: typed engine notifications
//! - [`AudioSession`]: output session lifecycle
//!
//! # Example
//!
//! ```
//! use dawg_core::{AudioBuffer, BufferPool};
//!
//! let mut pool = BufferPool::new(16, 48000.0);
//! let buffer = pool.acquire(1024, 2, None)?;
//! let id = buffer.id();
//! pool.release(buffer);
//! assert_eq!(pool.acquire(1024, 2, None)?.id(), id);
//! # Ok::<(), dawg_core::Error>(())
//! ```

pub mod error;
pub use error::{check_range, Error, Result};

mod ids;
pub use ids::{BufferId, ClipId, TrackId, TrackKind};

mod lockfree;
pub use lockfree::{AtomicDouble, AtomicFlag, AtomicFloat};

pub mod config;
pub use config::{EngineConfig, LatencyHint, RenderConfig};

mod buffer;
pub use buffer::{AudioBuffer, BufferInfo, MAX_CHANNELS};

mod pool;
pub use pool::{BufferPool, PoolStats};

mod clip;
pub use clip::{Clip, ClipSpec, TIME_EPSILON};

mod scheduler;
pub use scheduler::{EventId, Scheduler};

pub mod transport;
pub use transport::{
    LoopRange, TimeSignature, TransitionResult, Transport, TransportHandle, TransportSegment,
    TransportState,
};

pub mod metering;
pub use metering::{AnalyzerTap, AtomicAmplitude, LevelMeter, MasterLevel, TrackLevel};

mod parameter;
pub use parameter::{Parameter, ParameterRange, ParameterSet};

mod effect;
pub use effect::{Effect, EffectCapability, OfflineContext};

mod events;
pub use events::{EngineEvent, EventBus};

mod session;
pub use session::{AudioSession, HeadlessSession};

/// Convert decibels to linear gain.
#[inline]
pub fn db_to_linear(db: f32) -> f32 {
    10.0f32.powf(db / 20.0)
}

/// Convert linear gain to decibels.
#[inline]
pub fn linear_to_db(linear: f32) -> f32 {
    if linear <= 0.0 {
        f32::NEG_INFINITY
    } else {
        20.0 * linear.log10()
    }
}

/// Stereo pan in place, unity at centre.
///
/// Panning left folds the right channel into the left (and vice versa) with
/// equal-power gains, so a hard-panned stereo source keeps both channels.
pub fn stereo_pan(pan: f32, left: &mut [f32], right: &mut [f32]) {
    let pan = pan.clamp(-1.0, 1.0);
    if pan == 0.0 {
        return;
    }
    let x = if pan < 0.0 { pan + 1.0 } else { pan };
    let angle = x * std::f32::consts::FRAC_PI_2;
    let (gain_l, gain_r) = (angle.cos(), angle.sin());

    for (l, r) in left.iter_mut().zip(right.iter_mut()) {
        let (in_l, in_r) = (*l, *r);
        if pan < 0.0 {
            *l = in_l + in_r * gain_l;
            *r = in_r * gain_r;
        } else {
            *l = in_l * gain_l;
            *r = in_r + in_l * gain_r;
        }
    }
}
