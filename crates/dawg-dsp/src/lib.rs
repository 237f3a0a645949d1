//! Built-in effects for dawg tracks and the master bus.
//!
//! Every effect implements [`dawg_core::Effect`]; parameters are exposed
//! through the effect's [`dawg_core::ParameterSet`] and read lock-free on the
//! audio path.

mod error;
pub use error::{Error, Result};

mod gain;
pub use gain::Gain;

mod delay;
pub use delay::{Delay, MAX_DELAY_SECONDS};

#[cfg(feature = "dynamics")]
mod dynamics;
#[cfg(feature = "dynamics")]
pub use dynamics::{Compressor, CompressorBuilder, Limiter};
