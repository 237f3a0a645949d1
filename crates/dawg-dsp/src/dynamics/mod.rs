//! Dynamics processors.
//!
//! - [`Compressor`] - stereo-linked feed-forward compressor
//! - [`Limiter`] - brickwall peak limiter with a fixed ceiling
//!
//! ## Example
//!
//! ```
//! use dawg_dsp::Compressor;
//!
//! let comp = Compressor::builder()
//!     .threshold_db(-20.0)
//!     .ratio(4.0)
//!     .attack_seconds(0.001)
//!     .release_seconds(0.05)
//!     .build()?;
//! # Ok::<(), dawg_dsp::Error>(())
//! ```

mod utils;

mod compressor;
mod limiter;

pub use compressor::{Compressor, CompressorBuilder};
pub use limiter::Limiter;
