//! Recording and sample loading.
//!
//! - [`Recorder`]: per-track recording state machine over a [`RecordingDevice`]
//! - [`decode_wav`] / [`encode_wav`]: WAV payloads to and from [`dawg_core::AudioBuffer`]
//! - [`SampleLoader`]: decode-from-URL capability, with [`FileSampleLoader`]
//!
//! # Example
//!
//! ```
//! use dawg_core::AudioBuffer;
//! use dawg_sampler::{BufferDevice, Recorder};
//!
//! let take = AudioBuffer::constant(0.5, 480, 48000.0);
//! let mut recorder = Recorder::new(48000.0);
//! recorder.start(Box::new(BufferDevice::new(take)))?;
//! let recorded = recorder.stop()?;
//! assert_eq!(recorded.len(), 480);
//! # Ok::<(), dawg_sampler::Error>(())
//! ```

pub mod error;
pub use error::{Error, Result};

mod decode;
pub use decode::{decode_wav, encode_wav};

mod loader;
pub use loader::{FileSampleLoader, SampleLoader};

pub mod recording;
pub use recording::{BufferDevice, DeviceFactory, Recorder, RecordingDevice, RecordingState};
