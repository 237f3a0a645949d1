//! Audio recording.
//!
//! The [`Recorder`] drives a [`RecordingDevice`] through an explicit state
//! machine: `Idle -> OpeningDevice -> Recording -> Finalizing -> Idle`.
//! Cancellation is a defined transition back to `Idle` from any active state.

mod device;
mod recorder;
mod state;

pub use device::{BufferDevice, DeviceFactory, RecordingDevice};
pub use recorder::Recorder;
pub use state::RecordingState;
