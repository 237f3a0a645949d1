//! Per-track recording state machine.

use super::{RecordingDevice, RecordingState};
use crate::{decode_wav, Error, Result};
use dawg_core::AudioBuffer;

/// Owns the device for the duration of one take.
///
/// Every failure path returns the recorder to `Idle`, so the caller can try
/// again or carry on with other tracks.
pub struct Recorder {
    state: RecordingState,
    device: Option<Box<dyn RecordingDevice>>,
    sample_rate: f64,
}

impl Recorder {
    pub fn new(sample_rate: f64) -> Self {
        Self {
            state: RecordingState::Idle,
            device: None,
            sample_rate,
        }
    }

    pub fn state(&self) -> RecordingState {
        self.state
    }

    pub fn is_recording(&self) -> bool {
        self.state == RecordingState::Recording
    }

    pub fn start(&mut self, mut device: Box<dyn RecordingDevice>) -> Result<()> {
        if self.state.is_active() {
            return Err(Error::AlreadyRecording);
        }

        self.state = RecordingState::OpeningDevice;
        if let Err(e) = device.open(self.sample_rate) {
            tracing::warn!(error = %e, "failed to open recording device");
            self.state = RecordingState::Idle;
            return Err(e);
        }

        self.device = Some(device);
        self.state = RecordingState::Recording;
        tracing::debug!("recording started");
        Ok(())
    }

    /// Close the device and decode the take.
    pub fn stop(&mut self) -> Result<AudioBuffer> {
        if self.state != RecordingState::Recording {
            return Err(Error::NotRecording);
        }
        let Some(mut device) = self.device.take() else {
            self.state = RecordingState::Idle;
            return Err(Error::NotRecording);
        };

        self.state = RecordingState::Finalizing;
        let result = device.close().and_then(|payload| decode_wav(&payload));
        self.state = RecordingState::Idle;

        match &result {
            Ok(buffer) => tracing::debug!(
                frames = buffer.len(),
                channels = buffer.channel_count(),
                "recording finalized"
            ),
            Err(e) => tracing::warn!(error = %e, "recording could not be finalized"),
        }
        result
    }

    /// Mix the device's monitor feed into `left`/`right` while recording.
    pub fn monitor(&mut self, left: &mut [f32], right: &mut [f32]) {
        if self.state != RecordingState::Recording {
            return;
        }
        if let Some(device) = self.device.as_mut() {
            device.monitor(left, right);
        }
    }

    /// Abort an active recording. Returns `false` if nothing was running.
    pub fn cancel(&mut self) -> bool {
        if !self.state.is_active() {
            return false;
        }
        if let Some(mut device) = self.device.take() {
            device.abort();
        }
        self.state = RecordingState::Idle;
        tracing::debug!("recording cancelled");
        true
    }
}

impl Drop for Recorder {
    fn drop(&mut self) {
        self.cancel();
    }
}
