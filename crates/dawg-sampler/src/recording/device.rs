//! Recording device capability.

use crate::{encode_wav, Error, Result};
use dawg_core::AudioBuffer;
use std::sync::Arc;

/// A capture stream. `close` returns the take as a decodable WAV payload.
pub trait RecordingDevice: Send {
    /// Open the capture stream. Fails with `DeviceAccessDenied` or
    /// `DeviceUnavailable`.
    fn open(&mut self, sample_rate: f64) -> Result<()>;

    /// Stop capturing and hand over the payload.
    fn close(&mut self) -> Result<Vec<u8>>;

    /// Stop capturing and discard everything.
    fn abort(&mut self);

    /// Mix input captured since the last call into `left`/`right` so the
    /// track can monitor it. Devices without a monitor feed leave both
    /// slices untouched.
    fn monitor(&mut self, _left: &mut [f32], _right: &mut [f32]) {}
}

/// Creates a fresh device for each recording.
pub type DeviceFactory = Arc<dyn Fn() -> Box<dyn RecordingDevice> + Send + Sync>;

/// Device that "captures" a prepared buffer. Used for headless sessions and
/// tests.
///
/// While open, the monitor feed plays the take from its first frame; mono
/// takes feed both sides.
#[derive(Debug, Clone)]
pub struct BufferDevice {
    take: AudioBuffer,
    open: bool,
    cursor: usize,
}

impl BufferDevice {
    pub fn new(take: AudioBuffer) -> Self {
        Self {
            take,
            open: false,
            cursor: 0,
        }
    }

    pub fn is_open(&self) -> bool {
        self.open
    }
}

impl RecordingDevice for BufferDevice {
    fn open(&mut self, _sample_rate: f64) -> Result<()> {
        if self.open {
            return Err(Error::DeviceUnavailable("device already open".into()));
        }
        self.open = true;
        self.cursor = 0;
        Ok(())
    }

    fn close(&mut self) -> Result<Vec<u8>> {
        if !self.open {
            return Err(Error::DeviceUnavailable("device not open".into()));
        }
        self.open = false;
        encode_wav(&self.take)
    }

    fn abort(&mut self) {
        self.open = false;
    }

    fn monitor(&mut self, left: &mut [f32], right: &mut [f32]) {
        if !self.open || self.take.channel_count() == 0 {
            return;
        }
        let start = self.cursor.min(self.take.len());
        let frames = left.len().min(right.len()).min(self.take.len() - start);
        let last = self.take.channel_count().min(2) - 1;
        let src_l = &self.take.channel(0)[start..start + frames];
        let src_r = &self.take.channel(last)[start..start + frames];
        for (d, s) in left.iter_mut().zip(src_l) {
            *d += s;
        }
        for (d, s) in right.iter_mut().zip(src_r) {
            *d += s;
        }
        self.cursor = start + frames;
    }
}
