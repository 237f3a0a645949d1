//! Recording state.

/// Recording state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum RecordingState {
    #[default]
    Idle = 0,
    /// Waiting for the device to open (permission prompts happen here)
    OpeningDevice = 1,
    /// Capturing
    Recording = 2,
    /// Device closed, payload being decoded
    Finalizing = 3,
}

impl From<u8> for RecordingState {
    fn from(value: u8) -> Self {
        match value {
            1 => RecordingState::OpeningDevice,
            2 => RecordingState::Recording,
            3 => RecordingState::Finalizing,
            _ => RecordingState::Idle,
        }
    }
}

impl RecordingState {
    /// Anything other than `Idle`.
    pub fn is_active(self) -> bool {
        self != RecordingState::Idle
    }
}
