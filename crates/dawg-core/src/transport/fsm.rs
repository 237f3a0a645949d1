//! Transport state machine.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportState {
    #[default]
    Stopped,
    Playing,
    Paused,
}

impl TransportState {
    pub(crate) fn to_u8(self) -> u8 {
        match self {
            TransportState::Stopped => 0,
            TransportState::Playing => 1,
            TransportState::Paused => 2,
        }
    }

    pub(crate) fn from_u8(value: u8) -> Self {
        match value {
            1 => TransportState::Playing,
            2 => TransportState::Paused,
            _ => TransportState::Stopped,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportEvent {
    Play,
    Pause,
    Stop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionResult {
    /// The event does not apply in the current state.
    None,
    StateChanged(TransportState),
}

#[derive(Debug, Default)]
pub struct TransportFSM {
    state: TransportState,
}

impl TransportFSM {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> TransportState {
        self.state
    }

    pub fn transition(&mut self, event: TransportEvent) -> TransitionResult {
        use TransportState::*;

        let next = match (event, self.state) {
            (TransportEvent::Play, Stopped | Paused) => Playing,
            (TransportEvent::Pause, Playing) => Paused,
            (TransportEvent::Stop, Playing | Paused) => Stopped,
            _ => return TransitionResult::None,
        };
        self.state = next;
        TransitionResult::StateChanged(next)
    }
}
