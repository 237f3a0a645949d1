mod fsm;
mod manager;
mod position;

pub use fsm::{TransitionResult, TransportEvent, TransportFSM, TransportState};
pub use manager::{
    Transport, TransportHandle, TransportSegment, DEFAULT_TEMPO, MAX_TEMPO, MIN_TEMPO,
};
pub use position::{seconds_to_samples, LoopRange, TimeSignature};
