//! Typed engine notifications.
//!
//! Events are for observers (UI, logging); engine logic never depends on them.
//! Every subscriber gets its own unbounded channel; disconnected receivers
//! are pruned on the next emit.

use crate::{ClipId, TrackId};
use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;

#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    TrackCreated { id: TrackId, name: String },
    TrackDeleted { id: TrackId },
    PlaybackStarted,
    PlaybackPaused { position: f64 },
    PlaybackStopped,
    TempoChanged { bpm: f64 },
    RecordingStarted { track: TrackId },
    RecordingStopped { track: TrackId, clip: ClipId },
    RenderCompleted { duration: f64, peak: f32 },
}

#[derive(Debug, Default)]
pub struct EventBus {
    subscribers: Mutex<Vec<Sender<EngineEvent>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> Receiver<EngineEvent> {
        let (tx, rx) = unbounded();
        self.subscribers.lock().push(tx);
        rx
    }

    pub fn emit(&self, event: EngineEvent) {
        tracing::trace!(?event, "engine event");
        self.subscribers
            .lock()
            .retain(|tx| tx.send(event.clone()).is_ok());
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }
}
