//! Sample-accurate event timeline.
//!
//! Events are registered at absolute transport sample positions and stay
//! registered until cancelled, so a looping transport fires them again on
//! every pass. Cancelling removes the pending entry; nothing fires for a
//! cancelled id.

use std::collections::{BTreeMap, HashMap};
use std::ops::Range;

/// Handle returned by [`Scheduler::schedule`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EventId(u64);

/// Register of timed events keyed by transport sample.
#[derive(Debug, Clone)]
pub struct Scheduler<T> {
    events: BTreeMap<u64, Vec<(EventId, T)>>,
    index: HashMap<EventId, u64>,
    next_id: u64,
}

impl<T> Default for Scheduler<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Scheduler<T> {
    pub fn new() -> Self {
        Self {
            events: BTreeMap::new(),
            index: HashMap::new(),
            next_id: 0,
        }
    }

    pub fn schedule(&mut self, at_sample: u64, payload: T) -> EventId {
        let id = EventId(self.next_id);
        self.next_id += 1;
        self.events.entry(at_sample).or_default().push((id, payload));
        self.index.insert(id, at_sample);
        id
    }

    /// Remove a pending event, returning its payload.
    pub fn cancel(&mut self, id: EventId) -> Option<T> {
        let at = self.index.remove(&id)?;
        let slot = self.events.get_mut(&at)?;
        let position = slot.iter().position(|(event, _)| *event == id)?;
        let (_, payload) = slot.remove(position);
        if slot.is_empty() {
            self.events.remove(&at);
        }
        Some(payload)
    }

    /// Move a pending event to a new sample position.
    pub fn reschedule(&mut self, id: EventId, at_sample: u64) -> bool {
        let Some(old) = self.index.get(&id).copied() else {
            return false;
        };
        let Some(slot) = self.events.get_mut(&old) else {
            return false;
        };
        let Some(position) = slot.iter().position(|(event, _)| *event == id) else {
            return false;
        };
        let entry = slot.remove(position);
        if slot.is_empty() {
            self.events.remove(&old);
        }
        self.events.entry(at_sample).or_default().push(entry);
        self.index.insert(id, at_sample);
        true
    }

    /// Sample position of a pending event.
    pub fn position_of(&self, id: EventId) -> Option<u64> {
        self.index.get(&id).copied()
    }

    /// Visit every event in `range` (half-open) in time order.
    pub fn for_each_in(&self, range: Range<u64>, mut f: impl FnMut(u64, &T)) {
        if range.start >= range.end {
            return;
        }
        for (&at, slot) in self.events.range(range) {
            for (_, payload) in slot {
                f(at, payload);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn clear(&mut self) {
        self.events.clear();
        self.index.clear();
    }
}
