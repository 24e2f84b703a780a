use std::time::Instant;

use crate::events::{MidiMessage, RawEvent, TimedEvent};

/// Everything played since the last flush, in arrival order.
#[derive(Debug, Default)]
pub struct RecordingBuffer {
    events: Vec<TimedEvent>,
}

impl RecordingBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, raw: RawEvent, message: MidiMessage, timestamp: Instant) {
        self.events.push(TimedEvent {
            raw,
            message,
            timestamp,
        });
    }

    /// Hands over the whole recording and leaves the buffer empty.
    pub fn drain_all(&mut self) -> Vec<TimedEvent> {
        std::mem::take(&mut self.events)
    }

    #[cfg(test)]
    pub fn first_timestamp(&self) -> Option<Instant> {
        self.events.first().map(|e| e.timestamp)
    }

    #[cfg(test)]
    pub fn events(&self) -> &[TimedEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
