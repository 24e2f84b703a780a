use std::time::{Duration, Instant};

use super::{Deferred, TimerId, TimerQueue};
use crate::events::{RawEvent, TimedEvent};
use crate::output::{MidiSink, deliver};
use crate::playback::SoundingNotes;

/// Shifts a pitch by `semitones`. Values above 127 are passed through as-is;
/// `None` when the result does not fit in a data byte at all.
pub fn transpose(pitch: u8, semitones: i8) -> Option<u8> {
    pitch.checked_add_signed(semitones)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledAction {
    /// Offset from the start of the replay.
    pub delay: Duration,
    pub message: RawEvent,
    pub starts_note: bool,
}

#[derive(Debug, Clone, Default)]
pub struct PlaybackPlan {
    actions: Vec<ScheduledAction>,
}

impl PlaybackPlan {
    pub fn build(events: &[TimedEvent], transpose_semitones: i8) -> Self {
        let Some(t0) = events.first().map(|e| e.timestamp) else {
            return Self::default();
        };

        let actions = events
            .iter()
            .filter_map(|event| {
                let Some(pitch) = transpose(event.raw.pitch, transpose_semitones) else {
                    tracing::warn!(
                        pitch = event.raw.pitch,
                        transpose_semitones,
                        "transposed pitch out of byte range, dropping"
                    );
                    return None;
                };
                Some(ScheduledAction {
                    delay: event.timestamp.saturating_duration_since(t0),
                    message: RawEvent::new(event.raw.status, pitch, event.raw.velocity),
                    starts_note: event.message.is_note_on(),
                })
            })
            .collect();

        Self { actions }
    }

    /// Orders `actions` by delay. Actions with equal delays keep their order.
    pub fn from_actions(mut actions: Vec<ScheduledAction>) -> Self {
        actions.sort_by_key(|a| a.delay);
        Self { actions }
    }

    pub fn actions(&self) -> &[ScheduledAction] {
        &self.actions
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn duration(&self) -> Duration {
        self.actions
            .iter()
            .map(|a| a.delay)
            .max()
            .unwrap_or(Duration::ZERO)
    }
}

/// A plan that has been put on the timer queue.
#[derive(Debug)]
pub struct Replay {
    handles: Vec<TimerId>,
    remaining: usize,
    sounding: SoundingNotes,
}

impl Replay {
    pub fn start(plan: PlaybackPlan, timers: &mut TimerQueue<Deferred>, now: Instant) -> Self {
        let remaining = plan.len();
        let handles = plan
            .actions
            .into_iter()
            .map(|action| timers.schedule(now + action.delay, Deferred::ReplayAction(action)))
            .collect();

        Self {
            handles,
            remaining,
            sounding: SoundingNotes::new(),
        }
    }

    pub fn fire<S: MidiSink + ?Sized>(&mut self, action: &ScheduledAction, sink: &mut S) {
        deliver(sink, action.message.to_bytes());

        if action.starts_note {
            self.sounding
                .note_started(action.message.pitch, action.message.status);
        } else {
            self.sounding.note_stopped(action.message.pitch);
        }
        self.remaining = self.remaining.saturating_sub(1);
    }

    pub fn is_finished(&self) -> bool {
        self.remaining == 0
    }

    #[cfg(test)]
    pub fn remaining(&self) -> usize {
        self.remaining
    }

    pub fn sounding(&self) -> &SoundingNotes {
        &self.sounding
    }

    pub(crate) fn into_parts(self) -> (Vec<TimerId>, SoundingNotes) {
        (self.handles, self.sounding)
    }
}
