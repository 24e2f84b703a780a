use std::collections::BTreeMap;

use crate::events::StatusKind;
use crate::output::{MidiSink, deliver};
use crate::timing::{Deferred, Replay, TimerQueue};

/// Transposed pitches the replay has started and not yet stopped, with the
/// status byte that started them.
#[derive(Debug, Default)]
pub struct SoundingNotes {
    notes: BTreeMap<u8, u8>,
}

impl SoundingNotes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn note_started(&mut self, pitch: u8, status: u8) {
        self.notes.insert(pitch, status);
    }

    pub fn note_stopped(&mut self, pitch: u8) {
        self.notes.remove(&pitch);
    }

    pub fn pitches(&self) -> Vec<u8> {
        self.notes.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    /// Note-Off messages owed for everything still sounding. Empties the map.
    fn take_note_offs(&mut self) -> Vec<[u8; 3]> {
        std::mem::take(&mut self.notes)
            .into_iter()
            .filter(|&(_, status)| StatusKind::of(status) == Some(StatusKind::NoteOn))
            .map(|(pitch, _)| [StatusKind::NOTE_OFF, pitch, 0])
            .collect()
    }
}

/// Stops a replay in its tracks: pending actions are dropped from the queue
/// and every note the replay left sounding gets an explicit Note-Off.
/// Returns how many Note-Offs were sent.
pub fn cancel_replay<S: MidiSink + ?Sized>(
    replay: Replay,
    timers: &mut TimerQueue<Deferred>,
    sink: &mut S,
) -> usize {
    let (handles, mut sounding) = replay.into_parts();

    let cancelled = handles
        .into_iter()
        .filter_map(|id| timers.cancel(id))
        .count();

    let note_offs = sounding.take_note_offs();
    for message in &note_offs {
        deliver(sink, *message);
    }

    tracing::debug!(
        cancelled,
        forced_note_offs = note_offs.len(),
        "replay cancelled"
    );
    note_offs.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{MidiMessage, RawEvent, TimedEvent};
    use crate::output::MemorySink;
    use crate::timing::PlaybackPlan;
    use std::time::{Duration, Instant};

    fn timed(status: u8, pitch: u8, velocity: u8, at: Instant) -> TimedEvent {
        let raw = RawEvent::new(status, pitch, velocity);
        TimedEvent {
            raw,
            message: MidiMessage::classify(&raw).unwrap(),
            timestamp: at,
        }
    }

    #[test]
    fn forces_note_off_for_sounding_notes() {
        let t0 = Instant::now();
        let events = vec![
            timed(0x90, 60, 100, t0),
            timed(0x92, 64, 80, t0 + Duration::from_millis(10)),
            timed(0x80, 60, 0, t0 + Duration::from_millis(100)),
            timed(0x82, 64, 0, t0 + Duration::from_millis(200)),
        ];
        let mut timers = TimerQueue::new();
        let mut sink = MemorySink::new();
        let mut replay = Replay::start(PlaybackPlan::build(&events, 2), &mut timers, t0);

        while let Some((_, Deferred::ReplayAction(action))) =
            timers.pop_due(t0 + Duration::from_millis(50))
        {
            replay.fire(&action, &mut sink);
        }
        assert_eq!(replay.sounding().len(), 2);
        sink.clear();

        let forced = cancel_replay(replay, &mut timers, &mut sink);
        assert_eq!(forced, 2);
        assert!(timers.is_empty());
        assert_eq!(sink.bytes(), vec![[0x80, 62, 0], [0x80, 66, 0]]);
    }

    #[test]
    fn cancel_before_anything_fired_sends_nothing() {
        let t0 = Instant::now();
        let events = vec![
            timed(0x90, 60, 100, t0),
            timed(0x80, 60, 0, t0 + Duration::from_millis(100)),
        ];
        let mut timers = TimerQueue::new();
        timers.schedule(t0 + Duration::from_secs(1), Deferred::SilenceCheck);
        let mut sink = MemorySink::new();
        let replay = Replay::start(PlaybackPlan::build(&events, 2), &mut timers, t0);
        assert_eq!(timers.len(), 3);

        assert_eq!(cancel_replay(replay, &mut timers, &mut sink), 0);
        assert!(sink.bytes().is_empty());
        assert_eq!(timers.len(), 1);
    }

    #[test]
    fn only_note_on_statuses_are_owed_a_note_off() {
        let mut sounding = SoundingNotes::new();
        sounding.note_started(62, 0x90);
        sounding.note_started(70, 0xB0);
        let offs = sounding.take_note_offs();
        assert_eq!(offs, vec![[0x80, 62, 0]]);
        assert!(sounding.is_empty());
    }
}
