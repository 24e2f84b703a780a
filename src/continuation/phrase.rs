use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::events::{MidiMessage, RawEvent, StatusKind, TimedEvent};
use crate::timing::{PlaybackPlan, ScheduledAction};

/// One note of a finished phrase, with the feel it was played with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayedNote {
    pub pitch: u8,
    pub velocity: u8,
    /// Status byte of the Note-On, so the channel survives.
    pub status: u8,
    /// Time since the previous note started. Zero for the first note.
    pub gap: Duration,
    pub length: Duration,
}

/// Pairs each Note-On with the next Note-Off of the same pitch. Notes still
/// held at the end run until the last event, and Note-Offs with nothing to
/// close are skipped.
pub fn extract_notes(events: &[TimedEvent]) -> Vec<PlayedNote> {
    let Some(end) = events.last().map(|e| e.timestamp) else {
        return Vec::new();
    };

    let mut notes: Vec<PlayedNote> = Vec::new();
    let mut onsets: Vec<Instant> = Vec::new();
    let mut open: HashMap<u8, usize> = HashMap::new();

    for event in events {
        match event.message {
            MidiMessage::NoteOn { pitch, velocity } => {
                // Retriggering a held pitch ends the earlier note.
                if let Some(index) = open.remove(&pitch) {
                    notes[index].length = event.timestamp.saturating_duration_since(onsets[index]);
                }
                let gap = onsets
                    .last()
                    .map_or(Duration::ZERO, |prev| event.timestamp.saturating_duration_since(*prev));
                open.insert(pitch, notes.len());
                onsets.push(event.timestamp);
                notes.push(PlayedNote {
                    pitch,
                    velocity,
                    status: event.raw.status,
                    gap,
                    length: Duration::ZERO,
                });
            }
            MidiMessage::NoteOff { pitch } => {
                if let Some(index) = open.remove(&pitch) {
                    notes[index].length = event.timestamp.saturating_duration_since(onsets[index]);
                }
            }
        }
    }

    for index in open.into_values() {
        notes[index].length = end.saturating_duration_since(onsets[index]);
    }

    notes
}

/// Lays the notes out one after another, each starting `gap` after the one
/// before it. The first note starts at once. A note is cut short when the
/// same pitch starts again before it ends.
pub fn render(notes: &[PlayedNote]) -> PlaybackPlan {
    let mut onsets = Vec::with_capacity(notes.len());
    let mut onset = Duration::ZERO;
    for (i, note) in notes.iter().enumerate() {
        if i > 0 {
            onset += note.gap;
        }
        onsets.push(onset);
    }

    let mut actions = Vec::with_capacity(notes.len() * 2);
    for (i, (note, &onset)) in notes.iter().zip(&onsets).enumerate() {
        let retrigger = notes[i + 1..]
            .iter()
            .zip(&onsets[i + 1..])
            .find(|(later, _)| later.pitch == note.pitch)
            .map(|(_, &at)| at);
        let release = match retrigger {
            Some(at) => at.min(onset + note.length),
            None => onset + note.length,
        };

        actions.push(ScheduledAction {
            delay: onset,
            message: RawEvent::new(note.status, note.pitch, note.velocity),
            starts_note: true,
        });
        actions.push(ScheduledAction {
            delay: release,
            message: RawEvent::new(StatusKind::NOTE_OFF | (note.status & 0x0F), note.pitch, 0),
            starts_note: false,
        });
    }

    PlaybackPlan::from_actions(actions)
}
