use std::collections::HashSet;

use crate::events::MidiMessage;

/// Pitches currently held down by the player.
#[derive(Debug, Default)]
pub struct ActiveNotes {
    held: HashSet<u8>,
}

impl ActiveNotes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn note_on(&mut self, pitch: u8) {
        self.held.insert(pitch);
    }

    /// Stray and duplicate releases are tolerated.
    pub fn note_off(&mut self, pitch: u8) {
        self.held.remove(&pitch);
    }

    pub fn apply(&mut self, message: &MidiMessage) {
        match *message {
            MidiMessage::NoteOn { pitch, .. } => self.note_on(pitch),
            MidiMessage::NoteOff { pitch } => self.note_off(pitch),
        }
    }

    pub fn all_released(&self) -> bool {
        self.held.is_empty()
    }

    #[cfg(test)]
    pub fn is_held(&self, pitch: u8) -> bool {
        self.held.contains(&pitch)
    }

    pub fn len(&self) -> usize {
        self.held.len()
    }

    pub fn is_empty(&self) -> bool {
        self.held.is_empty()
    }
}
