use std::time::Instant;

/// A channel-voice message as it arrives from the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawEvent {
    pub status: u8,
    pub pitch: u8,
    pub velocity: u8,
}

impl RawEvent {
    pub fn new(status: u8, pitch: u8, velocity: u8) -> Self {
        Self {
            status,
            pitch,
            velocity,
        }
    }

    /// Missing data bytes read as zero. An empty slice carries no event.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        let (&status, data) = bytes.split_first()?;
        Some(Self {
            status,
            pitch: data.first().copied().unwrap_or(0),
            velocity: data.get(1).copied().unwrap_or(0),
        })
    }

    pub fn to_bytes(self) -> [u8; 3] {
        [self.status, self.pitch, self.velocity]
    }
}

/// The two status families a note event can belong to. Channel is ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    NoteOff,
    NoteOn,
}

impl StatusKind {
    pub const NOTE_OFF: u8 = 0x80;
    pub const NOTE_ON: u8 = 0x90;

    pub fn of(status: u8) -> Option<Self> {
        match status & 0xF0 {
            Self::NOTE_OFF => Some(StatusKind::NoteOff),
            Self::NOTE_ON => Some(StatusKind::NoteOn),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MidiMessage {
    NoteOn { pitch: u8, velocity: u8 },
    NoteOff { pitch: u8 },
}

impl MidiMessage {
    /// A Note-On with zero velocity is a Note-Off. Anything that is not a note
    /// message yields `None` and must be ignored by the caller.
    pub fn classify(raw: &RawEvent) -> Option<Self> {
        match StatusKind::of(raw.status)? {
            StatusKind::NoteOn if raw.velocity > 0 => Some(MidiMessage::NoteOn {
                pitch: raw.pitch,
                velocity: raw.velocity,
            }),
            StatusKind::NoteOn | StatusKind::NoteOff => {
                Some(MidiMessage::NoteOff { pitch: raw.pitch })
            }
        }
    }

    pub fn pitch(&self) -> u8 {
        match self {
            MidiMessage::NoteOn { pitch, .. } | MidiMessage::NoteOff { pitch } => *pitch,
        }
    }

    pub fn is_note_on(&self) -> bool {
        matches!(self, MidiMessage::NoteOn { .. })
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TimedEvent {
    pub raw: RawEvent,
    pub message: MidiMessage,
    pub timestamp: Instant,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_note_on() {
        let raw = RawEvent::new(0x90, 60, 100);
        assert_eq!(
            MidiMessage::classify(&raw),
            Some(MidiMessage::NoteOn {
                pitch: 60,
                velocity: 100
            })
        );

        let other_channel = RawEvent::new(0x9F, 61, 1);
        assert!(MidiMessage::classify(&other_channel).unwrap().is_note_on());
    }

    #[test]
    fn zero_velocity_note_on_is_note_off() {
        let raw = RawEvent::new(0x93, 64, 0);
        assert_eq!(
            MidiMessage::classify(&raw),
            Some(MidiMessage::NoteOff { pitch: 64 })
        );
    }

    #[test]
    fn classifies_note_off_on_every_channel() {
        for status in 0x80..=0x8F {
            let raw = RawEvent::new(status, 48, 64);
            assert_eq!(
                MidiMessage::classify(&raw),
                Some(MidiMessage::NoteOff { pitch: 48 })
            );
        }
    }

    #[test]
    fn ignores_other_status_bytes() {
        for status in [0x00, 0x7F, 0xA0, 0xB0, 0xC0, 0xE0, 0xF8, 0xFE] {
            let raw = RawEvent::new(status, 60, 100);
            assert_eq!(MidiMessage::classify(&raw), None, "status {status:#X}");
        }
    }

    #[test]
    fn reads_short_messages() {
        assert_eq!(RawEvent::from_bytes(&[]), None);
        assert_eq!(
            RawEvent::from_bytes(&[0xC0, 5]),
            Some(RawEvent::new(0xC0, 5, 0))
        );
        assert_eq!(
            RawEvent::from_bytes(&[0x90, 60, 100, 0xFF]),
            Some(RawEvent::new(0x90, 60, 100))
        );
    }
}
