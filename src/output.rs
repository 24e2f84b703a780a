use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;

use crate::error::OutputError;

/// Fire-and-forget destination for outgoing note messages.
pub trait MidiSink {
    fn send(&mut self, message: [u8; 3]) -> Result<(), OutputError>;
}

impl MidiSink for midir::MidiOutputConnection {
    fn send(&mut self, message: [u8; 3]) -> Result<(), OutputError> {
        midir::MidiOutputConnection::send(self, &message).map_err(OutputError::from)
    }
}

impl<S: MidiSink + ?Sized> MidiSink for Box<S> {
    fn send(&mut self, message: [u8; 3]) -> Result<(), OutputError> {
        (**self).send(message)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SentMessage {
    pub bytes: [u8; 3],
    pub sent_at: Instant,
}

/// Keeps every sent message in memory. Clones share the same log, so one
/// clone can be handed to the engine while another is inspected.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    sent: Arc<Mutex<Vec<SentMessage>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<SentMessage> {
        self.sent.lock().clone()
    }

    pub fn bytes(&self) -> Vec<[u8; 3]> {
        self.sent.lock().iter().map(|m| m.bytes).collect()
    }

    pub fn clear(&self) {
        self.sent.lock().clear();
    }
}

impl MidiSink for MemorySink {
    fn send(&mut self, message: [u8; 3]) -> Result<(), OutputError> {
        self.sent.lock().push(SentMessage {
            bytes: message,
            sent_at: Instant::now(),
        });
        Ok(())
    }
}

/// Dry-run output: every message goes to the log instead of a port.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl MidiSink for LogSink {
    fn send(&mut self, message: [u8; 3]) -> Result<(), OutputError> {
        tracing::info!(
            status = message[0],
            pitch = message[1],
            velocity = message[2],
            "out"
        );
        Ok(())
    }
}

/// Sends one message; a failed send is logged and otherwise ignored.
pub(crate) fn deliver<S: MidiSink + ?Sized>(sink: &mut S, message: [u8; 3]) {
    if let Err(e) = sink.send(message) {
        tracing::warn!(?message, "send failed: {}", e);
    }
}
