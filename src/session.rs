use std::time::Instant;

use rand::SeedableRng;
use rand::rngs::SmallRng;

use crate::capture::{ActiveNotes, RecordingBuffer};
use crate::config::{ResponseMode, Settings};
use crate::continuation::{Memory, extract_notes, render};
use crate::events::{MidiMessage, RawEvent};
use crate::output::MidiSink;
use crate::playback::cancel_replay;
use crate::timing::{Deferred, PlaybackPlan, Replay, SilenceDetector, TimerId, TimerQueue};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Recording,
    Replaying,
}

/// What happened while handling input or timers, for anyone watching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    StateChanged(SessionState),
    ReplayStarted { events: usize },
    ReplayFinished,
    ReplayCancelled { forced_note_offs: usize },
}

/// Owns every piece of capture and replay state. Time is always passed in,
/// so the owner decides what clock drives it.
pub struct Session<S: MidiSink> {
    settings: Settings,
    sink: S,
    buffer: RecordingBuffer,
    active: ActiveNotes,
    timers: TimerQueue<Deferred>,
    silence: SilenceDetector,
    replay: Option<Replay>,
    memory: Memory,
    rng: SmallRng,
    state: SessionState,
    events: Vec<SessionEvent>,
}

impl<S: MidiSink> Session<S> {
    pub fn new(settings: Settings, sink: S) -> Self {
        Self::with_rng(settings, sink, SmallRng::from_os_rng())
    }

    /// Same as `new`, with generated continuations drawn from `rng`.
    pub fn with_rng(settings: Settings, sink: S, rng: SmallRng) -> Self {
        Self {
            silence: SilenceDetector::new(settings.silence_threshold()),
            settings,
            sink,
            buffer: RecordingBuffer::new(),
            active: ActiveNotes::new(),
            timers: TimerQueue::new(),
            replay: None,
            memory: Memory::new(),
            rng,
            state: SessionState::Idle,
            events: Vec::new(),
        }
    }

    /// Live input path. Any running replay is stopped first, before the event
    /// is looked at, so no replay action can sneak out after it.
    pub fn handle_input(&mut self, raw: RawEvent, now: Instant) {
        if self.replay.is_some() {
            self.interrupt_replay();
        }

        tracing::trace!(
            status = raw.status,
            pitch = raw.pitch,
            velocity = raw.velocity,
            "in"
        );

        if let Some(message) = MidiMessage::classify(&raw) {
            self.active.apply(&message);
            self.buffer.append(raw, message, now);
            tracing::debug!(
                buffered = self.buffer.len(),
                held = self.active.len(),
                "recorded {:?}",
                message
            );
        }

        if !self.buffer.is_empty() {
            self.set_state(SessionState::Recording);
        }

        self.silence
            .arm(&mut self.timers, now, Deferred::SilenceCheck);
    }

    /// Runs everything due at or before `now`.
    pub fn poll(&mut self, now: Instant) {
        while let Some((id, deferred)) = self.timers.pop_due(now) {
            match deferred {
                Deferred::SilenceCheck => self.on_silence(id, now),
                Deferred::ReplayAction(action) => {
                    let Some(replay) = self.replay.as_mut() else {
                        continue;
                    };
                    replay.fire(&action, &mut self.sink);
                    if replay.is_finished() {
                        self.replay = None;
                        tracing::info!("replay finished");
                        self.events.push(SessionEvent::ReplayFinished);
                        self.set_state(SessionState::Idle);
                    }
                }
            }
        }
    }

    fn on_silence(&mut self, id: TimerId, now: Instant) {
        if !self.silence.fired(id) {
            return;
        }
        if self.buffer.is_empty() {
            return;
        }
        if !self.active.all_released() {
            tracing::debug!(held = self.active.len(), "silence with notes held, still recording");
            return;
        }
        self.start_replay(now);
    }

    fn start_replay(&mut self, now: Instant) {
        let recorded = self.buffer.drain_all();

        // Every phrase is learned, so switching to Continue later has
        // something to draw from.
        let phrase = extract_notes(&recorded);
        let seed: Vec<u8> = phrase.iter().map(|n| n.pitch).collect();
        self.memory.train(phrase);
        tracing::debug!(phrases = self.memory.phrases(), "learned phrase");
        tracing::trace!("memory:\n{}", self.memory);

        let plan = match self.settings.mode {
            ResponseMode::Echo => {
                PlaybackPlan::build(&recorded, self.settings.transpose_semitones)
            }
            ResponseMode::Continue => render(&self.memory.generate(
                &seed,
                self.settings.max_continuation_length,
                &mut self.rng,
            )),
        };
        tracing::info!(
            events = recorded.len(),
            duration_ms = plan.duration().as_millis() as u64,
            mode = ?self.settings.mode,
            transpose = self.settings.transpose_semitones,
            "replaying"
        );
        self.events.push(SessionEvent::ReplayStarted {
            events: plan.len(),
        });

        if plan.is_empty() {
            self.events.push(SessionEvent::ReplayFinished);
            self.set_state(SessionState::Idle);
            return;
        }

        // Zero-delay actions are due immediately and are picked up by the
        // poll loop that fired the silence check.
        self.replay = Some(Replay::start(plan, &mut self.timers, now));
        self.set_state(SessionState::Replaying);
    }

    fn interrupt_replay(&mut self) {
        let Some(replay) = self.replay.take() else {
            return;
        };
        let forced_note_offs = cancel_replay(replay, &mut self.timers, &mut self.sink);
        tracing::info!(forced_note_offs, "replay interrupted");
        self.events
            .push(SessionEvent::ReplayCancelled { forced_note_offs });
        self.set_state(SessionState::Idle);
    }

    /// Stops any replay and forgets the current recording.
    pub fn shutdown(&mut self) {
        self.interrupt_replay();
        self.silence.cancel(&mut self.timers);
        self.buffer.drain_all();
    }

    /// New values are used from the next silence window and the next replay.
    pub fn reconfigure(&mut self, settings: Settings) {
        self.silence.set_threshold(settings.silence_threshold());
        self.settings = settings;
    }

    fn set_state(&mut self, state: SessionState) {
        if self.state != state {
            tracing::debug!(from = ?self.state, to = ?state, "state");
            self.state = state;
            self.events.push(SessionEvent::StateChanged(state));
        }
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.timers.next_deadline()
    }

    pub fn drain_events(&mut self) -> Vec<SessionEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_replaying(&self) -> bool {
        self.replay.is_some()
    }

    pub fn settings(&self) -> Settings {
        self.settings
    }

    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    pub fn held_notes(&self) -> usize {
        self.active.len()
    }

    pub fn sounding_notes(&self) -> Vec<u8> {
        self.replay
            .as_ref()
            .map(|r| r.sounding().pitches())
            .unwrap_or_default()
    }

    pub fn learned_phrases(&self) -> usize {
        self.memory.phrases()
    }
}
