use crate::config::Settings;
use crate::events::RawEvent;
use crate::output::MidiSink;
use crate::session::{Session, SessionEvent, SessionState};
use crossbeam::channel::{Receiver, RecvTimeoutError, Sender, TrySendError};
use std::thread::JoinHandle;
use std::time::Instant;

#[derive(Debug, Clone)]
pub enum EngineCommand {
    Input { event: RawEvent, received_at: Instant },
    Reconfigure(Settings),
    Shutdown,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineUpdate {
    StateChanged { state: SessionState },
    ReplayStarted { events: usize },
    ReplayFinished,
    ReplayCancelled { forced_note_offs: usize },
    Reconfigured { settings: Settings },
}

impl From<SessionEvent> for EngineUpdate {
    fn from(event: SessionEvent) -> Self {
        match event {
            SessionEvent::StateChanged(state) => EngineUpdate::StateChanged { state },
            SessionEvent::ReplayStarted { events } => EngineUpdate::ReplayStarted { events },
            SessionEvent::ReplayFinished => EngineUpdate::ReplayFinished,
            SessionEvent::ReplayCancelled { forced_note_offs } => {
                EngineUpdate::ReplayCancelled { forced_note_offs }
            }
        }
    }
}

pub struct EngineHandle {
    pub command_tx: Sender<EngineCommand>,
    pub update_rx: Receiver<EngineUpdate>,
    thread: Option<JoinHandle<()>>,
}

/// Cheap to clone; meant to be moved into a transport callback.
#[derive(Debug, Clone)]
pub struct InputSender {
    command_tx: Sender<EngineCommand>,
}

impl InputSender {
    /// Stamps the message with the current time and queues it.
    pub fn send(&self, bytes: &[u8]) -> Result<(), crate::Error> {
        let received_at = Instant::now();
        let Some(event) = RawEvent::from_bytes(bytes) else {
            return Ok(());
        };
        self.command_tx
            .send(EngineCommand::Input { event, received_at })
            .map_err(|_| crate::Error::EngineStopped)
    }
}

impl EngineHandle {
    pub fn input_sender(&self) -> InputSender {
        InputSender {
            command_tx: self.command_tx.clone(),
        }
    }

    pub fn input(&self, bytes: &[u8]) -> Result<(), crate::Error> {
        self.input_sender().send(bytes)
    }

    pub fn reconfigure(&self, settings: Settings) -> Result<(), crate::Error> {
        self.command_tx
            .send(EngineCommand::Reconfigure(settings))
            .map_err(|_| crate::Error::EngineStopped)
    }

    /// Stops the engine, silencing any replay in flight, and waits for it.
    pub fn shutdown(mut self) {
        let _ = self.command_tx.send(EngineCommand::Shutdown);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

/// Updates are dropped once this many are waiting to be read.
pub const UPDATE_CAPACITY: usize = 256;

/// Runs a session on its own thread. Inputs, settings changes and timer
/// firings are all handled there, one at a time.
pub fn spawn_engine<S>(settings: Settings, sink: S) -> EngineHandle
where
    S: MidiSink + Send + 'static,
{
    let (command_tx, command_rx) = crossbeam::channel::unbounded();
    let (update_tx, update_rx) = crossbeam::channel::bounded(UPDATE_CAPACITY);

    let thread = std::thread::spawn(move || {
        engine_thread(Session::new(settings, sink), command_rx, update_tx);
    });

    EngineHandle {
        command_tx,
        update_rx,
        thread: Some(thread),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Stop,
}

fn engine_thread<S: MidiSink>(
    mut session: Session<S>,
    command_rx: Receiver<EngineCommand>,
    update_tx: Sender<EngineUpdate>,
) {
    tracing::debug!(settings = ?session.settings(), "engine started");

    loop {
        let woke = match session.next_deadline() {
            Some(deadline) => command_rx.recv_deadline(deadline),
            None => command_rx
                .recv()
                .map_err(|_| RecvTimeoutError::Disconnected),
        };

        let flow = match woke {
            Ok(command) => handle_command(&mut session, command, &update_tx),
            Err(RecvTimeoutError::Timeout) => Flow::Continue,
            Err(RecvTimeoutError::Disconnected) => Flow::Stop,
        };
        if flow == Flow::Stop || catch_up(&mut session, &command_rx, &update_tx) == Flow::Stop {
            session.shutdown();
            publish(&mut session, &update_tx);
            break;
        }

        session.poll(Instant::now());
        publish(&mut session, &update_tx);
    }

    tracing::debug!("engine stopped");
}

/// Handles everything already queued, so timers that came due while those
/// commands waited never fire ahead of them.
fn catch_up<S: MidiSink>(
    session: &mut Session<S>,
    command_rx: &Receiver<EngineCommand>,
    update_tx: &Sender<EngineUpdate>,
) -> Flow {
    while let Ok(command) = command_rx.try_recv() {
        if handle_command(session, command, update_tx) == Flow::Stop {
            return Flow::Stop;
        }
    }
    Flow::Continue
}

fn handle_command<S: MidiSink>(
    session: &mut Session<S>,
    command: EngineCommand,
    update_tx: &Sender<EngineUpdate>,
) -> Flow {
    match command {
        EngineCommand::Input { event, received_at } => {
            // Only timers due before the input arrived go first.
            session.poll(received_at);
            session.handle_input(event, received_at);
        }
        EngineCommand::Reconfigure(settings) => {
            tracing::info!(?settings, "settings updated");
            session.reconfigure(settings);
            notify(update_tx, EngineUpdate::Reconfigured { settings });
        }
        EngineCommand::Shutdown => return Flow::Stop,
    }
    Flow::Continue
}

fn publish<S: MidiSink>(session: &mut Session<S>, update_tx: &Sender<EngineUpdate>) {
    for event in session.drain_events() {
        notify(update_tx, event.into());
    }
}

fn notify(update_tx: &Sender<EngineUpdate>, update: EngineUpdate) {
    if let Err(TrySendError::Full(update)) = update_tx.try_send(update) {
        tracing::trace!(?update, "update queue full, dropping");
    }
}
