pub mod capture;
pub mod config;
pub mod continuation;
pub mod devices;
pub mod engine;
pub mod error;
pub mod events;
pub mod output;
pub mod playback;
pub mod session;
pub mod timing;
pub mod watch;

pub use config::{Config, ResponseMode, Settings};
pub use engine::{EngineCommand, EngineHandle, EngineUpdate, InputSender, spawn_engine};
pub use error::{ConfigError, Error, OutputError, SetupError};
pub use events::{MidiMessage, RawEvent};
pub use output::{LogSink, MemorySink, MidiSink};
pub use session::{Session, SessionEvent, SessionState};
