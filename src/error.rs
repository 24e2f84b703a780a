use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Setup(#[from] SetupError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("config watcher: {0}")]
    Watch(#[from] notify::Error),
    #[error("engine is no longer running")]
    EngineStopped,
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Fatal conditions met while choosing and opening ports. None are retried.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("MIDI is not supported here: {0}")]
    Unsupported(#[from] midir::InitError),
    #[error("no MIDI input device found")]
    NoInputDevice,
    #[error("no MIDI output device found")]
    NoOutputDevice,
    #[error("no {direction} port matches '{selector}'")]
    PortNotFound {
        direction: &'static str,
        selector: String,
    },
    #[error("could not read port name: {0}")]
    PortInfo(#[from] midir::PortInfoError),
    #[error("could not connect to '{port}': {reason}")]
    Connect { port: String, reason: String },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not access {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: ron::error::SpannedError,
    },
    #[error("could not serialize config: {0}")]
    Serialize(#[from] ron::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Error)]
#[error("MIDI send failed: {0}")]
pub struct OutputError(String);

impl OutputError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self(reason.into())
    }
}

impl From<midir::SendError> for OutputError {
    fn from(e: midir::SendError) -> Self {
        Self(e.to_string())
    }
}
