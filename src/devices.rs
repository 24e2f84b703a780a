use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use midir::{Ignore, MidiInput, MidiInputConnection, MidiOutput, MidiOutputConnection};

use crate::engine::InputSender;
use crate::error::SetupError;

/// Picks a port either by its position in the listing or by a
/// case-insensitive fragment of its name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PortSelector {
    Index(usize),
    Name(String),
}

impl FromStr for PortSelector {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Ok(match s.parse::<usize>() {
            Ok(index) => PortSelector::Index(index),
            Err(_) => PortSelector::Name(s.to_string()),
        })
    }
}

impl fmt::Display for PortSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PortSelector::Index(index) => write!(f, "#{}", index),
            PortSelector::Name(name) => write!(f, "{}", name),
        }
    }
}

impl PortSelector {
    /// Index of the chosen port in `names`. No selector means the first port.
    pub fn pick(selector: Option<&PortSelector>, names: &[String]) -> Option<usize> {
        match selector {
            None => (!names.is_empty()).then_some(0),
            Some(PortSelector::Index(index)) => (*index < names.len()).then_some(*index),
            Some(PortSelector::Name(fragment)) => {
                let fragment = fragment.to_lowercase();
                names
                    .iter()
                    .position(|name| name.to_lowercase().contains(&fragment))
            }
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PortListing {
    pub inputs: Vec<String>,
    pub outputs: Vec<String>,
}

impl fmt::Display for PortListing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Available MIDI inputs:")?;
        for (i, name) in self.inputs.iter().enumerate() {
            writeln!(f, "  {}: {}", i, name)?;
        }
        writeln!(f, "Available MIDI outputs:")?;
        for (i, name) in self.outputs.iter().enumerate() {
            writeln!(f, "  {}: {}", i, name)?;
        }
        Ok(())
    }
}

fn input_names(midi_in: &MidiInput) -> Result<Vec<String>, SetupError> {
    midi_in
        .ports()
        .iter()
        .map(|port| midi_in.port_name(port).map_err(SetupError::from))
        .collect()
}

fn output_names(midi_out: &MidiOutput) -> Result<Vec<String>, SetupError> {
    midi_out
        .ports()
        .iter()
        .map(|port| midi_out.port_name(port).map_err(SetupError::from))
        .collect()
}

pub fn list_ports(client_name: &str) -> Result<PortListing, SetupError> {
    let midi_in = MidiInput::new(client_name)?;
    let midi_out = MidiOutput::new(client_name)?;
    Ok(PortListing {
        inputs: input_names(&midi_in)?,
        outputs: output_names(&midi_out)?,
    })
}

fn choose(
    direction: &'static str,
    selector: Option<&PortSelector>,
    names: &[String],
    none: SetupError,
) -> Result<usize, SetupError> {
    if names.is_empty() {
        return Err(none);
    }
    PortSelector::pick(selector, names).ok_or_else(|| SetupError::PortNotFound {
        direction,
        selector: selector.map(ToString::to_string).unwrap_or_default(),
    })
}

/// Opens the input port and forwards every message it delivers to the engine.
/// The connection stays open for as long as the returned value is alive.
pub fn connect_input(
    client_name: &str,
    selector: Option<&PortSelector>,
    inputs: InputSender,
) -> Result<(MidiInputConnection<()>, String), SetupError> {
    let mut midi_in = MidiInput::new(client_name)?;
    midi_in.ignore(Ignore::All);

    let names = input_names(&midi_in)?;
    let index = choose("input", selector, &names, SetupError::NoInputDevice)?;
    let ports = midi_in.ports();
    let port = &ports[index];
    let name = names[index].clone();

    tracing::info!(port = %name, "using MIDI input");

    let connection = midi_in
        .connect(
            port,
            &format!("{}-input", client_name),
            move |_, message, _| {
                if let Err(e) = inputs.send(message) {
                    tracing::warn!("dropping input: {}", e);
                }
            },
            (),
        )
        .map_err(|e| SetupError::Connect {
            port: name.clone(),
            reason: e.to_string(),
        })?;

    Ok((connection, name))
}

pub fn connect_output(
    client_name: &str,
    selector: Option<&PortSelector>,
) -> Result<(MidiOutputConnection, String), SetupError> {
    let midi_out = MidiOutput::new(client_name)?;

    let names = output_names(&midi_out)?;
    let index = choose("output", selector, &names, SetupError::NoOutputDevice)?;
    let ports = midi_out.ports();
    let port = &ports[index];
    let name = names[index].clone();

    tracing::info!(port = %name, "using MIDI output");

    let connection = midi_out
        .connect(port, &format!("{}-output", client_name))
        .map_err(|e| SetupError::Connect {
            port: name.clone(),
            reason: e.to_string(),
        })?;

    Ok((connection, name))
}
