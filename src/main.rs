use std::io::stdin;
use std::path::PathBuf;

use canon::devices::{self, PortSelector};
use canon::{Config, EngineHandle, EngineUpdate, LogSink, MidiSink, ResponseMode, spawn_engine};
use clap::Parser;
use tracing_subscriber::EnvFilter;

/// Listens to a MIDI input and, once you stop playing, answers on a MIDI
/// output: either your phrase transposed or a continuation of it.
#[derive(Parser, Debug)]
#[command(name = "canon")]
struct Args {
    /// RON config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Input port: index or part of its name (default: first input)
    #[arg(short, long)]
    input: Option<String>,

    /// Output port: index or part of its name (default: first output)
    #[arg(short, long)]
    output: Option<String>,

    /// Semitones added to every replayed note
    #[arg(short, long, allow_negative_numbers = true)]
    transpose: Option<i8>,

    /// Quiet time in milliseconds that ends a phrase
    #[arg(short, long)]
    silence_ms: Option<u64>,

    /// Echo the phrase or continue it
    #[arg(short, long, value_enum)]
    mode: Option<ResponseMode>,

    /// Most notes in a generated continuation
    #[arg(long)]
    length: Option<usize>,

    /// Print the available ports and exit
    #[arg(long)]
    list: bool,

    /// Log outgoing messages instead of opening an output port
    #[arg(long)]
    dry_run: bool,

    /// Reload settings when the config file changes
    #[arg(short, long, requires = "config")]
    watch: bool,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("canon=info")),
        )
        .init();

    if let Err(e) = run(Args::parse()) {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<(), canon::Error> {
    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    if let Some(input) = args.input {
        config.input_port = Some(input);
    }
    if let Some(output) = args.output {
        config.output_port = Some(output);
    }
    if let Some(transpose) = args.transpose {
        config.settings.transpose_semitones = transpose;
    }
    if let Some(silence_ms) = args.silence_ms {
        config.settings.silence_threshold_ms = silence_ms;
    }
    if let Some(mode) = args.mode {
        config.settings.mode = mode;
    }
    if let Some(length) = args.length {
        config.settings.max_continuation_length = length;
    }
    config.settings.validate()?;

    if args.list {
        print!("{}", devices::list_ports(&config.client_name)?);
        return Ok(());
    }

    let input_selector = config.input_port.as_deref().map(parse_selector);
    let output_selector = config.output_port.as_deref().map(parse_selector);

    let sink: Box<dyn MidiSink + Send> = if args.dry_run {
        Box::new(LogSink)
    } else {
        let (connection, _) =
            devices::connect_output(&config.client_name, output_selector.as_ref())?;
        Box::new(connection)
    };

    let engine = spawn_engine(config.settings, sink);
    let (_conn_in, _) = devices::connect_input(
        &config.client_name,
        input_selector.as_ref(),
        engine.input_sender(),
    )?;

    let _watcher = match (&args.config, args.watch) {
        (Some(path), true) => Some(canon::watch::watch_config(
            path,
            engine.command_tx.clone(),
        )?),
        _ => None,
    };

    report_updates(&engine);

    tracing::info!(
        mode = ?config.settings.mode,
        transpose = config.settings.transpose_semitones,
        silence_ms = config.settings.silence_threshold_ms,
        "listening (press enter to exit)"
    );
    let mut line = String::new();
    stdin().read_line(&mut line)?;

    engine.shutdown();
    Ok(())
}

fn parse_selector(s: &str) -> PortSelector {
    match s.parse() {
        Ok(selector) => selector,
        Err(never) => match never {},
    }
}

fn report_updates(engine: &EngineHandle) {
    let update_rx = engine.update_rx.clone();
    std::thread::spawn(move || {
        for update in update_rx {
            match update {
                EngineUpdate::StateChanged { state } => tracing::debug!(?state, "session"),
                EngineUpdate::ReplayStarted { events } => {
                    println!("Replaying {} events", events)
                }
                EngineUpdate::ReplayFinished => println!("Replay done"),
                EngineUpdate::ReplayCancelled { forced_note_offs } => {
                    println!("Replay stopped ({} notes released)", forced_note_offs)
                }
                EngineUpdate::Reconfigured { settings } => match settings.mode {
                    ResponseMode::Echo => println!(
                        "Now transposing by {} after {} ms of silence",
                        settings.transpose_semitones, settings.silence_threshold_ms
                    ),
                    ResponseMode::Continue => println!(
                        "Now continuing for up to {} notes after {} ms of silence",
                        settings.max_continuation_length, settings.silence_threshold_ms
                    ),
                },
            }
        }
    });
}
