//! Subcommand handlers.

use std::future::Future;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use latchkey_auth::AnyAuthority;
use latchkey_core::ControllerConfig;
use latchkey_hardware::{AnyActuator, LoggingActuator, SerialReaderConfig, spawn_serial_reader};
use latchkey_runtime::{ControllerInputs, ControllerStats, DoorController};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::door_input::spawn_door_input;

/// Buffered reader chunks before the serial task blocks.
const READER_CHANNEL_CAPACITY: usize = 64;

const DOOR_EVENT_CHANNEL_CAPACITY: usize = 16;

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Path to the TOML configuration file. Defaults apply when omitted.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Serial port of the card reader, overriding `reader.port`.
    #[arg(long)]
    pub port: Option<String>,

    /// Do not read door events from stdin.
    #[arg(long)]
    pub no_stdin: bool,
}

#[derive(Args, Debug)]
pub struct CheckConfigArgs {
    /// Path to the TOML configuration file.
    #[arg(short, long)]
    pub config: PathBuf,
}

/// Load the configuration file, or defaults when no path is given.
///
/// # Errors
///
/// Returns an error if the file cannot be read, parsed or validated.
pub fn load_config(path: Option<&Path>) -> Result<ControllerConfig> {
    match path {
        Some(path) => ControllerConfig::from_file(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display())),
        None => {
            info!("No configuration file given, using defaults");
            Ok(ControllerConfig::default())
        }
    }
}

/// Run the door controller until Ctrl-C.
///
/// # Errors
///
/// Returns an error if the configuration is invalid or the card reader
/// cannot be opened.
pub async fn run(args: &RunArgs) -> Result<()> {
    let config = load_config(args.config.as_deref())?;
    let port = args.port.clone().or_else(|| config.reader.port.clone());
    let door_input = (!args.no_stdin).then(|| BufReader::new(std::io::stdin()));

    let stats = run_controller(&config, port, door_input, shutdown_signal()).await?;
    info!(
        granted = stats.cards_granted,
        denied = stats.cards_denied,
        dropped = stats.cards_dropped,
        auto_relocks = stats.auto_relocks,
        "Door controller stopped"
    );
    Ok(())
}

/// Run the door controller with the given inputs until `shutdown` resolves.
///
/// Door events are read from `door_input` on a dedicated thread that is left
/// behind when this returns.
///
/// # Errors
///
/// Returns an error if the controller cannot be built or an input cannot be
/// started.
pub async fn run_controller<I>(
    config: &ControllerConfig,
    port: Option<String>,
    door_input: Option<I>,
    shutdown: impl Future<Output = ()>,
) -> Result<ControllerStats>
where
    I: BufRead + Send + 'static,
{
    let remote = AnyAuthority::from_config(&config.auth)
        .context("Failed to set up remote authority")?;
    let actuator = AnyActuator::Logging(LoggingActuator::new());
    let mut controller = DoorController::from_config(config, actuator, remote)
        .context("Failed to build door controller")?;

    let (bytes_tx, bytes_rx) = mpsc::channel(READER_CHANNEL_CAPACITY);
    let _reader_task = match port {
        Some(port) => {
            let reader = SerialReaderConfig {
                port,
                baud_rate: config.reader.baud_rate,
            };
            Some(spawn_serial_reader(&reader, bytes_tx).context("Failed to open card reader")?)
        }
        None => {
            warn!("No card reader port configured; only door events will be handled");
            None
        }
    };

    let (events_tx, events_rx) = mpsc::channel(DOOR_EVENT_CHANNEL_CAPACITY);
    if let Some(input) = door_input {
        spawn_door_input(input, events_tx).context("Failed to start door input")?;
    }

    let inputs = ControllerInputs {
        bytes: Some(bytes_rx),
        door_events: Some(events_rx),
    };
    controller.run(inputs, shutdown).await;

    info!(lock = %controller.lock().state(), "Final lock state");
    Ok(controller.stats())
}

/// Validate a configuration file and print a summary.
///
/// # Errors
///
/// Returns an error if the file cannot be read, parsed or validated.
pub fn check_config(args: &CheckConfigArgs) -> Result<String> {
    let config = load_config(Some(&args.config))?;
    let allow_list = config
        .auth
        .allow_list()
        .context("Invalid allow-list")?;

    let remote = config
        .auth
        .remote_url
        .as_ref()
        .map_or_else(|| "none".to_string(), ToString::to_string);

    Ok(format!(
        "Configuration OK\n  reader: {} @ {} baud, {:?} frames\n  lock: {} ticks of {} ms per transition, revert window {} ticks\n  auth: {} allow-listed card(s), remote {}",
        config.reader.port.as_deref().unwrap_or("(none)"),
        config.reader.baud_rate,
        config.reader.format,
        config.lock.transition_ticks(),
        config.lock.tick_ms,
        config.lock.revert_window_ticks(),
        allow_list.len(),
        remote,
    ))
}

/// Render the default configuration as TOML.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn default_config() -> Result<String> {
    ControllerConfig::default()
        .to_toml()
        .context("Failed to serialize default configuration")
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Cannot listen for Ctrl-C, running until killed: {}", e);
        std::future::pending::<()>().await;
    }
}
