//! # RC Keybridge
//!
//! Drive keyboard-only drone software with a DJI remote controller.
//!
//! # Control Flow
//!
//! 1. **Initialization**
//!    - Parse the command line and load `config/default.toml`
//!    - Set up logging with a tracing subscriber
//!    - Connect to the handset, retrying a bounded number of times
//!    - Create the virtual keyboard (or a dry-run sink)
//!
//! 2. **Main Loop**
//!    - Poll the handset at `poll_rate_hz`
//!    - Translate sticks, buttons and macros into key events
//!    - With `--monitor`, print each snapshot and send no keys
//!
//! 3. **Graceful Shutdown** (Ctrl+C or handset lost)
//!    - Stop any macro, release every held key, close the handset
//!
//! ```bash
//! cargo run --release -- --model n1
//! ```

use anyhow::{bail, Result};
use clap::Parser;
use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

use rc_keybridge::bridge::{Bridge, BridgeSettings, StopReason};
use rc_keybridge::config::{Config, HandsetModel, DEFAULT_CONFIG_PATH};
use rc_keybridge::controller::hid::{EvdevJoystick, HidLayout, HidSource};
use rc_keybridge::controller::ControllerSource;
use rc_keybridge::keyboard::sink::VIRTUAL_KEYBOARD_NAME;
use rc_keybridge::keyboard::{DryRunSink, KeyEmitter, KeySink, UinputKeyboard};
use rc_keybridge::serial::{open_with_paths, SerialSource};

#[derive(Parser, Debug)]
#[command(name = "rc-keybridge", version)]
#[command(about = "Bridge a DJI remote controller to a virtual keyboard")]
struct Cli {
    /// Handset model (overrides the config file)
    #[arg(long, value_enum)]
    model: Option<HandsetModel>,

    /// Config file path
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Print handset state every poll instead of emitting keys
    #[arg(long)]
    monitor: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("RC Keybridge v{} starting...", env!("CARGO_PKG_VERSION"));

    let mut config = Config::load_or_default(&cli.config)?;
    if let Some(model) = cli.model {
        config.controller.model = model;
    }
    info!("Target handset: {:?}", config.controller.model);

    let reason = match config.controller.model {
        HandsetModel::Rc3 => {
            let name = config.controller.joystick_name.clone();
            let deadzones = config.deadzones();
            let joystick = connect(&config, move || {
                std::future::ready(EvdevJoystick::open(&name))
            })
            .await?;
            let source = HidSource::new(joystick, deadzones, HidLayout::default());
            run(source, &config, cli.monitor).await?
        }
        HandsetModel::N1 => {
            let port = config.serial.port.clone();
            let baud_rate = config.serial.baud_rate;
            let deadzones = config.deadzones();
            let timeout = config.serial_timeout();
            let source = connect(&config, move || {
                let port = port.clone();
                async move {
                    let (stream, path) = open_with_paths(&port, baud_rate)?;
                    SerialSource::new(stream, path, deadzones, timeout).await
                }
            })
            .await?;
            run(source, &config, cli.monitor).await?
        }
    };

    match reason {
        StopReason::Interrupted => info!("Done."),
        StopReason::Disconnected => warn!("Handset lost, exiting"),
    }
    Ok(())
}

/// Retries `attempt` up to `connect_retries` times, `retry_interval_ms` apart.
async fn connect<T, F, Fut>(config: &Config, mut attempt: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = rc_keybridge::error::Result<T>>,
{
    let retries = config.controller.connect_retries;
    let interval = Duration::from_millis(config.controller.retry_interval_ms);

    for n in 1..=retries {
        match attempt().await {
            Ok(handle) => {
                info!("Connected to {:?}", config.controller.model);
                return Ok(handle);
            }
            Err(e) => {
                warn!("Retrying... [{}/{}] {}", n, retries, e);
                if n < retries {
                    tokio::time::sleep(interval).await;
                }
            }
        }
    }

    bail!(
        "No {:?} handset after {} attempts",
        config.controller.model,
        retries
    )
}

async fn run<C: ControllerSource>(
    mut source: C,
    config: &Config,
    monitor: bool,
) -> Result<StopReason> {
    if monitor {
        info!("Monitoring only, no keys are sent. Press Ctrl+C to stop.");
        return Ok(rc_keybridge::monitor::monitor(&mut source, config.poll_interval()).await);
    }

    let sink: Box<dyn KeySink> = if config.keyboard.emulate_hardware {
        Box::new(UinputKeyboard::new(VIRTUAL_KEYBOARD_NAME)?)
    } else {
        info!("Hardware emulation off, key events are only logged");
        Box::new(DryRunSink)
    };
    let emitter = KeyEmitter::new(sink, config.keyboard.print_events);

    let mut bridge = Bridge::new(source, emitter, BridgeSettings::from_config(config));
    info!("Streaming data. Press Ctrl+C to stop.");
    Ok(bridge.run().await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["rc-keybridge"]);
        assert_eq!(cli.model, None);
        assert_eq!(cli.config, PathBuf::from(DEFAULT_CONFIG_PATH));
        assert_eq!(cli.log_level, "info");
        assert!(!cli.monitor);
    }

    #[test]
    fn test_cli_monitor_flag() {
        let cli = Cli::parse_from(["rc-keybridge", "--monitor", "--model", "rc3"]);
        assert!(cli.monitor);
        assert_eq!(cli.model, Some(HandsetModel::Rc3));
    }

    #[test]
    fn test_cli_model_flag() {
        let cli = Cli::parse_from(["rc-keybridge", "--model", "n1"]);
        assert_eq!(cli.model, Some(HandsetModel::N1));

        assert!(Cli::try_parse_from(["rc-keybridge", "--model", "m300"]).is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_gives_up_after_retries() {
        let mut config = Config::default();
        config.controller.connect_retries = 3;
        let mut attempts = 0;

        let result: Result<()> = connect(&config, || {
            attempts += 1;
            std::future::ready(Err(rc_keybridge::error::BridgeError::ControllerNotFound))
        })
        .await;

        assert!(result.is_err());
        assert_eq!(attempts, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_returns_first_success() {
        let config = Config::default();
        let mut attempts = 0;

        let result = connect(&config, || {
            attempts += 1;
            std::future::ready(if attempts < 2 {
                Err(rc_keybridge::error::BridgeError::ControllerNotFound)
            } else {
                Ok(attempts)
            })
        })
        .await;

        assert_eq!(result.unwrap(), 2);
    }
}
