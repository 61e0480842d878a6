use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::sync::Arc;

use drone_remote::config::{self, RemoteConfig};
use drone_remote::input::{self, InputEvent, SharedInput};
use drone_remote::monitor::Monitor;
use drone_remote::{control, AddressResolver, ControlLoop, TargetAddress, Transmitter, WifiConfig};

#[derive(Parser)]
#[command(name = "drone-remote", about = "UDP remote control for the drone receiver")]
struct Cli {
    /// Settings file (created with defaults if missing)
    #[arg(short, long, default_value = config::DEFAULT_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Stream control packets from the input sources (default)
    Run {
        /// Drone address, skips discovery
        #[arg(long)]
        target: Option<Ipv4Addr>,
    },
    /// Send new hotspot credentials to the drone
    Provision {
        #[arg(long)]
        ssid: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        target: Option<Ipv4Addr>,
    },
    /// Listen like the drone would and log what arrives
    Monitor {
        #[arg(long, default_value = "0.0.0.0:2390")]
        bind: String,
    },
    /// Print the drone address discovery would use
    Resolve,
}

fn load_config(path: &Path) -> Result<RemoteConfig> {
    match RemoteConfig::load(path) {
        Ok(config) => {
            log::info!("Loaded settings from {}", path.display());
            Ok(config)
        }
        Err(e) => {
            log::warn!("Error loading {}: {}, using defaults", path.display(), e);
            let config = RemoteConfig::default();
            if !path.exists() {
                config
                    .save(path)
                    .with_context(|| format!("writing default settings to {}", path.display()))?;
            }
            Ok(config)
        }
    }
}

fn resolve_target(config: &RemoteConfig, target: Option<Ipv4Addr>) -> TargetAddress {
    match target.or(config.actuator.target_ip) {
        Some(ip) => TargetAddress::new(ip, config.actuator.port),
        None => AddressResolver::new(config.actuator.probe_address, config.actuator.port).resolve(),
    }
}

fn run(config: &RemoteConfig, target: Option<Ipv4Addr>) -> Result<()> {
    let target = resolve_target(config, target);
    log::info!("Drone at {}", target);

    let transmitter = Arc::new(Transmitter::open(target).context("opening UDP socket")?);
    let shared = SharedInput::new();
    let (tx_events, rx_events) = mpsc::channel::<InputEvent>();

    input::spawn_feeder(config, shared.clone(), tx_events).context("starting input feeder")?;

    let mut control = ControlLoop::new(transmitter, shared, &config.control);
    control.run(rx_events);
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = load_config(&cli.config)?;

    match cli.command.unwrap_or(Command::Run { target: None }) {
        Command::Run { target } => run(&config, target),
        Command::Provision { ssid, password, target } => {
            let transmitter = Transmitter::open(resolve_target(&config, target)).context("opening UDP socket")?;
            control::provision(&transmitter, &WifiConfig::new(ssid, password))?;
            Ok(())
        }
        Command::Monitor { bind } => {
            Monitor::bind(&bind)?.run()?;
            Ok(())
        }
        Command::Resolve => {
            println!("{}", resolve_target(&config, None));
            Ok(())
        }
    }
}
