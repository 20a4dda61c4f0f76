//! Navigation controller entry point
//!
//! Loads configuration, opens the serial and I2C transports, and runs the
//! supervisor on a thread-mode executor until SIGINT/SIGTERM.

use std::path::PathBuf;

use clap::Parser;
use embassy_executor::{Executor, Spawner};
use linux_embedded_hal::I2cdev;
use log::{error, info};

use pathfinder::config::Config;
use pathfinder::error::{Error, Result};
use pathfinder::system::shutdown::Shutdown;
use pathfinder::task::supervisor::Supervisor;
use pathfinder::transport::{BlockingI2c, SerialLineSource};

/// Raised by the signal handler, observed by every task
static SHUTDOWN: Shutdown = Shutdown::new();

/// Drive a ground vehicle to a GPS waypoint while avoiding obstacles.
#[derive(Debug, Parser)]
#[command(name = "pathfinder", version)]
struct Cli {
    /// TOML configuration file. Built-in defaults apply when omitted.
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Serial device carrying positioning sentences (overrides config)
    #[arg(long)]
    serial: Option<String>,

    /// I2C bus device (overrides config)
    #[arg(long)]
    i2c: Option<String>,
}

type Controller = Supervisor<BlockingI2c<I2cdev>, SerialLineSource>;

#[embassy_executor::task]
async fn controller(supervisor: Controller) {
    let summary = supervisor.run(&SHUTDOWN).await;
    info!(
        "Shut down complete: {} fixes, {} errors, final mode {:?}",
        summary.ingest.fixes,
        summary.errors.total(),
        summary.nav_state.mode
    );
    // Closes the I2C device before exit
    drop(summary.bus);
    std::process::exit(0);
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => {
            info!("Using config: {}", path.display());
            Config::load(path)?
        }
        None => {
            info!("No config given, using defaults");
            Config::default()
        }
    };
    if let Some(serial) = &cli.serial {
        config.serial.path = serial.clone();
    }
    if let Some(i2c) = &cli.i2c {
        config.bus.path = i2c.clone();
    }
    config.validate()?;
    Ok(config)
}

fn start(spawner: Spawner, supervisor: Controller) {
    if let Err(e) = spawner.spawn(controller(supervisor)) {
        error!("Failed to spawn controller: {:?}", e);
        std::process::exit(1);
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;

    info!(
        "Target {:.6}, {:.6} (tolerance {:.1} m)",
        config.navigation.target_latitude,
        config.navigation.target_longitude,
        config.navigation.arrival_tolerance_m
    );

    let lines = SerialLineSource::open(&config.serial.path, config.serial.baud_rate)?;
    let bus = BlockingI2c::open(&config.bus.path)?;
    let supervisor = Supervisor::new(&config, bus, lines)?;

    ctrlc::set_handler(|| {
        info!("Received shutdown signal");
        SHUTDOWN.raise();
    })
    .map_err(|e| Error::Startup(format!("signal handler: {}", e)))?;

    let executor: &'static mut Executor = Box::leak(Box::new(Executor::new()));
    executor.run(move |spawner| start(spawner, supervisor))
}
