//! Headless Runewire client: logs in and keeps the world in sync until the
//! server disconnects.

mod error;
mod session;
mod tick_clock;

use std::path::PathBuf;

use clap::Parser;
use runewire_config::{CliArgs, Config, default_config_dir};
use tracing::{error, info};

use crate::error::ClientError;

fn main() {
    let args = CliArgs::parse();
    if let Err(err) = run(args) {
        error!(error = %err, "client stopped");
        eprintln!("runewire: {err}");
        std::process::exit(1);
    }
}

fn run(args: CliArgs) -> Result<(), ClientError> {
    let config_dir = match args.config.clone() {
        Some(dir) => dir,
        None => default_config_dir().ok_or(ClientError::NoConfigDir)?,
    };
    let mut config = Config::load_or_create(&config_dir)?;
    config.apply_cli_overrides(&args);

    let log_dir = log_dir(&config_dir);
    runewire_log::init_logging(Some(&log_dir), cfg!(debug_assertions), Some(&config));
    info!(
        config = %config_dir.display(),
        server = %config.network.server_address,
        port = config.network.server_port,
        "starting"
    );

    let descriptors = session::load_descriptors(&config_dir)?;
    let password = args.password.unwrap_or_default();
    session::run(&config, &password, descriptors)
}

/// Logs live under the platform data directory, falling back to the config
/// directory.
fn log_dir(config_dir: &std::path::Path) -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join("runewire").join("logs"))
        .unwrap_or_else(|| config_dir.join("logs"))
}
