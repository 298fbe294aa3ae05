//! Init command - write a configuration file.

use std::path::Path;

use super::common::load_config;
use crate::error::CliError;

/// Run the init command.
///
/// Existing values are kept; missing keys are filled with defaults.
pub fn run(config_path: &Path) -> Result<(), CliError> {
    let config = load_config(config_path)?;
    config.save_to(config_path)?;

    println!("Configuration file: {}", config_path.display());
    println!();
    println!("Set daemon.server, daemon.port and daemon.rsync_server before running.");
    println!("CLI arguments override config file values when specified.");
    Ok(())
}
