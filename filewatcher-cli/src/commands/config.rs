//! Configuration management CLI commands.
//!
//! Provides `config get`, `config set`, `config list`, and `config path` commands
//! for viewing and modifying configuration settings from the command line.

use std::path::Path;

use clap::Subcommand;
use filewatcher::config::{ConfigFile, ConfigKey};

use super::common::load_config;
use crate::error::CliError;

/// Config subcommands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Get a configuration value
    Get {
        /// Configuration key in format section.key (e.g., daemon.server)
        key: String,
    },

    /// Set a configuration value
    Set {
        /// Configuration key in format section.key (e.g., daemon.server)
        key: String,

        /// Value to set
        value: String,
    },

    /// List all configuration settings
    List,

    /// Show the configuration file path
    Path,
}

/// Run a config subcommand.
pub fn run(config_path: &Path, command: ConfigCommands) -> Result<(), CliError> {
    match command {
        ConfigCommands::Get { key } => run_get(config_path, &key),
        ConfigCommands::Set { key, value } => run_set(config_path, &key, &value),
        ConfigCommands::List => run_list(config_path),
        ConfigCommands::Path => {
            println!("{}", config_path.display());
            Ok(())
        }
    }
}

fn parse_key(key: &str) -> Result<ConfigKey, CliError> {
    key.parse().map_err(|_| {
        CliError::Config(format!(
            "Unknown configuration key '{}'. Use 'filewatcher config list' to see available keys.",
            key
        ))
    })
}

/// Get a configuration value.
fn run_get(config_path: &Path, key: &str) -> Result<(), CliError> {
    let config_key = parse_key(key)?;
    let config = load_config(config_path)?;
    println!("{}", describe(config_key, &config));
    Ok(())
}

/// Set a configuration value.
fn run_set(config_path: &Path, key: &str, value: &str) -> Result<(), CliError> {
    let config_key = parse_key(key)?;
    let mut config = load_config(config_path)?;
    config_key.set(&mut config, value)?;
    config.save_to(config_path)?;

    println!("Set {} = {}", config_key.name(), config_key.get(&config));

    Ok(())
}

/// List all configuration settings.
fn run_list(config_path: &Path) -> Result<(), CliError> {
    let config = load_config(config_path)?;
    print!("{}", render_settings(&config));
    Ok(())
}

/// Value of one key as shown to the user. Unset keys that block a run say so.
fn describe(key: ConfigKey, config: &ConfigFile) -> String {
    let value = key.get(config);
    match (value.is_empty(), key.is_required()) {
        (false, _) => value,
        (true, true) => "(not set, required to sync)".to_string(),
        (true, false) => "(not set)".to_string(),
    }
}

/// Settings grouped by section, followed by whether `filewatcher run` can
/// start with them.
fn render_settings(config: &ConfigFile) -> String {
    let mut out = String::from("Configuration Settings\n======================\n");
    let mut current_section = "";

    for key in ConfigKey::all() {
        if key.section() != current_section {
            current_section = key.section();
            out.push_str(&format!("\n[{}]\n", current_section));
        }
        out.push_str(&format!("  {} = {}\n", key.key_name(), describe(*key, config)));
    }

    let missing: Vec<&str> = ConfigKey::all()
        .iter()
        .filter(|key| key.is_required() && key.get(config).is_empty())
        .map(ConfigKey::name)
        .collect();

    out.push('\n');
    if missing.is_empty() {
        out.push_str(&format!(
            "Ready to sync from {}:{} into {}\n",
            config.daemon.server,
            config.daemon.port,
            config.daemon.downloads_path.display()
        ));
    } else {
        out.push_str(&format!(
            "Not ready to sync. Set {} with 'filewatcher config set'.\n",
            missing.join(", ")
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_persists_value() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("config.ini");

        run_set(&path, "daemon.port", "4040").unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.daemon.port, 4040);
    }

    #[test]
    fn test_unknown_key_is_config_error() {
        let temp = tempfile::tempdir().unwrap();
        let err = run_get(&temp.path().join("config.ini"), "daemon.colour").unwrap_err();
        assert!(matches!(err, CliError::Config(_)));
    }

    #[test]
    fn test_describe_marks_required_keys() {
        let config = ConfigFile::default();
        assert_eq!(
            describe(ConfigKey::DaemonServer, &config),
            "(not set, required to sync)"
        );
        assert_eq!(describe(ConfigKey::DaemonClientId, &config), "(not set)");
        assert_eq!(describe(ConfigKey::DaemonMaxDownloads, &config), "2");
    }

    #[test]
    fn test_settings_name_missing_required_keys() {
        let mut config = ConfigFile::default();
        config.daemon.server = "files.lan".to_string();

        let text = render_settings(&config);
        assert!(text.contains("[daemon]\n"));
        assert!(text.contains("  server = files.lan\n"));
        assert!(text.contains("  port = (not set, required to sync)\n"));
        assert!(text.contains("Not ready to sync. Set daemon.port, daemon.rsync_server"));
    }

    #[test]
    fn test_settings_report_ready_config() {
        let mut config = ConfigFile::default();
        ConfigKey::DaemonServer.set(&mut config, "files.lan").unwrap();
        ConfigKey::DaemonPort.set(&mut config, "4040").unwrap();
        ConfigKey::DaemonRsyncServer.set(&mut config, "sync@files.lan").unwrap();
        ConfigKey::DaemonDownloadsPath.set(&mut config, "/srv/dl").unwrap();

        let text = render_settings(&config);
        assert!(!text.contains("required to sync"));
        assert!(text.ends_with("Ready to sync from files.lan:4040 into /srv/dl\n"));
    }
}
