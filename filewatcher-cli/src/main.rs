//! Filewatcher CLI - command-line interface
//!
//! Pulls the files announced by a filewatched server into a local directory.

mod commands;
mod error;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use commands::common::{resolve_config_path, Overrides};
use commands::config::ConfigCommands;

#[derive(Debug, Parser)]
#[command(name = "filewatcher", version = filewatcher::VERSION, about)]
struct Cli {
    /// Configuration file (defaults to the user configuration directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Fetch the manifest and download every file once
    Run {
        #[command(flatten)]
        overrides: Overrides,
    },

    /// Create or complete the configuration file
    Init,

    /// View or change configuration settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let config_path = resolve_config_path(cli.config);

    let result = match cli.command {
        Command::Run { overrides } => commands::run::run(&config_path, overrides),
        Command::Init => commands::init::run(&config_path),
        Command::Config { command } => commands::config::run(&config_path, command),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_run_overrides() {
        let cli = Cli::parse_from([
            "filewatcher",
            "run",
            "--server",
            "files.lan",
            "--port",
            "4040",
            "--max-downloads",
            "3",
        ]);
        match cli.command {
            Command::Run { overrides } => {
                assert_eq!(overrides.server.as_deref(), Some("files.lan"));
                assert_eq!(overrides.port, Some(4040));
                assert_eq!(overrides.max_downloads, Some(3));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }
}
