//! Command-line interface handling for the Bitrealm game server.
//!
//! This module provides command-line argument parsing using the `clap` crate.

use clap::{Arg, ArgMatches, Command};
use std::path::PathBuf;

/// Command line arguments parsed from user input.
///
/// Every option except the config path overrides a value from the
/// configuration file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliArgs {
    /// Path to the configuration file
    pub config_path: PathBuf,
    /// Optional override for the TCP bind address
    pub bind_address: Option<String>,
    /// Optional override for the UDP bind address
    pub udp_bind_address: Option<String>,
    /// Optional override for log level
    pub log_level: Option<String>,
    /// Whether to force JSON log output
    pub json_logs: bool,
}

impl CliArgs {
    /// Parses the process arguments.
    pub fn parse() -> Self {
        Self::from_matches(&command().get_matches())
    }

    fn from_matches(matches: &ArgMatches) -> Self {
        Self {
            config_path: matches
                .get_one::<String>("config")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("bitrealm.toml")),
            bind_address: matches.get_one::<String>("bind").cloned(),
            udp_bind_address: matches.get_one::<String>("udp-bind").cloned(),
            log_level: matches.get_one::<String>("log-level").cloned(),
            json_logs: matches.get_flag("json-logs"),
        }
    }
}

fn command() -> Command {
    Command::new("Bitrealm Game Server")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Game server for Bitrealm clients")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path")
                .default_value("bitrealm.toml"),
        )
        .arg(
            Arg::new("bind")
                .short('b')
                .long("bind")
                .value_name("ADDRESS")
                .help("TCP bind address (e.g., 127.0.0.1:8080)"),
        )
        .arg(
            Arg::new("udp-bind")
                .short('u')
                .long("udp-bind")
                .value_name("ADDRESS")
                .help("UDP bind address; an empty value disables the side-channel"),
        )
        .arg(
            Arg::new("log-level")
                .short('l')
                .long("log-level")
                .value_name("LEVEL")
                .help("Log level (trace, debug, info, warn, error)"),
        )
        .arg(
            Arg::new("json-logs")
                .long("json-logs")
                .help("Output logs in JSON format")
                .action(clap::ArgAction::SetTrue),
        )
}
