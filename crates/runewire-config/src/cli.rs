//! Command-line argument parsing.

use std::path::PathBuf;

use clap::Parser;

use crate::Config;

/// Runewire client command-line arguments.
///
/// CLI values override settings loaded from `config.ron`.
#[derive(Parser, Debug, Default)]
#[command(name = "runewire", about = "Headless Runewire protocol client")]
pub struct CliArgs {
    /// Server address.
    #[arg(long)]
    pub server: Option<String>,

    /// Server port.
    #[arg(long)]
    pub port: Option<u16>,

    /// Account name.
    #[arg(long)]
    pub username: Option<String>,

    /// Account password. Never saved.
    #[arg(long)]
    pub password: Option<String>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Path to config directory (overrides default location).
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl Config {
    /// Apply CLI overrides to a loaded config. The password has no config
    /// field and is read from [`CliArgs::password`] directly.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(ref addr) = args.server {
            self.network.server_address = addr.clone();
        }
        if let Some(port) = args.port {
            self.network.server_port = port;
        }
        if let Some(ref name) = args.username {
            self.login.username = name.clone();
        }
        if let Some(ref level) = args.log_level {
            self.debug.log_level = level.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_override() {
        let mut config = Config::default();
        let args = CliArgs {
            server: Some("192.168.1.1".to_string()),
            username: Some("mod_ash".to_string()),
            ..CliArgs::default()
        };
        config.apply_cli_overrides(&args);
        assert_eq!(config.network.server_address, "192.168.1.1");
        assert_eq!(config.login.username, "mod_ash");
        // Non-overridden fields retain defaults
        assert_eq!(config.network.server_port, 43594);
        assert_eq!(config.debug.log_level, "info");
    }

    #[test]
    fn test_cli_no_override() {
        let original = Config::default();
        let mut config = Config::default();
        config.apply_cli_overrides(&CliArgs::default());
        assert_eq!(config, original);
    }

    #[test]
    fn test_parse_flags() {
        let args = CliArgs::parse_from([
            "runewire",
            "--port",
            "43595",
            "--password",
            "hunter2",
            "--log-level",
            "debug",
        ]);
        assert_eq!(args.port, Some(43595));
        assert_eq!(args.password.as_deref(), Some("hunter2"));
        assert_eq!(args.log_level.as_deref(), Some("debug"));
        assert!(args.server.is_none());
    }
}
