//! Client configuration.
//!
//! Settings persist to disk as `config.ron`; every section tolerates missing
//! and unknown fields. Command-line flags override the loaded values.

mod cli;
mod config;
mod error;

pub use cli::CliArgs;
pub use config::{
    CONFIG_FILE, Config, DebugConfig, LoginConfig, NetworkConfig, ProtocolConfig,
    default_config_dir,
};
pub use error::ConfigError;
