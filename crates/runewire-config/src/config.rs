//! Configuration structs with defaults matching a stock server, plus RON
//! persistence.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// File name used inside the config directory.
pub const CONFIG_FILE: &str = "config.ron";

/// Top-level client configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Server endpoint and connection timing.
    pub network: NetworkConfig,
    /// Handshake constants.
    pub protocol: ProtocolConfig,
    /// Account settings.
    pub login: LoginConfig,
    /// Debug/development settings.
    pub debug: DebugConfig,
}

/// Network configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct NetworkConfig {
    /// Server host name or address.
    pub server_address: String,
    /// Server port.
    pub server_port: u16,
    /// Deadline for each blocking handshake read, in milliseconds.
    pub handshake_timeout_ms: u64,
    /// Connected ticks without inbound traffic before a keep-alive is sent.
    pub keepalive_idle_ticks: u32,
    /// Length of one game tick, in milliseconds.
    pub tick_interval_ms: u64,
}

/// Values sent or used during the login handshake.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ProtocolConfig {
    pub revision: u16,
    pub client_uid: i32,
    /// Hex RSA public exponent. `None` keeps the built-in key.
    pub rsa_exponent: Option<String>,
    /// Hex RSA modulus. `None` keeps the built-in key.
    pub rsa_modulus: Option<String>,
}

/// Account configuration. The password is never written to disk.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoginConfig {
    pub username: String,
}

/// Debug/development configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DebugConfig {
    /// Log level override (e.g., "debug", "info", "warn").
    pub log_level: String,
}

// --- Default implementations ---

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            server_address: "127.0.0.1".to_string(),
            server_port: 43594,
            handshake_timeout_ms: 5000,
            keepalive_idle_ticks: 50,
            tick_interval_ms: 600,
        }
    }
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            revision: 317,
            client_uid: 0x1F1F_1F1F,
            rsa_exponent: None,
            rsa_modulus: None,
        }
    }
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// Per-user config directory (`<config_dir>/runewire`), if the platform has one.
pub fn default_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("runewire"))
}

// --- Load / Save / Reload ---

impl Config {
    /// Load config from the given directory, or create a default config file.
    pub fn load_or_create(config_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = config_dir.join(CONFIG_FILE);

        if config_path.exists() {
            let config = Self::read(&config_path)?;
            log::info!("Loaded config from {}", config_path.display());
            Ok(config)
        } else {
            let config = Config::default();
            config.save(config_dir)?;
            log::info!("Created default config at {}", config_path.display());
            Ok(config)
        }
    }

    /// Save config to the given directory as `config.ron`.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        let config_path = config_dir.join(CONFIG_FILE);
        let write_error = |source| ConfigError::Write {
            path: config_path.clone(),
            source,
        };
        std::fs::create_dir_all(config_dir).map_err(write_error)?;

        let pretty = ron::ser::PrettyConfig::new()
            .depth_limit(3)
            .separate_tuple_members(true)
            .enumerate_arrays(false);

        let serialized = ron::ser::to_string_pretty(self, pretty).map_err(ConfigError::Encode)?;

        std::fs::write(&config_path, serialized).map_err(write_error)?;
        Ok(())
    }

    /// Hot-reload: returns `Some(new_config)` if the file changed, `None` otherwise.
    pub fn reload(&self, config_dir: &Path) -> Result<Option<Self>, ConfigError> {
        let new_config = Self::read(&config_dir.join(CONFIG_FILE))?;

        if &new_config != self {
            log::info!("Config reloaded with changes");
            Ok(Some(new_config))
        } else {
            Ok(None)
        }
    }

    /// Rejects zero tick and handshake timings. A zero tick would never let
    /// the tick clock drain, and a zero socket timeout is refused by the OS.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.network.tick_interval_ms == 0 {
            return Err(ConfigError::ZeroDuration {
                setting: "network.tick_interval_ms",
            });
        }
        if self.network.handshake_timeout_ms == 0 {
            return Err(ConfigError::ZeroDuration {
                setting: "network.handshake_timeout_ms",
            });
        }
        Ok(())
    }

    fn read(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Config = ron::from_str(&contents).map_err(|source| ConfigError::Malformed {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }
}
