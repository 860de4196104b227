//! Errors surfaced by the client binary.

use runewire_config::ConfigError;
use runewire_net::NetError;
use runewire_sync::DescriptorError;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to load descriptors: {0}")]
    Descriptors(#[from] DescriptorError),

    #[error(transparent)]
    Net(#[from] NetError),

    #[error("failed to resolve {host}: {source}")]
    Resolve {
        host: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{0} resolved to no addresses")]
    NoAddress(String),

    /// Only one of `rsa_exponent` and `rsa_modulus` was configured.
    #[error("custom RSA key needs both exponent and modulus")]
    PartialRsaKey,

    #[error("no config directory available; pass --config")]
    NoConfigDir,
}
