//! Failures while reading, checking or writing `config.ron`.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file exists but is not valid RON for [`Config`](crate::Config).
    #[error("malformed {}: {source}", path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: ron::error::SpannedError,
    },

    #[error("cannot encode config: {0}")]
    Encode(#[source] ron::Error),

    /// A timing setting that the client divides or waits by is zero.
    #[error("{setting} must be greater than zero")]
    ZeroDuration { setting: &'static str },
}
