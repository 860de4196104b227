//! Error types for the connection engine.

use std::io;

/// Errors surfaced by [`ConnectionEngine`](crate::ConnectionEngine) outside
/// the login handshake.
#[derive(Debug, thiserror::Error)]
pub enum NetError {
    /// The transport failed. The engine has already disconnected.
    #[error("transport error: {0}")]
    Io(#[from] io::Error),

    /// The operation requires a connected engine.
    #[error("not connected")]
    NotConnected,

    /// The login handshake was rejected or failed.
    #[error("login failed: {0}")]
    Login(#[from] LoginError),

    /// An RSA key could not be parsed.
    #[error("invalid RSA key: {0}")]
    Rsa(String),
}

/// Why a login handshake did not reach the connected state.
#[derive(Debug, thiserror::Error)]
pub enum LoginError {
    /// Status 3: the server rejected the username or password.
    #[error("invalid username or password")]
    InvalidCredentials,

    /// Status 4: the account is disabled.
    #[error("account disabled")]
    AccountDisabled,

    /// Any other status byte.
    #[error("login rejected with status {0}")]
    Unknown(u8),

    /// A handshake read did not complete before the deadline.
    #[error("handshake timed out")]
    Timeout,

    /// The transport failed during the handshake.
    #[error("transport error during handshake: {0}")]
    Transport(#[source] io::Error),

    /// The credentials block does not fit under the RSA modulus.
    #[error("credentials block too long for the RSA modulus")]
    CredentialsTooLong,

    /// The RSA modulus is zero or its ciphertext cannot be length-prefixed.
    #[error("RSA key unusable for the login block")]
    InvalidRsaKey,
}

impl LoginError {
    /// Maps a non-success login status byte.
    pub fn from_status(status: u8) -> Self {
        match status {
            3 => Self::InvalidCredentials,
            4 => Self::AccountDisabled,
            other => Self::Unknown(other),
        }
    }
}

impl From<io::Error> for LoginError {
    fn from(error: io::Error) -> Self {
        match error.kind() {
            io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => Self::Timeout,
            _ => Self::Transport(error),
        }
    }
}
