//! Login handshake.
//!
//! ```text
//! client  [14][name hash]
//! server  [server seed: i64][status: 0]
//! client  [16][len][255][revision: u16][1][9 x i32 0][rsa len][RSA(credentials)]
//!         credentials = [10][seed: 4 x i32][client uid: i32][username \n][password \n]
//! server  [status: 2][rights][flagged]
//! ```
//!
//! The session seed is two client-random words followed by the two halves of
//! the server seed. Both ciphers are derived from it as soon as the login
//! block is sent; the status reply itself is not enciphered.

use runewire_codec::{Buffer, IsaacPair, STRING_TERMINATOR, name_hash};
use tracing::debug;

use crate::error::LoginError;
use crate::rsa::RsaKey;
use crate::transport::Transport;

const HANDSHAKE_REQUEST: u8 = 14;
const NEW_LOGIN: u8 = 16;
const LOGIN_MAGIC: u8 = 255;
const CLIENT_MODE: u8 = 1;
const ARCHIVE_CHECKSUMS: usize = 9;
const CREDENTIALS_MAGIC: u8 = 10;
const MAX_USERNAME_LEN: usize = 12;

/// Client build revision sent in the login block.
pub const CLIENT_REVISION: u16 = 317;
/// Install identifier sent by a client that has never been assigned one.
pub const UNASSIGNED_CLIENT_UID: i32 = 0x1F1F_1F1F;

const STATUS_EXCHANGE_OK: u8 = 0;
const STATUS_SUCCESS: u8 = 2;

/// Username and password for one login attempt. Never persisted.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

/// Protocol constants sent in the login block.
#[derive(Debug, Clone)]
pub struct HandshakeConfig {
    /// Client build revision. Default: [`CLIENT_REVISION`].
    pub revision: u16,
    /// Per-install identifier. Default: [`UNASSIGNED_CLIENT_UID`].
    pub client_uid: i32,
    /// Key used to encrypt the credentials block.
    pub rsa: RsaKey,
}

impl Default for HandshakeConfig {
    fn default() -> Self {
        Self {
            revision: CLIENT_REVISION,
            client_uid: UNASSIGNED_CLIENT_UID,
            rsa: RsaKey::default(),
        }
    }
}

/// Outcome of a successful login.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoginSuccess {
    /// Privilege level of the account.
    pub rights: u8,
}

/// Everything the engine keeps from a successful handshake.
#[derive(Debug)]
pub(crate) struct Session {
    pub ciphers: IsaacPair,
    pub success: LoginSuccess,
}

fn read_u8<T: Transport + ?Sized>(transport: &mut T) -> Result<u8, LoginError> {
    let mut byte = [0u8; 1];
    transport.read_exact(&mut byte)?;
    Ok(byte[0])
}

/// Combines the client-random words with the server seed halves.
pub fn session_seed(client_seed: [u32; 2], server_seed: u64) -> [u32; 4] {
    [
        client_seed[0],
        client_seed[1],
        (server_seed >> 32) as u32,
        server_seed as u32,
    ]
}

/// Plaintext credentials block, before RSA.
pub fn credentials_block(seed: &[u32; 4], client_uid: i32, credentials: &Credentials) -> Buffer {
    let mut block = Buffer::with_capacity(64);
    block.write_u8(CREDENTIALS_MAGIC);
    for word in seed {
        block.write_i32(*word as i32);
    }
    block.write_i32(client_uid);
    block.write_string(&credentials.username, STRING_TERMINATOR);
    block.write_string(&credentials.password, STRING_TERMINATOR);
    block
}

/// Runs the login exchange over a transport in handshake (blocking) mode.
pub(crate) fn authenticate<T: Transport + ?Sized>(
    transport: &mut T,
    credentials: &Credentials,
    config: &HandshakeConfig,
    client_seed: [u32; 2],
) -> Result<Session, LoginError> {
    if credentials.username.chars().count() > MAX_USERNAME_LEN {
        return Err(LoginError::CredentialsTooLong);
    }

    transport.write_all(&[HANDSHAKE_REQUEST, name_hash(&credentials.username)])?;
    transport.flush()?;

    let mut challenge = [0u8; 8];
    transport.read_exact(&mut challenge)?;
    let server_seed = u64::from_be_bytes(challenge);
    let status = read_u8(transport)?;
    if status != STATUS_EXCHANGE_OK {
        return Err(LoginError::from_status(status));
    }
    debug!(server_seed, "received login challenge");

    let seed = session_seed(client_seed, server_seed);
    let block = credentials_block(&seed, config.client_uid, credentials);
    let encrypted = config.rsa.encrypt(block.as_bytes())?;
    let encrypted_len = u8::try_from(encrypted.len()).map_err(|_| LoginError::InvalidRsaKey)?;

    let mut login = Buffer::with_capacity(64 + encrypted.len());
    login.write_u8(NEW_LOGIN);
    login.write_u8(0);
    let start = login.position();
    login.write_u8(LOGIN_MAGIC);
    login.write_u16(config.revision);
    login.write_u8(CLIENT_MODE);
    for _ in 0..ARCHIVE_CHECKSUMS {
        login.write_i32(0);
    }
    login.write_u8(encrypted_len);
    login.write_bytes(&encrypted);
    login
        .write_length(login.position() - start)
        .map_err(|_| LoginError::InvalidRsaKey)?;

    transport.write_all(login.as_bytes())?;
    transport.flush()?;

    let ciphers = IsaacPair::from_session_seed(seed);

    let status = read_u8(transport)?;
    if status != STATUS_SUCCESS {
        return Err(LoginError::from_status(status));
    }
    let rights = read_u8(transport)?;
    let _flagged = read_u8(transport)?;

    Ok(Session {
        ciphers,
        success: LoginSuccess { rights },
    })
}
