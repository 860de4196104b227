//! Connection engine: transport, login handshake, incremental frame decoding,
//! opcode dispatch and the outbound frame queue.

pub mod connection;
pub mod dispatcher;
pub mod error;
pub mod framing;
pub mod handshake;
pub mod outbound;
pub mod platform;
pub mod protocol;
pub mod rsa;
pub mod tcp;
pub mod transport;

pub use connection::{ConnectionEngine, ConnectionState, DisconnectReason, EngineConfig, TickReport};
pub use dispatcher::{Dispatcher, Handler};
pub use error::{LoginError, NetError};
pub use framing::{FrameDecoder, PendingSize};
pub use handshake::{
    CLIENT_REVISION, Credentials, HandshakeConfig, LoginSuccess, UNASSIGNED_CLIENT_UID,
};
pub use platform::SocketConfig;
pub use protocol::FrameSize;
pub use rsa::RsaKey;
pub use tcp::TcpTransport;
pub use transport::{MemoryTransport, Transport};
