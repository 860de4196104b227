//! The connection engine: login, per-tick decode and dispatch, outbound
//! queue, keep-alive and disconnect.
//!
//! The engine is driven from the host's tick loop and never blocks after the
//! handshake. One tick is:
//!
//! 1. [`ConnectionEngine::tick`] decodes every complete inbound frame and
//!    hands it to the [`Dispatcher`]. Partial frames wait for the next tick.
//! 2. The host mutates its own state and queues outbound frames.
//! 3. [`ConnectionEngine::flush`] writes the queue in FIFO order.
//!
//! Transport errors anywhere are a hard disconnect; nothing is retried.

use std::collections::VecDeque;
use std::fmt;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use rand::Rng;
use runewire_codec::{Frame, IsaacPair};
use tracing::{debug, error, info, trace, warn};

use crate::dispatcher::Dispatcher;
use crate::error::{LoginError, NetError};
use crate::framing::FrameDecoder;
use crate::handshake::{self, Credentials, HandshakeConfig, LoginSuccess};
use crate::outbound;
use crate::platform::SocketConfig;
use crate::protocol::server;
use crate::tcp::TcpTransport;
use crate::transport::Transport;

/// Connection lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No transport. Initial and terminal state.
    Disconnected,
    /// Login handshake in progress.
    Authenticating,
    /// Logged in; frames flow every tick.
    Connected,
}

/// Why the engine left the connected state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectReason {
    /// [`ConnectionEngine::disconnect`] was called.
    Requested,
    /// The server sent the logout opcode.
    Logout,
    /// The transport failed while decoding or flushing.
    Io(io::ErrorKind),
}

/// Engine settings.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Connected ticks without an inbound frame before a keep-alive is
    /// queued. Default: 50.
    pub keepalive_idle_ticks: u32,
    /// Deadline for each blocking handshake read. Default: 5s.
    pub handshake_timeout: Duration,
    pub socket: SocketConfig,
    pub handshake: HandshakeConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            keepalive_idle_ticks: 50,
            handshake_timeout: Duration::from_secs(5),
            socket: SocketConfig::default(),
            handshake: HandshakeConfig::default(),
        }
    }
}

/// What one call to [`ConnectionEngine::tick`] did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Complete frames decoded.
    pub frames: usize,
    /// Frames with no registered handler.
    pub dropped: usize,
    /// Frames whose handler returned an error.
    pub failed: usize,
}

type DisconnectCallback = Box<dyn FnMut(DisconnectReason)>;

/// Owns one server connection.
pub struct ConnectionEngine<T: Transport> {
    config: EngineConfig,
    state: ConnectionState,
    transport: Option<T>,
    ciphers: Option<IsaacPair>,
    decoder: FrameDecoder,
    outbound: VecDeque<Frame>,
    idle_ticks: u32,
    rights: u8,
    on_disconnect: Option<DisconnectCallback>,
}

impl<T: Transport> fmt::Debug for ConnectionEngine<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionEngine")
            .field("state", &self.state)
            .field("decoder", &self.decoder)
            .field("queued", &self.outbound.len())
            .field("idle_ticks", &self.idle_ticks)
            .field("rights", &self.rights)
            .finish_non_exhaustive()
    }
}

impl<T: Transport> ConnectionEngine<T> {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            state: ConnectionState::Disconnected,
            transport: None,
            ciphers: None,
            decoder: FrameDecoder::new(),
            outbound: VecDeque::new(),
            idle_ticks: 0,
            rights: 0,
            on_disconnect: None,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    /// Privilege level reported at login.
    pub fn rights(&self) -> u8 {
        self.rights
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Frames waiting for the next flush.
    pub fn queued(&self) -> usize {
        self.outbound.len()
    }

    pub fn transport(&self) -> Option<&T> {
        self.transport.as_ref()
    }

    pub fn transport_mut(&mut self) -> Option<&mut T> {
        self.transport.as_mut()
    }

    pub fn decoder(&self) -> &FrameDecoder {
        &self.decoder
    }

    /// Installs the callback invoked on every transition to
    /// [`ConnectionState::Disconnected`] from a live connection.
    pub fn on_disconnect(&mut self, callback: impl FnMut(DisconnectReason) + 'static) {
        self.on_disconnect = Some(Box::new(callback));
    }

    /// Runs the login handshake over `transport`. `client_seed` supplies the
    /// two client-random words of the session seed.
    ///
    /// On success the transport switches to polling mode and the engine is
    /// connected. On failure the transport is dropped and the engine stays
    /// disconnected.
    pub fn login(
        &mut self,
        mut transport: T,
        credentials: &Credentials,
        client_seed: [u32; 2],
    ) -> Result<LoginSuccess, LoginError> {
        if self.state != ConnectionState::Disconnected {
            self.disconnect();
        }
        self.state = ConnectionState::Authenticating;
        info!(username = %credentials.username, "authenticating");

        let session = handshake::authenticate(
            &mut transport,
            credentials,
            &self.config.handshake,
            client_seed,
        )
        .and_then(|session| {
            transport.set_polling(true)?;
            Ok(session)
        });

        match session {
            Ok(session) => {
                self.transport = Some(transport);
                self.ciphers = Some(session.ciphers);
                self.decoder.reset();
                self.outbound.clear();
                self.idle_ticks = 0;
                self.rights = session.success.rights;
                self.state = ConnectionState::Connected;
                info!(rights = self.rights, "logged in");
                Ok(session.success)
            }
            Err(err) => {
                self.state = ConnectionState::Disconnected;
                warn!(error = %err, "login failed");
                Err(err)
            }
        }
    }

    /// Decodes and dispatches every complete inbound frame.
    ///
    /// Handler errors are logged and only abandon that frame. Transport
    /// errors and the logout opcode disconnect. After
    /// [`EngineConfig::keepalive_idle_ticks`] ticks without a frame a
    /// keep-alive is queued.
    pub fn tick<C, E: fmt::Display>(
        &mut self,
        dispatcher: &Dispatcher<C, E>,
        context: &mut C,
    ) -> TickReport {
        let mut report = TickReport::default();
        if self.state != ConnectionState::Connected {
            return report;
        }

        loop {
            let decoded = match self.transport.as_mut() {
                Some(transport) => {
                    let cipher = self.ciphers.as_mut().map(|pair| &mut pair.decoder);
                    self.decoder.next_frame(transport, cipher)
                }
                None => break,
            };

            let mut frame = match decoded {
                Ok(Some(frame)) => frame,
                Ok(None) => break,
                Err(err) => {
                    warn!(error = %err, "read failed, disconnecting");
                    self.disconnect_with(DisconnectReason::Io(err.kind()));
                    return report;
                }
            };
            report.frames += 1;
            trace!(opcode = frame.opcode, len = frame.len(), "frame received");

            if frame.opcode == server::LOGOUT {
                info!("server requested logout");
                self.disconnect_with(DisconnectReason::Logout);
                return report;
            }

            match dispatcher.dispatch(&mut frame, context) {
                Ok(true) => {}
                Ok(false) => {
                    report.dropped += 1;
                    trace!(opcode = frame.opcode, "no handler, frame dropped");
                }
                Err(err) => {
                    report.failed += 1;
                    error!(opcode = frame.opcode, error = %err, "frame handler failed");
                }
            }
        }

        if report.frames > 0 {
            self.idle_ticks = 0;
        } else {
            self.idle_ticks += 1;
            if self.idle_ticks >= self.config.keepalive_idle_ticks {
                self.idle_ticks = 0;
                debug!("queueing keep-alive");
                self.queue(outbound::keepalive());
            }
        }
        report
    }

    /// Appends a frame to the outbound queue. Frames queued while not
    /// connected are discarded.
    pub fn queue(&mut self, frame: Frame) {
        if self.state != ConnectionState::Connected {
            debug!(opcode = frame.opcode, "not connected, frame discarded");
            return;
        }
        self.outbound.push_back(frame);
    }

    /// Writes every queued frame in order, then flushes the transport.
    /// Returns the number of frames written.
    pub fn flush(&mut self) -> Result<usize, NetError> {
        if self.state != ConnectionState::Connected {
            return Err(NetError::NotConnected);
        }
        let Some(transport) = self.transport.as_mut() else {
            return Err(NetError::NotConnected);
        };

        let count = self.outbound.len();
        let mut bytes = Vec::new();
        for frame in self.outbound.drain(..) {
            let cipher = self.ciphers.as_mut().map(|pair| &mut pair.encoder);
            bytes.extend(frame.encode(cipher));
        }

        let written = if bytes.is_empty() {
            Ok(())
        } else {
            transport.write_all(&bytes).and_then(|()| transport.flush())
        };
        if let Err(err) = written {
            warn!(error = %err, "write failed, disconnecting");
            self.disconnect_with(DisconnectReason::Io(err.kind()));
            return Err(err.into());
        }
        if count > 0 {
            trace!(frames = count, bytes = bytes.len(), "flushed");
        }
        Ok(count)
    }

    /// Drops the connection immediately.
    pub fn disconnect(&mut self) {
        self.disconnect_with(DisconnectReason::Requested);
    }

    fn disconnect_with(&mut self, reason: DisconnectReason) {
        let was_live = self.transport.is_some();
        self.transport = None;
        self.ciphers = None;
        self.decoder.reset();
        self.outbound.clear();
        self.idle_ticks = 0;
        self.state = ConnectionState::Disconnected;

        if was_live {
            info!(?reason, "disconnected");
            if let Some(callback) = self.on_disconnect.as_mut() {
                callback(reason);
            }
        }
    }
}

impl ConnectionEngine<TcpTransport> {
    /// Opens a TCP connection to `addr` and logs in with a random client
    /// seed.
    pub fn connect(
        &mut self,
        addr: SocketAddr,
        credentials: &Credentials,
    ) -> Result<LoginSuccess, NetError> {
        if self.state != ConnectionState::Disconnected {
            self.disconnect();
        }
        self.state = ConnectionState::Authenticating;
        info!(%addr, "connecting");

        let timeout = self.config.handshake_timeout;
        let transport = match TcpTransport::connect(addr, &self.config.socket, timeout) {
            Ok(transport) => transport,
            Err(err) => {
                self.state = ConnectionState::Disconnected;
                warn!(%addr, error = %err, "connect failed");
                return Err(err.into());
            }
        };

        let mut rng = rand::rng();
        let client_seed = [rng.random::<u32>(), rng.random::<u32>()];
        Ok(self.login(transport, credentials, client_seed)?)
    }
}

#[cfg(test)]
#[path = "connection_tests.rs"]
mod tests;
