//! [`Transport`] over a std [`TcpStream`].
//!
//! During the handshake reads block with a read timeout. Once polling is
//! enabled the read timeout is cleared and [`Transport::available`] drains
//! whatever the socket holds into a receive buffer without blocking.

use std::collections::VecDeque;
use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::time::Duration;

use crate::platform::{self, SocketConfig};
use crate::transport::Transport;

const READ_CHUNK: usize = 4096;

/// TCP transport with an internal receive buffer.
#[derive(Debug)]
pub struct TcpTransport {
    stream: TcpStream,
    received: VecDeque<u8>,
    handshake_timeout: Duration,
    polling: bool,
}

impl TcpTransport {
    /// Connects and configures the socket. Reads time out after
    /// `handshake_timeout` until polling is enabled.
    pub fn connect(
        addr: SocketAddr,
        socket: &SocketConfig,
        handshake_timeout: Duration,
    ) -> io::Result<Self> {
        let stream = platform::connect(addr, socket, handshake_timeout)?;
        Self::from_stream(stream, handshake_timeout)
    }

    /// Wraps an already connected stream.
    pub fn from_stream(stream: TcpStream, handshake_timeout: Duration) -> io::Result<Self> {
        stream.set_read_timeout(Some(handshake_timeout))?;
        stream.set_write_timeout(Some(handshake_timeout))?;
        Ok(Self {
            stream,
            received: VecDeque::with_capacity(READ_CHUNK),
            handshake_timeout,
            polling: false,
        })
    }

    pub fn peer_addr(&self) -> io::Result<SocketAddr> {
        self.stream.peer_addr()
    }

    /// Moves every byte the socket currently holds into the receive buffer.
    fn drain_socket(&mut self) -> io::Result<()> {
        self.stream.set_nonblocking(true)?;
        let result = self.drain_nonblocking();
        self.stream.set_nonblocking(false)?;
        result
    }

    fn drain_nonblocking(&mut self) -> io::Result<()> {
        let mut chunk = [0u8; READ_CHUNK];
        loop {
            match self.stream.read(&mut chunk) {
                Ok(0) => {
                    return Err(io::Error::new(
                        io::ErrorKind::ConnectionAborted,
                        "connection closed by peer",
                    ));
                }
                Ok(n) => {
                    self.received.extend(&chunk[..n]);
                    if n < chunk.len() {
                        return Ok(());
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(()),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
    }
}

impl Transport for TcpTransport {
    fn available(&mut self) -> io::Result<usize> {
        if self.polling {
            self.drain_socket()?;
        }
        Ok(self.received.len())
    }

    fn read_exact(&mut self, buf: &mut [u8]) -> io::Result<()> {
        if self.received.len() < buf.len() {
            if self.polling {
                self.drain_socket()?;
                if self.received.len() < buf.len() {
                    return Err(io::Error::new(
                        io::ErrorKind::WouldBlock,
                        "frame bytes not yet received",
                    ));
                }
            } else {
                let mut rest = vec![0u8; buf.len() - self.received.len()];
                self.stream.read_exact(&mut rest)?;
                self.received.extend(rest);
            }
        }
        let len = buf.len();
        for (slot, byte) in buf.iter_mut().zip(self.received.drain(..len)) {
            *slot = byte;
        }
        Ok(())
    }

    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.stream.write_all(bytes)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.stream.flush()
    }

    fn set_polling(&mut self, polling: bool) -> io::Result<()> {
        self.polling = polling;
        let timeout = (!polling).then_some(self.handshake_timeout);
        self.stream.set_read_timeout(timeout)
    }
}
