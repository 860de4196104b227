//! Byte transport seam between the engine and the socket.
//!
//! The engine never blocks outside the login handshake: every tick it asks
//! the transport how many bytes are buffered and only reads what is there.

use std::collections::VecDeque;
use std::io;

/// A bidirectional byte stream as the connection engine sees it.
pub trait Transport {
    /// Bytes that can be read right now without blocking.
    fn available(&mut self) -> io::Result<usize>;

    /// Fills `buf` completely. In handshake mode this may block up to the
    /// handshake deadline; in polling mode callers check
    /// [`available`](Self::available) first.
    fn read_exact(&mut self, buf: &mut [u8]) -> io::Result<()>;

    /// Writes all of `bytes`.
    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()>;

    /// Pushes buffered writes to the peer.
    fn flush(&mut self) -> io::Result<()>;

    /// Switches from blocking handshake reads to per-tick polling.
    fn set_polling(&mut self, polling: bool) -> io::Result<()>;
}

fn closed() -> io::Error {
    io::Error::new(io::ErrorKind::ConnectionAborted, "transport closed")
}

/// In-memory transport for tests and offline replays.
///
/// Inbound bytes are queued with [`push_inbound`](Self::push_inbound);
/// everything the engine writes is captured until
/// [`take_written`](Self::take_written).
#[derive(Debug, Default)]
pub struct MemoryTransport {
    inbound: VecDeque<u8>,
    written: Vec<u8>,
    flushes: usize,
    polling: bool,
    closed: bool,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a transport whose inbound queue already holds `bytes`.
    pub fn with_inbound(bytes: &[u8]) -> Self {
        let mut transport = Self::new();
        transport.push_inbound(bytes);
        transport
    }

    /// Makes `bytes` readable by the engine.
    pub fn push_inbound(&mut self, bytes: &[u8]) {
        self.inbound.extend(bytes);
    }

    /// Returns and clears everything written so far.
    pub fn take_written(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.written)
    }

    /// Number of completed flush calls.
    pub fn flush_count(&self) -> usize {
        self.flushes
    }

    pub fn is_polling(&self) -> bool {
        self.polling
    }

    /// Simulates the peer closing the connection: every later call fails.
    pub fn close(&mut self) {
        self.closed = true;
    }
}

impl Transport for MemoryTransport {
    fn available(&mut self) -> io::Result<usize> {
        if self.closed {
            return Err(closed());
        }
        Ok(self.inbound.len())
    }

    fn read_exact(&mut self, buf: &mut [u8]) -> io::Result<()> {
        if self.closed {
            return Err(closed());
        }
        if self.inbound.len() < buf.len() {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "not enough inbound bytes",
            ));
        }
        let len = buf.len();
        for (slot, byte) in buf.iter_mut().zip(self.inbound.drain(..len)) {
            *slot = byte;
        }
        Ok(())
    }

    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        if self.closed {
            return Err(closed());
        }
        self.written.extend_from_slice(bytes);
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        if self.closed {
            return Err(closed());
        }
        self.flushes += 1;
        Ok(())
    }

    fn set_polling(&mut self, polling: bool) -> io::Result<()> {
        self.polling = polling;
        Ok(())
    }
}
