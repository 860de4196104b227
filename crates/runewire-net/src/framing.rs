//! Incremental inbound frame decoding.
//!
//! ```text
//! +----------------+-----------------+-----------------+
//! | opcode (1)     | size prefix     | payload         |
//! | ISAAC-shifted  | 0, 1 or 2 bytes | (size bytes)    |
//! +----------------+-----------------+-----------------+
//! ```
//!
//! Bytes may arrive split across any number of socket reads. The decoder
//! keeps the deciphered opcode and the size resolution state between calls,
//! so a frame whose bytes trickle in over several ticks is decoded exactly
//! once, and the cipher is advanced exactly once per frame.

use std::io;

use runewire_codec::{Buffer, Frame, Isaac};

use crate::protocol::{FRAME_SIZES, FrameSize};
use crate::transport::Transport;

/// Size resolution state of the pending frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PendingSize {
    /// No opcode read yet.
    #[default]
    Unknown,
    /// Waiting for a one-byte size prefix.
    Byte,
    /// Waiting for a two-byte size prefix.
    Short,
    /// Payload size resolved.
    Known(usize),
}

/// Persisted decode state for one connection.
#[derive(Debug, Clone)]
pub struct FrameDecoder {
    sizes: &'static [i16; 256],
    pending_opcode: Option<u8>,
    pending_size: PendingSize,
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameDecoder {
    /// Decoder using the protocol's inbound size table.
    pub fn new() -> Self {
        Self::with_sizes(&FRAME_SIZES)
    }

    /// Decoder using a custom size table.
    pub fn with_sizes(sizes: &'static [i16; 256]) -> Self {
        Self {
            sizes,
            pending_opcode: None,
            pending_size: PendingSize::Unknown,
        }
    }

    /// Opcode of a partially received frame, if any.
    pub fn pending_opcode(&self) -> Option<u8> {
        self.pending_opcode
    }

    /// Size state of the partially received frame.
    pub fn pending_size(&self) -> PendingSize {
        self.pending_size
    }

    /// Forgets any partially received frame.
    pub fn reset(&mut self) {
        self.pending_opcode = None;
        self.pending_size = PendingSize::Unknown;
    }

    /// Decodes the next complete frame. Returns `Ok(None)` when the transport
    /// does not yet hold enough bytes; the partial state is kept for the
    /// next call.
    pub fn next_frame<T: Transport + ?Sized>(
        &mut self,
        transport: &mut T,
        cipher: Option<&mut Isaac>,
    ) -> io::Result<Option<Frame>> {
        let opcode = match self.pending_opcode {
            Some(opcode) => opcode,
            None => {
                if transport.available()? < 1 {
                    return Ok(None);
                }
                let mut header = [0u8; 1];
                transport.read_exact(&mut header)?;
                let opcode = match cipher {
                    Some(cipher) => cipher.decode_opcode(header[0]),
                    None => header[0],
                };
                self.pending_opcode = Some(opcode);
                self.pending_size = match FrameSize::from_table(self.sizes[opcode as usize]) {
                    FrameSize::Fixed(size) => PendingSize::Known(size),
                    FrameSize::VariableByte => PendingSize::Byte,
                    FrameSize::VariableShort => PendingSize::Short,
                };
                opcode
            }
        };

        let size = match self.pending_size {
            PendingSize::Known(size) => size,
            PendingSize::Byte => {
                if transport.available()? < 1 {
                    return Ok(None);
                }
                let mut prefix = [0u8; 1];
                transport.read_exact(&mut prefix)?;
                usize::from(prefix[0])
            }
            PendingSize::Short => {
                if transport.available()? < 2 {
                    return Ok(None);
                }
                let mut prefix = [0u8; 2];
                transport.read_exact(&mut prefix)?;
                usize::from(u16::from_be_bytes(prefix))
            }
            PendingSize::Unknown => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    "frame size unresolved after opcode",
                ));
            }
        };
        self.pending_size = PendingSize::Known(size);

        if transport.available()? < size {
            return Ok(None);
        }
        let mut payload = vec![0u8; size];
        if size > 0 {
            transport.read_exact(&mut payload)?;
        }

        self.reset();
        Ok(Some(Frame::with_payload(opcode, Buffer::wrap(payload))))
    }
}
