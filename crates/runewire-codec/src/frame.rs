//! A single opcode + payload unit.

use crate::buffer::Buffer;
use crate::isaac::Isaac;

/// One protocol frame. The opcode selects the payload layout; the layout
/// itself lives in the handler for that opcode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Unobfuscated opcode.
    pub opcode: u8,
    /// Payload body, cursor at 0 for inbound frames.
    pub payload: Buffer,
}

impl Frame {
    /// Creates a frame with an empty payload ready for writing.
    pub fn new(opcode: u8) -> Self {
        Self {
            opcode,
            payload: Buffer::new(),
        }
    }

    /// Creates a frame around an existing payload.
    pub fn with_payload(opcode: u8, payload: Buffer) -> Self {
        Self { opcode, payload }
    }

    /// Payload length in bytes.
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    /// Returns `true` if the payload is empty.
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    /// The header byte as it goes on the wire. Only the opcode is
    /// obfuscated; the payload is sent as is.
    pub fn write_opcode(&self, cipher: Option<&mut Isaac>) -> u8 {
        match cipher {
            Some(cipher) => cipher.encode_opcode(self.opcode),
            None => self.opcode,
        }
    }

    /// Serializes `[header][payload]`.
    pub fn encode(&self, cipher: Option<&mut Isaac>) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(1 + self.len());
        bytes.push(self.write_opcode(cipher));
        bytes.extend_from_slice(self.payload.as_bytes());
        bytes
    }
}
