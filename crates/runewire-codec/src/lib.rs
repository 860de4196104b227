//! Wire-level building blocks: the byte/bit cursor, the ISAAC stream cipher
//! used to obfuscate opcodes, the opcode + payload [`Frame`], and base-37 name
//! packing.

pub mod buffer;
pub mod error;
pub mod frame;
pub mod isaac;
pub mod names;

pub use buffer::{Buffer, STRING_TERMINATOR};
pub use error::CodecError;
pub use frame::Frame;
pub use isaac::{DECODER_SEED_OFFSET, Isaac, IsaacPair};
pub use names::{decode_name, display_name, encode_name, name_hash};
