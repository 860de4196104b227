//! Byte cursor with obfuscated integer encodings and MSB-first bit access.
//!
//! A [`Buffer`] backs every frame payload. Byte reads and writes move the
//! byte cursor; between [`Buffer::begin_bit_access`] and
//! [`Buffer::end_bit_access`] the bit cursor takes over and the byte cursor is
//! only committed (rounded up to the next whole byte) when bit access ends.
//!
//! The wire format mixes several single-byte transforms to defeat naive
//! signature scanning:
//!
//! ```text
//! family   write      read
//! raw      v          v
//! add      v + 128    v - 128
//! sub      128 - v    128 - v
//! neg      -v         -v
//! ```
//!
//! All arithmetic wraps at 8 bits. Multi-byte integers come big-endian,
//! little-endian, with the `add` transform on the low byte, and in the two
//! scrambled 32-bit orders used by a handful of opcodes (`me` and `ime`).

use crate::error::CodecError;

/// Terminator byte used by most string fields.
pub const STRING_TERMINATOR: u8 = 10;

/// First byte values below this select the one-byte smart form.
const SMART_ONE_BYTE_LIMIT: u8 = 128;

/// Continuation value of the chained unsigned smart encoding.
const USMART2_CHUNK: i32 = 32767;

/// Growable byte sequence with a byte cursor and a bit cursor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Buffer {
    data: Vec<u8>,
    position: usize,
    bit_position: usize,
    bit_mode: bool,
}

impl From<Vec<u8>> for Buffer {
    fn from(data: Vec<u8>) -> Self {
        Self::wrap(data)
    }
}

impl Buffer {
    /// Creates an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty buffer with room for `capacity` bytes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: Vec::with_capacity(capacity),
            ..Self::default()
        }
    }

    /// Wraps existing bytes for reading, cursor at 0.
    pub fn wrap(data: Vec<u8>) -> Self {
        Self {
            data,
            ..Self::default()
        }
    }

    /// The full backing storage, independent of the cursor.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Consumes the buffer, returning its backing storage.
    pub fn into_inner(self) -> Vec<u8> {
        self.data
    }

    /// Length of the backing storage in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if the backing storage is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Current byte cursor.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Moves the byte cursor. Reuse of a long-lived buffer resets it to 0.
    pub fn set_position(&mut self, position: usize) {
        self.position = position;
    }

    /// Bytes between the cursor and the end of the backing storage.
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.position)
    }

    /// Drops all contents and rewinds both cursors.
    pub fn clear(&mut self) {
        self.data.clear();
        self.position = 0;
        self.bit_position = 0;
        self.bit_mode = false;
    }

    fn underflow(&self, needed: usize) -> CodecError {
        CodecError::Underflow {
            needed,
            position: self.position,
            len: self.data.len(),
        }
    }

    // -----------------------------------------------------------------------
    // Single bytes
    // -----------------------------------------------------------------------

    /// Reads one raw byte. Every other read is built on this one.
    pub fn read_u8(&mut self) -> Result<u8, CodecError> {
        debug_assert!(!self.bit_mode, "byte read during bit access");
        let Some(&value) = self.data.get(self.position) else {
            return Err(self.underflow(1));
        };
        self.position += 1;
        Ok(value)
    }

    /// Returns the next byte without consuming it.
    pub fn peek_u8(&self) -> Result<u8, CodecError> {
        self.data
            .get(self.position)
            .copied()
            .ok_or_else(|| self.underflow(1))
    }

    /// Writes one raw byte at the cursor, growing the storage as needed.
    pub fn write_u8(&mut self, value: u8) {
        debug_assert!(!self.bit_mode, "byte write during bit access");
        if self.position >= self.data.len() {
            self.data.resize(self.position + 1, 0);
        }
        self.data[self.position] = value;
        self.position += 1;
    }

    /// Reads one raw signed byte.
    pub fn read_i8(&mut self) -> Result<i8, CodecError> {
        Ok(self.read_u8()? as i8)
    }

    /// Reads a byte written with the `add` transform.
    pub fn read_u8_add(&mut self) -> Result<u8, CodecError> {
        Ok(self.read_u8()?.wrapping_sub(128))
    }

    /// Signed form of [`read_u8_add`](Self::read_u8_add).
    pub fn read_i8_add(&mut self) -> Result<i8, CodecError> {
        Ok(self.read_u8_add()? as i8)
    }

    /// Reads a byte written with the `neg` transform.
    pub fn read_u8_neg(&mut self) -> Result<u8, CodecError> {
        Ok(self.read_u8()?.wrapping_neg())
    }

    /// Signed form of [`read_u8_neg`](Self::read_u8_neg).
    pub fn read_i8_neg(&mut self) -> Result<i8, CodecError> {
        Ok(self.read_u8_neg()? as i8)
    }

    /// Reads a byte written with the `sub` transform.
    pub fn read_u8_sub(&mut self) -> Result<u8, CodecError> {
        Ok(128u8.wrapping_sub(self.read_u8()?))
    }

    /// Signed form of [`read_u8_sub`](Self::read_u8_sub).
    pub fn read_i8_sub(&mut self) -> Result<i8, CodecError> {
        Ok(self.read_u8_sub()? as i8)
    }

    /// Writes `value + 128`.
    pub fn write_u8_add(&mut self, value: u8) {
        self.write_u8(value.wrapping_add(128));
    }

    /// Writes `-value`.
    pub fn write_u8_neg(&mut self, value: u8) {
        self.write_u8(value.wrapping_neg());
    }

    /// Writes `128 - value`.
    pub fn write_u8_sub(&mut self, value: u8) {
        self.write_u8(128u8.wrapping_sub(value));
    }

    // -----------------------------------------------------------------------
    // Shorts
    // -----------------------------------------------------------------------

    /// Big-endian unsigned short.
    pub fn read_u16(&mut self) -> Result<u16, CodecError> {
        let high = self.read_u8()?;
        let low = self.read_u8()?;
        Ok(u16::from_be_bytes([high, low]))
    }

    /// Big-endian signed short.
    pub fn read_i16(&mut self) -> Result<i16, CodecError> {
        Ok(self.read_u16()? as i16)
    }

    /// Big-endian short with the `add` transform on the low byte.
    pub fn read_u16_add(&mut self) -> Result<u16, CodecError> {
        let high = self.read_u8()?;
        let low = self.read_u8_add()?;
        Ok(u16::from_be_bytes([high, low]))
    }

    /// Signed form of [`read_u16_add`](Self::read_u16_add).
    pub fn read_i16_add(&mut self) -> Result<i16, CodecError> {
        Ok(self.read_u16_add()? as i16)
    }

    /// Little-endian unsigned short.
    pub fn read_u16_le(&mut self) -> Result<u16, CodecError> {
        let low = self.read_u8()?;
        let high = self.read_u8()?;
        Ok(u16::from_le_bytes([low, high]))
    }

    /// Little-endian signed short.
    pub fn read_i16_le(&mut self) -> Result<i16, CodecError> {
        Ok(self.read_u16_le()? as i16)
    }

    /// Little-endian short with the `add` transform on the low byte.
    pub fn read_u16_le_add(&mut self) -> Result<u16, CodecError> {
        let low = self.read_u8_add()?;
        let high = self.read_u8()?;
        Ok(u16::from_le_bytes([low, high]))
    }

    /// Signed form of [`read_u16_le_add`](Self::read_u16_le_add).
    pub fn read_i16_le_add(&mut self) -> Result<i16, CodecError> {
        Ok(self.read_u16_le_add()? as i16)
    }

    /// Writes a big-endian short.
    pub fn write_u16(&mut self, value: u16) {
        let [high, low] = value.to_be_bytes();
        self.write_u8(high);
        self.write_u8(low);
    }

    /// Writes a big-endian short, `add` transform on the low byte.
    pub fn write_u16_add(&mut self, value: u16) {
        let [high, low] = value.to_be_bytes();
        self.write_u8(high);
        self.write_u8_add(low);
    }

    /// Writes a little-endian short.
    pub fn write_u16_le(&mut self, value: u16) {
        let [low, high] = value.to_le_bytes();
        self.write_u8(low);
        self.write_u8(high);
    }

    /// Writes a little-endian short, `add` transform on the low byte.
    pub fn write_u16_le_add(&mut self, value: u16) {
        let [low, high] = value.to_le_bytes();
        self.write_u8_add(low);
        self.write_u8(high);
    }

    // -----------------------------------------------------------------------
    // Wider integers
    // -----------------------------------------------------------------------

    /// Big-endian unsigned 24-bit integer.
    pub fn read_u24(&mut self) -> Result<u32, CodecError> {
        let b0 = u32::from(self.read_u8()?);
        let b1 = u32::from(self.read_u8()?);
        let b2 = u32::from(self.read_u8()?);
        Ok((b0 << 16) | (b1 << 8) | b2)
    }

    /// Writes the low 24 bits of `value` big-endian.
    pub fn write_u24(&mut self, value: u32) {
        self.write_u8((value >> 16) as u8);
        self.write_u8((value >> 8) as u8);
        self.write_u8(value as u8);
    }

    /// Big-endian 32-bit integer.
    pub fn read_i32(&mut self) -> Result<i32, CodecError> {
        let mut bytes = [0u8; 4];
        for byte in &mut bytes {
            *byte = self.read_u8()?;
        }
        Ok(i32::from_be_bytes(bytes))
    }

    /// Writes a big-endian 32-bit integer.
    pub fn write_i32(&mut self, value: i32) {
        for byte in value.to_be_bytes() {
            self.write_u8(byte);
        }
    }

    /// Big-endian 64-bit integer.
    pub fn read_i64(&mut self) -> Result<i64, CodecError> {
        let high = i64::from(self.read_i32()?) << 32;
        let low = i64::from(self.read_i32()? as u32);
        Ok(high | low)
    }

    /// Writes a big-endian 64-bit integer.
    pub fn write_i64(&mut self, value: i64) {
        for byte in value.to_be_bytes() {
            self.write_u8(byte);
        }
    }

    /// 32-bit integer with byte shifts `[8, 0, 24, 16]`.
    pub fn read_i32_me(&mut self) -> Result<i32, CodecError> {
        let b0 = u32::from(self.read_u8()?);
        let b1 = u32::from(self.read_u8()?);
        let b2 = u32::from(self.read_u8()?);
        let b3 = u32::from(self.read_u8()?);
        Ok(((b0 << 8) | b1 | (b2 << 24) | (b3 << 16)) as i32)
    }

    /// Writes a 32-bit integer with byte shifts `[8, 0, 24, 16]`.
    pub fn write_i32_me(&mut self, value: i32) {
        let value = value as u32;
        self.write_u8((value >> 8) as u8);
        self.write_u8(value as u8);
        self.write_u8((value >> 24) as u8);
        self.write_u8((value >> 16) as u8);
    }

    /// 32-bit integer with byte shifts `[16, 24, 0, 8]`.
    pub fn read_i32_ime(&mut self) -> Result<i32, CodecError> {
        let b0 = u32::from(self.read_u8()?);
        let b1 = u32::from(self.read_u8()?);
        let b2 = u32::from(self.read_u8()?);
        let b3 = u32::from(self.read_u8()?);
        Ok(((b0 << 16) | (b1 << 24) | b2 | (b3 << 8)) as i32)
    }

    /// Writes a 32-bit integer with byte shifts `[16, 24, 0, 8]`.
    pub fn write_i32_ime(&mut self, value: i32) {
        let value = value as u32;
        self.write_u8((value >> 16) as u8);
        self.write_u8((value >> 24) as u8);
        self.write_u8(value as u8);
        self.write_u8((value >> 8) as u8);
    }

    // -----------------------------------------------------------------------
    // Smart integers
    // -----------------------------------------------------------------------

    /// Signed smart: one byte `b - 64`, or a short `s - 49152`.
    pub fn read_smart(&mut self) -> Result<i32, CodecError> {
        if self.peek_u8()? < SMART_ONE_BYTE_LIMIT {
            Ok(i32::from(self.read_u8()?) - 64)
        } else {
            Ok(i32::from(self.read_u16()?) - 49152)
        }
    }

    /// Unsigned smart: one byte `b`, or a short `s - 32768`.
    pub fn read_usmart(&mut self) -> Result<i32, CodecError> {
        if self.peek_u8()? < SMART_ONE_BYTE_LIMIT {
            Ok(i32::from(self.read_u8()?))
        } else {
            Ok(i32::from(self.read_u16()?) - 32768)
        }
    }

    /// Writes a signed smart in `-16384..16384`.
    pub fn write_smart(&mut self, value: i32) -> Result<(), CodecError> {
        match value {
            -64..=63 => self.write_u8((value + 64) as u8),
            -16384..=16383 => self.write_u16((value + 49152) as u16),
            _ => return Err(CodecError::SmartOutOfRange(value)),
        }
        Ok(())
    }

    /// Writes an unsigned smart in `0..32768`.
    pub fn write_usmart(&mut self, value: i32) -> Result<(), CodecError> {
        match value {
            0..=127 => self.write_u8(value as u8),
            128..=32767 => self.write_u16((value + 32768) as u16),
            _ => return Err(CodecError::SmartOutOfRange(value)),
        }
        Ok(())
    }

    /// Chained unsigned smart. Each read equal to 32767 adds 32767 and
    /// continues; the first other value is added and ends the chain.
    pub fn read_usmart2(&mut self) -> Result<i32, CodecError> {
        let mut total = 0i32;
        let mut value = self.read_usmart()?;
        while value == USMART2_CHUNK {
            total = total.wrapping_add(USMART2_CHUNK);
            value = self.read_usmart()?;
        }
        Ok(total.wrapping_add(value))
    }

    /// Writes a non-negative value in the chained smart form.
    pub fn write_usmart2(&mut self, value: i32) -> Result<(), CodecError> {
        if value < 0 {
            return Err(CodecError::SmartOutOfRange(value));
        }
        let mut remaining = value;
        while remaining >= USMART2_CHUNK {
            self.write_usmart(USMART2_CHUNK)?;
            remaining -= USMART2_CHUNK;
        }
        self.write_usmart(remaining)
    }

    // -----------------------------------------------------------------------
    // Strings and raw bytes
    // -----------------------------------------------------------------------

    /// Reads bytes up to `terminator`, one char per byte.
    pub fn read_string(&mut self, terminator: u8) -> Result<String, CodecError> {
        let mut text = String::new();
        loop {
            let byte = self.read_u8()?;
            if byte == terminator {
                return Ok(text);
            }
            text.push(char::from(byte));
        }
    }

    /// Writes one byte per char followed by `terminator`. Chars outside
    /// Latin-1 are written as `?`.
    pub fn write_string(&mut self, text: &str, terminator: u8) {
        for ch in text.chars() {
            self.write_u8(u8::try_from(u32::from(ch)).unwrap_or(b'?'));
        }
        self.write_u8(terminator);
    }

    /// Reads `count` raw bytes.
    pub fn read_bytes(&mut self, count: usize) -> Result<Vec<u8>, CodecError> {
        if self.remaining() < count {
            return Err(self.underflow(count));
        }
        let bytes = self.data[self.position..self.position + count].to_vec();
        self.position += count;
        Ok(bytes)
    }

    /// Writes raw bytes.
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            self.write_u8(byte);
        }
    }

    /// Back-patches the length byte reserved `length` bytes before the cursor,
    /// i.e. at `position - length - 1`.
    pub fn write_length(&mut self, length: usize) -> Result<(), CodecError> {
        let value = u8::try_from(length).map_err(|_| CodecError::LengthOutOfRange(length))?;
        let slot = self
            .position
            .checked_sub(length + 1)
            .ok_or(CodecError::LengthOutOfRange(length))?;
        let reserved = self
            .data
            .get_mut(slot)
            .ok_or(CodecError::LengthOutOfRange(length))?;
        *reserved = value;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Bit access
    // -----------------------------------------------------------------------

    /// Enters bit mode at the current byte boundary.
    pub fn begin_bit_access(&mut self) {
        self.bit_position = self.position * 8;
        self.bit_mode = true;
    }

    /// Leaves bit mode, committing the byte cursor to the next whole byte.
    pub fn end_bit_access(&mut self) {
        self.position = self.bit_position.div_ceil(8);
        self.bit_mode = false;
    }

    /// Running bit offset from the start of the storage.
    pub fn bit_position(&self) -> usize {
        self.bit_position
    }

    /// Size of the backing storage in bits.
    pub fn capacity_bits(&self) -> usize {
        self.data.len() * 8
    }

    /// Reads `count` bits (1..=32), most significant first.
    pub fn read_bits(&mut self, count: u32) -> Result<u32, CodecError> {
        debug_assert!(self.bit_mode, "bit read outside bit access");
        if count == 0 || count > 32 {
            return Err(CodecError::InvalidBitWidth(count));
        }
        if self.bit_position + count as usize > self.capacity_bits() {
            return Err(CodecError::Underflow {
                needed: count as usize,
                position: self.bit_position,
                len: self.capacity_bits(),
            });
        }

        let mut value = 0u32;
        let mut remaining = count;
        while remaining > 0 {
            let byte = u32::from(self.data[self.bit_position >> 3]);
            let available = 8 - (self.bit_position & 7) as u32;
            let take = remaining.min(available);
            let bits = (byte >> (available - take)) & ((1 << take) - 1);
            value = (value << take) | bits;
            remaining -= take;
            self.bit_position += take as usize;
        }
        Ok(value)
    }

    /// Writes the low `count` bits (1..=32) of `value`, most significant first.
    pub fn write_bits(&mut self, count: u32, value: u32) -> Result<(), CodecError> {
        debug_assert!(self.bit_mode, "bit write outside bit access");
        if count == 0 || count > 32 {
            return Err(CodecError::InvalidBitWidth(count));
        }
        let needed = (self.bit_position + count as usize).div_ceil(8);
        if self.data.len() < needed {
            self.data.resize(needed, 0);
        }

        let mut remaining = count;
        while remaining > 0 {
            let index = self.bit_position >> 3;
            let available = 8 - (self.bit_position & 7) as u32;
            let take = remaining.min(available);
            let shift = available - take;
            let mask = ((1u32 << take) - 1) as u8;
            let bits = ((value >> (remaining - take)) as u8) & mask;
            self.data[index] = (self.data[index] & !(mask << shift)) | (bits << shift);
            remaining -= take;
            self.bit_position += take as usize;
        }
        Ok(())
    }

    /// Writes a single flag bit.
    pub fn write_flag(&mut self, flag: bool) -> Result<(), CodecError> {
        self.write_bits(1, u32::from(flag))
    }
}
