//! Payload builders shared by the sync tests.

use runewire_codec::Buffer;

pub(crate) const PLAYER_SENTINEL: u32 = 2047;
pub(crate) const ACTOR_SENTINEL: u32 = 16383;

/// Writes a sync payload: bit section first, then byte section.
pub(crate) struct SyncWriter {
    buf: Buffer,
    bits: bool,
}

impl SyncWriter {
    pub fn new() -> Self {
        let mut buf = Buffer::new();
        buf.begin_bit_access();
        Self { buf, bits: true }
    }

    pub fn bits(&mut self, count: u32, value: u32) -> &mut Self {
        assert!(self.bits, "bit write after byte section");
        self.buf.write_bits(count, value).unwrap();
        self
    }

    pub fn flag(&mut self, flag: bool) -> &mut Self {
        self.bits(1, u32::from(flag))
    }

    /// Phase-1 entry that stays put.
    pub fn stay(&mut self) -> &mut Self {
        self.flag(true)
    }

    /// Phase-1 entry with a move type and its trailing fields.
    pub fn walk(&mut self, direction: u32, masked: bool) -> &mut Self {
        self.flag(false).bits(2, 1).bits(3, direction).flag(masked)
    }

    pub fn run(&mut self, first: u32, second: u32, masked: bool) -> &mut Self {
        self.flag(false)
            .bits(2, 2)
            .bits(3, first)
            .bits(3, second)
            .flag(masked)
    }

    pub fn mask_only(&mut self) -> &mut Self {
        self.flag(false).bits(2, 0)
    }

    pub fn evict(&mut self) -> &mut Self {
        self.flag(false).bits(2, 3)
    }

    pub fn player_admission(
        &mut self,
        index: u32,
        dx: i32,
        dy: i32,
        discard: bool,
        masked: bool,
    ) -> &mut Self {
        self.bits(11, index)
            .bits(5, (dy & 31) as u32)
            .bits(5, (dx & 31) as u32)
            .flag(discard)
            .flag(masked)
    }

    pub fn actor_admission(
        &mut self,
        index: u32,
        dx: i32,
        dy: i32,
        discard: bool,
        descriptor: u32,
        masked: bool,
    ) -> &mut Self {
        self.bits(14, index)
            .bits(5, (dy & 31) as u32)
            .bits(5, (dx & 31) as u32)
            .flag(discard)
            .bits(18, descriptor)
            .flag(masked)
    }

    /// Phase 0 teleport of the local player.
    pub fn local_teleport(&mut self, plane: u32, x: u32, y: u32, masked: bool) -> &mut Self {
        self.flag(true)
            .bits(2, 3)
            .bits(2, plane)
            .flag(true)
            .flag(masked)
            .bits(7, y)
            .bits(7, x)
    }

    /// Leaves bit mode; further writes go through [`SyncWriter::bytes`].
    pub fn end_bits(&mut self) -> &mut Self {
        if self.bits {
            self.buf.end_bit_access();
            self.bits = false;
        }
        self
    }

    pub fn bytes(&mut self, write: impl FnOnce(&mut Buffer)) -> &mut Self {
        self.end_bits();
        write(&mut self.buf);
        self
    }

    pub fn finish(&mut self) -> Buffer {
        self.end_bits();
        let mut buf = std::mem::take(&mut self.buf);
        buf.set_position(0);
        buf
    }
}
