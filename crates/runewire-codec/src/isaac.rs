//! ISAAC keystream used to obfuscate frame opcodes.
//!
//! Each connection owns two instances: the encoder seeded with the session
//! seed and the decoder seeded with every seed word plus 50. Output words are
//! consumed once, in order; a full 256-word regeneration round runs whenever
//! the result table is exhausted.

use std::fmt;

const SIZE: usize = 256;
const GOLDEN_RATIO: u32 = 0x9e37_79b9;

/// Offset added to each session seed word for the server-to-client direction.
pub const DECODER_SEED_OFFSET: u32 = 50;

/// A single-direction ISAAC generator.
#[derive(Clone)]
pub struct Isaac {
    memory: [u32; SIZE],
    results: [u32; SIZE],
    a: u32,
    b: u32,
    c: u32,
    count: usize,
}

impl fmt::Debug for Isaac {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Isaac")
            .field("count", &self.count)
            .finish_non_exhaustive()
    }
}

impl Isaac {
    /// Seeds a generator from four words. The rest of the seed table is zero.
    pub fn new(seed: [u32; 4]) -> Self {
        let mut isaac = Self {
            memory: [0; SIZE],
            results: [0; SIZE],
            a: 0,
            b: 0,
            c: 0,
            count: 0,
        };
        isaac.results[..4].copy_from_slice(&seed);
        isaac.init();
        isaac
    }

    /// Returns the next keystream word.
    pub fn next_value(&mut self) -> u32 {
        if self.count == 0 {
            self.generate();
            self.count = SIZE;
        }
        self.count -= 1;
        self.results[self.count]
    }

    /// Obfuscates an outbound opcode.
    pub fn encode_opcode(&mut self, opcode: u8) -> u8 {
        opcode.wrapping_add(self.next_value() as u8)
    }

    /// Recovers an inbound opcode.
    pub fn decode_opcode(&mut self, byte: u8) -> u8 {
        byte.wrapping_sub(self.next_value() as u8)
    }

    fn init(&mut self) {
        let mut m = [GOLDEN_RATIO; 8];
        for _ in 0..4 {
            mix(&mut m);
        }

        for i in (0..SIZE).step_by(8) {
            for (j, word) in m.iter_mut().enumerate() {
                *word = word.wrapping_add(self.results[i + j]);
            }
            mix(&mut m);
            self.memory[i..i + 8].copy_from_slice(&m);
        }

        for i in (0..SIZE).step_by(8) {
            for (j, word) in m.iter_mut().enumerate() {
                *word = word.wrapping_add(self.memory[i + j]);
            }
            mix(&mut m);
            self.memory[i..i + 8].copy_from_slice(&m);
        }

        self.generate();
        self.count = SIZE;
    }

    fn generate(&mut self) {
        self.c = self.c.wrapping_add(1);
        self.b = self.b.wrapping_add(self.c);

        for i in 0..SIZE {
            let x = self.memory[i];
            self.a ^= match i & 3 {
                0 => self.a << 13,
                1 => self.a >> 6,
                2 => self.a << 2,
                _ => self.a >> 16,
            };
            self.a = self.a.wrapping_add(self.memory[(i + 128) & 0xFF]);
            let y = self.memory[((x >> 2) & 0xFF) as usize]
                .wrapping_add(self.a)
                .wrapping_add(self.b);
            self.memory[i] = y;
            self.b = self.memory[((y >> 10) & 0xFF) as usize].wrapping_add(x);
            self.results[i] = self.b;
        }
    }
}

fn mix(m: &mut [u32; 8]) {
    m[0] ^= m[1] << 11;
    m[3] = m[3].wrapping_add(m[0]);
    m[1] = m[1].wrapping_add(m[2]);
    m[1] ^= m[2] >> 2;
    m[4] = m[4].wrapping_add(m[1]);
    m[2] = m[2].wrapping_add(m[3]);
    m[2] ^= m[3] << 8;
    m[5] = m[5].wrapping_add(m[2]);
    m[3] = m[3].wrapping_add(m[4]);
    m[3] ^= m[4] >> 16;
    m[6] = m[6].wrapping_add(m[3]);
    m[4] = m[4].wrapping_add(m[5]);
    m[4] ^= m[5] << 10;
    m[7] = m[7].wrapping_add(m[4]);
    m[5] = m[5].wrapping_add(m[6]);
    m[5] ^= m[6] >> 4;
    m[0] = m[0].wrapping_add(m[5]);
    m[6] = m[6].wrapping_add(m[7]);
    m[6] ^= m[7] << 8;
    m[1] = m[1].wrapping_add(m[6]);
    m[7] = m[7].wrapping_add(m[0]);
    m[7] ^= m[0] >> 9;
    m[2] = m[2].wrapping_add(m[7]);
    m[0] = m[0].wrapping_add(m[1]);
}

/// Encoder and decoder derived from one session seed.
#[derive(Debug, Clone)]
pub struct IsaacPair {
    /// Client-to-server direction.
    pub encoder: Isaac,
    /// Server-to-client direction.
    pub decoder: Isaac,
}

impl IsaacPair {
    /// Encoder keyed with `seed`, decoder keyed with every word raised by
    /// [`DECODER_SEED_OFFSET`].
    pub fn from_session_seed(seed: [u32; 4]) -> Self {
        let decoder_seed = seed.map(|word| word.wrapping_add(DECODER_SEED_OFFSET));
        Self {
            encoder: Isaac::new(seed),
            decoder: Isaac::new(decoder_seed),
        }
    }
}
