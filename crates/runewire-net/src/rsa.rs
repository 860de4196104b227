//! Textbook RSA over the login credentials block.

use num_bigint::BigUint;

use crate::error::{LoginError, NetError};

/// Public exponent of the built-in key.
const DEFAULT_EXPONENT: u32 = 65_537;

/// Modulus of the built-in 1024-bit key.
const DEFAULT_MODULUS: [u8; 128] = [
    0xca, 0x20, 0x40, 0x3a, 0x4b, 0x65, 0x05, 0x35, 0xcd, 0x5b, 0x0c, 0x7e, 0x52, 0x5d, 0x5a, 0xa9,
    0xc1, 0x7b, 0x8b, 0xcb, 0xb2, 0xd4, 0x22, 0x07, 0x99, 0xa8, 0x0e, 0x8a, 0x8b, 0x44, 0x2f, 0x9f,
    0x73, 0x06, 0x95, 0x14, 0xfa, 0x9f, 0x8b, 0x86, 0xd9, 0xcc, 0xfc, 0x22, 0x09, 0xe2, 0xb1, 0x58,
    0x9e, 0xa8, 0xab, 0x8a, 0x48, 0x3e, 0xb1, 0x07, 0xe3, 0x6c, 0xff, 0x75, 0xd8, 0x95, 0x2a, 0x54,
    0x0f, 0xe1, 0x61, 0xba, 0x32, 0xfe, 0xda, 0x47, 0x2d, 0xda, 0xa1, 0xf8, 0x39, 0xea, 0x05, 0xcc,
    0x28, 0x28, 0x01, 0x99, 0xbe, 0x3a, 0xd4, 0x6b, 0x7c, 0x6d, 0x8c, 0xf6, 0x4b, 0x7b, 0xc7, 0x37,
    0x5d, 0xf4, 0xe9, 0x6f, 0x0b, 0x95, 0xb4, 0xee, 0xf3, 0x5a, 0x2a, 0xbd, 0xa9, 0x55, 0x83, 0x05,
    0x4b, 0xc0, 0x46, 0x92, 0x66, 0x4b, 0xa3, 0x6c, 0x1b, 0x99, 0x72, 0x25, 0xc5, 0xfd, 0xa8, 0x93,
];

/// Public key used to encrypt the credentials block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RsaKey {
    exponent: BigUint,
    modulus: BigUint,
}

impl Default for RsaKey {
    fn default() -> Self {
        Self {
            exponent: BigUint::from(DEFAULT_EXPONENT),
            modulus: BigUint::from_bytes_be(&DEFAULT_MODULUS),
        }
    }
}

impl RsaKey {
    pub fn new(exponent: BigUint, modulus: BigUint) -> Self {
        Self { exponent, modulus }
    }

    /// Parses a key from hexadecimal exponent and modulus strings.
    pub fn from_hex(exponent: &str, modulus: &str) -> Result<Self, NetError> {
        let parse = |field: &str, text: &str| {
            let digits = text.trim().trim_start_matches("0x");
            BigUint::parse_bytes(digits.as_bytes(), 16)
                .ok_or_else(|| NetError::Rsa(format!("{field} is not a hex number")))
        };
        let key = Self::new(parse("exponent", exponent)?, parse("modulus", modulus)?);
        if key.modulus.bits() == 0 {
            return Err(NetError::Rsa("modulus is zero".into()));
        }
        Ok(key)
    }

    pub fn modulus(&self) -> &BigUint {
        &self.modulus
    }

    /// Computes `plain^e mod n`. The result is big-endian with a leading
    /// zero byte whenever the top bit is set, so peers reading it as a
    /// signed integer see a positive value.
    pub fn encrypt(&self, plain: &[u8]) -> Result<Vec<u8>, LoginError> {
        if self.modulus.bits() == 0 {
            return Err(LoginError::InvalidRsaKey);
        }
        let message = BigUint::from_bytes_be(plain);
        if message >= self.modulus {
            return Err(LoginError::CredentialsTooLong);
        }
        let mut cipher = message.modpow(&self.exponent, &self.modulus).to_bytes_be();
        if cipher.first().is_some_and(|&b| b & 0x80 != 0) {
            cipher.insert(0, 0);
        }
        if cipher.len() > usize::from(u8::MAX) {
            return Err(LoginError::InvalidRsaKey);
        }
        Ok(cipher)
    }
}
