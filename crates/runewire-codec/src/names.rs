//! Base-37 packing of player names into a 64-bit integer.
//!
//! Alphabet: `_` (and every unsupported char) = 0, `a..z` = 1..26,
//! `0..9` = 27..36. Names are truncated to 12 characters.

const ALPHABET: &[u8; 37] = b"_abcdefghijklmnopqrstuvwxyz0123456789";
const MAX_NAME_LEN: usize = 12;

/// Largest value produced by a 12-character name.
const MAX_ENCODED: i64 = 0x5b5b_57f8_a98a_5dd1;

/// Packs `name` into base 37. Trailing underscores do not contribute.
pub fn encode_name(name: &str) -> i64 {
    let mut value: i64 = 0;
    for ch in name.chars().take(MAX_NAME_LEN) {
        value *= 37;
        value += match ch {
            'a'..='z' => 1 + (ch as i64 - 'a' as i64),
            'A'..='Z' => 1 + (ch as i64 - 'A' as i64),
            '0'..='9' => 27 + (ch as i64 - '0' as i64),
            _ => 0,
        };
    }
    while value % 37 == 0 && value != 0 {
        value /= 37;
    }
    value
}

/// Unpacks a base-37 name. Returns `None` for values no name encodes to.
pub fn decode_name(mut value: i64) -> Option<String> {
    if value <= 0 || value >= MAX_ENCODED || value % 37 == 0 {
        return None;
    }
    let mut reversed = Vec::with_capacity(MAX_NAME_LEN);
    while value != 0 {
        reversed.push(ALPHABET[(value % 37) as usize]);
        value /= 37;
    }
    Some(reversed.iter().rev().map(|&b| char::from(b)).collect())
}

/// Login handshake byte derived from a username.
pub fn name_hash(name: &str) -> u8 {
    ((encode_name(name) >> 16) & 31) as u8
}

/// Formats a decoded name for display: underscores become spaces and each
/// word starts upper-case.
pub fn display_name(name: &str) -> String {
    let mut formatted = String::with_capacity(name.len());
    let mut capitalize = true;
    for ch in name.chars() {
        if ch == '_' {
            formatted.push(' ');
            capitalize = true;
        } else if capitalize {
            formatted.extend(ch.to_uppercase());
            capitalize = false;
        } else {
            formatted.push(ch);
        }
    }
    formatted
}
