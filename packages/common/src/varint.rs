//! Compact, order-preserving text encoding for 64-bit ids.
//!
//! Values below 16 are a single symbol. Larger values start with a prefix
//! symbol that says how many 5-bit groups follow, so shorter strings always
//! sort before longer ones and the encoding is prefix-free.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

const BITS: u32 = 5;
const ALPHABET: &[u8; 32] = b"0123456789abcdefghjkmnpqrstvwxyz";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VarintError {
    #[error("varint: no input")]
    NoInput,
    #[error("varint: invalid length")]
    InvalidLength,
    #[error("varint: invalid symbol")]
    InvalidSymbol,
    #[error("varint: eof")]
    Eof,
    #[error("varint: overflow")]
    Overflow,
    #[error("varint: excess input")]
    ExcessInput,
}

/// A signed 64-bit id in its text form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Varint(pub i64);

/// Value of a symbol, case-insensitive. `None` for symbols outside the alphabet.
fn symbol_value(c: u8) -> Option<u64> {
    let c = c.to_ascii_lowercase();
    ALPHABET.iter().position(|&a| a == c).map(|p| p as u64)
}

/// Total encoded length (prefix included) announced by a leading symbol.
fn encoded_len(prefix: u8) -> Option<usize> {
    let v = symbol_value(prefix)?;
    if v < 16 { Some(1) } else { Some((v - 16) as usize + 2) }
}

/// Offset added to the decoded groups for a prefix announcing `groups` groups.
fn prefix_offset(groups: u32) -> u64 {
    // 16 + 32 + 32^2 + ... + 32^(groups-1)
    let mut offset = 16u64;
    for i in 1..groups {
        offset = offset.wrapping_add(1u64 << (BITS * i));
    }
    offset
}

fn max_encoding() -> Vec<u8> {
    Varint(-1).encode_bytes()
}

impl Varint {
    pub fn encode_bytes(self) -> Vec<u8> {
        let mut n = self.0 as u64;
        if n < 0x10 {
            return vec![ALPHABET[n as usize]];
        }
        n -= 0x10;

        let mut groups: usize = 1;
        let mut shift = BITS;
        while shift < 64 {
            let group_max = 1u64 << shift;
            if n >= group_max {
                n -= group_max;
                groups += 1;
                shift += BITS;
            } else {
                break;
            }
        }

        let mut raw = Vec::with_capacity(groups + 1);
        raw.push(ALPHABET[groups + 0x10 - 1]);
        for i in (0..groups).rev() {
            let sym = (n >> (BITS as usize * i)) & 0x1F;
            raw.push(ALPHABET[sym as usize]);
        }
        raw
    }

    pub fn encode(self) -> String {
        // The alphabet is ASCII.
        self.encode_bytes().into_iter().map(char::from).collect()
    }

    /// Decode a varint from the start of `raw`, returning it and the number of bytes consumed.
    pub fn decode(raw: &[u8]) -> Result<(Varint, usize), VarintError> {
        let first = *raw.first().ok_or(VarintError::NoInput)?;
        let len = encoded_len(first).ok_or(VarintError::InvalidLength)?;
        if len > raw.len() {
            return Err(VarintError::Eof);
        }
        if len > max_encoding().len() {
            return Err(VarintError::Overflow);
        }
        let head = raw[..len].to_ascii_lowercase();
        let max = max_encoding();
        if len == max.len() && head.as_slice() > max.as_slice() {
            return Err(VarintError::Overflow);
        }

        if len == 1 {
            let v = symbol_value(first).ok_or(VarintError::InvalidSymbol)?;
            return Ok((Varint(v as i64), 1));
        }

        let mut num: u64 = 0;
        for &c in &head[1..] {
            let v = symbol_value(c).ok_or(VarintError::InvalidSymbol)?;
            num = (num << BITS).wrapping_add(v);
        }
        let value = num.wrapping_add(prefix_offset((len - 1) as u32));
        Ok((Varint(value as i64), len))
    }

    /// Decode a string that must contain exactly one varint.
    pub fn decode_all(raw: &str) -> Result<Varint, VarintError> {
        let (v, n) = Self::decode(raw.as_bytes())?;
        if n != raw.len() {
            return Err(VarintError::ExcessInput);
        }
        Ok(v)
    }
}

impl From<i64> for Varint {
    fn from(v: i64) -> Self {
        Varint(v)
    }
}

impl fmt::Display for Varint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.encode(), self.0)
    }
}

impl FromStr for Varint {
    type Err = VarintError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Varint::decode_all(s)
    }
}
