//! # Canonical Encoding
//!
//! Every hash on the chain is a hash of bytes, so the bytes must be the
//! same everywhere. This module defines them, one explicit rule per shape:
//!
//! | shape                  | encoding                                  |
//! |------------------------|-------------------------------------------|
//! | `u8`, `u32`, `u64`     | fixed width, little-endian                |
//! | `[u8; N]`, `Digest`    | raw bytes, no prefix                      |
//! | `Vec<T>`               | `u32` LE element count, then each element |
//! | struct                 | fields in declaration order, no padding   |
//!
//! No versions, no field tags, no optional fields. Structs implement
//! [`Encode`] and [`Decode`] by hand next to their definitions, so the
//! layout is visible in the code rather than derived by a macro that could
//! change underneath us.
//!
//! bincode is still used for sled values; it simply never feeds a hash.

use thiserror::Error;

use crate::crypto::hash::Digest;
use crate::crypto::keys::{Address, Sig};
use crate::config::{ADDRESS_KEY_LENGTH, HASH_OUTPUT_LENGTH, SIGNATURE_LENGTH};

/// Malformed canonical bytes.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("unexpected end of input: needed {needed} more bytes at offset {offset}")]
    Truncated { offset: usize, needed: usize },

    #[error("{0} trailing bytes after value")]
    TrailingBytes(usize),

    #[error("sequence length {0} exceeds remaining input")]
    LengthOverflow(u32),
}

pub type Result<T> = std::result::Result<T, CodecError>;

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// Append the canonical encoding of `self` to a buffer.
pub trait Encode {
    fn encode_to(&self, out: &mut Vec<u8>);

    fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.encode_to(&mut out);
        out
    }
}

/// Read a value back from canonical bytes.
pub trait Decode: Sized {
    fn decode_from(reader: &mut Reader<'_>) -> Result<Self>;

    /// Decode exactly one value; leftover bytes are an error.
    fn decode(bytes: &[u8]) -> Result<Self> {
        let mut reader = Reader::new(bytes);
        let value = Self::decode_from(&mut reader)?;
        reader.finish()?;
        Ok(value)
    }
}

/// A cursor over canonical bytes.
pub struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.remaining() < n {
            return Err(CodecError::Truncated {
                offset: self.pos,
                needed: n - self.remaining(),
            });
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    pub fn take_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    pub fn finish(self) -> Result<()> {
        match self.remaining() {
            0 => Ok(()),
            n => Err(CodecError::TrailingBytes(n)),
        }
    }
}

// ---------------------------------------------------------------------------
// Primitives
// ---------------------------------------------------------------------------

impl Encode for u8 {
    fn encode_to(&self, out: &mut Vec<u8>) {
        out.push(*self);
    }
}

impl Decode for u8 {
    fn decode_from(reader: &mut Reader<'_>) -> Result<Self> {
        Ok(reader.take(1)?[0])
    }
}

impl Encode for u32 {
    fn encode_to(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.to_le_bytes());
    }
}

impl Decode for u32 {
    fn decode_from(reader: &mut Reader<'_>) -> Result<Self> {
        Ok(u32::from_le_bytes(reader.take_array()?))
    }
}

impl Encode for u64 {
    fn encode_to(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.to_le_bytes());
    }
}

impl Decode for u64 {
    fn decode_from(reader: &mut Reader<'_>) -> Result<Self> {
        Ok(u64::from_le_bytes(reader.take_array()?))
    }
}

impl Encode for Digest {
    fn encode_to(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(self.as_bytes());
    }
}

impl Decode for Digest {
    fn decode_from(reader: &mut Reader<'_>) -> Result<Self> {
        Ok(Digest(reader.take_array::<HASH_OUTPUT_LENGTH>()?))
    }
}

impl Encode for Address {
    fn encode_to(&self, out: &mut Vec<u8>) {
        out.push(self.version);
        out.extend_from_slice(&self.key);
    }
}

impl Decode for Address {
    fn decode_from(reader: &mut Reader<'_>) -> Result<Self> {
        let version = u8::decode_from(reader)?;
        let key = reader.take_array::<ADDRESS_KEY_LENGTH>()?;
        Ok(Address { version, key })
    }
}

impl Encode for Sig {
    fn encode_to(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(self.as_bytes());
    }
}

impl Decode for Sig {
    fn decode_from(reader: &mut Reader<'_>) -> Result<Self> {
        Ok(Sig::new(reader.take_array::<SIGNATURE_LENGTH>()?))
    }
}

impl<T: Encode> Encode for Vec<T> {
    fn encode_to(&self, out: &mut Vec<u8>) {
        self.as_slice().encode_to(out);
    }
}

impl<T: Encode> Encode for [T] {
    fn encode_to(&self, out: &mut Vec<u8>) {
        (self.len() as u32).encode_to(out);
        for item in self {
            item.encode_to(out);
        }
    }
}

impl<T: Decode> Decode for Vec<T> {
    fn decode_from(reader: &mut Reader<'_>) -> Result<Self> {
        let len = u32::decode_from(reader)?;
        // Every element is at least one byte, so a count larger than the
        // rest of the input is a lie. Refuse before allocating for it.
        if len as usize > reader.remaining() {
            return Err(CodecError::LengthOverflow(len));
        }
        let mut items = Vec::with_capacity(len as usize);
        for _ in 0..len {
            items.push(T::decode_from(reader)?);
        }
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integers_are_little_endian() {
        assert_eq!(0x0102_0304u32.encode(), vec![4, 3, 2, 1]);
        assert_eq!(1u64.encode(), vec![1, 0, 0, 0, 0, 0, 0, 0]);
        assert_eq!(u64::decode(&[0xff; 8]).unwrap(), u64::MAX);
    }

    #[test]
    fn vec_has_u32_count_prefix() {
        let v: Vec<u32> = vec![1, 2];
        assert_eq!(v.encode(), vec![2, 0, 0, 0, 1, 0, 0, 0, 2, 0, 0, 0]);
        assert_eq!(Vec::<u32>::new().encode(), vec![0, 0, 0, 0]);
    }

    #[test]
    fn digest_is_raw() {
        let d = Digest([9u8; 32]);
        assert_eq!(d.encode(), vec![9u8; 32]);
    }

    #[test]
    fn address_is_version_then_key() {
        let addr = Address {
            version: 0,
            key: [0xAA; 20],
        };
        let bytes = addr.encode();
        assert_eq!(bytes.len(), 21);
        assert_eq!(bytes[0], 0);
        assert_eq!(Address::decode(&bytes).unwrap(), addr);
    }

    #[test]
    fn trailing_bytes_rejected() {
        assert_eq!(
            u32::decode(&[1, 0, 0, 0, 0]),
            Err(CodecError::TrailingBytes(1))
        );
    }

    #[test]
    fn truncated_input_rejected() {
        assert!(matches!(
            u64::decode(&[1, 2, 3]),
            Err(CodecError::Truncated { offset: 0, needed: 5 })
        ));
    }

    #[test]
    fn absurd_length_prefix_rejected() {
        let bytes = [0xff, 0xff, 0xff, 0xff, 0x01];
        assert_eq!(
            Vec::<u8>::decode(&bytes),
            Err(CodecError::LengthOverflow(u32::MAX))
        );
    }
}
