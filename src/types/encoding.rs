//! Binary encoding and decoding traits for the program file format.
//!
//! All encoded data uses little-endian byte order so a program written on one
//! host loads on any other.
//!
//! # Binary Format
//!
//! - Integers: little-endian, fixed-width
//! - Records (`#[derive(BinaryCodec)]`): fields back to back in declaration
//!   order, no length prefix, no padding
//!
//! # Example
//!
//! ```ignore
//! use crate::types::encoding::{Decode, Encode};
//!
//! let value: i64 = -42;
//! let bytes = value.to_bytes();
//! assert_eq!(bytes.len(), 8);
//! assert_eq!(i64::from_bytes(&bytes).unwrap(), value);
//! ```

/// Sink for writing encoded bytes.
pub trait EncodeSink {
    /// Writes the given bytes to the sink.
    fn write(&mut self, bytes: &[u8]);
}

/// Counter for computing encoded size without allocating memory.
///
/// Used by [`Encode::to_bytes`] to pre-allocate exact capacity before encoding.
pub struct SizeCounter {
    len: usize,
}

impl SizeCounter {
    /// Creates a new counter initialized to zero.
    pub fn new() -> Self {
        Self { len: 0 }
    }

    /// Returns the total number of bytes counted.
    pub fn len(&self) -> usize {
        self.len
    }
}

impl Default for SizeCounter {
    fn default() -> Self {
        Self::new()
    }
}

impl EncodeSink for SizeCounter {
    fn write(&mut self, bytes: &[u8]) {
        self.len += bytes.len();
    }
}

impl EncodeSink for Vec<u8> {
    fn write(&mut self, bytes: &[u8]) {
        self.extend_from_slice(bytes);
    }
}

/// Trait for types that can be serialized to binary format.
pub trait Encode {
    /// Writes the binary representation to the given sink.
    fn encode<S: EncodeSink>(&self, out: &mut S);

    /// Returns the number of bytes [`encode`](Encode::encode) would write.
    fn encoded_len(&self) -> usize {
        let mut counter = SizeCounter::new();
        self.encode(&mut counter);
        counter.len()
    }

    /// Serializes to a new byte buffer with exact capacity.
    fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.encoded_len());
        self.encode(&mut out);
        out
    }
}

/// Errors that can occur during decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    /// Input ended before expected data was read.
    UnexpectedEof,
    /// Data does not represent a valid value for the target type.
    InvalidValue,
}

impl DecodeError {
    pub const fn as_str(&self) -> &'static str {
        match self {
            DecodeError::UnexpectedEof => "unexpected end of input",
            DecodeError::InvalidValue => "invalid value",
        }
    }
}

/// Trait for types that can be deserialized from binary format.
pub trait Decode: Sized {
    /// Reads and decodes a value from the input buffer.
    ///
    /// Advances the input slice past the consumed bytes.
    fn decode(input: &mut &[u8]) -> Result<Self, DecodeError>;

    /// Decodes a value from a byte slice, requiring all bytes to be consumed.
    ///
    /// Returns `InvalidValue` if trailing bytes remain after decoding.
    fn from_bytes(data: &[u8]) -> Result<Self, DecodeError> {
        let mut input = data;
        let value = Self::decode(&mut input)?;

        if !input.is_empty() {
            return Err(DecodeError::InvalidValue);
        }

        Ok(value)
    }
}

/// Reads exactly `N` bytes from the input, advancing the slice.
fn read_array<const N: usize>(input: &mut &[u8]) -> Result<[u8; N], DecodeError> {
    let Some((head, rest)) = input.split_first_chunk::<N>() else {
        return Err(DecodeError::UnexpectedEof);
    };
    *input = rest;
    Ok(*head)
}

macro_rules! impl_int {
    ($($t:ty),*) => {
        $(
            impl Encode for $t {
                fn encode<S: EncodeSink>(&self, out: &mut S) {
                    out.write(&self.to_le_bytes());
                }
            }

            impl Decode for $t {
                fn decode(input: &mut &[u8]) -> Result<Self, DecodeError> {
                    read_array(input).map(<$t>::from_le_bytes)
                }
            }
        )*
    };
}

impl_int!(u32, i64);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integers_are_little_endian() {
        assert_eq!(0x0102_0304u32.to_bytes(), vec![0x04, 0x03, 0x02, 0x01]);
        assert_eq!((-2i64).to_bytes(), vec![0xFE, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF]);
    }

    #[test]
    fn encoded_len_matches_width() {
        assert_eq!(7u32.encoded_len(), 4);
        assert_eq!(i64::MIN.encoded_len(), 8);
    }

    #[test]
    fn decode_advances_input() {
        let bytes = [1, 0, 0, 0, 2, 0, 0, 0];
        let mut input = &bytes[..];
        assert_eq!(u32::decode(&mut input).unwrap(), 1);
        assert_eq!(input.len(), 4);
        assert_eq!(u32::decode(&mut input).unwrap(), 2);
        assert!(input.is_empty());
    }

    #[test]
    fn decode_short_input_is_eof() {
        let mut input: &[u8] = &[0xFF; 7];
        assert_eq!(i64::decode(&mut input), Err(DecodeError::UnexpectedEof));
        // A failed read leaves the input untouched.
        assert_eq!(input.len(), 7);
    }

    #[test]
    fn from_bytes_rejects_trailing_bytes() {
        assert_eq!(u32::from_bytes(&[0, 0, 0, 0, 9]), Err(DecodeError::InvalidValue));
        assert_eq!(u32::from_bytes(&[9, 0, 0, 0]), Ok(9));
    }
}
