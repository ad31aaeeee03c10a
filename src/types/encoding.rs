//! Binary encoding and decoding for compiled programs and device images.
//!
//! Every value has exactly one encoding, so two programs with the same instructions produce the
//! same bytes (and the same digest).
//!
//! # Binary Format
//!
//! - Integers and `f32`: little-endian, fixed-width
//! - `usize`: encoded as `u64`
//! - `Vec<T>`/`String`: 8-byte length prefix followed by elements
//! - `Option<T>`: 1-byte tag (0 = None, 1 = Some) followed by the value if present
//! - Arrays `[T; N]`: elements back to back without a length prefix
//!
//! Structs and enums get their impls from `#[derive(BinaryCodec)]`.

use tinycpu_derive::Error;

/// Sink for writing encoded bytes.
pub trait EncodeSink {
    /// Appends the given bytes to the sink.
    fn write(&mut self, bytes: &[u8]);
}

impl EncodeSink for Vec<u8> {
    fn write(&mut self, bytes: &[u8]) {
        self.extend_from_slice(bytes);
    }
}

/// Counts encoded bytes without storing them.
#[derive(Default)]
pub struct SizeCounter(usize);

impl SizeCounter {
    /// Total number of bytes seen so far.
    pub fn len(&self) -> usize {
        self.0
    }
}

impl EncodeSink for SizeCounter {
    fn write(&mut self, bytes: &[u8]) {
        self.0 += bytes.len();
    }
}

/// Types that can be serialized to the binary format.
pub trait Encode {
    /// Writes the binary representation to the given sink.
    fn encode<S: EncodeSink>(&self, out: &mut S);

    /// Serializes into a new buffer allocated with the exact encoded size.
    fn to_bytes(&self) -> Vec<u8> {
        let mut counter = SizeCounter::default();
        self.encode(&mut counter);

        let mut out = Vec::with_capacity(counter.len());
        self.encode(&mut out);
        out
    }
}

/// Errors that can occur during decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Input ended before the expected data was read.
    #[error("unexpected end of input")]
    UnexpectedEof,
    /// Bytes do not form a valid value of the target type.
    #[error("invalid value")]
    InvalidValue,
    /// Length prefix exceeds the maximum allowed size.
    #[error("length prefix too large")]
    LengthOverflow,
}

/// Types that can be deserialized from the binary format.
pub trait Decode: Sized {
    /// Decodes one value, advancing `input` past the consumed bytes.
    fn decode(input: &mut &[u8]) -> Result<Self, DecodeError>;

    /// Decodes a value that must span the whole of `data`.
    fn from_bytes(data: &[u8]) -> Result<Self, DecodeError> {
        let mut input = data;
        let value = Self::decode(&mut input)?;
        if !input.is_empty() {
            return Err(DecodeError::InvalidValue);
        }
        Ok(value)
    }
}

/// Splits `n` bytes off the front of `input`.
fn take<'a>(input: &mut &'a [u8], n: usize) -> Result<&'a [u8], DecodeError> {
    if input.len() < n {
        return Err(DecodeError::UnexpectedEof);
    }
    let (head, rest) = input.split_at(n);
    *input = rest;
    Ok(head)
}

/// Reads a fixed-size array, the building block of every little-endian scalar.
fn take_array<const N: usize>(input: &mut &[u8]) -> Result<[u8; N], DecodeError> {
    let mut buf = [0u8; N];
    buf.copy_from_slice(take(input, N)?);
    Ok(buf)
}

macro_rules! impl_le {
    ($($t:ty),*) => {
        $(
            impl Encode for $t {
                fn encode<S: EncodeSink>(&self, out: &mut S) {
                    out.write(&self.to_le_bytes());
                }
            }

            impl Decode for $t {
                fn decode(input: &mut &[u8]) -> Result<Self, DecodeError> {
                    Ok(<$t>::from_le_bytes(take_array(input)?))
                }
            }
        )*
    };
}

impl_le!(u8, u16, u32, u64, f32);

impl Encode for usize {
    fn encode<S: EncodeSink>(&self, out: &mut S) {
        (*self as u64).encode(out);
    }
}

impl Decode for usize {
    fn decode(input: &mut &[u8]) -> Result<Self, DecodeError> {
        usize::try_from(u64::decode(input)?).map_err(|_| DecodeError::LengthOverflow)
    }
}

/// Upper bound on decoded collection lengths, so corrupt prefixes cannot exhaust memory.
const MAX_VEC_LEN: usize = 1 << 20;

impl<T: Encode> Encode for Vec<T> {
    fn encode<S: EncodeSink>(&self, out: &mut S) {
        self.len().encode(out);
        for item in self {
            item.encode(out);
        }
    }
}

impl<T: Decode> Decode for Vec<T> {
    fn decode(input: &mut &[u8]) -> Result<Self, DecodeError> {
        let len = usize::decode(input)?;
        if len > MAX_VEC_LEN {
            return Err(DecodeError::LengthOverflow);
        }
        // Every element takes at least one byte, so a length beyond the input is already corrupt.
        let mut items = Vec::with_capacity(len.min(input.len()));
        for _ in 0..len {
            items.push(T::decode(input)?);
        }
        Ok(items)
    }
}

impl Encode for String {
    fn encode<S: EncodeSink>(&self, out: &mut S) {
        self.as_str().encode(out);
    }
}

impl Encode for str {
    fn encode<S: EncodeSink>(&self, out: &mut S) {
        self.len().encode(out);
        out.write(self.as_bytes());
    }
}

impl Decode for String {
    fn decode(input: &mut &[u8]) -> Result<Self, DecodeError> {
        let len = usize::decode(input)?;
        if len > MAX_VEC_LEN {
            return Err(DecodeError::LengthOverflow);
        }
        String::from_utf8(take(input, len)?.to_vec()).map_err(|_| DecodeError::InvalidValue)
    }
}

impl<T: Encode> Encode for Option<T> {
    fn encode<S: EncodeSink>(&self, out: &mut S) {
        match self {
            None => 0u8.encode(out),
            Some(v) => {
                1u8.encode(out);
                v.encode(out);
            }
        }
    }
}

impl<T: Decode> Decode for Option<T> {
    fn decode(input: &mut &[u8]) -> Result<Self, DecodeError> {
        match u8::decode(input)? {
            0 => Ok(None),
            1 => Ok(Some(T::decode(input)?)),
            _ => Err(DecodeError::InvalidValue),
        }
    }
}

impl<T: Encode, const N: usize> Encode for [T; N] {
    fn encode<S: EncodeSink>(&self, out: &mut S) {
        for item in self {
            item.encode(out);
        }
    }
}

impl<const N: usize> Decode for [u8; N] {
    fn decode(input: &mut &[u8]) -> Result<Self, DecodeError> {
        take_array(input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_counter_matches_encoded_length() {
        let data: Vec<u16> = vec![1, 2, 3];
        let mut counter = SizeCounter::default();
        data.encode(&mut counter);
        assert_eq!(counter.len(), 8 + 3 * 2);
        assert_eq!(data.to_bytes().len(), counter.len());
    }

    #[test]
    fn u32_little_endian() {
        let bytes = 0x1234_5678u32.to_bytes();
        assert_eq!(bytes, [0x78, 0x56, 0x34, 0x12]);
    }

    #[test]
    fn f32_keeps_exact_bits() {
        for v in [0.0f32, -0.0, 1.5, -2.25, f32::MIN_POSITIVE, f32::MAX] {
            let decoded = f32::from_bytes(&v.to_bytes()).unwrap();
            assert_eq!(decoded.to_bits(), v.to_bits());
        }
    }

    #[test]
    fn usize_is_eight_bytes() {
        assert_eq!(42usize.to_bytes().len(), 8);
    }

    #[test]
    fn string_rejects_invalid_utf8() {
        let mut bytes = 2usize.to_bytes();
        bytes.extend_from_slice(&[0xC3, 0x28]);
        assert!(matches!(String::from_bytes(&bytes), Err(DecodeError::InvalidValue)));
    }

    #[test]
    fn vec_length_overflow_rejected() {
        let bytes = (MAX_VEC_LEN + 1).to_bytes();
        assert!(matches!(
            Vec::<u8>::from_bytes(&bytes),
            Err(DecodeError::LengthOverflow)
        ));
    }

    #[test]
    fn truncated_input_is_eof() {
        let mut bytes = 3usize.to_bytes();
        bytes.push(1);
        assert!(matches!(
            Vec::<u8>::from_bytes(&bytes),
            Err(DecodeError::UnexpectedEof)
        ));
    }

    #[test]
    fn option_tags() {
        assert_eq!(None::<u8>.to_bytes(), [0]);
        assert_eq!(Some(7u8).to_bytes(), [1, 7]);
        assert!(matches!(Option::<u8>::from_bytes(&[9]), Err(DecodeError::InvalidValue)));
    }

    #[test]
    fn from_bytes_rejects_trailing_bytes() {
        assert!(matches!(u8::from_bytes(&[1, 2]), Err(DecodeError::InvalidValue)));
    }
}
