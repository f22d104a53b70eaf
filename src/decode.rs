use thiserror::Error;

use crate::reader::SequentialReader;

/// Broad classification shared by encode and decode failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Fewer bytes remained than a read required.
    TruncatedInput,
    /// Bytes or characters that are not valid for the field (non-hex, non-ASCII, bad BCD).
    InvalidEncoding,
    /// A discriminant (location subtype, item type, command) nobody registered.
    UnknownVariant,
    /// A value that breaks a protocol limit or a required-field rule.
    ConstraintViolation,
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub struct DecodeError {
    kind: DecodeErrorKind,
    type_name: &'static str,
}

impl DecodeError {
    pub fn new<T: ?Sized>(kind: DecodeErrorKind) -> Self {
        Self {
            kind,
            type_name: core::any::type_name::<T>(),
        }
    }

    pub const fn kind(&self) -> DecodeErrorKind {
        self.kind
    }

    /// Name of the Rust type that was being decoded when the failure happened.
    pub const fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub const fn category(&self) -> ErrorCategory {
        self.kind.category()
    }
}

impl core::fmt::Display for DecodeError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "Failed to decode {}: {}", self.type_name, self.kind)
    }
}

#[derive(Error, Clone, Copy, Debug, PartialEq, Eq)]
pub enum DecodeErrorKind {
    #[error("Input ended early. Needed {needed} bytes, but only {remaining} remain.")]
    TruncatedInput { needed: usize, remaining: usize },

    #[error("Byte {value:#04x} at offset {offset} is not ASCII.")]
    NonAscii { offset: usize, value: u8 },

    #[error("Nibble {nibble:#x} is not a decimal digit.")]
    InvalidBcd { nibble: u8 },

    #[error("Unknown {name} {value:#04x}.")]
    UnknownVariant { name: &'static str, value: u8 },

    #[error("{0}.")]
    ConstraintViolation(&'static str),
}

impl DecodeErrorKind {
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::TruncatedInput { .. } => ErrorCategory::TruncatedInput,
            Self::NonAscii { .. } | Self::InvalidBcd { .. } => ErrorCategory::InvalidEncoding,
            Self::UnknownVariant { .. } => ErrorCategory::UnknownVariant,
            Self::ConstraintViolation(_) => ErrorCategory::ConstraintViolation,
        }
    }
}

/// A type that can be reconstructed from the front of a [`SequentialReader`].
///
/// On success the reader is advanced past the bytes that were consumed. On
/// failure the reader is left where it was whenever the implementation goes
/// through [`SequentialReader::read_atomic`], which every type in this crate does.
pub trait Decode {
    /// Attempts to decode `Self` from the reader's current position.
    ///
    /// # Errors
    ///
    /// Returns a [`DecodeError`] if the input is malformed or too short to
    /// hold a complete value of this type.
    fn decode(reader: &mut SequentialReader<'_>) -> Result<Self, DecodeError>
    where
        Self: Sized;
}

/// A type that is decoded given the number of elements it holds, which the
/// caller read from somewhere else (usually a count byte).
pub trait DecodeWithLength {
    fn decode_with_len(reader: &mut SequentialReader<'_>, len: usize) -> Result<Self, DecodeError>
    where
        Self: Sized;
}

impl<T: Decode> DecodeWithLength for Vec<T> {
    fn decode_with_len(reader: &mut SequentialReader<'_>, len: usize) -> Result<Self, DecodeError> {
        let mut vec = Vec::with_capacity(len);
        for _ in 0..len {
            vec.push(T::decode(reader)?);
        }
        Ok(vec)
    }
}

impl Decode for () {
    fn decode(_reader: &mut SequentialReader<'_>) -> Result<Self, DecodeError> {
        Ok(())
    }
}

// Everything on the wire is big-endian.
macro_rules! impl_decode_for_primitive {
    ($($t:ty),*) => {
        $(
            impl Decode for $t {
                fn decode(reader: &mut SequentialReader<'_>) -> Result<Self, DecodeError> {
                    Ok(Self::from_be_bytes(
                        reader.take_array::<$t, { core::mem::size_of::<$t>() }>()?,
                    ))
                }
            }
        )*
    };
}

impl_decode_for_primitive!(u8, u16, u32, u64, i8, i16, i32, i64, f32);

impl<const N: usize> Decode for [u8; N] {
    fn decode(reader: &mut SequentialReader<'_>) -> Result<Self, DecodeError> {
        reader.take_array::<Self, N>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primitives_are_big_endian() {
        const DATA: [u8; 7] = [0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07];
        let mut reader = SequentialReader::new(&DATA);

        assert_eq!(u8::decode(&mut reader), Ok(0x01));
        assert_eq!(u16::decode(&mut reader), Ok(0x0203));
        assert_eq!(u32::decode(&mut reader), Ok(0x0405_0607));
        assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn short_primitive_reports_type_and_sizes() {
        let mut reader = SequentialReader::new(&[0xAB]);
        let err = u32::decode(&mut reader).unwrap_err();

        assert_eq!(
            err.kind(),
            DecodeErrorKind::TruncatedInput {
                needed: 4,
                remaining: 1
            }
        );
        assert_eq!(err.type_name(), "u32");
        assert_eq!(err.category(), ErrorCategory::TruncatedInput);
        // Nothing was consumed.
        assert_eq!(reader.remaining(), 1);
    }

    #[test]
    fn vec_with_len() {
        let mut reader = SequentialReader::new(&[0x00, 0x01, 0x00, 0x02, 0xFF]);
        let values = Vec::<u16>::decode_with_len(&mut reader, 2).unwrap();

        assert_eq!(values, [1, 2]);
        assert_eq!(reader.remaining(), 1);
    }
}
