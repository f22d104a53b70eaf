use thiserror::Error;

use crate::{decode::ErrorCategory, item::info::CustomerIdError};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodeError {
    #[error("{field} contains the non-ASCII character {character:?}")]
    NonAscii {
        field: &'static str,
        character: char,
    },

    #[error("{field} is {len} long, which exceeds the maximum of {max}")]
    TooLong {
        field: &'static str,
        len: usize,
        max: usize,
    },

    #[error("{field} does not fit in signed tenths (-3276.8 to 3276.7)")]
    OutOfRange { field: &'static str },

    #[error("Device id contains the non-digit character {0:?}")]
    InvalidDeviceId(char),

    #[error(transparent)]
    InvalidCustomerId(#[from] CustomerIdError),
}

impl EncodeError {
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::NonAscii { .. } | Self::InvalidDeviceId(_) | Self::InvalidCustomerId(_) => {
                ErrorCategory::InvalidEncoding
            }
            Self::TooLong { .. } | Self::OutOfRange { .. } => ErrorCategory::ConstraintViolation,
        }
    }
}

/// A type that can be encoded into a sequence of bytes.
///
/// Encoding appends to the provided buffer. If an error is returned, the
/// buffer has been restored to the length it had before the call.
pub trait Encode {
    /// Appends the wire form of this value to `out`.
    fn encode(&self, out: &mut Vec<u8>) -> Result<(), EncodeError>;

    /// Encodes this value into a freshly allocated buffer.
    fn to_bytes(&self) -> Result<Vec<u8>, EncodeError> {
        let mut out = Vec::new();
        self.encode(&mut out)?;
        Ok(out)
    }
}

macro_rules! impl_encode_for_primitive {
    ($($t:ty),*) => {
        $(
            impl Encode for $t {
                fn encode(&self, out: &mut Vec<u8>) -> Result<(), EncodeError> {
                    out.extend_from_slice(&self.to_be_bytes());
                    Ok(())
                }
            }
        )*
    };
}

impl_encode_for_primitive!(u8, u16, u32, u64, i8, i16, i32, i64, f32);

impl Encode for () {
    fn encode(&self, _out: &mut Vec<u8>) -> Result<(), EncodeError> {
        Ok(())
    }
}

impl Encode for [u8] {
    fn encode(&self, out: &mut Vec<u8>) -> Result<(), EncodeError> {
        out.extend_from_slice(self);
        Ok(())
    }
}

impl<const N: usize> Encode for [u8; N] {
    fn encode(&self, out: &mut Vec<u8>) -> Result<(), EncodeError> {
        self.as_slice().encode(out)
    }
}

impl<T: Encode + ?Sized> Encode for &T {
    fn encode(&self, out: &mut Vec<u8>) -> Result<(), EncodeError> {
        (**self).encode(out)
    }
}

/// Writes a sequence of values into a buffer, undoing everything written so
/// far if any of them fails.
pub struct MessageEncoder<'a> {
    out: &'a mut Vec<u8>,
    start: usize,
}

impl<'a> MessageEncoder<'a> {
    pub fn new(out: &'a mut Vec<u8>) -> Self {
        let start = out.len();
        Self { out, start }
    }

    /// Appends `value`, rolling the whole message back on failure.
    pub fn write<T: Encode + ?Sized>(&mut self, value: &T) -> Result<&mut Self, EncodeError> {
        if let Err(err) = value.encode(&mut *self.out) {
            self.out.truncate(self.start);
            return Err(err);
        }
        Ok(self)
    }

    /// Number of bytes written through this encoder.
    pub fn written(&self) -> usize {
        self.out.len() - self.start
    }

    /// The underlying buffer, for nested encoders that append directly.
    pub(crate) fn buffer(&mut self) -> &mut Vec<u8> {
        &mut *self.out
    }

    /// Overwrites bytes at `offset` (relative to where this encoder started).
    pub(crate) fn patch(&mut self, offset: usize, bytes: &[u8]) {
        let at = self.start + offset;
        self.out[at..at + bytes.len()].copy_from_slice(bytes);
    }

    /// Discards everything written through this encoder.
    pub(crate) fn abort(self) {
        self.out.truncate(self.start);
    }
}
