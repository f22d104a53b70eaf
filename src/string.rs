use core::{fmt, ops::Deref, str::FromStr};

use log::warn;

use crate::{
    decode::{Decode, DecodeError, DecodeErrorKind},
    encode::{Encode, EncodeError, MessageEncoder},
    reader::SequentialReader,
};

/// Longest string or byte run a 1-byte length prefix can describe.
pub const MAX_VAR_LEN: usize = u8::MAX as usize;

/// A short ASCII string sent with a 1-byte length prefix.
///
/// # Invariants
///
/// - Contents are ASCII.
/// - The string is at most [`MAX_VAR_LEN`] bytes long.
///
/// # Encoding
///
/// | Field   | Size | Description |
/// |---------|------|-------------|
/// | `len`   | 1    | Number of bytes that follow. |
/// | `bytes` | len  | ASCII characters. |
#[derive(Debug, Default, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VarString(String);

impl VarString {
    /// Creates a [`VarString`], truncating anything past [`MAX_VAR_LEN`] bytes.
    ///
    /// Truncation is not an error: it is logged and the first 255 characters
    /// are kept. Use [`VarString::strict`] to reject long input instead.
    ///
    /// # Errors
    ///
    /// Returns [`EncodeError::NonAscii`] if the input has a non-ASCII character.
    pub fn new(s: impl AsRef<str>) -> Result<Self, EncodeError> {
        let s = s.as_ref();
        check_ascii("string", s)?;

        if s.len() > MAX_VAR_LEN {
            warn!(
                "Truncating {}-byte string to {MAX_VAR_LEN} bytes",
                s.len()
            );
        }

        // ASCII, so any byte offset is a char boundary.
        Ok(Self(s[..s.len().min(MAX_VAR_LEN)].to_owned()))
    }

    /// Creates a [`VarString`], refusing input that would need truncating.
    ///
    /// # Errors
    ///
    /// Returns [`EncodeError::NonAscii`] for non-ASCII input and
    /// [`EncodeError::TooLong`] for input over [`MAX_VAR_LEN`] bytes.
    pub fn strict(s: impl AsRef<str>) -> Result<Self, EncodeError> {
        let s = s.as_ref();
        if s.len() > MAX_VAR_LEN {
            return Err(EncodeError::TooLong {
                field: "string",
                len: s.len(),
                max: MAX_VAR_LEN,
            });
        }
        Self::new(s)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

pub(crate) fn check_ascii(field: &'static str, s: &str) -> Result<(), EncodeError> {
    match s.chars().find(|c| !c.is_ascii()) {
        Some(character) => Err(EncodeError::NonAscii { field, character }),
        None => Ok(()),
    }
}

impl Deref for VarString {
    type Target = str;

    fn deref(&self) -> &str {
        self.as_str()
    }
}

impl AsRef<str> for VarString {
    fn as_ref(&self) -> &str {
        self
    }
}

impl PartialEq<str> for VarString {
    fn eq(&self, other: &str) -> bool {
        self.as_str() == other
    }
}

impl PartialEq<&str> for VarString {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}

impl TryFrom<&str> for VarString {
    type Error = EncodeError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<String> for VarString {
    type Error = EncodeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl FromStr for VarString {
    type Err = EncodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl fmt::Display for VarString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl Encode for VarString {
    fn encode(&self, out: &mut Vec<u8>) -> Result<(), EncodeError> {
        MessageEncoder::new(out)
            .write(&(self.0.len() as u8))?
            .write(self.0.as_bytes())?;
        Ok(())
    }
}

impl Decode for VarString {
    fn decode(reader: &mut SequentialReader<'_>) -> Result<Self, DecodeError> {
        reader.read_atomic(|reader| {
            let len = reader.read_u8()? as usize;
            let start = reader.position();
            let bytes = reader.take::<Self>(len)?;

            if let Some(i) = bytes.iter().position(|b| !b.is_ascii()) {
                return Err(DecodeError::new::<Self>(DecodeErrorKind::NonAscii {
                    offset: start + i,
                    value: bytes[i],
                }));
            }

            // Every byte is ASCII, so this is valid UTF-8.
            Ok(Self(bytes.iter().map(|&b| b as char).collect()))
        })
    }
}

/// Raw bytes sent with a 1-byte length prefix.
///
/// The byte counterpart of [`VarString`], used for opaque identifiers.
#[derive(Debug, Default, Clone, PartialEq, Eq, Hash)]
pub struct VarBytes(Vec<u8>);

impl VarBytes {
    /// Creates a [`VarBytes`], truncating anything past [`MAX_VAR_LEN`] bytes.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        let mut bytes = bytes.into();
        if bytes.len() > MAX_VAR_LEN {
            warn!(
                "Truncating {}-byte value to {MAX_VAR_LEN} bytes",
                bytes.len()
            );
            bytes.truncate(MAX_VAR_LEN);
        }
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.0
    }
}

impl Deref for VarBytes {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.0
    }
}

impl Encode for VarBytes {
    fn encode(&self, out: &mut Vec<u8>) -> Result<(), EncodeError> {
        MessageEncoder::new(out)
            .write(&(self.0.len() as u8))?
            .write(self.0.as_slice())?;
        Ok(())
    }
}

impl Decode for VarBytes {
    fn decode(reader: &mut SequentialReader<'_>) -> Result<Self, DecodeError> {
        reader.read_atomic(|reader| {
            let len = reader.read_u8()? as usize;
            Ok(Self(reader.take::<Self>(len)?.to_vec()))
        })
    }
}
