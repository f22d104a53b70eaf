//! Identity and configuration details a device reports about itself.

use core::fmt;

use log::warn;
use thiserror::Error;

use super::{ItemType, Payload};
use crate::{
    decode::{Decode, DecodeError},
    encode::{Encode, EncodeError, MessageEncoder},
    reader::SequentialReader,
    string::{VarBytes, VarString},
};

/// Why a customer id string could not be turned into bytes.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CustomerIdError {
    #[error("Customer id has an odd number of hex digits")]
    OddLength,

    #[error("Customer id has the invalid hex character {c:?} at position {index}")]
    InvalidHexCharacter { c: char, index: usize },
}

impl From<hex::FromHexError> for CustomerIdError {
    fn from(err: hex::FromHexError) -> Self {
        match err {
            hex::FromHexError::InvalidHexCharacter { c, index } => {
                Self::InvalidHexCharacter { c, index }
            }
            hex::FromHexError::OddLength | hex::FromHexError::InvalidStringLength => {
                Self::OddLength
            }
        }
    }
}

/// An opaque account identifier assigned by the backend.
///
/// Usually configured as a hex string. On the wire it is a [`VarBytes`],
/// so anything past 255 bytes is dropped.
#[derive(Debug, Default, Clone, PartialEq, Eq, Hash)]
pub struct CustomerId(VarBytes);

impl CustomerId {
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self(VarBytes::new(bytes))
    }

    /// Parses a hex string, with or without a leading `0x`. Surrounding
    /// whitespace is ignored.
    ///
    /// # Errors
    ///
    /// Fails if the digit count is odd or a character is not a hex digit.
    pub fn from_hex(s: &str) -> Result<Self, CustomerIdError> {
        let s = s.trim();
        let digits = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .unwrap_or(s);

        Ok(Self::from_bytes(hex::decode(digits)?))
    }

    /// Parses a hex string, falling back to an empty id when it is malformed.
    ///
    /// The fallback is what older devices expect to receive, so it still
    /// encodes. The error is handed back so the caller can report it.
    pub fn from_hex_lossy(s: &str) -> (Self, Option<CustomerIdError>) {
        match Self::from_hex(s) {
            Ok(id) => (id, None),
            Err(err) => {
                warn!("Invalid customer id {s:?} ({err}), sending an empty id");
                (Self::default(), Some(err))
            }
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Encode for CustomerId {
    fn encode(&self, out: &mut Vec<u8>) -> Result<(), EncodeError> {
        self.0.encode(out)
    }
}

impl Decode for CustomerId {
    fn decode(reader: &mut SequentialReader<'_>) -> Result<Self, DecodeError> {
        reader.read().map(Self)
    }
}

/// Lower-case hex, without a prefix.
impl fmt::Display for CustomerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.as_bytes()))
    }
}

impl Payload for CustomerId {
    const TYPE: ItemType = ItemType::CUSTOMER_ID;
    const VERSION: u8 = 1;

    fn encode_payload(&self, out: &mut Vec<u8>) -> Result<(), EncodeError> {
        self.encode(out)
    }

    fn decode_payload(reader: &mut SequentialReader<'_>) -> Result<Self, DecodeError> {
        Self::decode(reader)
    }
}

/// Firmware versions.
///
/// | Field      | Size | Description |
/// |------------|------|-------------|
/// | `software` | 1+N  | Application firmware version. |
/// | `modem`    | 1+N  | Cellular modem firmware version. |
#[derive(Debug, Default, Clone, PartialEq, Eq, Hash)]
pub struct Versions {
    pub software: VarString,
    pub modem: VarString,
}

impl Payload for Versions {
    const TYPE: ItemType = ItemType::VERSIONS;
    const VERSION: u8 = 1;

    fn encode_payload(&self, out: &mut Vec<u8>) -> Result<(), EncodeError> {
        MessageEncoder::new(out)
            .write(&self.software)?
            .write(&self.modem)?;
        Ok(())
    }

    fn decode_payload(reader: &mut SequentialReader<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            software: reader.read_var_string()?,
            modem: reader.read_var_string()?,
        })
    }
}

/// The cellular network the device is attached to.
///
/// | Field | Size | Description |
/// |-------|------|-------------|
/// | `mcc` | 1+N  | Mobile country code. |
/// | `mnc` | 1+N  | Mobile network code. |
/// | `rat` | 1+N  | Radio access technology, such as `LTE-M`. |
#[derive(Debug, Default, Clone, PartialEq, Eq, Hash)]
pub struct NetworkInfo {
    pub mcc: VarString,
    pub mnc: VarString,
    pub rat: VarString,
}

impl Payload for NetworkInfo {
    const TYPE: ItemType = ItemType::NETWORK_INFO;
    const VERSION: u8 = 1;

    fn encode_payload(&self, out: &mut Vec<u8>) -> Result<(), EncodeError> {
        MessageEncoder::new(out)
            .write(&self.mcc)?
            .write(&self.mnc)?
            .write(&self.rat)?;
        Ok(())
    }

    fn decode_payload(reader: &mut SequentialReader<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            mcc: reader.read_var_string()?,
            mnc: reader.read_var_string()?,
            rat: reader.read_var_string()?,
        })
    }
}
