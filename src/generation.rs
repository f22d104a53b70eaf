//! Protocol generations.
//!
//! The protocol has gone through incompatible revisions of its header and
//! data item layout. A [`Generation`] names one of them and is always chosen
//! by the caller; frames are never sniffed to guess which layout they use.
//!
//! | Generation | Device id            | Timestamp      | Item length field                          |
//! |------------|----------------------|----------------|--------------------------------------------|
//! | `Legacy`   | 8 bytes of BCD       | not in header  | 1 byte for every item                      |
//! | `Current`  | digit count + BCD    | u32 in header  | 1 byte for single-value items, 2 otherwise |

use crate::{
    decode::DecodeError,
    encode::EncodeError,
    item::ItemType,
    reader::SequentialReader,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Generation {
    /// Fixed-width header used by the first deployed firmware.
    #[cfg(feature = "legacy")]
    Legacy,
    #[default]
    Current,
}

impl Generation {
    /// Width of the length field of a data item of type `item_type`.
    pub const fn length_width(self, item_type: ItemType) -> LengthWidth {
        match self {
            #[cfg(feature = "legacy")]
            Self::Legacy => LengthWidth::U8,
            Self::Current => item_type.length_width(),
        }
    }
}

/// Size of a data item's length field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LengthWidth {
    U8,
    U16,
}

impl LengthWidth {
    /// Bytes taken by the length field itself.
    pub const fn size(self) -> usize {
        match self {
            Self::U8 => 1,
            Self::U16 => 2,
        }
    }

    /// Largest payload length this field can describe.
    pub const fn max(self) -> usize {
        match self {
            Self::U8 => u8::MAX as usize,
            Self::U16 => u16::MAX as usize,
        }
    }

    pub(crate) fn read(self, reader: &mut SequentialReader<'_>) -> Result<u16, DecodeError> {
        match self {
            Self::U8 => reader.read_u8().map(u16::from),
            Self::U16 => reader.read_u16(),
        }
    }

    /// Big-endian bytes of `len` in this width, or an error naming `field`
    /// when it does not fit.
    pub(crate) fn to_bytes(self, field: &'static str, len: usize) -> Result<Vec<u8>, EncodeError> {
        if len > self.max() {
            return Err(EncodeError::TooLong {
                field,
                len,
                max: self.max(),
            });
        }

        Ok(match self {
            Self::U8 => vec![len as u8],
            Self::U16 => (len as u16).to_be_bytes().to_vec(),
        })
    }
}
