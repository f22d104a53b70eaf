//! Bounds-checked cursor over a received frame.

use crate::{
    decode::{Decode, DecodeError, DecodeErrorKind},
    generation::Generation,
    item::{DataItemHeader, ItemType, RawDataItem},
    string::VarString,
};

/// Cursor-based reader over an immutable byte buffer.
///
/// Every read either consumes exactly the bytes it needs or fails without
/// moving the cursor. The cursor never goes backwards except when a failed
/// [`read_atomic`](Self::read_atomic) restores it to where that call began.
///
/// The reader also carries the [`Generation`] of the frame it was built for,
/// which decides how wide data item length fields are.
#[derive(Debug, Clone)]
pub struct SequentialReader<'a> {
    data: &'a [u8],
    position: usize,
    generation: Generation,
}

impl<'a> SequentialReader<'a> {
    /// Creates a reader for a current-generation frame.
    pub fn new(data: &'a [u8]) -> Self {
        Self::with_generation(data, Generation::Current)
    }

    pub fn with_generation(data: &'a [u8], generation: Generation) -> Self {
        Self {
            data,
            position: 0,
            generation,
        }
    }

    pub const fn generation(&self) -> Generation {
        self.generation
    }

    /// Number of bytes consumed so far.
    pub const fn position(&self) -> usize {
        self.position
    }

    /// Number of bytes left to read.
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.position)
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// The unread part of the buffer, without consuming it.
    pub fn rest(&self) -> &'a [u8] {
        &self.data[self.position..]
    }

    /// Consumes and returns everything that is left.
    pub fn read_to_end(&mut self) -> &'a [u8] {
        let rest = self.rest();
        self.position = self.data.len();
        rest
    }

    /// Takes `n` bytes, attributing a failure to the type `T`.
    pub(crate) fn take<T: ?Sized>(&mut self, n: usize) -> Result<&'a [u8], DecodeError> {
        let remaining = self.remaining();
        if n > remaining {
            return Err(DecodeError::new::<T>(DecodeErrorKind::TruncatedInput {
                needed: n,
                remaining,
            }));
        }

        let bytes = &self.data[self.position..self.position + n];
        self.position += n;
        Ok(bytes)
    }

    pub(crate) fn take_array<T: ?Sized, const N: usize>(&mut self) -> Result<[u8; N], DecodeError> {
        let bytes = self.take::<T>(N)?;
        let mut array = [0; N];
        array.copy_from_slice(bytes);
        Ok(array)
    }

    /// Looks at the next byte without consuming it.
    pub fn peek_u8(&self) -> Option<u8> {
        self.data.get(self.position).copied()
    }

    /// Runs `f`, putting the cursor back where it was if `f` fails.
    ///
    /// This is what makes multi-field reads all-or-nothing.
    pub fn read_atomic<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, DecodeError>,
    ) -> Result<T, DecodeError> {
        let checkpoint = self.position;
        let result = f(self);
        if result.is_err() {
            self.position = checkpoint;
        }
        result
    }

    pub fn read<T: Decode>(&mut self) -> Result<T, DecodeError> {
        T::decode(self)
    }

    pub fn read_u8(&mut self) -> Result<u8, DecodeError> {
        u8::decode(self)
    }

    pub fn read_u16(&mut self) -> Result<u16, DecodeError> {
        u16::decode(self)
    }

    pub fn read_u32(&mut self) -> Result<u32, DecodeError> {
        u32::decode(self)
    }

    /// Reads a fixed-length run of `n` bytes.
    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8], DecodeError> {
        self.take::<[u8]>(n)
    }

    /// Reads a 1-byte length prefix followed by that many ASCII bytes.
    pub fn read_var_string(&mut self) -> Result<VarString, DecodeError> {
        VarString::decode(self)
    }

    /// Reads a data item header: type, version, then a length whose width
    /// depends on this reader's generation and on the item type.
    pub fn read_data_item_header(&mut self) -> Result<DataItemHeader, DecodeError> {
        self.read_atomic(|reader| {
            let item_type = ItemType(reader.read_u8()?);
            let version = reader.read_u8()?;
            let length = reader.generation.length_width(item_type).read(reader)?;

            Ok(DataItemHeader {
                item_type,
                version,
                length,
            })
        })
    }

    /// Reads one data item header and exactly `length` payload bytes.
    pub fn read_data_item(&mut self) -> Result<RawDataItem, DecodeError> {
        self.read_atomic(|reader| {
            let header = reader.read_data_item_header()?;
            let payload = reader.take::<RawDataItem>(header.length as usize)?;

            Ok(RawDataItem {
                item_type: header.item_type,
                version: header.version,
                payload: payload.to_vec(),
            })
        })
    }

    /// Reads a count byte and then that many data items.
    ///
    /// An empty remainder is treated as zero items.
    pub fn read_data_items(&mut self) -> Result<Vec<RawDataItem>, DecodeError> {
        if self.is_empty() {
            return Ok(Vec::new());
        }

        self.read_atomic(|reader| {
            let count = reader.read_u8()?;
            let mut items = Vec::with_capacity(count as usize);
            for _ in 0..count {
                items.push(reader.read_data_item()?);
            }
            Ok(items)
        })
    }
}
