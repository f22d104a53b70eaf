//! Key-value pairs, used for configuration and free-form status.

use std::collections::HashMap;

use log::warn;

use super::{ItemType, Payload};
use crate::{
    decode::DecodeError,
    encode::{EncodeError, MessageEncoder},
    reader::SequentialReader,
    string::VarString,
};

/// Most pairs a count byte can describe.
pub const MAX_PAIRS: usize = u8::MAX as usize;

/// An ordered list of string pairs.
///
/// Keys need not be unique. Lookups resolve duplicates to the last
/// occurrence, which is how devices apply configuration.
///
/// | Field   | Size | Description |
/// |---------|------|-------------|
/// | `count` | 1    | Number of pairs. |
/// | `pairs` | ...  | `count` × (key [`VarString`], value [`VarString`]). |
#[derive(Debug, Default, Clone, PartialEq, Eq, Hash)]
pub struct KeyValues {
    pairs: Vec<(VarString, VarString)>,
}

impl KeyValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs(pairs: Vec<(VarString, VarString)>) -> Self {
        Self { pairs }
    }

    /// Builds a list from plain strings.
    ///
    /// # Errors
    ///
    /// Fails if a key or value is not ASCII.
    pub fn try_from_strs<'a>(
        pairs: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Result<Self, EncodeError> {
        pairs
            .into_iter()
            .map(|(key, value)| {
                Ok::<_, EncodeError>((VarString::new(key)?, VarString::new(value)?))
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Self::from_pairs)
    }

    pub fn push(&mut self, key: VarString, value: VarString) {
        self.pairs.push((key, value));
    }

    /// The value of the last pair with this key.
    pub fn get(&self, key: &str) -> Option<&VarString> {
        self.pairs
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    /// A lookup table where later duplicates replace earlier ones.
    pub fn to_map(&self) -> HashMap<String, String> {
        self.pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(VarString, VarString)> {
        self.pairs.iter()
    }

    pub fn pairs(&self) -> &[(VarString, VarString)] {
        &self.pairs
    }

    pub fn into_pairs(self) -> Vec<(VarString, VarString)> {
        self.pairs
    }
}

impl Extend<(VarString, VarString)> for KeyValues {
    fn extend<T: IntoIterator<Item = (VarString, VarString)>>(&mut self, iter: T) {
        self.pairs.extend(iter);
    }
}

impl FromIterator<(VarString, VarString)> for KeyValues {
    fn from_iter<T: IntoIterator<Item = (VarString, VarString)>>(iter: T) -> Self {
        Self::from_pairs(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a KeyValues {
    type Item = &'a (VarString, VarString);
    type IntoIter = core::slice::Iter<'a, (VarString, VarString)>;

    fn into_iter(self) -> Self::IntoIter {
        self.pairs.iter()
    }
}

/// Writes a count byte and up to [`MAX_PAIRS`] pairs.
pub(crate) fn encode_pairs(
    pairs: &[(VarString, VarString)],
    out: &mut Vec<u8>,
) -> Result<(), EncodeError> {
    if pairs.len() > MAX_PAIRS {
        warn!(
            "Dropping {} of {} key-value pairs",
            pairs.len() - MAX_PAIRS,
            pairs.len()
        );
    }
    let pairs = &pairs[..pairs.len().min(MAX_PAIRS)];

    let mut enc = MessageEncoder::new(out);
    enc.write(&(pairs.len() as u8))?;
    for (key, value) in pairs {
        enc.write(key)?.write(value)?;
    }
    Ok(())
}

pub(crate) fn decode_pairs(
    reader: &mut SequentialReader<'_>,
) -> Result<Vec<(VarString, VarString)>, DecodeError> {
    reader.read_atomic(|reader| {
        let count = reader.read_u8()?;
        let mut pairs = Vec::with_capacity(count as usize);
        for _ in 0..count {
            pairs.push((reader.read_var_string()?, reader.read_var_string()?));
        }
        Ok(pairs)
    })
}

impl Payload for KeyValues {
    const TYPE: ItemType = ItemType::KEY_VALUE;
    const VERSION: u8 = 1;

    fn encode_payload(&self, out: &mut Vec<u8>) -> Result<(), EncodeError> {
        encode_pairs(&self.pairs, out)
    }

    fn decode_payload(reader: &mut SequentialReader<'_>) -> Result<Self, DecodeError> {
        decode_pairs(reader).map(Self::from_pairs)
    }
}
