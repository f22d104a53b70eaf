//! Device identities packed as binary-coded decimal.

use core::fmt;

#[cfg(feature = "legacy")]
use log::warn;

use crate::{
    decode::{DecodeError, DecodeErrorKind},
    encode::{EncodeError, MessageEncoder},
    generation::Generation,
    reader::SequentialReader,
};

/// Size of the fixed-width device id field in legacy headers.
#[cfg(feature = "legacy")]
pub const LEGACY_DEVICE_ID_SIZE: usize = 8;

/// A device identity such as an IMEI: a string of decimal digits.
///
/// On the wire each byte holds two digits, high nibble first. An odd number
/// of digits gets a leading zero digit so the run fills whole bytes.
///
/// - Current generation: a 1-byte digit count followed by `ceil(count / 2)`
///   BCD bytes.
/// - Legacy generation: exactly 8 BCD bytes. Ids longer than 16 digits lose
///   their excess digits, shorter ones are padded with zero bytes at the end.
///
/// The legacy field has no length, so padding cannot be told apart from
/// real zero digits. A legacy header always decodes to all 16 digits as
/// sent. Use [`DeviceId::to_legacy`] to get the form an id takes there
/// before comparing it with a decoded one.
#[derive(Debug, Default, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DeviceId(String);

impl DeviceId {
    /// Largest digit count the current generation's count byte can hold.
    pub const MAX_DIGITS: usize = u8::MAX as usize;

    /// # Errors
    ///
    /// Returns [`EncodeError::InvalidDeviceId`] if `digits` has anything other
    /// than `0`-`9`, and [`EncodeError::TooLong`] past [`Self::MAX_DIGITS`].
    pub fn new(digits: impl AsRef<str>) -> Result<Self, EncodeError> {
        let digits = digits.as_ref();

        if let Some(c) = digits.chars().find(|c| !c.is_ascii_digit()) {
            return Err(EncodeError::InvalidDeviceId(c));
        }
        if digits.len() > Self::MAX_DIGITS {
            return Err(EncodeError::TooLong {
                field: "device id",
                len: digits.len(),
                max: Self::MAX_DIGITS,
            });
        }

        Ok(Self(digits.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Number of digits in the id.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The digits packed two per byte, left-padded to an even count.
    pub fn packed(&self) -> Vec<u8> {
        pack(self.0.as_bytes())
    }

    /// The id as a legacy header carries it: 16 digits, truncated or padded
    /// with zeros at the end, after an odd count got its leading zero.
    ///
    /// This is exactly what decoding a legacy header gives back.
    #[cfg(feature = "legacy")]
    pub fn to_legacy(&self) -> Self {
        let digits = self
            .legacy_bytes()
            .iter()
            .flat_map(|byte| [byte >> 4, byte & 0x0F])
            .map(|nibble| char::from(b'0' + nibble))
            .collect();
        Self(digits)
    }

    #[cfg(feature = "legacy")]
    fn legacy_bytes(&self) -> [u8; LEGACY_DEVICE_ID_SIZE] {
        let mut fixed = [0u8; LEGACY_DEVICE_ID_SIZE];
        let packed = self.packed();
        let len = packed.len().min(LEGACY_DEVICE_ID_SIZE);
        fixed[..len].copy_from_slice(&packed[..len]);
        fixed
    }

    pub(crate) fn encode_for(
        &self,
        generation: Generation,
        out: &mut Vec<u8>,
    ) -> Result<(), EncodeError> {
        let mut enc = MessageEncoder::new(out);
        match generation {
            #[cfg(feature = "legacy")]
            Generation::Legacy => {
                if self.len() > LEGACY_DEVICE_ID_SIZE * 2 {
                    warn!(
                        "Device id {} has more than {} digits, truncating for legacy header",
                        self.0,
                        LEGACY_DEVICE_ID_SIZE * 2
                    );
                }
                enc.write(&self.legacy_bytes())?;
            }
            Generation::Current => {
                enc.write(&(self.0.len() as u8))?.write(self.packed().as_slice())?;
            }
        }
        Ok(())
    }

    pub(crate) fn decode_for(
        generation: Generation,
        reader: &mut SequentialReader<'_>,
    ) -> Result<Self, DecodeError> {
        reader.read_atomic(|reader| match generation {
            #[cfg(feature = "legacy")]
            Generation::Legacy => {
                let bytes = reader.take::<Self>(LEGACY_DEVICE_ID_SIZE)?;
                Ok(Self(unpack(bytes)?))
            }
            Generation::Current => {
                let count = reader.read_u8()? as usize;
                let bytes = reader.take::<Self>(count.div_ceil(2))?;
                let digits = unpack(bytes)?;
                // Drop the pad digit of an odd count.
                Ok(Self(digits[digits.len() - count..].to_owned()))
            }
        })
    }
}

fn pack(digits: &[u8]) -> Vec<u8> {
    let pad = digits.len() % 2;
    let mut nibbles = core::iter::repeat(0)
        .take(pad)
        .chain(digits.iter().map(|d| d - b'0'));

    let mut packed = Vec::with_capacity((digits.len() + 1) / 2);
    while let (Some(high), Some(low)) = (nibbles.next(), nibbles.next()) {
        packed.push((high << 4) | low);
    }
    packed
}

fn unpack(bytes: &[u8]) -> Result<String, DecodeError> {
    let mut digits = String::with_capacity(bytes.len() * 2);
    for &byte in bytes {
        for nibble in [byte >> 4, byte & 0x0F] {
            if nibble > 9 {
                return Err(DecodeError::new::<DeviceId>(DecodeErrorKind::InvalidBcd {
                    nibble,
                }));
            }
            digits.push(char::from(b'0' + nibble));
        }
    }
    Ok(digits)
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl TryFrom<&str> for DeviceId {
    type Error = EncodeError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packs_even_count() {
        let id = DeviceId::new("0123456789").unwrap();
        assert_eq!(id.packed(), [0x01, 0x23, 0x45, 0x67, 0x89]);
    }

    #[test]
    fn packs_odd_count_with_leading_zero() {
        let id = DeviceId::new("12345").unwrap();
        assert_eq!(id.packed(), [0x01, 0x23, 0x45]);
    }

    #[test]
    fn rejects_non_digits() {
        assert_eq!(
            DeviceId::new("35-69"),
            Err(EncodeError::InvalidDeviceId('-'))
        );
    }

    #[test]
    fn current_round_trip_keeps_odd_ids() {
        // 15-digit IMEI.
        const EXPECTED_ENCODING: [u8; 9] = [0x0F, 0x03, 0x56, 0x93, 0x80, 0x35, 0x64, 0x38, 0x09];

        let id = DeviceId::new("356938035643809").unwrap();
        let mut out = Vec::new();
        id.encode_for(Generation::Current, &mut out).unwrap();
        assert_eq!(out, EXPECTED_ENCODING);

        let mut reader = SequentialReader::new(&out);
        assert_eq!(DeviceId::decode_for(Generation::Current, &mut reader), Ok(id));
        assert!(reader.is_empty());
    }

    #[test]
    fn empty_id() {
        let id = DeviceId::new("").unwrap();
        let mut out = Vec::new();
        id.encode_for(Generation::Current, &mut out).unwrap();
        assert_eq!(out, [0x00]);
    }

    #[test]
    fn invalid_nibble() {
        let mut reader = SequentialReader::new(&[0x02, 0x1A]);
        let err = DeviceId::decode_for(Generation::Current, &mut reader).unwrap_err();

        assert_eq!(err.kind(), DecodeErrorKind::InvalidBcd { nibble: 0xA });
        assert_eq!(reader.position(), 0);
    }

    #[test]
    fn truncated_digits() {
        let mut reader = SequentialReader::new(&[0x0A, 0x01, 0x23]);
        let err = DeviceId::decode_for(Generation::Current, &mut reader).unwrap_err();

        assert_eq!(
            err.kind(),
            DecodeErrorKind::TruncatedInput {
                needed: 5,
                remaining: 2
            }
        );
    }

    #[cfg(feature = "legacy")]
    fn legacy_round_trip(id: &DeviceId) -> DeviceId {
        let mut out = Vec::new();
        id.encode_for(Generation::Legacy, &mut out).unwrap();
        assert_eq!(out.len(), LEGACY_DEVICE_ID_SIZE);

        let mut reader = SequentialReader::with_generation(&out, Generation::Legacy);
        let decoded = DeviceId::decode_for(Generation::Legacy, &mut reader).unwrap();
        assert!(reader.is_empty());
        decoded
    }

    #[cfg(feature = "legacy")]
    #[test]
    fn legacy_imei_keeps_its_pad_digit() {
        const EXPECTED_ENCODING: [u8; 8] = [0x03, 0x56, 0x93, 0x80, 0x35, 0x64, 0x38, 0x09];

        let id = DeviceId::new("356938035643809").unwrap();
        let mut out = Vec::new();
        id.encode_for(Generation::Legacy, &mut out).unwrap();
        assert_eq!(out, EXPECTED_ENCODING);

        let decoded = legacy_round_trip(&id);
        assert_eq!(decoded.as_str(), "0356938035643809");
        assert_eq!(decoded, id.to_legacy());
    }

    #[cfg(feature = "legacy")]
    #[test]
    fn legacy_zero_digits_are_not_stripped() {
        let id = DeviceId::new("1234567800").unwrap();
        let decoded = legacy_round_trip(&id);

        assert_eq!(decoded.as_str(), "1234567800000000");
        assert_eq!(decoded, id.to_legacy());
        assert!(decoded.as_str().starts_with(id.as_str()));
    }

    #[cfg(feature = "legacy")]
    #[test]
    fn legacy_full_width_id_round_trips() {
        let id = DeviceId::new("0356938035643800").unwrap();
        assert_eq!(legacy_round_trip(&id), id);
        assert_eq!(id.to_legacy(), id);
    }

    #[cfg(feature = "legacy")]
    #[test]
    fn legacy_truncates_long_ids() {
        let id = DeviceId::new("12345678901234567890").unwrap();
        let mut out = Vec::new();
        id.encode_for(Generation::Legacy, &mut out).unwrap();

        assert_eq!(out, [0x12, 0x34, 0x56, 0x78, 0x90, 0x12, 0x34, 0x56]);
        assert_eq!(id.to_legacy().as_str(), "1234567890123456");
    }
}
