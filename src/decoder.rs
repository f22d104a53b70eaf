//! Whole-frame decoding, from hex text or raw bytes.

use log::trace;
use thiserror::Error;

use crate::{
    decode::{DecodeError, ErrorCategory},
    generation::Generation,
    packet::{DecodedPacket, PacketHeader},
    reader::SequentialReader,
};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FrameError {
    #[error("Frame is not valid hex: {0}")]
    Hex(#[from] hex::FromHexError),
    #[error("Header too short: {len} bytes, need at least {min}")]
    HeaderTooShort { len: usize, min: usize },
    #[error("Packet decoding error: {0}")]
    Decode(#[from] DecodeError),
}

impl FrameError {
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::Hex(_) => ErrorCategory::InvalidEncoding,
            Self::HeaderTooShort { .. } => ErrorCategory::TruncatedInput,
            Self::Decode(err) => err.category(),
        }
    }
}

/// Splits received frames into a header and a command-specific body.
///
/// A decoder is built for one [`Generation`], which the caller must know
/// from context (firmware version, endpoint, and so on). Frames are never
/// inspected to guess it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PacketDecoder {
    generation: Generation,
}

impl PacketDecoder {
    pub const fn new(generation: Generation) -> Self {
        Self { generation }
    }

    pub const fn generation(&self) -> Generation {
        self.generation
    }

    /// Reads the header and returns it with the bytes that follow it.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::HeaderTooShort`] when the frame cannot even hold
    /// the version, command and transaction id, and [`FrameError::Decode`]
    /// when the rest of the header is cut off or malformed.
    pub fn decode_header<'a>(
        &self,
        frame: &'a [u8],
    ) -> Result<(PacketHeader, &'a [u8]), FrameError> {
        if frame.len() < PacketHeader::MIN_SIZE {
            return Err(FrameError::HeaderTooShort {
                len: frame.len(),
                min: PacketHeader::MIN_SIZE,
            });
        }

        let mut reader = SequentialReader::with_generation(frame, self.generation);
        let header = PacketHeader::decode_for(self.generation, &mut reader)?;
        Ok((header, reader.rest()))
    }

    /// Like [`PacketDecoder::decode_header`], for a hex-encoded frame.
    pub fn decode_header_hex(&self, frame: &str) -> Result<(PacketHeader, Vec<u8>), FrameError> {
        let bytes = hex::decode(frame.trim())?;
        let (header, rest) = self.decode_header(&bytes)?;
        Ok((header, rest.to_vec()))
    }

    /// Decodes a complete frame into whichever packet its command names.
    pub fn decode(&self, frame: &[u8]) -> Result<DecodedPacket, FrameError> {
        trace!("Decoding frame: {:x?}", frame);

        let (header, body) = self.decode_header(frame)?;
        let mut reader = SequentialReader::with_generation(body, self.generation);
        Ok(DecodedPacket::decode_after(header, &mut reader)?)
    }

    pub fn decode_hex(&self, frame: &str) -> Result<DecodedPacket, FrameError> {
        self.decode(&hex::decode(frame.trim())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        bcd::DeviceId,
        decode::DecodeErrorKind,
        encode::Encode,
        item::{sensor::Steps, DataItem, ItemType, RawDataItem},
        packet::{telemetry::Telemetry, Command, HeaderLayout, TelemetryPacket},
    };

    const FIXTURE_HEX: &str = "01540000070a012345678900000064011e0100040000019c";

    fn fixture() -> TelemetryPacket {
        TelemetryPacket::new(
            DeviceId::new("0123456789").unwrap(),
            7,
            HeaderLayout::Current { timestamp: 100 },
            Telemetry::periodic(vec![Steps { steps: 412 }.into()]),
        )
    }

    #[test]
    fn encodes_canonical_fixture() {
        assert_eq!(fixture().to_hex().unwrap(), FIXTURE_HEX);
    }

    #[test]
    fn decodes_hex_frame() {
        let packet = PacketDecoder::default().decode_hex(FIXTURE_HEX).unwrap();
        assert_eq!(packet, DecodedPacket::Telemetry(fixture()));
        assert_eq!(packet.header().transaction_id, 7);
    }

    #[test]
    fn header_and_remainder() {
        let (header, rest) = PacketDecoder::default()
            .decode_header_hex(FIXTURE_HEX)
            .unwrap();

        assert_eq!(header.command, Command::TELEMETRY);
        assert_eq!(header.device_id.as_str(), "0123456789");
        assert_eq!(header.timestamp(), Some(100));
        assert_eq!(rest, [0x01, 0x1E, 0x01, 0x00, 0x04, 0x00, 0x00, 0x01, 0x9C]);
    }

    #[test]
    fn header_too_short() {
        let err = PacketDecoder::default().decode_hex("01540000").unwrap_err();

        assert_eq!(err, FrameError::HeaderTooShort { len: 4, min: 5 });
        assert_eq!(err.category(), ErrorCategory::TruncatedInput);
    }

    #[test]
    fn invalid_hex() {
        let err = PacketDecoder::default().decode_hex("01zz").unwrap_err();

        assert!(matches!(err, FrameError::Hex(_)));
        assert_eq!(err.category(), ErrorCategory::InvalidEncoding);
    }

    #[test]
    fn truncated_device_id() {
        // Claims ten digits, carries two bytes of them.
        let err = PacketDecoder::default()
            .decode_hex("01540000070a0123")
            .unwrap_err();

        let FrameError::Decode(err) = err else {
            panic!("expected a decode error, got {err:?}");
        };
        assert_eq!(
            err.kind(),
            DecodeErrorKind::TruncatedInput {
                needed: 5,
                remaining: 2
            }
        );
    }

    #[test]
    fn skips_unknown_items_in_frame() {
        let mut packet = fixture();
        packet.body.items.insert(
            0,
            RawDataItem {
                item_type: ItemType(250),
                version: 1,
                payload: vec![1, 2, 3, 4, 5, 6],
            }
            .into(),
        );

        let frame = packet.to_bytes().unwrap();
        let DecodedPacket::Telemetry(decoded) = PacketDecoder::default().decode(&frame).unwrap()
        else {
            panic!("expected telemetry");
        };

        assert_eq!(decoded.body.items.len(), 2);
        assert_eq!(
            decoded.body.known_items().collect::<Vec<_>>(),
            [&DataItem::Steps(Steps { steps: 412 })]
        );
    }

    #[test]
    fn keeps_items_after_a_malformed_one() {
        let mut frame = hex::decode("01540000070a012345678900000064").unwrap();
        frame.extend([
            0x03, // count
            0x1E, 0x01, 0x00, 0x04, 0x00, 0x00, 0x00, 0x01, // steps 1
            0x0A, 0x01, 0x02, 0x09, 0x00, // location, subtype 9
            0x1E, 0x01, 0x00, 0x04, 0x00, 0x00, 0x00, 0x02, // steps 2
        ]);

        let DecodedPacket::Telemetry(packet) = PacketDecoder::default().decode(&frame).unwrap()
        else {
            panic!("expected telemetry");
        };

        assert_eq!(packet.body.items.len(), 3);
        assert!(packet.body.items[1].is_unknown());
        assert_eq!(
            packet.body.known_items().collect::<Vec<_>>(),
            [
                &DataItem::Steps(Steps { steps: 1 }),
                &DataItem::Steps(Steps { steps: 2 })
            ]
        );
    }

    #[cfg(feature = "legacy")]
    #[test]
    fn legacy_motion_is_its_own_packet() {
        use crate::{
            item::location::Location,
            packet::legacy::{Motion, MotionEvent},
            packet::MotionPacket,
        };

        // Legacy headers always carry 16 digits.
        let packet = MotionPacket::new(
            DeviceId::new("0356938035643809").unwrap(),
            1,
            HeaderLayout::Legacy,
            Motion {
                event: MotionEvent::Stop,
                timestamp: 5,
                location: Location::gnss(1.5, 2.5),
                items: Vec::new(),
            },
        );
        let frame = packet.to_bytes().unwrap();

        let decoded = PacketDecoder::new(Generation::Legacy).decode(&frame).unwrap();
        assert_eq!(decoded, DecodedPacket::Motion(packet));
    }
}
