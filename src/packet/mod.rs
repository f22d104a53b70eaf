//! Packet framing.
//!
//! Every packet starts with the same header, followed by a body whose layout
//! depends on the command.
//!
//! | Field            | Size       | Description |
//! |------------------|------------|-------------|
//! | `version`        | 1          | Protocol version, currently `1`. |
//! | `command`        | 2          | ASCII command code, NUL-padded. |
//! | `transaction_id` | 2          | Correlates a request with its response. |
//! | `device_id`      | 8 or 1+N   | BCD device id. See [`DeviceId`]. |
//! | `timestamp`      | 4          | Unix seconds. Current generation only. |
//! | body             | ...        | See the [`PacketBody`] implementors. |

use core::fmt;

use log::{debug, trace, warn};

use crate::{
    bcd::DeviceId,
    decode::{Decode, DecodeError, DecodeErrorKind},
    encode::{Encode, EncodeError, MessageEncoder},
    generation::Generation,
    reader::SequentialReader,
};

pub mod config;
#[cfg(feature = "legacy")]
pub mod legacy;
pub mod telemetry;
pub mod update;

use config::Config;
#[cfg(feature = "legacy")]
use legacy::{Motion, PowerOn};
use telemetry::{Telemetry, TelemetryEvent};
use update::{UpdateRequest, UpdateStatus};

/// A two-byte command code.
///
/// Codes shorter than two characters are padded with NUL, so telemetry's
/// `"T"` goes on the wire as `54 00`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Command(pub [u8; 2]);

impl Command {
    pub const TELEMETRY: Self = Self(*b"T\0");
    pub const CONFIG: Self = Self(*b"C\0");
    pub const UPDATE_REQUEST: Self = Self(*b"U+");
    pub const UPDATE_STATUS: Self = Self(*b"U-");
    pub const POWER_ON: Self = Self(*b"P+");
    pub const MOTION_START: Self = Self(*b"M+");
    pub const MOTION_STOP: Self = Self(*b"M-");

    /// Builds a command from its text form, NUL-padding or truncating it to
    /// two bytes.
    pub fn new(code: &str) -> Self {
        let mut bytes = [0; 2];
        for (slot, byte) in bytes.iter_mut().zip(code.bytes()) {
            *slot = byte;
        }
        Self(bytes)
    }

    pub const fn as_bytes(&self) -> [u8; 2] {
        self.0
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &byte in self.0.iter().take_while(|&&b| b != 0) {
            if byte.is_ascii_graphic() {
                write!(f, "{}", byte as char)?;
            } else {
                write!(f, "\\x{byte:02x}")?;
            }
        }
        Ok(())
    }
}

impl From<&str> for Command {
    fn from(code: &str) -> Self {
        Self::new(code)
    }
}

impl Encode for Command {
    fn encode(&self, out: &mut Vec<u8>) -> Result<(), EncodeError> {
        self.0.encode(out)
    }
}

impl Decode for Command {
    fn decode(reader: &mut SequentialReader<'_>) -> Result<Self, DecodeError> {
        reader.read().map(Self)
    }
}

/// The generation-dependent tail of a header.
///
/// The timestamp only exists in the current layout, so it lives here rather
/// than as an optional field that could disagree with the generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HeaderLayout {
    /// 8-byte device id, no timestamp.
    #[cfg(feature = "legacy")]
    Legacy,
    /// Length-prefixed device id followed by a Unix timestamp.
    Current { timestamp: u32 },
}

impl HeaderLayout {
    pub const fn generation(&self) -> Generation {
        match self {
            #[cfg(feature = "legacy")]
            Self::Legacy => Generation::Legacy,
            Self::Current { .. } => Generation::Current,
        }
    }

    pub const fn timestamp(&self) -> Option<u32> {
        match self {
            #[cfg(feature = "legacy")]
            Self::Legacy => None,
            Self::Current { timestamp } => Some(*timestamp),
        }
    }
}

/// Fields shared by every packet.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PacketHeader {
    pub version: u8,
    pub command: Command,
    pub transaction_id: u16,
    pub device_id: DeviceId,
    pub layout: HeaderLayout,
}

impl PacketHeader {
    /// Protocol version written by default.
    pub const DEFAULT_VERSION: u8 = 1;

    /// Version, command and transaction id: the part of the header that is
    /// the same in every generation.
    pub const MIN_SIZE: usize = 5;

    pub fn new(
        command: Command,
        device_id: DeviceId,
        transaction_id: u16,
        layout: HeaderLayout,
    ) -> Self {
        Self {
            version: Self::DEFAULT_VERSION,
            command,
            transaction_id,
            device_id,
            layout,
        }
    }

    pub const fn generation(&self) -> Generation {
        self.layout.generation()
    }

    pub const fn timestamp(&self) -> Option<u32> {
        self.layout.timestamp()
    }

    /// Reads a header laid out for `generation`.
    pub fn decode_for(
        generation: Generation,
        reader: &mut SequentialReader<'_>,
    ) -> Result<Self, DecodeError> {
        reader.read_atomic(|reader| {
            let version = reader.read_u8()?;
            let command = reader.read::<Command>()?;
            let transaction_id = reader.read_u16()?;
            let device_id = DeviceId::decode_for(generation, reader)?;
            let layout = match generation {
                #[cfg(feature = "legacy")]
                Generation::Legacy => HeaderLayout::Legacy,
                Generation::Current => HeaderLayout::Current {
                    timestamp: reader.read_u32()?,
                },
            };

            debug!(
                "Parsed header: version {version}, command {command}, transaction {transaction_id}, device {device_id}"
            );

            Ok(Self {
                version,
                command,
                transaction_id,
                device_id,
                layout,
            })
        })
    }
}

impl Encode for PacketHeader {
    fn encode(&self, out: &mut Vec<u8>) -> Result<(), EncodeError> {
        let mut enc = MessageEncoder::new(out);
        enc.write(&self.version)?
            .write(&self.command)?
            .write(&self.transaction_id)?;

        if let Err(err) = self.device_id.encode_for(self.generation(), enc.buffer()) {
            enc.abort();
            return Err(err);
        }
        if let Some(timestamp) = self.timestamp() {
            enc.write(&timestamp)?;
        }
        Ok(())
    }
}

/// The command-specific part of a packet.
pub trait PacketBody: Sized {
    /// Command code this body is sent under.
    fn command(&self) -> Command;

    fn encode_body(&self, generation: Generation, out: &mut Vec<u8>) -> Result<(), EncodeError>;

    /// Decodes a body from what follows `header`.
    ///
    /// # Errors
    ///
    /// Fails when the remainder is too short or malformed for this command.
    fn decode_body(
        header: &PacketHeader,
        reader: &mut SequentialReader<'_>,
    ) -> Result<Self, DecodeError>;
}

/// A header and the body it frames.
#[derive(Debug, Clone, PartialEq)]
pub struct Packet<B> {
    pub header: PacketHeader,
    pub body: B,
}

pub type TelemetryPacket = Packet<Telemetry>;
pub type ConfigPacket = Packet<Config>;
pub type UpdateRequestPacket = Packet<UpdateRequest>;
pub type UpdateStatusPacket = Packet<UpdateStatus>;
#[cfg(feature = "legacy")]
pub type PowerOnPacket = Packet<PowerOn>;
#[cfg(feature = "legacy")]
pub type MotionPacket = Packet<Motion>;

impl<B: PacketBody> Packet<B> {
    /// Frames `body` under its own command code.
    pub fn new(device_id: DeviceId, transaction_id: u16, layout: HeaderLayout, body: B) -> Self {
        Self {
            header: PacketHeader::new(body.command(), device_id, transaction_id, layout),
            body,
        }
    }

    /// Decodes the body that follows an already separated header.
    ///
    /// Bytes left after the body are logged and consumed.
    pub fn decode_after(
        header: PacketHeader,
        reader: &mut SequentialReader<'_>,
    ) -> Result<Self, DecodeError> {
        let body = B::decode_body(&header, reader)?;

        if !reader.is_empty() {
            warn!(
                "Ignoring {} bytes after the {} body",
                reader.remaining(),
                header.command
            );
            reader.read_to_end();
        }

        Ok(Self { header, body })
    }

    pub fn to_hex(&self) -> Result<String, EncodeError> {
        self.to_bytes().map(hex::encode)
    }
}

impl<B: PacketBody> Encode for Packet<B> {
    fn encode(&self, out: &mut Vec<u8>) -> Result<(), EncodeError> {
        let start = out.len();
        let mut enc = MessageEncoder::new(out);
        enc.write(&self.header)?;

        if let Err(err) = self.body.encode_body(self.header.generation(), enc.buffer()) {
            enc.abort();
            return Err(err);
        }

        trace!("Encoded {} packet: {:x?}", self.header.command, &out[start..]);
        Ok(())
    }
}

/// Any packet, as produced by [`PacketDecoder`](crate::PacketDecoder).
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedPacket {
    Telemetry(TelemetryPacket),
    Config(ConfigPacket),
    UpdateRequest(UpdateRequestPacket),
    UpdateStatus(UpdateStatusPacket),
    #[cfg(feature = "legacy")]
    PowerOn(PowerOnPacket),
    #[cfg(feature = "legacy")]
    Motion(MotionPacket),
}

impl DecodedPacket {
    pub fn header(&self) -> &PacketHeader {
        match self {
            Self::Telemetry(packet) => &packet.header,
            Self::Config(packet) => &packet.header,
            Self::UpdateRequest(packet) => &packet.header,
            Self::UpdateStatus(packet) => &packet.header,
            #[cfg(feature = "legacy")]
            Self::PowerOn(packet) => &packet.header,
            #[cfg(feature = "legacy")]
            Self::Motion(packet) => &packet.header,
        }
    }

    /// Picks the body decoder for the header's command.
    ///
    /// Motion commands are telemetry events in the current generation and
    /// packets of their own in the legacy one.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeErrorKind::UnknownVariant`] for a command with no
    /// decoder, and whatever the body decoder reports otherwise.
    pub fn decode_after(
        header: PacketHeader,
        reader: &mut SequentialReader<'_>,
    ) -> Result<Self, DecodeError> {
        match (header.command, header.generation()) {
            (Command::CONFIG, _) => Packet::decode_after(header, reader).map(Self::Config),
            (Command::UPDATE_REQUEST, _) => {
                Packet::decode_after(header, reader).map(Self::UpdateRequest)
            }
            (Command::UPDATE_STATUS, _) => {
                Packet::decode_after(header, reader).map(Self::UpdateStatus)
            }
            #[cfg(feature = "legacy")]
            (Command::POWER_ON, _) => Packet::decode_after(header, reader).map(Self::PowerOn),
            #[cfg(feature = "legacy")]
            (Command::MOTION_START | Command::MOTION_STOP, Generation::Legacy) => {
                Packet::decode_after(header, reader).map(Self::Motion)
            }
            (command, _) if TelemetryEvent::from_command(command).is_some() => {
                Packet::decode_after(header, reader).map(Self::Telemetry)
            }
            (command, _) => Err(DecodeError::new::<Self>(DecodeErrorKind::UnknownVariant {
                name: "command",
                value: command.0[0],
            })),
        }
    }

    pub fn to_hex(&self) -> Result<String, EncodeError> {
        self.to_bytes().map(hex::encode)
    }
}

impl Encode for DecodedPacket {
    fn encode(&self, out: &mut Vec<u8>) -> Result<(), EncodeError> {
        match self {
            Self::Telemetry(packet) => packet.encode(out),
            Self::Config(packet) => packet.encode(out),
            Self::UpdateRequest(packet) => packet.encode(out),
            Self::UpdateStatus(packet) => packet.encode(out),
            #[cfg(feature = "legacy")]
            Self::PowerOn(packet) => packet.encode(out),
            #[cfg(feature = "legacy")]
            Self::Motion(packet) => packet.encode(out),
        }
    }
}

macro_rules! impl_from_packet {
    ($($(#[$meta:meta])* $body:ty => $variant:ident),* $(,)?) => {
        $(
            $(#[$meta])*
            impl From<Packet<$body>> for DecodedPacket {
                fn from(packet: Packet<$body>) -> Self {
                    Self::$variant(packet)
                }
            }
        )*
    };
}

impl_from_packet!(
    Telemetry => Telemetry,
    Config => Config,
    UpdateRequest => UpdateRequest,
    UpdateStatus => UpdateStatus,
    #[cfg(feature = "legacy")]
    PowerOn => PowerOn,
    #[cfg(feature = "legacy")]
    Motion => Motion,
);

#[cfg(test)]
mod tests {
    use super::*;

    fn device() -> DeviceId {
        DeviceId::new("0123456789").unwrap()
    }

    #[test]
    fn command_padding() {
        assert_eq!(Command::new("T"), Command::TELEMETRY);
        assert_eq!(Command::new("U+"), Command::UPDATE_REQUEST);
        assert_eq!(Command::new("U+X"), Command::UPDATE_REQUEST);
        assert_eq!(Command::new(""), Command([0, 0]));
        assert_eq!(Command::TELEMETRY.to_string(), "T");
        assert_eq!(Command::MOTION_STOP.to_string(), "M-");
    }

    #[test]
    fn current_header() {
        const EXPECTED_ENCODING: [u8; 15] = [
            0x01, // version
            0x54, 0x00, // "T"
            0x00, 0x07, // transaction id
            0x0A, 0x01, 0x23, 0x45, 0x67, 0x89, // device id
            0x65, 0x53, 0xF1, 0x00, // timestamp
        ];

        let header = PacketHeader::new(
            Command::TELEMETRY,
            device(),
            7,
            HeaderLayout::Current {
                timestamp: 0x6553_F100,
            },
        );
        assert_eq!(header.to_bytes().unwrap(), EXPECTED_ENCODING);

        let mut reader = SequentialReader::new(&EXPECTED_ENCODING);
        assert_eq!(
            PacketHeader::decode_for(Generation::Current, &mut reader),
            Ok(header)
        );
        assert!(reader.is_empty());
    }

    #[cfg(feature = "legacy")]
    #[test]
    fn legacy_header() {
        const EXPECTED_ENCODING: [u8; 13] = [
            0x01, 0x50, 0x2B, 0x00, 0x2A, // version, "P+", transaction id
            0x01, 0x23, 0x45, 0x67, 0x89, 0x00, 0x00, 0x00, // device id
        ];

        let header = PacketHeader::new(Command::POWER_ON, device(), 42, HeaderLayout::Legacy);
        assert_eq!(header.to_bytes().unwrap(), EXPECTED_ENCODING);
        assert_eq!(header.timestamp(), None);

        // The fixed-width id comes back with its zero padding.
        let mut reader = SequentialReader::with_generation(&EXPECTED_ENCODING, Generation::Legacy);
        let decoded = PacketHeader::decode_for(Generation::Legacy, &mut reader).unwrap();
        assert_eq!(decoded.device_id.as_str(), "0123456789000000");
        assert_eq!(
            decoded,
            PacketHeader {
                device_id: header.device_id.to_legacy(),
                ..header
            }
        );
    }

    #[test]
    fn header_missing_timestamp() {
        let data = [0x01, 0x54, 0x00, 0x00, 0x07, 0x02, 0x12, 0x00, 0x00];
        let mut reader = SequentialReader::new(&data);
        let err = PacketHeader::decode_for(Generation::Current, &mut reader).unwrap_err();

        assert_eq!(
            err.kind(),
            DecodeErrorKind::TruncatedInput {
                needed: 4,
                remaining: 2
            }
        );
        assert_eq!(reader.position(), 0);
    }

    #[test]
    fn unknown_command() {
        let header = PacketHeader::new(
            Command::new("Z"),
            device(),
            1,
            HeaderLayout::Current { timestamp: 0 },
        );
        let err = DecodedPacket::decode_after(header, &mut SequentialReader::new(&[])).unwrap_err();

        assert_eq!(
            err.kind(),
            DecodeErrorKind::UnknownVariant {
                name: "command",
                value: b'Z'
            }
        );
    }
}
