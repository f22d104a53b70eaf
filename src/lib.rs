//! Codec for a compact binary telemetry protocol used by low-bandwidth trackers and sensors.
//!
//! This crate is structured around two key traits: [`Encode`] and [`Decode`].
//! Every packet and data item in this library implements [`Encode`], and is decoded either through
//! [`Decode`] or, where its layout depends on the packet header, through a [`SequentialReader`]
//! bound to a [`Generation`].
//!
//! Two wire generations exist. Legacy devices send a fixed eight byte device id and no header
//! timestamp, while current devices send a variable length id followed by a timestamp. Support
//! for the legacy generation and its single-purpose packets sits behind the `legacy` feature.
//!
//! Received frames are usually handled through a [`PacketDecoder`], which turns a hex string or
//! a byte slice into a [`DecodedPacket`].

pub mod bcd;
pub mod decode;
pub mod decoder;
pub mod encode;
pub mod generation;
pub mod item;
pub mod packet;
pub mod reader;
pub mod response;
pub mod string;

pub use bcd::DeviceId;
pub use decode::{Decode, DecodeError, DecodeErrorKind, DecodeWithLength, ErrorCategory};
pub use decoder::{FrameError, PacketDecoder};
pub use encode::{Encode, EncodeError, MessageEncoder};
pub use generation::{Generation, LengthWidth};
pub use item::{DataItem, DataItemHeader, ItemType, Payload, RawDataItem};
pub use packet::{Command, DecodedPacket, HeaderLayout, Packet, PacketBody, PacketHeader};
pub use reader::SequentialReader;
pub use response::{parse_response_data, ResponseError};
pub use string::{VarBytes, VarString};
