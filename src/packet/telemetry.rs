//! Telemetry: a batch of data items sent by a device.

use log::warn;

use super::{Command, PacketBody, PacketHeader};
use crate::{
    decode::{DecodeError, DecodeErrorKind},
    encode::{EncodeError, MessageEncoder},
    generation::Generation,
    item::DataItem,
    reader::SequentialReader,
};

/// Most items one telemetry packet can carry.
pub const MAX_ITEMS: usize = u8::MAX as usize;

/// Why a telemetry packet was sent. The command code carries this.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum TelemetryEvent {
    /// Scheduled report (`T`).
    #[default]
    Periodic,
    /// The device started moving (`M+`).
    MotionStart,
    /// The device came to rest (`M-`).
    MotionStop,
}

impl TelemetryEvent {
    pub const fn command(self) -> Command {
        match self {
            Self::Periodic => Command::TELEMETRY,
            Self::MotionStart => Command::MOTION_START,
            Self::MotionStop => Command::MOTION_STOP,
        }
    }

    pub const fn from_command(command: Command) -> Option<Self> {
        match command {
            Command::TELEMETRY => Some(Self::Periodic),
            Command::MOTION_START => Some(Self::MotionStart),
            Command::MOTION_STOP => Some(Self::MotionStop),
            _ => None,
        }
    }
}

/// Telemetry body.
///
/// | Field   | Size | Description |
/// |---------|------|-------------|
/// | `count` | 1    | Number of items. |
/// | `items` | ...  | `count` [`DataItem`]s, in order. |
///
/// The report time is the header timestamp.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Telemetry {
    pub event: TelemetryEvent,
    pub items: Vec<DataItem>,
}

impl Telemetry {
    pub fn new(event: TelemetryEvent, items: Vec<DataItem>) -> Self {
        Self { event, items }
    }

    pub fn periodic(items: Vec<DataItem>) -> Self {
        Self::new(TelemetryEvent::Periodic, items)
    }

    /// Items of a registered type, skipping the ones carried as raw bytes.
    pub fn known_items(&self) -> impl Iterator<Item = &DataItem> {
        self.items.iter().filter(|item| !item.is_unknown())
    }
}

/// Writes a count byte and up to [`MAX_ITEMS`] items.
pub(crate) fn encode_items(
    items: &[DataItem],
    generation: Generation,
    out: &mut Vec<u8>,
) -> Result<(), EncodeError> {
    if items.len() > MAX_ITEMS {
        warn!(
            "Dropping {} of {} data items",
            items.len() - MAX_ITEMS,
            items.len()
        );
    }
    let items = &items[..items.len().min(MAX_ITEMS)];

    let mut enc = MessageEncoder::new(out);
    enc.write(&(items.len() as u8))?;
    for item in items {
        if let Err(err) = item.encode_for(generation, enc.buffer()) {
            enc.abort();
            return Err(err);
        }
    }
    Ok(())
}

impl PacketBody for Telemetry {
    fn command(&self) -> Command {
        self.event.command()
    }

    fn encode_body(&self, generation: Generation, out: &mut Vec<u8>) -> Result<(), EncodeError> {
        encode_items(&self.items, generation, out)
    }

    fn decode_body(
        header: &PacketHeader,
        reader: &mut SequentialReader<'_>,
    ) -> Result<Self, DecodeError> {
        let event = TelemetryEvent::from_command(header.command).ok_or_else(|| {
            DecodeError::new::<Self>(DecodeErrorKind::UnknownVariant {
                name: "telemetry command",
                value: header.command.0[0],
            })
        })?;
        let items = DataItem::decode_all(reader)?;

        Ok(Self { event, items })
    }
}
