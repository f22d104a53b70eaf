//! Single-purpose packets from the fixed-width header generation.
//!
//! Later firmware folds both into telemetry: power-on details become data
//! items, and motion becomes a [`TelemetryEvent`](super::telemetry::TelemetryEvent).

use super::{telemetry::encode_items, Command, PacketBody, PacketHeader};
use crate::{
    decode::{DecodeError, DecodeErrorKind},
    encode::{EncodeError, MessageEncoder},
    generation::Generation,
    item::{
        info::{CustomerId, NetworkInfo, Versions},
        location::Location,
        DataItem, Payload,
    },
    reader::SequentialReader,
};

/// Sent once after boot.
///
/// | Field         | Size | Description |
/// |---------------|------|-------------|
/// | `customer_id` | 1+N  | Raw customer id bytes. |
/// | `software`    | 1+N  | Application firmware version. |
/// | `modem`       | 1+N  | Modem firmware version. |
/// | `mcc`         | 1+N  | Mobile country code. |
/// | `mnc`         | 1+N  | Mobile network code. |
/// | `rat`         | 1+N  | Radio access technology. |
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PowerOn {
    pub customer_id: CustomerId,
    pub versions: Versions,
    pub network: NetworkInfo,
}

impl PacketBody for PowerOn {
    fn command(&self) -> Command {
        Command::POWER_ON
    }

    fn encode_body(&self, _generation: Generation, out: &mut Vec<u8>) -> Result<(), EncodeError> {
        let mut enc = MessageEncoder::new(out);
        enc.write(&self.customer_id)?;

        let result = self
            .versions
            .encode_payload(enc.buffer())
            .and_then(|()| self.network.encode_payload(enc.buffer()));
        if let Err(err) = result {
            enc.abort();
            return Err(err);
        }
        Ok(())
    }

    fn decode_body(
        _header: &PacketHeader,
        reader: &mut SequentialReader<'_>,
    ) -> Result<Self, DecodeError> {
        reader.read_atomic(|reader| {
            Ok(Self {
                customer_id: reader.read()?,
                versions: Versions::decode_payload(reader)?,
                network: NetworkInfo::decode_payload(reader)?,
            })
        })
    }
}

/// Whether a [`Motion`] packet marks the start or the end of movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MotionEvent {
    Start,
    Stop,
}

/// Sent when the device starts or stops moving.
///
/// | Field       | Size | Description |
/// |-------------|------|-------------|
/// | `timestamp` | 4    | Unix seconds. |
/// | `location`  | 3+N  | A location [`DataItem`], header included. |
/// | `count`     | 1    | Number of items that follow. |
/// | `items`     | ...  | `count` [`DataItem`]s. |
#[derive(Debug, Clone, PartialEq)]
pub struct Motion {
    pub event: MotionEvent,
    pub timestamp: u32,
    pub location: Location,
    pub items: Vec<DataItem>,
}

impl PacketBody for Motion {
    fn command(&self) -> Command {
        match self.event {
            MotionEvent::Start => Command::MOTION_START,
            MotionEvent::Stop => Command::MOTION_STOP,
        }
    }

    fn encode_body(&self, generation: Generation, out: &mut Vec<u8>) -> Result<(), EncodeError> {
        let mut enc = MessageEncoder::new(out);
        enc.write(&self.timestamp)?;

        let result = DataItem::Location(self.location.clone())
            .encode_for(generation, enc.buffer())
            .and_then(|()| encode_items(&self.items, generation, enc.buffer()));
        if let Err(err) = result {
            enc.abort();
            return Err(err);
        }
        Ok(())
    }

    fn decode_body(
        header: &PacketHeader,
        reader: &mut SequentialReader<'_>,
    ) -> Result<Self, DecodeError> {
        let event = match header.command {
            Command::MOTION_START => MotionEvent::Start,
            Command::MOTION_STOP => MotionEvent::Stop,
            command => {
                return Err(DecodeError::new::<Self>(DecodeErrorKind::UnknownVariant {
                    name: "motion command",
                    value: command.0[0],
                }))
            }
        };

        reader.read_atomic(|reader| {
            let timestamp = reader.read_u32()?;
            let first = reader.read_data_item()?;
            let DataItem::Location(location) = DataItem::from_raw(first)? else {
                return Err(DecodeError::new::<Self>(DecodeErrorKind::ConstraintViolation(
                    "motion packet does not start with a location",
                )));
            };
            let items = DataItem::decode_all(reader)?;

            Ok(Self {
                event,
                timestamp,
                location,
                items,
            })
        })
    }
}
