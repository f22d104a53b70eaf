//! Sensor readings.
//!
//! Temperature and humidity travel as signed 16-bit tenths of a unit
//! (`21.5` is sent as `215`), so they must lie within `-3276.8..=3276.7`.
//! Values outside that range saturate with a warning; the `strict`
//! constructors reject them instead.

use log::warn;

use super::{ItemType, Payload};
use crate::{
    decode::{Decode, DecodeError, DecodeWithLength},
    encode::{EncodeError, MessageEncoder},
    reader::SequentialReader,
};

/// Most records a [`MultiRecord`] can carry.
pub const MAX_RECORDS: usize = u8::MAX as usize;

fn fits_tenths(value: f32) -> bool {
    (f32::from(i16::MIN)..=f32::from(i16::MAX)).contains(&(value * 10.0).round())
}

fn to_tenths(value: f32) -> i16 {
    if !fits_tenths(value) {
        warn!("{value} does not fit in signed tenths, saturating");
    }
    (value * 10.0).round() as i16
}

fn checked_tenths(field: &'static str, value: f32) -> Result<f32, EncodeError> {
    if fits_tenths(value) {
        Ok(value)
    } else {
        Err(EncodeError::OutOfRange { field })
    }
}

fn from_tenths(raw: i16) -> f32 {
    f32::from(raw) / 10.0
}

/// Step counter reading.
///
/// | Field   | Size | Description |
/// |---------|------|-------------|
/// | `steps` | 4    | Steps counted. |
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Steps {
    pub steps: u32,
}

impl Payload for Steps {
    const TYPE: ItemType = ItemType::STEPS;
    const VERSION: u8 = 1;

    fn encode_payload(&self, out: &mut Vec<u8>) -> Result<(), EncodeError> {
        MessageEncoder::new(out).write(&self.steps)?;
        Ok(())
    }

    fn decode_payload(reader: &mut SequentialReader<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            steps: reader.read_u32()?,
        })
    }
}

/// Battery and radio health.
///
/// | Field     | Size | Description |
/// |-----------|------|-------------|
/// | `battery` | 1    | Battery percentage. |
/// | `rssi`    | 1    | Modem signal quality as reported by the modem. |
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct DeviceStatus {
    pub battery: u8,
    pub rssi: u8,
}

impl Payload for DeviceStatus {
    const TYPE: ItemType = ItemType::DEVICE_STATUS;
    const VERSION: u8 = 1;

    fn encode_payload(&self, out: &mut Vec<u8>) -> Result<(), EncodeError> {
        MessageEncoder::new(out)
            .write(&self.battery)?
            .write(&self.rssi)?;
        Ok(())
    }

    fn decode_payload(reader: &mut SequentialReader<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            battery: reader.read_u8()?,
            rssi: reader.read_u8()?,
        })
    }
}

/// Ambient conditions.
///
/// | Field          | Size | Description |
/// |----------------|------|-------------|
/// | `temperature`  | 2    | °C, tenths, signed. |
/// | `humidity`     | 2    | %RH, tenths, signed. |
/// | `illumination` | 2    | Lux. |
/// | `motion`       | 1    | Non-zero when motion was detected. |
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Environment {
    pub temperature: f32,
    pub humidity: f32,
    pub illumination: u16,
    pub motion: bool,
}

impl Environment {
    /// Builds a reading, refusing temperatures and humidities that would
    /// saturate on the wire.
    pub fn strict(
        temperature: f32,
        humidity: f32,
        illumination: u16,
        motion: bool,
    ) -> Result<Self, EncodeError> {
        Ok(Self {
            temperature: checked_tenths("temperature", temperature)?,
            humidity: checked_tenths("humidity", humidity)?,
            illumination,
            motion,
        })
    }
}

impl Payload for Environment {
    const TYPE: ItemType = ItemType::ENVIRONMENT;
    const VERSION: u8 = 1;

    fn encode_payload(&self, out: &mut Vec<u8>) -> Result<(), EncodeError> {
        MessageEncoder::new(out)
            .write(&to_tenths(self.temperature))?
            .write(&to_tenths(self.humidity))?
            .write(&self.illumination)?
            .write(&u8::from(self.motion))?;
        Ok(())
    }

    fn decode_payload(reader: &mut SequentialReader<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            temperature: from_tenths(reader.read()?),
            humidity: from_tenths(reader.read()?),
            illumination: reader.read_u16()?,
            motion: reader.read_u8()? != 0,
        })
    }
}

/// Temperature with battery and signal, as sent by the simplest trackers.
///
/// | Field         | Size | Description |
/// |---------------|------|-------------|
/// | `temperature` | 2    | °C, tenths, signed. |
/// | `battery`     | 1    | Battery percentage. |
/// | `rssi`        | 1    | Modem signal quality. |
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Basic {
    pub temperature: f32,
    pub battery: u8,
    pub rssi: u8,
}

impl Basic {
    /// Builds a reading, refusing a temperature that would saturate.
    pub fn strict(temperature: f32, battery: u8, rssi: u8) -> Result<Self, EncodeError> {
        Ok(Self {
            temperature: checked_tenths("temperature", temperature)?,
            battery,
            rssi,
        })
    }
}

impl Payload for Basic {
    const TYPE: ItemType = ItemType::BASIC;
    const VERSION: u8 = 1;

    fn encode_payload(&self, out: &mut Vec<u8>) -> Result<(), EncodeError> {
        MessageEncoder::new(out)
            .write(&to_tenths(self.temperature))?
            .write(&self.battery)?
            .write(&self.rssi)?;
        Ok(())
    }

    fn decode_payload(reader: &mut SequentialReader<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            temperature: from_tenths(reader.read()?),
            battery: reader.read_u8()?,
            rssi: reader.read_u8()?,
        })
    }
}

/// One sample in a [`MultiRecord`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Record {
    pub temperature: f32,
    pub humidity: f32,
}

impl Record {
    pub fn strict(temperature: f32, humidity: f32) -> Result<Self, EncodeError> {
        Ok(Self {
            temperature: checked_tenths("temperature", temperature)?,
            humidity: checked_tenths("humidity", humidity)?,
        })
    }
}

impl Decode for Record {
    fn decode(reader: &mut SequentialReader<'_>) -> Result<Self, DecodeError> {
        reader.read_atomic(|reader| {
            Ok(Self {
                temperature: from_tenths(reader.read()?),
                humidity: from_tenths(reader.read()?),
            })
        })
    }
}

/// A batch of evenly spaced temperature/humidity samples.
///
/// | Field             | Size      | Description |
/// |-------------------|-----------|-------------|
/// | `first_timestamp` | 4         | Unix seconds of the first sample. |
/// | `interval`        | 2         | Seconds between samples. |
/// | `count`           | 1         | Number of records. |
/// | `records`         | 4 × count | `i16` temperature and `i16` humidity, tenths. |
///
/// At most [`MAX_RECORDS`] records are sent. Any beyond that are dropped
/// when encoding, with a warning, rather than failing the whole item.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MultiRecord {
    pub first_timestamp: u32,
    pub interval: u16,
    pub records: Vec<Record>,
}

impl MultiRecord {
    pub fn new(first_timestamp: u32, interval: u16, records: Vec<Record>) -> Self {
        Self {
            first_timestamp,
            interval,
            records,
        }
    }

    /// Like [`MultiRecord::new`], but refuses more than [`MAX_RECORDS`] records.
    pub fn strict(
        first_timestamp: u32,
        interval: u16,
        records: Vec<Record>,
    ) -> Result<Self, EncodeError> {
        if records.len() > MAX_RECORDS {
            return Err(EncodeError::TooLong {
                field: "multi-record records",
                len: records.len(),
                max: MAX_RECORDS,
            });
        }
        Ok(Self::new(first_timestamp, interval, records))
    }

    /// Unix timestamp of the record at `index`.
    pub fn timestamp_of(&self, index: usize) -> u64 {
        u64::from(self.first_timestamp) + u64::from(self.interval) * index as u64
    }
}

impl Payload for MultiRecord {
    const TYPE: ItemType = ItemType::MULTI;
    const VERSION: u8 = 1;

    fn encode_payload(&self, out: &mut Vec<u8>) -> Result<(), EncodeError> {
        if self.records.len() > MAX_RECORDS {
            warn!(
                "Dropping {} of {} multi-record samples",
                self.records.len() - MAX_RECORDS,
                self.records.len()
            );
        }
        let records = &self.records[..self.records.len().min(MAX_RECORDS)];

        let mut enc = MessageEncoder::new(out);
        enc.write(&self.first_timestamp)?
            .write(&self.interval)?
            .write(&(records.len() as u8))?;
        for record in records {
            enc.write(&to_tenths(record.temperature))?
                .write(&to_tenths(record.humidity))?;
        }
        Ok(())
    }

    fn decode_payload(reader: &mut SequentialReader<'_>) -> Result<Self, DecodeError> {
        let first_timestamp = reader.read_u32()?;
        let interval = reader.read_u16()?;
        let count = reader.read_u8()? as usize;
        let records = Vec::<Record>::decode_with_len(reader, count)?;

        Ok(Self {
            first_timestamp,
            interval,
            records,
        })
    }
}
