//! Self-describing data items.
//!
//! A data item is the unit that telemetry bodies are built from. Each one
//! carries its own type code, payload format version and payload length, so
//! a decoder can step over items it does not understand and keep going.
//!
//! # Encoding
//!
//! | Field     | Size   | Description |
//! |-----------|--------|-------------|
//! | `type`    | 1      | An [`ItemType`] code. |
//! | `version` | 1      | Payload layout version within that type. |
//! | `length`  | 1 or 2 | Payload length. See [`LengthWidth`] for which width applies. |
//! | `payload` | length | Defined by `(type, version)`. |

use core::fmt;

use log::{debug, warn};

use crate::{
    decode::{Decode, DecodeError, DecodeErrorKind},
    encode::{Encode, EncodeError, MessageEncoder},
    generation::{Generation, LengthWidth},
    reader::SequentialReader,
};

pub mod info;
pub mod kv;
pub mod location;
pub mod sensor;

use info::{CustomerId, NetworkInfo, Versions};
use kv::KeyValues;
use location::Location;
use sensor::{Basic, DeviceStatus, Environment, MultiRecord, Steps};

/// A data item type code.
///
/// This is an open registry: any `u8` is a valid code, and the associated
/// constants list the ones this crate knows how to decode. Codes missing
/// from this table are carried as [`DataItem::Unknown`].
///
/// | Code | Name           | Length field |
/// |------|----------------|--------------|
/// | 0    | null           | 2 bytes      |
/// | 1    | key-value      | 2 bytes      |
/// | 10   | location       | 1 byte       |
/// | 11   | customer id    | 2 bytes      |
/// | 20   | versions       | 1 byte       |
/// | 21   | network info   | 1 byte       |
/// | 22   | device status  | 2 bytes      |
/// | 30   | steps          | 2 bytes      |
/// | 31   | environment    | 2 bytes      |
/// | 32   | multi-record   | 2 bytes      |
/// | 33   | basic          | 2 bytes      |
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ItemType(pub u8);

impl ItemType {
    pub const NULL: Self = Self(0);
    pub const KEY_VALUE: Self = Self(1);
    pub const LOCATION: Self = Self(10);
    pub const CUSTOMER_ID: Self = Self(11);
    pub const VERSIONS: Self = Self(20);
    pub const NETWORK_INFO: Self = Self(21);
    pub const DEVICE_STATUS: Self = Self(22);
    pub const STEPS: Self = Self(30);
    pub const ENVIRONMENT: Self = Self(31);
    pub const MULTI: Self = Self(32);
    pub const BASIC: Self = Self(33);

    /// Every code in the table above.
    pub const REGISTERED: [Self; 11] = [
        Self::NULL,
        Self::KEY_VALUE,
        Self::LOCATION,
        Self::CUSTOMER_ID,
        Self::VERSIONS,
        Self::NETWORK_INFO,
        Self::DEVICE_STATUS,
        Self::STEPS,
        Self::ENVIRONMENT,
        Self::MULTI,
        Self::BASIC,
    ];

    pub const fn name(self) -> Option<&'static str> {
        Some(match self {
            Self::NULL => "null",
            Self::KEY_VALUE => "key-value",
            Self::LOCATION => "location",
            Self::CUSTOMER_ID => "customer id",
            Self::VERSIONS => "versions",
            Self::NETWORK_INFO => "network info",
            Self::DEVICE_STATUS => "device status",
            Self::STEPS => "steps",
            Self::ENVIRONMENT => "environment",
            Self::MULTI => "multi-record",
            Self::BASIC => "basic",
            _ => return None,
        })
    }

    pub const fn is_registered(self) -> bool {
        self.name().is_some()
    }

    /// Length field width in the current generation.
    ///
    /// Single-value items use one byte. Everything else, including codes
    /// that are not registered yet, uses two.
    pub const fn length_width(self) -> LengthWidth {
        match self {
            Self::LOCATION | Self::VERSIONS | Self::NETWORK_INFO => LengthWidth::U8,
            _ => LengthWidth::U16,
        }
    }
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{name} ({})", self.0),
            None => write!(f, "unregistered ({})", self.0),
        }
    }
}

/// Type, version and length of a data item, as read off the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataItemHeader {
    pub item_type: ItemType,
    pub version: u8,
    pub length: u16,
}

/// A data item whose payload has been cut out but not interpreted.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RawDataItem {
    pub item_type: ItemType,
    pub version: u8,
    pub payload: Vec<u8>,
}

/// The payload of a registered data item type.
///
/// Implementors only deal with payload bytes; the envelope is written and
/// read by [`DataItem`].
pub trait Payload: Sized {
    const TYPE: ItemType;
    const VERSION: u8;

    fn encode_payload(&self, out: &mut Vec<u8>) -> Result<(), EncodeError>;

    fn decode_payload(reader: &mut SequentialReader<'_>) -> Result<Self, DecodeError>;
}

/// Writes the item envelope around whatever `payload_fn` appends.
pub(crate) fn frame_item(
    item_type: ItemType,
    version: u8,
    width: LengthWidth,
    out: &mut Vec<u8>,
    payload_fn: impl FnOnce(&mut Vec<u8>) -> Result<(), EncodeError>,
) -> Result<(), EncodeError> {
    let header_size = 2 + width.size();

    let mut enc = MessageEncoder::new(out);
    enc.write(&item_type.0)?
        .write(&version)?
        // Placeholder, patched once the payload size is known.
        .write(&[0u8, 0][..width.size()])?;

    if let Err(err) = payload_fn(enc.buffer()) {
        enc.abort();
        return Err(err);
    }

    let field = item_type.name().unwrap_or("data item");
    match width.to_bytes(field, enc.written() - header_size) {
        Ok(len) => {
            enc.patch(2, &len);
            Ok(())
        }
        Err(err) => {
            enc.abort();
            Err(err)
        }
    }
}

/// Decodes a payload and insists that it used every byte.
pub(crate) fn decode_exact<P: Payload>(payload: &[u8]) -> Result<P, DecodeError> {
    let mut reader = SequentialReader::new(payload);
    let value = P::decode_payload(&mut reader)?;

    if !reader.is_empty() {
        return Err(DecodeError::new::<P>(DecodeErrorKind::ConstraintViolation(
            "payload is longer than its fields",
        )));
    }
    Ok(value)
}

/// Every data item this crate understands, plus a passthrough for the rest.
#[derive(Debug, Clone, PartialEq)]
pub enum DataItem {
    Null,
    KeyValue(KeyValues),
    Location(Location),
    CustomerId(CustomerId),
    Versions(Versions),
    NetworkInfo(NetworkInfo),
    DeviceStatus(DeviceStatus),
    Steps(Steps),
    Environment(Environment),
    Multi(MultiRecord),
    Basic(Basic),
    /// An item with a type code or payload version this crate does not know,
    /// or a registered one whose payload did not decode.
    ///
    /// It is kept byte-for-byte so it can be forwarded unchanged.
    Unknown(RawDataItem),
}

impl DataItem {
    pub fn item_type(&self) -> ItemType {
        match self {
            Self::Null => ItemType::NULL,
            Self::KeyValue(_) => KeyValues::TYPE,
            Self::Location(_) => Location::TYPE,
            Self::CustomerId(_) => CustomerId::TYPE,
            Self::Versions(_) => Versions::TYPE,
            Self::NetworkInfo(_) => NetworkInfo::TYPE,
            Self::DeviceStatus(_) => DeviceStatus::TYPE,
            Self::Steps(_) => Steps::TYPE,
            Self::Environment(_) => Environment::TYPE,
            Self::Multi(_) => MultiRecord::TYPE,
            Self::Basic(_) => Basic::TYPE,
            Self::Unknown(raw) => raw.item_type,
        }
    }

    pub fn version(&self) -> u8 {
        match self {
            Self::Null => 0,
            Self::KeyValue(_) => KeyValues::VERSION,
            Self::Location(_) => Location::VERSION,
            Self::CustomerId(_) => CustomerId::VERSION,
            Self::Versions(_) => Versions::VERSION,
            Self::NetworkInfo(_) => NetworkInfo::VERSION,
            Self::DeviceStatus(_) => DeviceStatus::VERSION,
            Self::Steps(_) => Steps::VERSION,
            Self::Environment(_) => Environment::VERSION,
            Self::Multi(_) => MultiRecord::VERSION,
            Self::Basic(_) => Basic::VERSION,
            Self::Unknown(raw) => raw.version,
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown(_))
    }

    /// Encodes the item with the length field width `generation` uses for it.
    pub fn encode_for(&self, generation: Generation, out: &mut Vec<u8>) -> Result<(), EncodeError> {
        let width = generation.length_width(self.item_type());

        frame_item(self.item_type(), self.version(), width, out, |out| match self {
            Self::Null => Ok(()),
            Self::KeyValue(kv) => kv.encode_payload(out),
            Self::Location(location) => location.encode_payload(out),
            Self::CustomerId(id) => id.encode_payload(out),
            Self::Versions(versions) => versions.encode_payload(out),
            Self::NetworkInfo(info) => info.encode_payload(out),
            Self::DeviceStatus(status) => status.encode_payload(out),
            Self::Steps(steps) => steps.encode_payload(out),
            Self::Environment(env) => env.encode_payload(out),
            Self::Multi(multi) => multi.encode_payload(out),
            Self::Basic(basic) => basic.encode_payload(out),
            Self::Unknown(raw) => raw.payload.as_slice().encode(out),
        })
    }

    /// Interprets an item that has already been cut out of a frame.
    ///
    /// Type codes and versions without a decoder become [`DataItem::Unknown`]
    /// rather than errors, so a caller can skip them and move on.
    ///
    /// # Errors
    ///
    /// Fails if a registered payload is malformed: too short, too long for
    /// its fields, or holding an unknown location subtype.
    pub fn from_raw(raw: RawDataItem) -> Result<Self, DecodeError> {
        let payload = raw.payload.as_slice();

        Ok(match (raw.item_type, raw.version) {
            (ItemType::NULL, 0) => {
                decode_exact::<()>(payload)?;
                Self::Null
            }
            (KeyValues::TYPE, KeyValues::VERSION) => Self::KeyValue(decode_exact(payload)?),
            (Location::TYPE, Location::VERSION) => Self::Location(decode_exact(payload)?),
            (CustomerId::TYPE, CustomerId::VERSION) => Self::CustomerId(decode_exact(payload)?),
            (Versions::TYPE, Versions::VERSION) => Self::Versions(decode_exact(payload)?),
            (NetworkInfo::TYPE, NetworkInfo::VERSION) => Self::NetworkInfo(decode_exact(payload)?),
            (DeviceStatus::TYPE, DeviceStatus::VERSION) => {
                Self::DeviceStatus(decode_exact(payload)?)
            }
            (Steps::TYPE, Steps::VERSION) => Self::Steps(decode_exact(payload)?),
            (Environment::TYPE, Environment::VERSION) => Self::Environment(decode_exact(payload)?),
            (MultiRecord::TYPE, MultiRecord::VERSION) => Self::Multi(decode_exact(payload)?),
            (Basic::TYPE, Basic::VERSION) => Self::Basic(decode_exact(payload)?),
            (item_type, version) => {
                debug!(
                    "Skipping data item of type {item_type} version {version} ({} payload bytes)",
                    raw.payload.len()
                );
                Self::Unknown(raw)
            }
        })
    }

    /// Like [`DataItem::from_raw`], but keeps a malformed payload as
    /// [`DataItem::Unknown`] instead of failing.
    ///
    /// The item's length is already known, so one bad payload never stops
    /// the items after it from being read.
    pub fn from_raw_lossy(raw: RawDataItem) -> Self {
        match Self::from_raw(raw.clone()) {
            Ok(item) => item,
            Err(err) => {
                warn!("Keeping malformed {} item as raw bytes: {err}", raw.item_type);
                Self::Unknown(raw)
            }
        }
    }

    /// Reads a count byte and that many items, in the reader's generation.
    ///
    /// Only a frame that is cut short fails. Items with a malformed payload
    /// are kept raw, see [`DataItem::from_raw_lossy`].
    pub fn decode_all(reader: &mut SequentialReader<'_>) -> Result<Vec<Self>, DecodeError> {
        Ok(reader
            .read_data_items()?
            .into_iter()
            .map(Self::from_raw_lossy)
            .collect())
    }
}

/// The null item has an empty payload.
impl Payload for () {
    const TYPE: ItemType = ItemType::NULL;
    const VERSION: u8 = 0;

    fn encode_payload(&self, _out: &mut Vec<u8>) -> Result<(), EncodeError> {
        Ok(())
    }

    fn decode_payload(_reader: &mut SequentialReader<'_>) -> Result<Self, DecodeError> {
        Ok(())
    }
}

impl Encode for DataItem {
    fn encode(&self, out: &mut Vec<u8>) -> Result<(), EncodeError> {
        self.encode_for(Generation::Current, out)
    }
}

impl Decode for DataItem {
    fn decode(reader: &mut SequentialReader<'_>) -> Result<Self, DecodeError> {
        reader.read_atomic(|reader| Self::from_raw(reader.read_data_item()?))
    }
}

macro_rules! impl_from_payload {
    ($($payload:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$payload> for DataItem {
                fn from(value: $payload) -> Self {
                    Self::$variant(value)
                }
            }
        )*
    };
}

impl_from_payload!(
    KeyValues => KeyValue,
    Location => Location,
    CustomerId => CustomerId,
    Versions => Versions,
    NetworkInfo => NetworkInfo,
    DeviceStatus => DeviceStatus,
    Steps => Steps,
    Environment => Environment,
    MultiRecord => Multi,
    Basic => Basic,
    RawDataItem => Unknown,
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn steps_fixture() {
        const EXPECTED_ENCODING: [u8; 8] = [0x1E, 0x01, 0x00, 0x04, 0x00, 0x00, 0x01, 0x9C];

        let item = DataItem::from(Steps { steps: 412 });
        assert_eq!(item.to_bytes().unwrap(), EXPECTED_ENCODING);
        assert_eq!(
            DataItem::decode(&mut SequentialReader::new(&EXPECTED_ENCODING)),
            Ok(item)
        );
    }

    #[test]
    fn null_item() {
        const EXPECTED_ENCODING: [u8; 4] = [0x00, 0x00, 0x00, 0x00];

        assert_eq!(DataItem::Null.to_bytes().unwrap(), EXPECTED_ENCODING);
        assert_eq!(
            DataItem::decode(&mut SequentialReader::new(&EXPECTED_ENCODING)),
            Ok(DataItem::Null)
        );
    }

    #[test]
    fn skips_unregistered_type() {
        let mut data = vec![0x03];
        data.extend(DataItem::from(Steps { steps: 1 }).to_bytes().unwrap());
        // Type 250, version 1, 6 bytes of something new.
        data.extend([0xFA, 0x01, 0x00, 0x06, 1, 2, 3, 4, 5, 6]);
        data.extend(DataItem::from(Steps { steps: 2 }).to_bytes().unwrap());

        let items = DataItem::decode_all(&mut SequentialReader::new(&data)).unwrap();

        assert_eq!(items.len(), 3);
        assert_eq!(items[0], DataItem::Steps(Steps { steps: 1 }));
        assert_eq!(
            items[1],
            DataItem::Unknown(RawDataItem {
                item_type: ItemType(250),
                version: 1,
                payload: vec![1, 2, 3, 4, 5, 6],
            })
        );
        assert_eq!(items[2], DataItem::Steps(Steps { steps: 2 }));
    }

    #[test]
    fn malformed_item_does_not_stop_the_rest() {
        let mut data = vec![0x03];
        data.extend(DataItem::from(Steps { steps: 1 }).to_bytes().unwrap());
        // Location item with subtype 9.
        data.extend([0x0A, 0x01, 0x02, 0x09, 0x00]);
        data.extend(DataItem::from(Steps { steps: 2 }).to_bytes().unwrap());

        let mut reader = SequentialReader::new(&data);
        let items = DataItem::decode_all(&mut reader).unwrap();

        assert_eq!(
            items,
            [
                DataItem::Steps(Steps { steps: 1 }),
                DataItem::Unknown(RawDataItem {
                    item_type: ItemType::LOCATION,
                    version: 1,
                    payload: vec![0x09, 0x00],
                }),
                DataItem::Steps(Steps { steps: 2 }),
            ]
        );
        assert!(reader.is_empty());

        // Decoded on its own, the same item is still an error.
        let err = DataItem::decode(&mut SequentialReader::new(&data[9..14])).unwrap_err();
        assert_eq!(
            err.kind(),
            DecodeErrorKind::UnknownVariant {
                name: "location subtype",
                value: 9
            }
        );
    }

    #[test]
    fn unknown_version_is_kept_raw() {
        let data = [0x1E, 0x02, 0x00, 0x02, 0xAB, 0xCD];
        let item = DataItem::decode(&mut SequentialReader::new(&data)).unwrap();

        assert!(item.is_unknown());
        assert_eq!(item.item_type(), ItemType::STEPS);
        assert_eq!(item.version(), 2);
        // Forwarding it reproduces the original bytes.
        assert_eq!(item.to_bytes().unwrap(), data);
    }

    #[test]
    fn trailing_payload_bytes_are_rejected() {
        let data = [0x1E, 0x01, 0x00, 0x05, 0x00, 0x00, 0x01, 0x9C, 0xFF];
        let err = DataItem::decode(&mut SequentialReader::new(&data)).unwrap_err();

        assert_eq!(
            err.kind(),
            DecodeErrorKind::ConstraintViolation("payload is longer than its fields")
        );
    }

    #[test]
    fn short_payload_is_truncated_input() {
        let data = [0x1E, 0x01, 0x00, 0x02, 0x00, 0x01];
        let err = DataItem::decode(&mut SequentialReader::new(&data)).unwrap_err();

        assert_eq!(
            err.kind(),
            DecodeErrorKind::TruncatedInput {
                needed: 4,
                remaining: 2
            }
        );
    }

    #[test]
    fn registry_names() {
        assert!(ItemType::REGISTERED.iter().all(|t| t.is_registered()));
        assert_eq!(ItemType(250).name(), None);
        assert_eq!(ItemType::STEPS.to_string(), "steps (30)");
    }

    #[cfg(feature = "legacy")]
    #[test]
    fn legacy_items_use_one_byte_lengths() {
        let mut out = Vec::new();
        DataItem::from(Steps { steps: 412 })
            .encode_for(Generation::Legacy, &mut out)
            .unwrap();

        assert_eq!(out, [0x1E, 0x01, 0x04, 0x00, 0x00, 0x01, 0x9C]);
    }
}
