//! Where the device is.

use super::{ItemType, Payload};
use crate::{
    decode::{DecodeError, DecodeErrorKind},
    encode::{EncodeError, MessageEncoder},
    reader::SequentialReader,
    string::VarString,
};

/// A position fix, or the cell tower standing in for one.
///
/// The payload starts with a subtype byte that picks the layout:
///
/// | Subtype | Name   | Fields |
/// |---------|--------|--------|
/// | 1       | GNSS   | `f32` latitude, `f32` longitude |
/// | 2       | Cell   | mcc, mnc, lac, cell id [`VarString`]s, then `i8` rssi |
#[derive(Debug, Clone, PartialEq)]
pub enum Location {
    Gnss { latitude: f32, longitude: f32 },
    Cell(CellTower),
}

/// The serving cell of a device without a satellite fix.
#[derive(Debug, Default, Clone, PartialEq, Eq, Hash)]
pub struct CellTower {
    pub mcc: VarString,
    pub mnc: VarString,
    pub lac: VarString,
    pub cell_id: VarString,
    /// Signal strength in dBm.
    pub rssi: i8,
}

impl Location {
    pub const GNSS: u8 = 1;
    pub const CELL: u8 = 2;

    pub const fn gnss(latitude: f32, longitude: f32) -> Self {
        Self::Gnss {
            latitude,
            longitude,
        }
    }

    pub const fn subtype(&self) -> u8 {
        match self {
            Self::Gnss { .. } => Self::GNSS,
            Self::Cell(_) => Self::CELL,
        }
    }
}

impl From<CellTower> for Location {
    fn from(cell: CellTower) -> Self {
        Self::Cell(cell)
    }
}

impl Payload for Location {
    const TYPE: ItemType = ItemType::LOCATION;
    const VERSION: u8 = 1;

    fn encode_payload(&self, out: &mut Vec<u8>) -> Result<(), EncodeError> {
        let mut enc = MessageEncoder::new(out);
        enc.write(&self.subtype())?;

        match self {
            Self::Gnss {
                latitude,
                longitude,
            } => {
                enc.write(latitude)?.write(longitude)?;
            }
            Self::Cell(cell) => {
                enc.write(&cell.mcc)?
                    .write(&cell.mnc)?
                    .write(&cell.lac)?
                    .write(&cell.cell_id)?
                    .write(&cell.rssi)?;
            }
        }
        Ok(())
    }

    fn decode_payload(reader: &mut SequentialReader<'_>) -> Result<Self, DecodeError> {
        reader.read_atomic(|reader| match reader.read_u8()? {
            Self::GNSS => Ok(Self::Gnss {
                latitude: reader.read()?,
                longitude: reader.read()?,
            }),
            Self::CELL => Ok(Self::Cell(CellTower {
                mcc: reader.read_var_string()?,
                mnc: reader.read_var_string()?,
                lac: reader.read_var_string()?,
                cell_id: reader.read_var_string()?,
                rssi: reader.read()?,
            })),
            subtype => Err(DecodeError::new::<Self>(DecodeErrorKind::UnknownVariant {
                name: "location subtype",
                value: subtype,
            })),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        decode::{Decode, ErrorCategory},
        encode::Encode,
        item::{decode_exact, DataItem},
    };

    #[test]
    fn gnss_item() {
        let location = Location::gnss(37.422, -122.084);
        let encoded = DataItem::from(location.clone()).to_bytes().unwrap();

        // Type 10, version 1, 1-byte length of 9.
        assert_eq!(encoded[..4], [0x0A, 0x01, 0x09, Location::GNSS]);
        assert_eq!(encoded.len(), 3 + 9);

        let Ok(DataItem::Location(Location::Gnss {
            latitude,
            longitude,
        })) = DataItem::decode(&mut SequentialReader::new(&encoded))
        else {
            panic!("expected a GNSS location");
        };
        assert!((latitude - 37.422).abs() < 1e-5);
        assert!((longitude - -122.084).abs() < 1e-5);
    }

    #[test]
    fn cell_payload() {
        const EXPECTED_ENCODING: [u8; 18] = [
            0x02, // subtype
            0x03, b'3', b'1', b'0', // mcc
            0x03, b'4', b'1', b'0', // mnc
            0x02, b'1', b'2', // lac
            0x04, b'a', b'b', b'c', b'd', // cell id
            0xB5, // -75 dBm
        ];

        let location = Location::from(CellTower {
            mcc: VarString::new("310").unwrap(),
            mnc: VarString::new("410").unwrap(),
            lac: VarString::new("12").unwrap(),
            cell_id: VarString::new("abcd").unwrap(),
            rssi: -75,
        });
        let mut payload = Vec::new();
        location.encode_payload(&mut payload).unwrap();

        assert_eq!(payload, EXPECTED_ENCODING);
        assert_eq!(decode_exact::<Location>(&payload), Ok(location));
    }

    #[test]
    fn unknown_subtype() {
        let err = decode_exact::<Location>(&[0x07, 0x00]).unwrap_err();

        assert_eq!(
            err.kind(),
            DecodeErrorKind::UnknownVariant {
                name: "location subtype",
                value: 7
            }
        );
        assert_eq!(err.category(), ErrorCategory::UnknownVariant);
    }
}
