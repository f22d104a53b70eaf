//! Configuration pushed to a device, and echoed back by it.

use std::collections::HashMap;

use super::{Command, ConfigPacket, PacketBody, PacketHeader, TelemetryPacket};
use crate::{
    decode::DecodeError,
    encode::EncodeError,
    generation::Generation,
    item::{
        kv::{decode_pairs, encode_pairs, KeyValues},
        DataItem,
    },
    reader::SequentialReader,
};

/// Configuration body.
///
/// | Field   | Size | Description |
/// |---------|------|-------------|
/// | `count` | 1    | Number of pairs. An empty body means none. |
/// | `pairs` | ...  | `count` × (key, value) [`VarString`](crate::VarString)s. |
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    pub settings: KeyValues,
}

impl Config {
    pub fn new(settings: KeyValues) -> Self {
        Self { settings }
    }

    /// Last-wins lookup of the settings.
    pub fn to_map(&self) -> HashMap<String, String> {
        self.settings.to_map()
    }
}

impl PacketBody for Config {
    fn command(&self) -> Command {
        Command::CONFIG
    }

    fn encode_body(&self, _generation: Generation, out: &mut Vec<u8>) -> Result<(), EncodeError> {
        encode_pairs(self.settings.pairs(), out)
    }

    fn decode_body(
        _header: &PacketHeader,
        reader: &mut SequentialReader<'_>,
    ) -> Result<Self, DecodeError> {
        if reader.is_empty() {
            return Ok(Self::default());
        }
        decode_pairs(reader).map(|pairs| Self::new(KeyValues::from_pairs(pairs)))
    }
}

impl ConfigPacket {
    /// Rebuilds the configuration a device echoed back as telemetry.
    ///
    /// Devices confirm a config push by reporting their settings as
    /// key-value items. The pairs of every such item are gathered in order
    /// and the header is reused under the config command.
    pub fn from_telemetry(packet: &TelemetryPacket) -> Self {
        let settings = packet
            .body
            .items
            .iter()
            .filter_map(|item| match item {
                DataItem::KeyValue(kv) => Some(kv.iter().cloned()),
                _ => None,
            })
            .flatten()
            .collect();

        let mut header = packet.header.clone();
        header.command = Command::CONFIG;

        Self {
            header,
            body: Config::new(settings),
        }
    }

    pub fn to_map(&self) -> HashMap<String, String> {
        self.body.to_map()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        bcd::DeviceId,
        encode::Encode,
        item::sensor::Steps,
        packet::{telemetry::Telemetry, HeaderLayout},
    };

    fn device() -> DeviceId {
        DeviceId::new("356938035643809").unwrap()
    }

    #[test]
    fn config_body() {
        const EXPECTED_BODY: [u8; 12] = [
            0x02, // count
            0x01, b'a', 0x02, b'1', b'0', // a = 10
            0x01, b'b', 0x03, b'o', b'f', b'f', // b = off
        ];

        let settings = KeyValues::try_from_strs([("a", "10"), ("b", "off")]).unwrap();
        let packet = ConfigPacket::new(
            device(),
            3,
            HeaderLayout::Current { timestamp: 0 },
            Config::new(settings),
        );
        let encoded = packet.to_bytes().unwrap();
        let header_len = encoded.len() - EXPECTED_BODY.len();

        assert_eq!(packet.header.command, Command::CONFIG);
        assert_eq!(encoded[header_len..], EXPECTED_BODY);

        let mut reader = SequentialReader::new(&encoded);
        let header = PacketHeader::decode_for(Generation::Current, &mut reader).unwrap();
        assert_eq!(ConfigPacket::decode_after(header, &mut reader), Ok(packet));
    }

    #[test]
    fn empty_body_is_empty_config() {
        let header = PacketHeader::new(
            Command::CONFIG,
            device(),
            1,
            HeaderLayout::Current { timestamp: 0 },
        );
        let packet = ConfigPacket::decode_after(header, &mut SequentialReader::new(&[])).unwrap();
        assert!(packet.body.settings.is_empty());
    }

    #[test]
    fn trailing_bytes_are_consumed() {
        let header = PacketHeader::new(
            Command::CONFIG,
            device(),
            1,
            HeaderLayout::Current { timestamp: 0 },
        );
        let body = [0x01, 0x01, b'a', 0x01, b'1', 0xEE, 0xEE];
        let mut reader = SequentialReader::new(&body);

        let packet = ConfigPacket::decode_after(header, &mut reader).unwrap();
        assert_eq!(packet.to_map()["a"], "1");
        assert_eq!(packet.body.settings.len(), 1);
        assert!(reader.is_empty());
    }

    #[test]
    fn from_echoed_telemetry() {
        let first = KeyValues::try_from_strs([("x", "1"), ("rate", "60")]).unwrap();
        let second = KeyValues::try_from_strs([("x", "2")]).unwrap();
        let telemetry = TelemetryPacket::new(
            device(),
            9,
            HeaderLayout::Current { timestamp: 100 },
            Telemetry::periodic(vec![
                first.into(),
                Steps { steps: 1 }.into(),
                second.into(),
            ]),
        );

        let config = ConfigPacket::from_telemetry(&telemetry);

        assert_eq!(config.header.command, Command::CONFIG);
        assert_eq!(config.header.transaction_id, 9);
        assert_eq!(config.body.settings.len(), 3);
        let map = config.to_map();
        assert_eq!(map["x"], "2");
        assert_eq!(map["rate"], "60");
    }
}
