//! Firmware update requests and the progress reports that answer them.

use core::fmt;

use super::{Command, PacketBody, PacketHeader};
use crate::{
    decode::DecodeError,
    encode::{EncodeError, MessageEncoder},
    generation::Generation,
    reader::SequentialReader,
    string::VarString,
};

/// Asks a device to update one of its components.
///
/// | Field       | Size | Description |
/// |-------------|------|-------------|
/// | `component` | 1+N  | Which firmware to update. |
/// | `url`       | 1+N  | Where to download the image from. |
/// | `arguments` | 1+N  | Component-specific options. May be empty. |
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct UpdateRequest {
    pub component: VarString,
    pub url: VarString,
    pub arguments: VarString,
}

impl PacketBody for UpdateRequest {
    fn command(&self) -> Command {
        Command::UPDATE_REQUEST
    }

    fn encode_body(&self, _generation: Generation, out: &mut Vec<u8>) -> Result<(), EncodeError> {
        MessageEncoder::new(out)
            .write(&self.component)?
            .write(&self.url)?
            .write(&self.arguments)?;
        Ok(())
    }

    fn decode_body(
        _header: &PacketHeader,
        reader: &mut SequentialReader<'_>,
    ) -> Result<Self, DecodeError> {
        reader.read_atomic(|reader| {
            Ok(Self {
                component: reader.read_var_string()?,
                url: reader.read_var_string()?,
                arguments: reader.read_var_string()?,
            })
        })
    }
}

/// Progress of an update, as reported by the device.
///
/// Statuses outside the known set are kept so newer firmware can report
/// states this crate does not know about. Ones built with
/// [`UpdateState::new`] are lower-cased; ones received from a device are
/// kept as sent.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum UpdateState {
    Waiting,
    Started,
    Success,
    Failed,
    Other(VarString),
}

impl UpdateState {
    /// Parses a status, ignoring case.
    ///
    /// # Errors
    ///
    /// Only fails if an unrecognised status is not ASCII.
    pub fn new(status: &str) -> Result<Self, EncodeError> {
        VarString::new(status.to_ascii_lowercase()).map(Self::from_wire)
    }

    fn from_wire(status: VarString) -> Self {
        match status.to_ascii_lowercase().as_str() {
            "waiting" => Self::Waiting,
            "started" => Self::Started,
            "success" => Self::Success,
            "failed" => Self::Failed,
            _ => Self::Other(status),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Waiting => "waiting",
            Self::Started => "started",
            Self::Success => "success",
            Self::Failed => "failed",
            Self::Other(status) => status.as_str(),
        }
    }

    /// Whether the update has finished, one way or the other.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Success | Self::Failed)
    }
}

impl fmt::Display for UpdateState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reports how an update is going.
///
/// | Field       | Size | Description |
/// |-------------|------|-------------|
/// | `component` | 1+N  | Component being updated. |
/// | `status`    | 1+N  | One of `waiting`, `started`, `success`, `failed`. |
/// | `result`    | 1+N  | Free-form detail, such as an error message. |
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UpdateStatus {
    pub component: VarString,
    pub status: UpdateState,
    pub result: VarString,
}

impl PacketBody for UpdateStatus {
    fn command(&self) -> Command {
        Command::UPDATE_STATUS
    }

    fn encode_body(&self, _generation: Generation, out: &mut Vec<u8>) -> Result<(), EncodeError> {
        let status = match &self.status {
            UpdateState::Other(status) => status.clone(),
            known => VarString::new(known.as_str())?,
        };

        MessageEncoder::new(out)
            .write(&self.component)?
            .write(&status)?
            .write(&self.result)?;
        Ok(())
    }

    fn decode_body(
        _header: &PacketHeader,
        reader: &mut SequentialReader<'_>,
    ) -> Result<Self, DecodeError> {
        reader.read_atomic(|reader| {
            Ok(Self {
                component: reader.read_var_string()?,
                status: UpdateState::from_wire(reader.read_var_string()?),
                result: reader.read_var_string()?,
            })
        })
    }
}
