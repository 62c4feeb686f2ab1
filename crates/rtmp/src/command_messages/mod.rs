//! Command messages.
//!
//! The client and the server exchange commands which are AMF encoded. The
//! sender sends a command message that consists of command name, transaction
//! ID, and command object that contains related parameters.
//!
//! Defined by:
//! - Legacy RTMP spec, sections 7.1.1 and 7.2

mod error;
mod reader;
mod writer;

pub mod netconnection;
pub mod netstream;
pub mod on_status;

use std::str::FromStr;

use netconnection::NetConnectionCommand;
use netstream::NetStreamCommand;
use on_status::OnStatus;
use strom_amf0::Amf0Value;

pub use self::error::CommandError;

/// Command message.
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    /// Transaction ID.
    ///
    /// The receiver processes the command and sends back the response with
    /// the same transaction ID.
    pub transaction_id: f64,
    /// Command type.
    pub command_type: CommandType,
}

/// This enum wraps the [`NetConnectionCommand`], [`NetStreamCommand`],
/// [`OnStatus`] and reply types.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandType {
    /// NetConnection command
    NetConnection(NetConnectionCommand),
    /// NetStream command
    NetStream(NetStreamCommand),
    /// onStatus command
    OnStatus(OnStatus),
    /// `_result` / `_error` reply to an RPC command
    Result(CommandResult),
    /// `onFCPublish`, the reply to `FCPublish`
    OnFcPublish {
        /// The info object, if the peer sent one.
        info: Option<Amf0Value>,
    },
    /// Any unknown command
    ///
    /// e.g. some encoders send commands that don't appear in any spec.
    Unknown(UnknownCommand),
}

/// The `_result` / `_error` reply to an RPC command, correlated by
/// transaction id.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandResult {
    /// True for `_result`, false for `_error`.
    pub success: bool,
    /// Everything after the transaction id: the command object followed by
    /// any further values. Readers tolerate extra trailing arguments.
    pub values: Vec<Amf0Value>,
}

impl CommandResult {
    /// The numeric value a `createStream` result carries after its null
    /// command object.
    pub fn stream_id(&self) -> Option<u32> {
        self.values.iter().find_map(|value| value.as_number()).map(|id| id as u32)
    }
}

/// Any unknown command
#[derive(Debug, Clone, PartialEq)]
pub struct UnknownCommand {
    /// Name of the unknown command.
    pub command_name: String,
    /// All other values of the command including the command object.
    pub values: Vec<Amf0Value>,
}

/// NetStream onStatus level (7.2.2.) and NetConnection connect result level (7.2.1.1.)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandResultLevel {
    /// Warning level.
    ///
    /// Not further explained in any spec.
    Warning,
    /// Status level.
    ///
    /// Used by [`OnStatus`] commands.
    Status,
    /// Error level.
    Error,
    /// Any other level.
    Unknown(String),
}

impl FromStr for CommandResultLevel {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "warning" => Ok(Self::Warning),
            "status" => Ok(Self::Status),
            "error" => Ok(Self::Error),
            _ => Ok(Self::Unknown(s.to_string())),
        }
    }
}

impl AsRef<str> for CommandResultLevel {
    fn as_ref(&self) -> &str {
        match self {
            Self::Warning => "warning",
            Self::Status => "status",
            Self::Error => "error",
            Self::Unknown(s) => s,
        }
    }
}

impl std::fmt::Display for CommandResultLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::CommandResultLevel;

    #[test]
    fn command_result_level_from_str() {
        assert_eq!("warning".parse::<CommandResultLevel>().unwrap(), CommandResultLevel::Warning);
        assert_eq!("status".parse::<CommandResultLevel>().unwrap(), CommandResultLevel::Status);
        assert_eq!("error".parse::<CommandResultLevel>().unwrap(), CommandResultLevel::Error);
        assert_eq!(
            "custom".parse::<CommandResultLevel>().unwrap(),
            CommandResultLevel::Unknown("custom".to_string())
        );
    }

    #[test]
    fn command_result_level_display() {
        assert_eq!(CommandResultLevel::Status.to_string(), "status");
        assert_eq!(CommandResultLevel::Unknown("custom".to_string()).to_string(), "custom");
    }
}
