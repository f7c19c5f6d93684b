//! Command messages.
//!
//! Defined by:
//! - Legacy RTMP spec, section 7.1.1
//! - Legacy RTMP spec, section 7.2

use netconnection::NetConnectionCommand;
use netstream::NetStreamCommand;
use on_status::OnStatus;
use rtmprelay_amf0::Amf0Value;

pub mod error;
pub mod netconnection;
pub mod netstream;
pub mod on_status;
pub mod reader;
pub mod writer;

pub use error::CommandError;

/// A command message: a name, a transaction id, and whatever arguments
/// the command carries, AMF0-encoded back to back.
#[derive(Debug, Clone)]
pub struct Command {
    pub transaction_id: f64,
    pub command_type: CommandType,
}

/// Wraps the [`NetConnectionCommand`], [`NetStreamCommand`] and [`OnStatus`] families.
#[derive(Debug, Clone)]
pub enum CommandType {
    NetConnection(NetConnectionCommand),
    NetStream(NetStreamCommand),
    OnStatus(OnStatus),
    /// Any command this server doesn't recognize, e.g. vendor-specific
    /// extensions some encoders send. Preserved so a caller can log it.
    Unknown { command_name: String, values: Vec<Amf0Value> },
}

/// NetStream onStatus level (7.2.2) and NetConnection connect result level (7.2.1.1).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandResultLevel {
    Warning,
    Status,
    Error,
    Unknown(String),
}
