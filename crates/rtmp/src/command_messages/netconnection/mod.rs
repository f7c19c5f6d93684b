//! NetConnection command messages (legacy RTMP spec, 7.2.1).

use rtmprelay_amf0::Amf0Object;

use super::on_status::codes::NET_CONNECTION_CONNECT_SUCCESS;
use crate::command_messages::CommandResultLevel;

pub mod reader;
pub mod writer;

/// NetConnection command `connect`.
#[derive(Debug, Clone, PartialEq)]
pub struct NetConnectionCommandConnect {
    /// Application name the client wants to connect to. Treated as the
    /// stream registry's app-scope key.
    pub app: String,
    /// Every other property of the connect command object.
    pub others: Amf0Object,
}

/// NetConnection command `connect` result, sent server to client.
#[derive(Debug, Clone, PartialEq)]
pub struct NetConnectionCommandConnectResult {
    pub fmsver: String,
    pub capabilities: f64,
    pub level: CommandResultLevel,
    pub code: String,
    pub description: String,
    pub encoding: f64,
}

impl Default for NetConnectionCommandConnectResult {
    fn default() -> Self {
        Self {
            fmsver: "FMS/3,0,1,123".to_owned(),
            capabilities: 31.0,
            level: CommandResultLevel::Status,
            code: NET_CONNECTION_CONNECT_SUCCESS.to_owned(),
            description: "Connection Succeeded.".to_owned(),
            encoding: 0.0,
        }
    }
}

/// NetConnection commands as defined in 7.2.1.
#[derive(Debug, Clone, PartialEq)]
pub enum NetConnectionCommand {
    Connect(NetConnectionCommandConnect),
    /// Sent from server to client in response to [`NetConnectionCommand::Connect`].
    ConnectResult(NetConnectionCommandConnectResult),
    Call {
        command_object: rtmprelay_amf0::Amf0Value,
    },
    Close,
    CreateStream,
    /// Sent from server to client in response to [`NetConnectionCommand::CreateStream`].
    CreateStreamResult {
        stream_id: f64,
    },
}
