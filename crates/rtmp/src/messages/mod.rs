//! Message types and definitions.

use bytes::Bytes;
use num_derive::FromPrimitive;

use crate::command_messages::Command;
use crate::protocol_control_messages::{
    ProtocolControlMessageSetChunkSize, ProtocolControlMessageSetPeerBandwidth,
    ProtocolControlMessageWindowAcknowledgementSize,
};

pub mod errors;
pub mod reader;

pub use errors::MessageError;

/// Different types of messages that can be sent or received.
///
/// Defined by:
/// - Legacy RTMP spec, 5.4
#[derive(Debug)]
pub enum MessageData {
    SetChunkSize(ProtocolControlMessageSetChunkSize),
    SetAcknowledgementWindowSize(ProtocolControlMessageWindowAcknowledgementSize),
    SetPeerBandwidth(ProtocolControlMessageSetPeerBandwidth),
    /// > Command messages carry the AMF-encoded commands between the client and the server.
    Amf0Command(Command),
    /// > The client or the server sends this message to send Metadata or any
    /// > user data to the peer.
    DataAmf0 { data: Bytes },
    /// Usually contains FLV AUDIODATA.
    AudioData { data: Bytes },
    /// Usually contains FLV VIDEODATA.
    VideoData { data: Bytes },
    /// Any message type this server doesn't act on, kept for logging/passthrough.
    Other { msg_type_id: u8, data: Bytes },
}

/// One byte field to represent the message type.
///
/// A range of type IDs (1-6) are reserved for protocol control messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive)]
#[repr(u8)]
pub enum MessageType {
    SetChunkSize = 1,
    Abort = 2,
    Acknowledgement = 3,
    UserControlEvent = 4,
    WindowAcknowledgementSize = 5,
    SetPeerBandwidth = 6,
    Audio = 8,
    Video = 9,
    DataAmf3 = 15,
    SharedObjAmf3 = 16,
    CommandAmf3 = 17,
    DataAmf0 = 18,
    SharedObjAmf0 = 19,
    CommandAmf0 = 20,
    Aggregate = 22,
}
