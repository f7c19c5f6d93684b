use bytes::Bytes;

/// Chunk stream ID reserved for protocol control messages (5.4).
pub const CONTROL_CHUNK_STREAM_ID: u32 = 2;
/// Chunk stream ID this implementation uses for command (AMF0) messages.
pub const COMMAND_CHUNK_STREAM_ID: u32 = 3;

/// Chunk size both peers start with before any Set Chunk Size message.
pub const INIT_CHUNK_SIZE: usize = 128;
/// Chunk size the server announces in the initial control burst.
pub const CHUNK_SIZE: usize = 4096;

/// One of the four message-header compression formats (5.3.1.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ChunkType {
    /// 11-byte header: full timestamp, length, type, MSID.
    Type0 = 0,
    /// 7-byte header: timestamp delta, length, type. Inherits MSID.
    Type1 = 1,
    /// 3-byte header: timestamp delta only. Inherits MSID, length, type.
    Type2 = 2,
    /// 0-byte header. Inherits everything from the previous chunk on this CSID.
    Type3 = 3,
}

impl ChunkType {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Type0),
            1 => Some(Self::Type1),
            2 => Some(Self::Type2),
            3 => Some(Self::Type3),
            _ => None,
        }
    }
}

/// The basic header: a format code plus a chunk stream id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkBasicHeader {
    pub chunk_stream_id: u32,
}

/// The message header fields a chunk carries, fully resolved (after
/// inheritance and extended-timestamp expansion have been applied).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkMessageHeader {
    pub timestamp: u32,
    pub msg_length: u32,
    /// Raw message type id byte. Interpreting this as a [`crate::messages::MessageType`]
    /// is the message layer's job, not the chunk layer's.
    pub msg_type_id: u8,
    pub msg_stream_id: u32,
}

impl ChunkMessageHeader {
    /// True when the 3-byte timestamp field must be replaced with the
    /// extended-timestamp marker `0xFFFFFF` plus a trailing 4-byte field.
    pub fn is_extended_timestamp(&self) -> bool {
        self.timestamp >= 0xFFFFFF
    }
}

/// A fully reassembled chunk: a complete RTMP message plus the chunk stream
/// metadata it arrived on.
#[derive(Debug, Clone)]
pub struct Chunk {
    pub basic_header: ChunkBasicHeader,
    pub message_header: ChunkMessageHeader,
    pub payload: Bytes,
}

impl Chunk {
    pub fn new(chunk_stream_id: u32, timestamp: u32, msg_type_id: u8, msg_stream_id: u32, payload: Bytes) -> Self {
        Self {
            basic_header: ChunkBasicHeader { chunk_stream_id },
            message_header: ChunkMessageHeader {
                timestamp,
                msg_length: payload.len() as u32,
                msg_type_id,
                msg_stream_id,
            },
            payload,
        }
    }
}
