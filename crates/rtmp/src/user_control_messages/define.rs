use bytes::Bytes;

/// The type of user control message event.
///
/// Defined by:
/// - Legacy RTMP spec, 6.2
#[derive(Debug, PartialEq, Eq, Clone, Copy, num_derive::FromPrimitive)]
#[repr(u16)]
pub enum EventType {
    StreamBegin = 0,
    StreamEof = 1,
    StreamDry = 2,
    SetBufferLength = 3,
    StreamIsRecorded = 4,
    PingRequest = 6,
    PingResponse = 7,
}

/// A user control event (legacy RTMP spec, 6.2), fully parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserControlEvent {
    /// Sent by the server once a stream id is ready for communication.
    StreamBegin { stream_id: u32 },
    /// Sent by the server when playback on a stream has ended.
    StreamEof { stream_id: u32 },
    /// Sent by the server when a stream has no data available.
    StreamDry { stream_id: u32 },
    /// Sent by the client to advertise its client-side buffer length, in milliseconds.
    SetBufferLength { stream_id: u32, buffer_length_ms: u32 },
    /// Sent by the server to mark a stream as a recorded (non-live) stream.
    StreamIsRecorded { stream_id: u32 },
    /// Sent by the server to check that the client is still reachable.
    PingRequest { timestamp: u32 },
    /// Sent by the client in response to a [`UserControlEvent::PingRequest`].
    PingResponse { timestamp: u32 },
    /// Any event type this server doesn't assign dedicated handling to.
    Other { event_type: u16, data: Bytes },
}
