//! Per-connection session state established over the lifetime of one RTMP
//! NetConnection (4.9, 3): what `connect` told us, which stream id owns
//! which role, and where in the connect -> createStream -> publish/play
//! lifecycle we currently sit.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionPhase {
    #[default]
    Uninitialized,
    Connected,
    StreamCreated,
    Publishing,
    Playing,
}

#[derive(Debug, Default)]
pub struct Session {
    pub app_name: Option<String>,
    pub tc_url: Option<String>,
    pub flash_ver: Option<String>,
    pub object_encoding: f64,
    next_stream_id: u32,
    pub stream_key: Option<String>,
    pub subscriber_id: Option<u64>,
    /// The stream id this session most recently allocated via `createStream`,
    /// i.e. the MSID any outgoing message for its current NetStream must use.
    pub stream_id: Option<u32>,
    pub phase: SessionPhase,
}

impl Session {
    pub fn new() -> Self {
        Self {
            next_stream_id: 1,
            ..Default::default()
        }
    }

    /// Allocates the next stream id for a `createStream` call. A per-session
    /// monotonic counter, not a constant: a client that calls `createStream`
    /// more than once over the connection's life gets distinct ids. Also
    /// records the id as the session's current stream id.
    pub fn allocate_stream_id(&mut self) -> u32 {
        let id = self.next_stream_id;
        self.next_stream_id += 1;
        self.stream_id = Some(id);
        id
    }
}
