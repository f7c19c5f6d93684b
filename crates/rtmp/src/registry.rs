//! Stream registry and fan-out fabric (4.8).
//!
//! A stream is addressed by `app + "/" + streamName`. At most one publisher may
//! bind to a stream at a time (I1); broadcasting is snapshot-then-release so a
//! slow subscriber can never hold up the publisher's read loop.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, RwLock};

use bytes::Bytes;
use tokio::sync::mpsc;

use crate::chunk::Chunk;
use crate::media::{AudioCodec, VideoCodec};

/// Handle used by the registry to push chunks into a subscriber's outbound queue.
pub type SubscriberSink = mpsc::Sender<Chunk>;

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("stream {0} already has a publisher")]
    DuplicatePublisher(String),
}

struct Subscriber {
    id: u64,
    /// The stream id this subscriber's own `createStream` allocated; every
    /// message forwarded to it must carry this MSID, not the publisher's.
    msid: u32,
    sink: SubscriberSink,
}

/// Cached state of one named stream.
pub struct Stream {
    key: String,
    publisher_conn_id: Option<u64>,
    subscribers: Vec<Subscriber>,
    video_sequence_header: Option<Bytes>,
    audio_sequence_header: Option<Bytes>,
    video_codec: Option<VideoCodec>,
    audio_codec: Option<AudioCodec>,
    has_recorder: bool,
}

impl Stream {
    fn new(key: String) -> Self {
        Self {
            key,
            publisher_conn_id: None,
            subscribers: Vec::new(),
            video_sequence_header: None,
            audio_sequence_header: None,
            video_codec: None,
            audio_codec: None,
            has_recorder: false,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn has_publisher(&self) -> bool {
        self.publisher_conn_id.is_some()
    }

    pub fn video_codec(&self) -> Option<VideoCodec> {
        self.video_codec
    }

    pub fn audio_codec(&self) -> Option<AudioCodec> {
        self.audio_codec
    }

    pub fn set_video_codec(&mut self, codec: VideoCodec) {
        if self.video_codec.is_none() {
            self.video_codec = Some(codec);
        }
    }

    pub fn set_audio_codec(&mut self, codec: AudioCodec) {
        if self.audio_codec.is_none() {
            self.audio_codec = Some(codec);
        }
    }

    /// Caches a sequence header. The caller's buffer is never aliased: this
    /// always stores an owned copy independent of the publisher's chunk buffer.
    pub fn cache_video_sequence_header(&mut self, data: &[u8]) {
        self.video_sequence_header = Some(Bytes::copy_from_slice(data));
    }

    pub fn cache_audio_sequence_header(&mut self, data: &[u8]) {
        self.audio_sequence_header = Some(Bytes::copy_from_slice(data));
    }

    pub fn video_sequence_header(&self) -> Option<Bytes> {
        self.video_sequence_header.clone()
    }

    pub fn audio_sequence_header(&self) -> Option<Bytes> {
        self.audio_sequence_header.clone()
    }

    pub fn mark_recorder_attached(&mut self) {
        self.has_recorder = true;
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    fn is_empty(&self) -> bool {
        self.publisher_conn_id.is_none() && self.subscribers.is_empty() && !self.has_recorder
    }
}

/// Concurrent map of stream key to [`Stream`], one RW lock per stream.
#[derive(Default)]
pub struct Registry {
    streams: Mutex<HashMap<String, std::sync::Arc<RwLock<Stream>>>>,
    next_subscriber_id: AtomicU64,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_create(&self, key: &str) -> std::sync::Arc<RwLock<Stream>> {
        let mut streams = self.streams.lock().expect("registry lock poisoned");
        streams
            .entry(key.to_owned())
            .or_insert_with(|| std::sync::Arc::new(RwLock::new(Stream::new(key.to_owned()))))
            .clone()
    }

    pub fn get(&self, key: &str) -> Option<std::sync::Arc<RwLock<Stream>>> {
        self.streams.lock().expect("registry lock poisoned").get(key).cloned()
    }

    /// Binds `conn_id` as the publisher of `key`. Fails if a publisher is
    /// already bound (I1).
    pub fn set_publisher(&self, key: &str, conn_id: u64) -> Result<(), RegistryError> {
        let stream = self.get_or_create(key);
        let mut stream = stream.write().expect("stream lock poisoned");
        if stream.publisher_conn_id.is_some() {
            return Err(RegistryError::DuplicatePublisher(key.to_owned()));
        }
        stream.publisher_conn_id = Some(conn_id);
        Ok(())
    }

    pub fn next_subscriber_id(&self) -> u64 {
        self.next_subscriber_id.fetch_add(1, Ordering::Relaxed)
    }

    pub fn add_subscriber(&self, key: &str, id: u64, msid: u32, sink: SubscriberSink) {
        let stream = self.get_or_create(key);
        let mut stream = stream.write().expect("stream lock poisoned");
        stream.subscribers.push(Subscriber { id, msid, sink });
    }

    pub fn remove_subscriber(&self, key: &str, id: u64) {
        let Some(stream) = self.get(key) else { return };
        {
            let mut stream = stream.write().expect("stream lock poisoned");
            stream.subscribers.retain(|s| s.id != id);
        }
        self.prune_if_empty(key);
    }

    /// Fans `chunk` out to every subscriber of `key`. Snapshots the
    /// subscriber list, releases the lock, then enqueues non-blockingly;
    /// any subscriber whose queue is full or closed is dropped.
    pub fn broadcast(&self, key: &str, chunk: &Chunk) {
        let Some(stream) = self.get(key) else { return };

        let sinks: Vec<(u64, u32, SubscriberSink)> = {
            let stream = stream.read().expect("stream lock poisoned");
            stream.subscribers.iter().map(|s| (s.id, s.msid, s.sink.clone())).collect()
        };

        let mut dead = Vec::new();
        for (id, msid, sink) in sinks {
            let clone = Chunk::new(
                chunk.basic_header.chunk_stream_id,
                chunk.message_header.timestamp,
                chunk.message_header.msg_type_id,
                msid,
                chunk.payload.clone(),
            );
            if sink.try_send(clone).is_err() {
                dead.push(id);
            }
        }

        if !dead.is_empty() {
            let mut stream = stream.write().expect("stream lock poisoned");
            stream.subscribers.retain(|s| !dead.contains(&s.id));
        }
    }

    pub fn publisher_disconnected(&self, key: &str) {
        if let Some(stream) = self.get(key) {
            let mut stream = stream.write().expect("stream lock poisoned");
            stream.publisher_conn_id = None;
            stream.video_sequence_header = None;
            stream.audio_sequence_header = None;
            stream.video_codec = None;
            stream.audio_codec = None;
        }
        self.prune_if_empty(key);
    }

    pub fn subscriber_disconnected(&self, key: &str, id: u64) {
        self.remove_subscriber(key, id);
    }

    fn prune_if_empty(&self, key: &str) {
        let mut streams = self.streams.lock().expect("registry lock poisoned");
        if let Some(stream) = streams.get(key) {
            let empty = stream.read().expect("stream lock poisoned").is_empty();
            if empty {
                streams.remove(key);
            }
        }
    }
}
