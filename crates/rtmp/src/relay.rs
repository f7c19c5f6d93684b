//! Relay manager: outbound RTMP clients that mirror a publisher's media to
//! upstream destinations (4.11).

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};

use byteorder::{BigEndian, WriteBytesExt};
use bytes::{Bytes, BytesMut};
use rtmprelay_amf0::{Amf0Decoder, Amf0Encoder, Amf0Object, Amf0Value};
use rtmprelay_context::Context;
use rtmprelay_future_ext::FutureExt;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::{Mutex, mpsc};

use crate::chunk::{Chunk, ChunkDecoder, ChunkEncoder, COMMAND_CHUNK_STREAM_ID};
use crate::handshake::RTMP_HANDSHAKE_SIZE;

const RECONNECT_INTERVAL: Duration = Duration::from_secs(5);
const MAX_RECONNECT_ATTEMPTS: u32 = 10;
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DestinationStatus {
    Disconnected,
    Connecting,
    Connected,
    Error,
}

struct DestinationState {
    status: DestinationStatus,
    last_error: Option<String>,
    sink: Option<mpsc::Sender<Chunk>>,
    attempts: u32,
    messages_sent: u64,
    messages_dropped: u64,
    bytes_sent: u64,
    connected_at: Option<Instant>,
    reconnect_count: u32,
}

/// Point-in-time snapshot of a destination's delivery counters, for
/// whatever reports on relay health.
#[derive(Debug, Clone, Copy)]
pub struct DestinationStats {
    pub messages_sent: u64,
    pub messages_dropped: u64,
    pub bytes_sent: u64,
    pub reconnect_count: u32,
}

/// One upstream RTMP target, parsed from a `rtmp://host[:port]/app/streamName` URL.
pub struct Destination {
    pub url: String,
    host: String,
    port: u16,
    app: String,
    stream_name: String,
    state: Mutex<DestinationState>,
}

#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("invalid relay url: {0}")]
    InvalidUrl(String),
}

impl Destination {
    pub fn parse(url: &str) -> Result<Self, RelayError> {
        let rest = url
            .strip_prefix("rtmp://")
            .ok_or_else(|| RelayError::InvalidUrl(url.to_owned()))?;
        let mut parts = rest.splitn(2, '/');
        let host_port = parts.next().ok_or_else(|| RelayError::InvalidUrl(url.to_owned()))?;
        let path = parts.next().unwrap_or_default();

        let (host, port) = match host_port.split_once(':') {
            Some((h, p)) => (h.to_owned(), p.parse().map_err(|_| RelayError::InvalidUrl(url.to_owned()))?),
            None => (host_port.to_owned(), 1935),
        };

        let mut path_parts = path.splitn(2, '/');
        let app = path_parts.next().unwrap_or_default().to_owned();
        let stream_name = path_parts.next().unwrap_or_default().to_owned();
        if app.is_empty() || stream_name.is_empty() {
            return Err(RelayError::InvalidUrl(url.to_owned()));
        }

        Ok(Self {
            url: url.to_owned(),
            host,
            port,
            app,
            stream_name,
            state: Mutex::new(DestinationState {
                status: DestinationStatus::Disconnected,
                last_error: None,
                sink: None,
                attempts: 0,
                messages_sent: 0,
                messages_dropped: 0,
                bytes_sent: 0,
                connected_at: None,
                reconnect_count: 0,
            }),
        })
    }

    pub async fn status(&self) -> DestinationStatus {
        self.state.lock().await.status
    }

    pub async fn stats(&self) -> DestinationStats {
        let state = self.state.lock().await;
        DestinationStats {
            messages_sent: state.messages_sent,
            messages_dropped: state.messages_dropped,
            bytes_sent: state.bytes_sent,
            reconnect_count: state.reconnect_count,
        }
    }

    /// Sends one media chunk to this destination, if connected. Non-blocking:
    /// a full or closed queue is treated the same as not being connected yet,
    /// and either way counts as a drop if the chunk doesn't make it out.
    async fn send(&self, chunk: Chunk) {
        let len = chunk.payload.len() as u64;
        let mut state = self.state.lock().await;
        let Some(sink) = state.sink.clone() else {
            state.messages_dropped += 1;
            return;
        };
        drop(state);

        if sink.try_send(chunk).is_ok() {
            let mut state = self.state.lock().await;
            state.messages_sent += 1;
            state.bytes_sent += len;
        } else {
            let mut state = self.state.lock().await;
            state.messages_dropped += 1;
        }
    }

    async fn reconnect_loop(self: Arc<Self>, ctx: Context) {
        loop {
            if ctx.is_done() {
                return;
            }

            {
                let mut state = self.state.lock().await;
                state.status = DestinationStatus::Connecting;
            }

            match self.connect_once().await {
                Ok(sink) => {
                    tracing::info!(url = %self.url, "relay destination connected");
                    let mut state = self.state.lock().await;
                    let was_ever_connected = state.connected_at.is_some();
                    state.status = DestinationStatus::Connected;
                    state.sink = Some(sink);
                    state.attempts = 0;
                    state.connected_at = Some(Instant::now());
                    if was_ever_connected {
                        state.reconnect_count += 1;
                    }
                    return;
                }
                Err(err) => {
                    let mut state = self.state.lock().await;
                    state.status = DestinationStatus::Error;
                    state.last_error = Some(err.to_string());
                    state.attempts += 1;
                    tracing::warn!(url = %self.url, error = %err, attempt = state.attempts, "relay connect failed");

                    if state.attempts >= MAX_RECONNECT_ATTEMPTS {
                        tracing::error!(url = %self.url, "relay destination giving up after max attempts");
                        return;
                    }
                }
            }

            tokio::time::sleep(RECONNECT_INTERVAL).await;
        }
    }

    async fn connect_once(&self) -> Result<mpsc::Sender<Chunk>, std::io::Error> {
        let mut stream = TcpStream::connect((self.host.as_str(), self.port))
            .await
            .map_err(std::io::Error::other)?;

        client_handshake(&mut stream)
            .with_timeout(HANDSHAKE_TIMEOUT)
            .await
            .map_err(std::io::Error::other)??;

        let encoder = ChunkEncoder::default();
        let mut write_buf = Vec::new();

        let connect_obj: Amf0Object = [("app".to_owned(), Amf0Value::String(self.app.clone()))].into_iter().collect();
        write_command(&mut write_buf, &encoder, "connect", 1.0, &connect_obj)?;
        write_amf_value(&mut write_buf, &encoder, 2.0, "createStream", &Amf0Value::Null)?;
        stream.write_all(&write_buf).await?;

        let stream_id = read_create_stream_result(&mut stream).await.unwrap_or(1.0);

        let mut payload = Vec::new();
        {
            let mut enc = Amf0Encoder::new(&mut payload);
            enc.encode_string("publish").ok();
            enc.encode_number(3.0).ok();
            enc.encode_null().ok();
            enc.encode_string(&self.stream_name).ok();
            enc.encode_string("live").ok();
        }
        let chunk = Chunk::new(COMMAND_CHUNK_STREAM_ID, 0, 20, stream_id as u32, Bytes::from(payload));
        let mut publish_buf = Vec::new();
        encoder.write_chunk(&mut publish_buf, chunk).map_err(std::io::Error::other)?;
        stream.write_all(&publish_buf).await?;

        let (tx, mut rx) = mpsc::channel::<Chunk>(100);
        let msid = stream_id as u32;

        tokio::spawn(async move {
            let write_encoder = ChunkEncoder::default();
            let mut buf = Vec::new();
            while let Some(chunk) = rx.recv().await {
                let chunk = Chunk::new(
                    chunk.basic_header.chunk_stream_id,
                    chunk.message_header.timestamp,
                    chunk.message_header.msg_type_id,
                    msid,
                    chunk.payload,
                );
                buf.clear();
                if write_encoder.write_chunk(&mut buf, chunk).is_err() {
                    break;
                }
                if stream.write_all(&buf).await.is_err() {
                    break;
                }
            }
        });

        Ok(tx)
    }
}

fn write_command(
    buf: &mut Vec<u8>,
    encoder: &ChunkEncoder,
    name: &str,
    transaction_id: f64,
    command_object: &Amf0Object,
) -> std::io::Result<()> {
    let mut payload = Vec::new();
    let mut amf = Amf0Encoder::new(&mut payload);
    amf.encode_string(name).ok();
    amf.encode_number(transaction_id).ok();
    amf.encode_object(command_object).ok();

    let chunk = Chunk::new(COMMAND_CHUNK_STREAM_ID, 0, 20, 0, Bytes::from(payload));
    encoder.write_chunk(buf, chunk).map_err(std::io::Error::other)
}

fn write_amf_value(
    buf: &mut Vec<u8>,
    encoder: &ChunkEncoder,
    transaction_id: f64,
    name: &str,
    value: &Amf0Value,
) -> std::io::Result<()> {
    let mut payload = Vec::new();
    let mut amf = Amf0Encoder::new(&mut payload);
    amf.encode_string(name).ok();
    amf.encode_number(transaction_id).ok();
    amf.encode_value(value).ok();

    let chunk = Chunk::new(COMMAND_CHUNK_STREAM_ID, 0, 20, 0, Bytes::from(payload));
    encoder.write_chunk(buf, chunk).map_err(std::io::Error::other)
}

/// Reads chunks off `stream` until a `createStream` result (or an unparsable
/// response) arrives, returning the allocated stream id. Best-effort: relay
/// targets that don't play along with replies just get stream id 1.
async fn read_create_stream_result(stream: &mut TcpStream) -> Option<f64> {
    let mut decoder = ChunkDecoder::default();
    let mut buf = BytesMut::new();
    let mut read_buf = [0u8; 4096];

    for _ in 0..32 {
        let n = stream.read(&mut read_buf).with_timeout(HANDSHAKE_TIMEOUT).await.ok()?.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&read_buf[..n]);

        while let Ok(Some(chunk)) = decoder.read_chunk(&mut buf) {
            if chunk.message_header.msg_type_id == 20 {
                let mut amf = Amf0Decoder::new(chunk.payload);
                let _name = amf.decode_string().ok()?;
                let _txn = amf.decode_number().ok()?;
                let _ = amf.decode_null();
                if let Ok(Amf0Value::Number(id)) = amf.decode_value() {
                    return Some(id);
                }
            }
        }
    }

    None
}

/// RTMP client-side simple handshake: write C0+C1, read S0+S1+S2, write C2.
async fn client_handshake(stream: &mut TcpStream) -> std::io::Result<()> {
    let mut c1 = Vec::with_capacity(RTMP_HANDSHAKE_SIZE);
    WriteBytesExt::write_u32::<BigEndian>(&mut c1, 0)?;
    WriteBytesExt::write_u32::<BigEndian>(&mut c1, 0)?;
    c1.resize(RTMP_HANDSHAKE_SIZE, 0);

    let mut c0c1 = Vec::with_capacity(RTMP_HANDSHAKE_SIZE + 1);
    WriteBytesExt::write_u8(&mut c0c1, 3)?;
    c0c1.extend_from_slice(&c1);
    stream.write_all(&c0c1).await?;

    let mut s0s1s2 = vec![0u8; 1 + RTMP_HANDSHAKE_SIZE * 2];
    stream.read_exact(&mut s0s1s2).await?;

    let s1 = &s0s1s2[1..1 + RTMP_HANDSHAKE_SIZE];
    let mut c2 = Vec::with_capacity(RTMP_HANDSHAKE_SIZE);
    c2.extend_from_slice(&s1[..4]);
    WriteBytesExt::write_u32::<BigEndian>(&mut c2, 0)?;
    c2.extend_from_slice(&s1[8..]);
    stream.write_all(&c2).await?;

    Ok(())
}

/// Owns every configured relay [`Destination`] and fans publisher media out
/// to all of them in parallel, one task per destination, preserving
/// per-destination order while avoiding head-of-line blocking across them.
pub struct RelayManager {
    destinations: Vec<Arc<Destination>>,
    chunk_stream_id: AtomicU32,
}

impl RelayManager {
    pub fn new(urls: &[String], ctx: Context) -> Result<Self, RelayError> {
        let destinations = urls
            .iter()
            .map(|url| Destination::parse(url).map(Arc::new))
            .collect::<Result<Vec<_>, _>>()?;

        for destination in &destinations {
            tokio::spawn(Arc::clone(destination).reconnect_loop(ctx.clone()));
        }

        Ok(Self {
            destinations,
            chunk_stream_id: AtomicU32::new(7),
        })
    }

    pub fn is_empty(&self) -> bool {
        self.destinations.is_empty()
    }

    /// Fans `payload` out to every destination and waits for all of them to
    /// be enqueued. Each destination's send is a lock-and-`try_send`, never a
    /// blocking write, so one slow destination cannot stall the others.
    pub async fn relay(&self, msg_type_id: u8, timestamp: u32, payload: Bytes) {
        if self.destinations.is_empty() {
            return;
        }

        let csid = self.chunk_stream_id.load(Ordering::Relaxed);
        for destination in &self.destinations {
            let chunk = Chunk::new(csid, timestamp, msg_type_id, 0, payload.clone());
            destination.send(chunk).await;
        }
    }
}
