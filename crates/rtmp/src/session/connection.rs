//! The per-connection orchestrator (4.9): handshake, then two long-lived
//! tasks for the lifetime of the socket. The read loop owns the chunk
//! decoder and all session state and is the only place decisions get made;
//! the write loop is a dumb drain of whatever wire bytes land in its queue.
//! Everything the read loop (and any subscriber fan-out task) wants to send
//! goes through the same bounded [`OutboundQueue`] so a stalled peer can
//! never block the rest of the server, only itself.

use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use rtmprelay_context::Context;
use rtmprelay_future_ext::FutureExt;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::error::SessionError;
use super::state::{Session, SessionPhase};
use crate::chunk::{Chunk, ChunkDecoder, ChunkEncoder};
use crate::command_messages::netconnection::{NetConnectionCommand, NetConnectionCommandConnectResult};
use crate::command_messages::netstream::NetStreamCommand;
use crate::command_messages::on_status::{OnStatus, codes};
use crate::command_messages::{Command, CommandResultLevel, CommandType};
use crate::handshake::{HandshakeServer, RTMP_HANDSHAKE_SIZE};
use crate::media::{FrameKind, classify_audio, classify_video};
use crate::messages::MessageData;
use crate::protocol_control_messages::{
    ProtocolControlMessageSetChunkSize, ProtocolControlMessageSetPeerBandwidth,
    ProtocolControlMessageSetPeerBandwidthLimitType, ProtocolControlMessageWindowAcknowledgementSize,
};
use crate::recorder::Recorder;
use crate::registry::{Registry, RegistryError};
use crate::relay::RelayManager;
use crate::user_control_messages::UserControlEvent;

const OUTBOUND_QUEUE_CAPACITY: usize = 100;
const OUTBOUND_ENQUEUE_TIMEOUT: Duration = Duration::from_millis(200);
const HANDSHAKE_DEADLINE: Duration = Duration::from_secs(5);
const WINDOW_ACK_SIZE: u32 = 2_500_000;
const AUDIO_CHUNK_STREAM_ID: u32 = 4;
const VIDEO_CHUNK_STREAM_ID: u32 = 6;

const MSG_TYPE_AUDIO: u8 = 8;
const MSG_TYPE_VIDEO: u8 = 9;

/// Handle used to push wire bytes onto a connection's bounded outbound
/// queue. Enqueuing never blocks past [`OUTBOUND_ENQUEUE_TIMEOUT`]; past
/// that, the message is dropped rather than letting one slow peer stall
/// whatever producer (read loop, subscriber fan-out) is trying to write to it.
#[derive(Clone)]
struct OutboundQueue {
    sender: mpsc::Sender<Bytes>,
}

impl OutboundQueue {
    async fn enqueue(&self, bytes: Bytes) {
        match self.sender.send(bytes).with_timeout(OUTBOUND_ENQUEUE_TIMEOUT).await {
            Ok(Ok(())) => {}
            Ok(Err(_)) => tracing::debug!("outbound queue closed, dropping message"),
            Err(_) => tracing::warn!("outbound queue enqueue timed out, dropping message"),
        }
    }
}

/// What the read loop should do after handling one message.
enum Directive {
    Continue,
    Close,
}

/// Mutable state threaded through one connection's read loop.
struct ReadLoopState {
    session: Session,
    recorder: Option<Recorder>,
    subscriber_task: Option<JoinHandle<()>>,
}

/// Static configuration shared by every connection the server accepts.
#[derive(Clone)]
pub struct ConnectionConfig {
    pub registry: Arc<Registry>,
    pub relay: Option<Arc<RelayManager>>,
    pub record_all: bool,
    pub record_dir: PathBuf,
    pub chunk_size: u32,
}

/// One accepted RTMP socket. Cheap to clone: every field is either `Copy`,
/// an `Arc`, or a context handle, which is what lets the subscriber
/// fan-out task hold its own copy to encode and enqueue with.
#[derive(Clone)]
pub struct Connection {
    id: u64,
    remote_addr: SocketAddr,
    ctx: Context,
    config: ConnectionConfig,
    write_chunk_size: Arc<AtomicU32>,
}

impl Connection {
    pub fn new(id: u64, remote_addr: SocketAddr, ctx: Context, config: ConnectionConfig) -> Self {
        let write_chunk_size = Arc::new(AtomicU32::new(config.chunk_size));
        Self {
            id,
            remote_addr,
            ctx,
            config,
            write_chunk_size,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Runs the handshake, then the read and write loops, to completion.
    pub async fn run(self, stream: TcpStream) -> Result<(), SessionError> {
        let _ = stream.set_nodelay(true);
        let (mut read_half, mut write_half) = stream.into_split();

        let handshake_started = std::time::Instant::now();
        self.handshake(&mut read_half, &mut write_half).await?;
        let duration_ms = handshake_started.elapsed().as_millis();
        tracing::info!(conn_id = self.id, addr = %self.remote_addr, duration_ms, "handshake complete");

        let (tx, rx) = mpsc::channel(OUTBOUND_QUEUE_CAPACITY);
        let outbound = OutboundQueue { sender: tx };

        self.queue_initial_control_burst(&outbound).await?;

        let write_task = tokio::spawn(write_loop(write_half, rx, self.ctx.clone()));

        let result = self.read_loop(read_half, outbound).await;
        write_task.abort();

        if let Err(err) = &result {
            tracing::warn!(conn_id = self.id, error = %err, "connection ended with error");
        }
        result
    }

    async fn handshake(&self, read_half: &mut OwnedReadHalf, write_half: &mut OwnedWriteHalf) -> Result<(), SessionError> {
        let mut handshake = HandshakeServer::default();

        let mut c0_c1 = vec![0u8; 1 + RTMP_HANDSHAKE_SIZE];
        read_half.read_exact(&mut c0_c1).with_timeout(HANDSHAKE_DEADLINE).await??;

        let mut output = Vec::new();
        handshake.handshake(&mut io::Cursor::new(Bytes::from(c0_c1)), &mut output)?;
        write_half.write_all(&output).with_timeout(HANDSHAKE_DEADLINE).await??;

        let mut c2 = vec![0u8; RTMP_HANDSHAKE_SIZE];
        read_half.read_exact(&mut c2).with_timeout(HANDSHAKE_DEADLINE).await??;

        let mut output = Vec::new();
        handshake.handshake(&mut io::Cursor::new(Bytes::from(c2)), &mut output)?;

        Ok(())
    }

    fn write_encoder(&self) -> ChunkEncoder {
        let mut encoder = ChunkEncoder::default();
        encoder.set_chunk_size(self.write_chunk_size.load(Ordering::Relaxed) as usize);
        encoder
    }

    fn encode(&self, chunk: Chunk) -> Vec<u8> {
        let mut buf = Vec::new();
        self.write_encoder().write_chunk(&mut buf, chunk).expect("encoding into a Vec never fails");
        buf
    }

    /// The initial control burst (4.4): window ack size, peer bandwidth,
    /// then chunk size, strictly in that order, before any command response.
    async fn queue_initial_control_burst(&self, outbound: &OutboundQueue) -> Result<(), SessionError> {
        let encoder = self.write_encoder();

        let mut buf = Vec::new();
        ProtocolControlMessageWindowAcknowledgementSize {
            acknowledgement_window_size: WINDOW_ACK_SIZE,
        }
        .write(&mut buf, &encoder)?;
        outbound.enqueue(Bytes::from(buf)).await;

        let mut buf = Vec::new();
        ProtocolControlMessageSetPeerBandwidth {
            acknowledgement_window_size: WINDOW_ACK_SIZE,
            limit_type: ProtocolControlMessageSetPeerBandwidthLimitType::Dynamic,
        }
        .write(&mut buf, &encoder)?;
        outbound.enqueue(Bytes::from(buf)).await;

        let mut buf = Vec::new();
        ProtocolControlMessageSetChunkSize {
            chunk_size: self.config.chunk_size,
        }
        .write(&mut buf, &encoder)?;
        outbound.enqueue(Bytes::from(buf)).await;

        Ok(())
    }

    async fn queue_command(&self, outbound: &OutboundQueue, transaction_id: f64, command_type: CommandType) -> Result<(), SessionError> {
        let command = Command { transaction_id, command_type };
        let encoder = self.write_encoder();
        let mut buf = Vec::new();
        command.write(&mut buf, &encoder)?;
        outbound.enqueue(Bytes::from(buf)).await;
        Ok(())
    }

    async fn queue_on_status(&self, outbound: &OutboundQueue, status: OnStatus) -> Result<(), SessionError> {
        // Unsolicited NetStream notifications, not a response to a specific
        // request; transaction id 0 is the conventional "this isn't a reply" marker.
        self.queue_command(outbound, 0.0, CommandType::OnStatus(status)).await
    }

    async fn queue_user_control_event(&self, outbound: &OutboundQueue, event: UserControlEvent) -> Result<(), SessionError> {
        let encoder = self.write_encoder();
        let mut buf = Vec::new();
        event.write(&mut buf, &encoder)?;
        outbound.enqueue(Bytes::from(buf)).await;
        Ok(())
    }

    async fn forward_media(&self, outbound: &OutboundQueue, msg_type_id: u8, timestamp: u32, msid: u32, data: Bytes) {
        let csid = if msg_type_id == MSG_TYPE_AUDIO {
            AUDIO_CHUNK_STREAM_ID
        } else {
            VIDEO_CHUNK_STREAM_ID
        };
        let chunk = Chunk::new(csid, timestamp, msg_type_id, msid, data);
        outbound.enqueue(Bytes::from(self.encode(chunk))).await;
    }

    async fn read_loop(&self, mut read_half: OwnedReadHalf, outbound: OutboundQueue) -> Result<(), SessionError> {
        let mut decoder = ChunkDecoder::default();
        let mut buf = BytesMut::with_capacity(8192);
        let mut state = ReadLoopState {
            session: Session::new(),
            recorder: None,
            subscriber_task: None,
        };

        let outcome: Result<(), SessionError> = 'outer: loop {
            let n = tokio::select! {
                _ = self.ctx.done() => break 'outer Ok(()),
                result = read_half.read_buf(&mut buf) => match result {
                    Ok(n) => n,
                    Err(err) => break 'outer Err(err.into()),
                },
            };
            if n == 0 {
                break 'outer Ok(());
            }

            loop {
                let chunk = match decoder.read_chunk(&mut buf) {
                    Ok(Some(chunk)) => chunk,
                    Ok(None) => break,
                    Err(err) => break 'outer Err(err.into()),
                };

                match self.handle_chunk(chunk, &mut decoder, &mut state, &outbound).await {
                    Ok(Directive::Continue) => {}
                    Ok(Directive::Close) => break 'outer Ok(()),
                    Err(err) => break 'outer Err(err),
                }
            }
        };

        if let Some(handle) = state.subscriber_task.take() {
            handle.abort();
        }
        self.release_stream(&mut state.session);

        outcome
    }

    /// `MessageData::read` deliberately leaves Abort, Acknowledgement, and
    /// User Control Event messages unparsed (`MessageData::Other`) since the
    /// connection, not the message layer, needs to act on them directly.
    async fn handle_chunk(
        &self,
        chunk: Chunk,
        decoder: &mut ChunkDecoder,
        state: &mut ReadLoopState,
        outbound: &OutboundQueue,
    ) -> Result<Directive, SessionError> {
        match chunk.message_header.msg_type_id {
            2 => {
                tracing::debug!(conn_id = self.id, "abort message received, ignoring");
                return Ok(Directive::Continue);
            }
            3 => return Ok(Directive::Continue),
            4 => {
                let event = UserControlEvent::read(&chunk.payload)?;
                tracing::trace!(conn_id = self.id, ?event, "user control event");
                return Ok(Directive::Continue);
            }
            _ => {}
        }

        match MessageData::read(&chunk)? {
            MessageData::SetChunkSize(msg) => {
                decoder.update_max_chunk_size(msg.chunk_size as usize);
            }
            MessageData::SetAcknowledgementWindowSize(_) | MessageData::SetPeerBandwidth(_) => {}
            MessageData::Amf0Command(command) => {
                return self.handle_command(command, state, outbound).await;
            }
            MessageData::AudioData { data } => {
                self.handle_media(state, MSG_TYPE_AUDIO, chunk.message_header.timestamp, data, &chunk).await;
            }
            MessageData::VideoData { data } => {
                self.handle_media(state, MSG_TYPE_VIDEO, chunk.message_header.timestamp, data, &chunk).await;
            }
            MessageData::DataAmf0 { .. } | MessageData::Other { .. } => {}
        }

        Ok(Directive::Continue)
    }

    async fn handle_media(&self, state: &mut ReadLoopState, msg_type_id: u8, timestamp: u32, data: Bytes, chunk: &Chunk) {
        let Some(key) = state.session.stream_key.clone() else { return };
        let Some(stream) = self.config.registry.get(&key) else { return };

        if msg_type_id == MSG_TYPE_AUDIO {
            if let Some((codec, frame_kind)) = classify_audio(&data) {
                let mut stream = stream.write().expect("stream lock poisoned");
                let first_seen = stream.audio_codec().is_none();
                stream.set_audio_codec(codec);
                if frame_kind == FrameKind::SequenceHeader {
                    stream.cache_audio_sequence_header(&data);
                }
                if first_seen {
                    tracing::info!(conn_id = self.id, %key, codec = ?codec, "codec_detected");
                }
            }
            if let Some(recorder) = state.recorder.as_mut() {
                recorder.write_audio(timestamp, &data).await;
            }
        } else {
            if let Some((codec, frame_kind)) = classify_video(&data) {
                let mut stream = stream.write().expect("stream lock poisoned");
                let first_seen = stream.video_codec().is_none();
                stream.set_video_codec(codec);
                if frame_kind == FrameKind::SequenceHeader {
                    stream.cache_video_sequence_header(&data);
                }
                if first_seen {
                    tracing::info!(conn_id = self.id, %key, codec = ?codec, "codec_detected");
                }
            }
            if let Some(recorder) = state.recorder.as_mut() {
                recorder.write_video(timestamp, &data).await;
            }
        }

        self.config.registry.broadcast(&key, chunk);

        if let Some(relay) = &self.config.relay {
            relay.relay(msg_type_id, timestamp, data).await;
        }
    }

    async fn handle_command(&self, command: Command, state: &mut ReadLoopState, outbound: &OutboundQueue) -> Result<Directive, SessionError> {
        let transaction_id = command.transaction_id;

        match command.command_type {
            CommandType::NetConnection(NetConnectionCommand::Connect(connect)) => {
                state.session.app_name = Some(connect.app.clone());
                state.session.tc_url = connect.others.get("tcUrl").and_then(|v| v.as_str()).map(String::from);
                state.session.flash_ver = connect.others.get("flashVer").and_then(|v| v.as_str()).map(String::from);
                state.session.object_encoding = connect.others.get("objectEncoding").and_then(|v| v.as_f64()).unwrap_or(0.0);
                state.session.phase = SessionPhase::Connected;

                self.queue_command(
                    outbound,
                    transaction_id,
                    CommandType::NetConnection(NetConnectionCommand::ConnectResult(NetConnectionCommandConnectResult::default())),
                )
                .await?;
            }
            CommandType::NetConnection(NetConnectionCommand::CreateStream) => {
                let stream_id = state.session.allocate_stream_id();
                state.session.phase = SessionPhase::StreamCreated;
                tracing::info!(conn_id = self.id, stream_id, "stream_create");

                self.queue_command(
                    outbound,
                    transaction_id,
                    CommandType::NetConnection(NetConnectionCommand::CreateStreamResult { stream_id: stream_id as f64 }),
                )
                .await?;
            }
            CommandType::NetConnection(NetConnectionCommand::Close) => {
                return Ok(Directive::Close);
            }
            CommandType::NetConnection(NetConnectionCommand::Call { .. } | NetConnectionCommand::ConnectResult(_) | NetConnectionCommand::CreateStreamResult { .. }) => {
                // Call is an unimplemented extension point; the two *Result
                // variants are server-originated and never arrive from a client.
            }
            CommandType::NetStream(NetStreamCommand::Publish { publishing_name, .. }) => {
                self.on_publish(state, outbound, publishing_name).await?;
            }
            CommandType::NetStream(NetStreamCommand::Play { stream_name, .. }) => {
                self.on_play(state, outbound, stream_name).await?;
            }
            CommandType::NetStream(NetStreamCommand::DeleteStream { .. } | NetStreamCommand::CloseStream) => {
                tracing::info!(conn_id = self.id, stream_id = ?state.session.stream_id, "stream_delete");
                if let Some(handle) = state.subscriber_task.take() {
                    handle.abort();
                }
                state.recorder = None;
                self.release_stream(&mut state.session);
            }
            CommandType::NetStream(_) => {
                tracing::debug!(conn_id = self.id, "ignoring unhandled NetStream command");
            }
            CommandType::OnStatus(_) => {
                tracing::debug!(conn_id = self.id, "ignoring onStatus from client");
            }
            CommandType::Unknown { command_name, .. } => {
                tracing::debug!(conn_id = self.id, %command_name, "ignoring unknown command");
            }
        }

        Ok(Directive::Continue)
    }

    /// Empty publishing names map to `"default"` (8).
    async fn on_publish(&self, state: &mut ReadLoopState, outbound: &OutboundQueue, publishing_name: String) -> Result<(), SessionError> {
        let app = state.session.app_name.clone().unwrap_or_default();
        let stream_name = if publishing_name.is_empty() { "default".to_owned() } else { publishing_name };
        let key = format!("{app}/{stream_name}");

        match self.config.registry.set_publisher(&key, self.id) {
            Ok(()) => {
                state.session.stream_key = Some(key.clone());
                state.session.phase = SessionPhase::Publishing;

                if self.config.record_all {
                    match Recorder::create(&self.config.record_dir, &app, &stream_name).await {
                        Ok(recorder) => {
                            self.config.registry.get_or_create(&key).write().expect("stream lock poisoned").mark_recorder_attached();
                            state.recorder = Some(recorder);
                        }
                        Err(err) => tracing::warn!(conn_id = self.id, %err, "failed to open recorder"),
                    }
                }

                self.queue_on_status(
                    outbound,
                    OnStatus {
                        code: codes::NET_STREAM_PUBLISH_START.to_owned(),
                        description: Some(format!("{stream_name} is now published.")),
                        level: CommandResultLevel::Status,
                        others: None,
                    },
                )
                .await?;
                tracing::info!(conn_id = self.id, %key, "publish_start");
            }
            Err(RegistryError::DuplicatePublisher(_)) => {
                self.queue_on_status(
                    outbound,
                    OnStatus {
                        code: codes::NET_STREAM_PUBLISH_BAD_NAME.to_owned(),
                        description: Some(format!("{stream_name} is already published.")),
                        level: CommandResultLevel::Error,
                        others: None,
                    },
                )
                .await?;
            }
        }

        Ok(())
    }

    /// Plays a stream, replaying cached sequence headers so a late joiner
    /// can decode immediately, or reports `StreamNotFound` if nothing by
    /// that name is live. A stream that doesn't exist yet never gets an
    /// implicit subscription against a future publish (9).
    async fn on_play(&self, state: &mut ReadLoopState, outbound: &OutboundQueue, stream_name: String) -> Result<(), SessionError> {
        let app = state.session.app_name.clone().unwrap_or_default();
        let key = format!("{app}/{stream_name}");
        let msid = state.session.stream_id.unwrap_or(0);

        self.queue_user_control_event(outbound, UserControlEvent::StreamBegin { stream_id: msid }).await?;

        let Some(stream) = self.config.registry.get(&key) else {
            self.queue_on_status(
                outbound,
                OnStatus {
                    code: codes::NET_STREAM_PLAY_STREAM_NOT_FOUND.to_owned(),
                    description: Some(format!("{stream_name} is not published.")),
                    level: CommandResultLevel::Error,
                    others: None,
                },
            )
            .await?;
            return Ok(());
        };

        let (tx, rx) = mpsc::channel(OUTBOUND_QUEUE_CAPACITY);
        let subscriber_id = self.config.registry.next_subscriber_id();
        self.config.registry.add_subscriber(&key, subscriber_id, msid, tx);
        state.session.subscriber_id = Some(subscriber_id);
        state.session.stream_key = Some(key);
        state.session.phase = SessionPhase::Playing;

        self.queue_on_status(
            outbound,
            OnStatus {
                code: codes::NET_STREAM_PLAY_START.to_owned(),
                description: Some(format!("Started playing {stream_name}.")),
                level: CommandResultLevel::Status,
                others: None,
            },
        )
        .await?;
        tracing::info!(conn_id = self.id, %stream_name, "play_start");

        let (video_header, audio_header) = {
            let stream = stream.read().expect("stream lock poisoned");
            (stream.video_sequence_header(), stream.audio_sequence_header())
        };
        if let Some(header) = audio_header {
            self.forward_media(outbound, MSG_TYPE_AUDIO, 0, msid, header).await;
        }
        if let Some(header) = video_header {
            self.forward_media(outbound, MSG_TYPE_VIDEO, 0, msid, header).await;
        }

        let connection = self.clone();
        let outbound = outbound.clone();
        state.subscriber_task = Some(tokio::spawn(async move {
            connection.subscriber_forward_loop(rx, outbound).await;
        }));

        Ok(())
    }

    async fn subscriber_forward_loop(&self, mut rx: mpsc::Receiver<Chunk>, outbound: OutboundQueue) {
        loop {
            tokio::select! {
                _ = self.ctx.done() => break,
                chunk = rx.recv() => {
                    let Some(chunk) = chunk else { break };
                    outbound.enqueue(Bytes::from(self.encode(chunk))).await;
                }
            }
        }
    }

    fn release_stream(&self, session: &mut Session) {
        match session.phase {
            SessionPhase::Publishing => {
                if let Some(key) = session.stream_key.take() {
                    tracing::info!(conn_id = self.id, %key, "publish_stop");
                    self.config.registry.publisher_disconnected(&key);
                }
            }
            SessionPhase::Playing => {
                if let (Some(key), Some(id)) = (session.stream_key.take(), session.subscriber_id.take()) {
                    tracing::info!(conn_id = self.id, %key, subscriber_id = id, "play_stop");
                    self.config.registry.subscriber_disconnected(&key, id);
                }
            }
            _ => {}
        }
    }
}

/// Drains the outbound queue and writes whatever arrives straight to the
/// socket. Deliberately dumb: all ordering and backpressure decisions were
/// already made by whoever enqueued the bytes.
async fn write_loop(mut write_half: OwnedWriteHalf, mut rx: mpsc::Receiver<Bytes>, ctx: Context) {
    loop {
        tokio::select! {
            _ = ctx.done() => break,
            bytes = rx.recv() => {
                let Some(bytes) = bytes else { break };
                if write_half.write_all(&bytes).await.is_err() {
                    break;
                }
            }
        }
    }
}
