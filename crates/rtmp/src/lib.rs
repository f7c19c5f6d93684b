#![cfg_attr(all(coverage_nightly, test), feature(coverage_attribute))]

mod chunk;
mod command_messages;
mod error;
mod handshake;
mod media;
mod messages;
mod protocol_control_messages;
mod recorder;
mod registry;
mod relay;
mod session;
mod user_control_messages;

pub use error::RtmpError;
pub use recorder::Recorder;
pub use registry::{Registry, RegistryError};
pub use relay::{Destination, DestinationStats, DestinationStatus, RelayError, RelayManager};
pub use session::{Connection, ConnectionConfig, Session, SessionError, SessionPhase};

#[cfg(test)]
#[cfg_attr(all(test, coverage_nightly), coverage(off))]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use byteorder::{BigEndian, WriteBytesExt};
    use bytes::{Bytes, BytesMut};
    use rtmprelay_amf0::{Amf0Encoder, Amf0Object, Amf0Value};
    use rtmprelay_context::Context;
    use rtmprelay_future_ext::FutureExt;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    use crate::chunk::{Chunk, ChunkDecoder, ChunkEncoder, COMMAND_CHUNK_STREAM_ID};
    use crate::handshake::RTMP_HANDSHAKE_SIZE;
    use crate::registry::Registry;
    use crate::session::{Connection, ConnectionConfig};

    const TIMEOUT: Duration = Duration::from_secs(2);

    async fn client_handshake(stream: &mut TcpStream) {
        let mut c0c1 = Vec::with_capacity(1 + RTMP_HANDSHAKE_SIZE);
        WriteBytesExt::write_u8(&mut c0c1, 3).unwrap();
        c0c1.resize(1 + RTMP_HANDSHAKE_SIZE, 0);
        stream.write_all(&c0c1).await.unwrap();

        let mut s0s1s2 = vec![0u8; 1 + RTMP_HANDSHAKE_SIZE * 2];
        stream.read_exact(&mut s0s1s2).await.unwrap();

        let s1 = &s0s1s2[1..1 + RTMP_HANDSHAKE_SIZE];
        let mut c2 = Vec::with_capacity(RTMP_HANDSHAKE_SIZE);
        c2.extend_from_slice(&s1[..4]);
        WriteBytesExt::write_u32::<BigEndian>(&mut c2, 0).unwrap();
        c2.extend_from_slice(&s1[8..]);
        stream.write_all(&c2).await.unwrap();
    }

    fn encode_command(name: &str, transaction_id: f64, values: &[Amf0Value]) -> Vec<u8> {
        let mut payload = Vec::new();
        let mut amf = Amf0Encoder::new(&mut payload);
        amf.encode_string(name).unwrap();
        amf.encode_number(transaction_id).unwrap();
        for value in values {
            amf.encode_value(value).unwrap();
        }

        let encoder = ChunkEncoder::default();
        let chunk = Chunk::new(COMMAND_CHUNK_STREAM_ID, 0, 20, 0, Bytes::from(payload));
        let mut buf = Vec::new();
        encoder.write_chunk(&mut buf, chunk).unwrap();
        buf
    }

    fn raw_video_chunk(payload: &[u8]) -> Vec<u8> {
        let encoder = ChunkEncoder::default();
        let chunk = Chunk::new(6, 0, 9, 1, Bytes::copy_from_slice(payload));
        let mut buf = Vec::new();
        encoder.write_chunk(&mut buf, chunk).unwrap();
        buf
    }

    /// Reads off `stream` until a chunk matching `predicate` arrives, using
    /// `decoder`/`buf` owned by the caller so repeated calls on the same
    /// stream never drop bytes already read off the socket.
    async fn next_matching(stream: &mut TcpStream, decoder: &mut ChunkDecoder, buf: &mut BytesMut, predicate: impl Fn(&Chunk) -> bool) -> Chunk {
        loop {
            while let Ok(Some(chunk)) = decoder.read_chunk(buf) {
                if predicate(&chunk) {
                    return chunk;
                }
            }
            let mut read_buf = [0u8; 4096];
            let n = stream
                .read(&mut read_buf)
                .with_timeout(TIMEOUT)
                .await
                .expect("timed out waiting for server")
                .expect("read failed");
            assert!(n > 0, "connection closed before expected message arrived");
            buf.extend_from_slice(&read_buf[..n]);
        }
    }

    fn connect_command(app: &str) -> Vec<u8> {
        let connect_obj: Amf0Object = [("app".to_owned(), Amf0Value::String(app.to_owned()))].into_iter().collect();
        encode_command("connect", 1.0, &[Amf0Value::Object(connect_obj)])
    }

    #[tokio::test]
    async fn publish_then_play_relays_cached_sequence_header() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let registry = Arc::new(Registry::new());
        let config = ConnectionConfig {
            registry: Arc::clone(&registry),
            relay: None,
            record_all: false,
            record_dir: std::env::temp_dir(),
            chunk_size: 4096,
        };
        let (ctx, _handler) = Context::new();

        tokio::spawn({
            let ctx = ctx.clone();
            async move {
                let mut next_id = 1u64;
                while let Ok((stream, peer)) = listener.accept().await {
                    let connection = Connection::new(next_id, peer, ctx.clone(), config.clone());
                    next_id += 1;
                    tokio::spawn(connection.run(stream));
                }
            }
        });

        let mut publisher = TcpStream::connect(addr).await.unwrap();
        client_handshake(&mut publisher).await;
        publisher.write_all(&connect_command("live")).await.unwrap();
        publisher.write_all(&encode_command("createStream", 2.0, &[Amf0Value::Null])).await.unwrap();
        publisher
            .write_all(&encode_command(
                "publish",
                3.0,
                &[Amf0Value::Null, Amf0Value::String("key".to_owned()), Amf0Value::String("live".to_owned())],
            ))
            .await
            .unwrap();

        let mut publisher_decoder = ChunkDecoder::default();
        let mut publisher_buf = BytesMut::new();
        // connect result, createStream result, publish onStatus: three AMF0 command replies in order.
        for _ in 0..3 {
            next_matching(&mut publisher, &mut publisher_decoder, &mut publisher_buf, |c| c.message_header.msg_type_id == 20).await;
        }

        let avc_sequence_header = [0x17, 0x00, 0x00, 0x00, 0x00];
        publisher.write_all(&raw_video_chunk(&avc_sequence_header)).await.unwrap();

        let mut subscriber = TcpStream::connect(addr).await.unwrap();
        client_handshake(&mut subscriber).await;
        subscriber.write_all(&connect_command("live")).await.unwrap();
        subscriber.write_all(&encode_command("createStream", 2.0, &[Amf0Value::Null])).await.unwrap();
        subscriber
            .write_all(&encode_command("play", 3.0, &[Amf0Value::Null, Amf0Value::String("key".to_owned())]))
            .await
            .unwrap();

        let mut subscriber_decoder = ChunkDecoder::default();
        let mut subscriber_buf = BytesMut::new();
        let video = next_matching(&mut subscriber, &mut subscriber_decoder, &mut subscriber_buf, |c| c.message_header.msg_type_id == 9).await;
        assert_eq!(video.payload, Bytes::copy_from_slice(&avc_sequence_header));
    }

    #[tokio::test]
    async fn play_of_unpublished_stream_gets_stream_not_found() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let config = ConnectionConfig {
            registry: Arc::new(Registry::new()),
            relay: None,
            record_all: false,
            record_dir: std::env::temp_dir(),
            chunk_size: 4096,
        };
        let (ctx, _handler) = Context::new();

        tokio::spawn(async move {
            let Ok((stream, peer)) = listener.accept().await else { return };
            let connection = Connection::new(1, peer, ctx, config);
            connection.run(stream).await.ok();
        });

        let mut client = TcpStream::connect(addr).await.unwrap();
        client_handshake(&mut client).await;
        client.write_all(&connect_command("live")).await.unwrap();
        client.write_all(&encode_command("createStream", 2.0, &[Amf0Value::Null])).await.unwrap();
        client
            .write_all(&encode_command("play", 3.0, &[Amf0Value::Null, Amf0Value::String("nope".to_owned())]))
            .await
            .unwrap();

        let mut decoder = ChunkDecoder::default();
        let mut buf = BytesMut::new();
        // connect result, createStream result: skip past those to the play onStatus.
        for _ in 0..2 {
            next_matching(&mut client, &mut decoder, &mut buf, |c| c.message_header.msg_type_id == 20).await;
        }
        let on_status = next_matching(&mut client, &mut decoder, &mut buf, |c| c.message_header.msg_type_id == 20).await;

        let mut amf = rtmprelay_amf0::Amf0Decoder::new(on_status.payload);
        let _name = amf.decode_string().unwrap();
        let _txn = amf.decode_number().unwrap();
        let _ = amf.decode_null();
        let info = amf.decode_object().unwrap();
        assert_eq!(info.get("code").and_then(|v| v.as_str()), Some("NetStream.Play.StreamNotFound"));
    }
}
