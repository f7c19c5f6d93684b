use std::collections::HashMap;

use byteorder::{BigEndian, ByteOrder};
use bytes::{Buf, BytesMut};

use super::define::{Chunk, ChunkBasicHeader, ChunkMessageHeader, ChunkType, INIT_CHUNK_SIZE};
use super::errors::ChunkDecodeError;

const MAX_TRACKED_CHUNK_STREAMS: usize = 256;
const MAX_PARTIAL_CHUNK_SIZE: usize = 16 * 1024 * 1024;

/// What a chunk stream looked like the last time a chunk arrived on it.
/// Type1-3 chunks lean on this to fill in whatever the wire didn't repeat.
#[derive(Clone)]
struct ChunkStreamState {
    header: ChunkMessageHeader,
    timestamp_delta: u32,
    extended_timestamp: bool,
    /// Bytes collected so far for the message currently being reassembled,
    /// once its length has reached `header.msg_length` it's handed back whole.
    partial: Option<BytesMut>,
}

/// Reassembles a raw byte stream into [`Chunk`]s, tracking one
/// [`ChunkStreamState`] per chunk stream id so that Type1-3 chunks can
/// inherit whatever the wire omitted.
pub struct ChunkDecoder {
    max_chunk_size: usize,
    streams: HashMap<u32, ChunkStreamState>,
}

impl Default for ChunkDecoder {
    fn default() -> Self {
        Self {
            max_chunk_size: INIT_CHUNK_SIZE,
            streams: HashMap::new(),
        }
    }
}

/// The basic + message header of one chunk, fully resolved against
/// whatever chunk stream state preceded it, along with how many bytes of
/// `buf` it occupied.
struct ParsedHeader {
    consumed: usize,
    basic: ChunkBasicHeader,
    resolved: ChunkMessageHeader,
    delta: u32,
    extended_timestamp: bool,
}

impl ChunkDecoder {
    /// Applies a Set Chunk Size message's value to future reads.
    pub fn update_max_chunk_size(&mut self, chunk_size: usize) {
        self.max_chunk_size = chunk_size;
    }

    /// Attempts to decode one complete message from the front of `buf`.
    ///
    /// Returns `Ok(None)` when `buf` does not yet hold enough bytes; the
    /// caller is expected to read more off the socket and call again with
    /// the same, now-longer, buffer. Partial progress (chunk headers and
    /// fragments already consumed) is retained across calls in per-stream
    /// state, so nothing already parsed is re-parsed.
    pub fn read_chunk(&mut self, buf: &mut BytesMut) -> Result<Option<Chunk>, ChunkDecodeError> {
        loop {
            let Some(parsed) = self.peek_header(buf)? else {
                return Ok(None);
            };

            let state = self.streams.get(&parsed.basic.chunk_stream_id).expect("just inserted");
            let already_read = state.partial.as_ref().map(|p| p.len()).unwrap_or(0);
            let remaining = parsed.resolved.msg_length as usize - already_read;
            let fragment_len = remaining.min(self.max_chunk_size);

            if buf.len() < parsed.consumed + fragment_len {
                return Ok(None);
            }

            buf.advance(parsed.consumed);
            let fragment = buf.split_to(fragment_len);

            let state = self.streams.get_mut(&parsed.basic.chunk_stream_id).expect("just inserted");
            let partial = state.partial.get_or_insert_with(BytesMut::new);
            partial.extend_from_slice(&fragment);

            if partial.len() < parsed.resolved.msg_length as usize {
                continue;
            }

            let payload = state.partial.take().expect("just populated").freeze();
            return Ok(Some(Chunk {
                basic_header: parsed.basic,
                message_header: parsed.resolved,
                payload,
            }));
        }
    }

    /// Parses (without consuming) the basic header, message header, and
    /// extended timestamp of the next chunk, resolving it against prior
    /// state for the same chunk stream id. Returns `Ok(None)` if `buf`
    /// doesn't hold a complete header yet.
    fn peek_header(&mut self, buf: &BytesMut) -> Result<Option<ParsedHeader>, ChunkDecodeError> {
        if buf.is_empty() {
            return Ok(None);
        }

        let first = buf[0];
        let fmt = ChunkType::from_u8(first >> 6).ok_or(ChunkDecodeError::InvalidChunkType(first >> 6))?;
        let csid_low = first & 0x3F;

        let (basic_len, chunk_stream_id) = match csid_low {
            0 => {
                if buf.len() < 2 {
                    return Ok(None);
                }
                (2, 64 + buf[1] as u32)
            }
            1 => {
                if buf.len() < 3 {
                    return Ok(None);
                }
                (3, 64 + buf[1] as u32 + 256 * buf[2] as u32)
            }
            csid => (1, csid as u32),
        };

        let message_header_len = match fmt {
            ChunkType::Type0 => 11,
            ChunkType::Type1 => 7,
            ChunkType::Type2 => 3,
            ChunkType::Type3 => 0,
        };

        if buf.len() < basic_len + message_header_len {
            return Ok(None);
        }

        if !self.streams.contains_key(&chunk_stream_id) && self.streams.len() >= MAX_TRACKED_CHUNK_STREAMS {
            return Err(ChunkDecodeError::TooManyPreviousChunkHeaders);
        }

        let prev = self.streams.get(&chunk_stream_id).cloned();
        if fmt != ChunkType::Type0 && fmt != ChunkType::Type1 && prev.is_none() {
            return Err(ChunkDecodeError::MissingPreviousChunkHeader(chunk_stream_id));
        }

        let mut offset = basic_len;
        let (mut resolved, delta) = match fmt {
            ChunkType::Type0 => {
                let timestamp_field = BigEndian::read_u24(&buf[offset..]);
                let msg_length = BigEndian::read_u24(&buf[offset + 3..]);
                let msg_type_id = buf[offset + 6];
                let msg_stream_id = u32::from_le_bytes(buf[offset + 7..offset + 11].try_into().unwrap());
                offset += 11;
                (
                    ChunkMessageHeader {
                        timestamp: timestamp_field,
                        msg_length,
                        msg_type_id,
                        msg_stream_id,
                    },
                    0,
                )
            }
            ChunkType::Type1 => {
                let timestamp_field = BigEndian::read_u24(&buf[offset..]);
                let msg_length = BigEndian::read_u24(&buf[offset + 3..]);
                let msg_type_id = buf[offset + 6];
                offset += 7;

                match prev.as_ref() {
                    Some(prev) => (
                        ChunkMessageHeader {
                            timestamp: prev.header.timestamp.wrapping_add(timestamp_field),
                            msg_length,
                            msg_type_id,
                            msg_stream_id: prev.header.msg_stream_id,
                        },
                        timestamp_field,
                    ),
                    // First-ever chunk on this csid: there is no previous
                    // header to delta against, so the timestamp field is
                    // absolute rather than a delta (RTMP 5.3.1.2.2).
                    None => (
                        ChunkMessageHeader {
                            timestamp: timestamp_field,
                            msg_length,
                            msg_type_id,
                            msg_stream_id: 0,
                        },
                        0,
                    ),
                }
            }
            ChunkType::Type2 => {
                let prev = prev.as_ref().unwrap();
                let delta = BigEndian::read_u24(&buf[offset..]);
                offset += 3;
                (
                    ChunkMessageHeader {
                        timestamp: prev.header.timestamp.wrapping_add(delta),
                        msg_length: prev.header.msg_length,
                        msg_type_id: prev.header.msg_type_id,
                        msg_stream_id: prev.header.msg_stream_id,
                    },
                    delta,
                )
            }
            ChunkType::Type3 => {
                let prev = prev.as_ref().unwrap();
                if prev.partial.is_some() {
                    // Continuation fragment: every field, including the timestamp, repeats.
                    (prev.header.clone(), prev.timestamp_delta)
                } else {
                    // New message reusing the previous header's delta (RTMP 5.3.1.2.4).
                    (
                        ChunkMessageHeader {
                            timestamp: prev.header.timestamp.wrapping_add(prev.timestamp_delta),
                            ..prev.header.clone()
                        },
                        prev.timestamp_delta,
                    )
                }
            }
        };

        let extended_timestamp = if fmt == ChunkType::Type0 || (fmt == ChunkType::Type1 && prev.is_none()) {
            resolved.timestamp >= 0xFFFFFF
        } else if fmt == ChunkType::Type3 {
            prev.as_ref().map(|p| p.extended_timestamp).unwrap_or(false)
        } else {
            delta >= 0xFFFFFF
        };

        if extended_timestamp {
            if buf.len() < offset + 4 {
                return Ok(None);
            }
            let extended_value = BigEndian::read_u32(&buf[offset..]);
            offset += 4;

            resolved.timestamp = match fmt {
                ChunkType::Type0 => extended_value,
                ChunkType::Type1 if prev.is_none() => extended_value,
                ChunkType::Type1 | ChunkType::Type2 => {
                    let prev = prev.as_ref().unwrap();
                    prev.header.timestamp.wrapping_add(extended_value)
                }
                ChunkType::Type3 => resolved.timestamp,
            };
        }

        self.streams
            .entry(chunk_stream_id)
            .and_modify(|s| {
                s.header = resolved.clone();
                s.timestamp_delta = delta;
                s.extended_timestamp = extended_timestamp;
            })
            .or_insert_with(|| ChunkStreamState {
                header: resolved.clone(),
                timestamp_delta: delta,
                extended_timestamp,
                partial: None,
            });

        if resolved.msg_length as usize > MAX_PARTIAL_CHUNK_SIZE {
            return Err(ChunkDecodeError::PartialChunkTooLarge(resolved.msg_length as usize));
        }

        Ok(Some(ParsedHeader {
            consumed: offset,
            basic: ChunkBasicHeader { chunk_stream_id },
            resolved,
            delta,
            extended_timestamp,
        }))
    }
}

#[cfg(test)]
#[cfg_attr(all(test, coverage_nightly), coverage(off))]
mod tests {
    use bytes::Bytes;

    use super::super::encoder::ChunkEncoder;
    use super::*;

    fn round_trip(chunks: Vec<Chunk>, chunk_size: usize) -> Vec<Chunk> {
        let mut encoder = ChunkEncoder::default();
        encoder.set_chunk_size(chunk_size);
        let mut wire = Vec::new();
        for chunk in chunks {
            encoder.write_chunk(&mut wire, chunk).unwrap();
        }

        let mut decoder = ChunkDecoder::default();
        decoder.update_max_chunk_size(chunk_size);
        let mut buf = BytesMut::from(&wire[..]);

        let mut out = Vec::new();
        while let Some(chunk) = decoder.read_chunk(&mut buf).unwrap() {
            out.push(chunk);
        }
        out
    }

    #[test]
    fn decodes_single_small_chunk() {
        let chunk = Chunk::new(3, 0, 20, 1, Bytes::from_static(b"hello world"));
        let decoded = round_trip(vec![chunk], 128);
        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded[0].payload, Bytes::from_static(b"hello world"));
        assert_eq!(decoded[0].basic_header.chunk_stream_id, 3);
        assert_eq!(decoded[0].message_header.msg_type_id, 20);
        assert_eq!(decoded[0].message_header.msg_stream_id, 1);
    }

    #[test]
    fn reassembles_fragmented_message() {
        let payload: Vec<u8> = (0..300u32).map(|i| i as u8).collect();
        let chunk = Chunk::new(4, 50, 9, 2, Bytes::from(payload.clone()));
        let decoded = round_trip(vec![chunk], 128);
        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded[0].payload, Bytes::from(payload));
    }

    #[test]
    fn decodes_extended_csid_forms() {
        for csid in [64u32, 319] {
            let chunk = Chunk::new(csid, 0, 8, 0, Bytes::from_static(b"payload"));
            let decoded = round_trip(vec![chunk], 128);
            assert_eq!(decoded[0].basic_header.chunk_stream_id, csid);
        }
    }

    #[test]
    fn decodes_extended_timestamp() {
        let chunk = Chunk::new(3, 0xFFFFFFFF, 20, 1, Bytes::from_static(b"x"));
        let decoded = round_trip(vec![chunk], 128);
        assert_eq!(decoded[0].message_header.timestamp, 0xFFFFFFFF);
    }

    #[test]
    fn type1_as_first_chunk_treats_timestamp_as_absolute() {
        // Hand-craft a lone Type1 chunk on a csid that has never seen a Type0.
        let mut buf = BytesMut::new();
        buf.extend_from_slice(&[(1 << 6) | 5]); // fmt 1, csid 5
        buf.extend_from_slice(&[0, 0, 42]); // timestamp field, read as absolute
        buf.extend_from_slice(&[0, 0, 1]); // msg length
        buf.extend_from_slice(&[20]); // msg type
        buf.extend_from_slice(b"x");

        let mut decoder = ChunkDecoder::default();
        let chunk = decoder.read_chunk(&mut buf).unwrap().expect("first Type1 chunk must decode");
        assert_eq!(chunk.message_header.timestamp, 42);
        assert_eq!(chunk.message_header.msg_length, 1);
        assert_eq!(chunk.message_header.msg_type_id, 20);
        assert_eq!(chunk.payload, Bytes::from_static(b"x"));
    }

    #[test]
    fn rejects_type2_without_prior_header() {
        let mut buf = BytesMut::new();
        buf.extend_from_slice(&[(2 << 6) | 5]); // fmt 2, csid 5
        buf.extend_from_slice(&[0, 0, 0]); // timestamp delta

        let mut decoder = ChunkDecoder::default();
        let err = decoder.read_chunk(&mut buf).unwrap_err();
        assert!(matches!(err, ChunkDecodeError::MissingPreviousChunkHeader(5)));
    }

    #[test]
    fn rejects_type3_without_prior_header() {
        let mut buf = BytesMut::new();
        buf.extend_from_slice(&[(3 << 6) | 5]); // fmt 3, csid 5

        let mut decoder = ChunkDecoder::default();
        let err = decoder.read_chunk(&mut buf).unwrap_err();
        assert!(matches!(err, ChunkDecodeError::MissingPreviousChunkHeader(5)));
    }

    #[test]
    fn type3_continuation_inherits_full_header() {
        let payload: Vec<u8> = (0..10u8).collect();
        let chunk = Chunk::new(6, 10, 18, 1, Bytes::from(payload.clone()));
        let decoded = round_trip(vec![chunk], 4);
        assert_eq!(decoded[0].payload, Bytes::from(payload));
        assert_eq!(decoded[0].message_header.timestamp, 10);
    }
}
