use std::io;

use byteorder::{BigEndian, LittleEndian, WriteBytesExt};

use super::define::{Chunk, ChunkMessageHeader, ChunkType, INIT_CHUNK_SIZE};
use super::errors::ChunkEncodeError;

/// Encodes [`Chunk`]s into an RTMP chunk stream, fragmenting message
/// payloads larger than `chunk_size` across consecutive Type3 chunks.
pub struct ChunkEncoder {
    chunk_size: usize,
}

impl Default for ChunkEncoder {
    fn default() -> Self {
        Self {
            chunk_size: INIT_CHUNK_SIZE,
        }
    }
}

impl ChunkEncoder {
    pub fn set_chunk_size(&mut self, chunk_size: usize) {
        self.chunk_size = chunk_size;
    }

    #[inline]
    fn write_basic_header(writer: &mut impl io::Write, fmt: ChunkType, csid: u32) -> Result<(), ChunkEncodeError> {
        let fmt = fmt as u8;

        if csid >= 64 + 255 {
            writer.write_u8((fmt << 6) | 1)?;
            let csid = csid - 64;

            let div = csid / 256;
            let rem = csid % 256;

            writer.write_u8(rem as u8)?;
            writer.write_u8(div as u8)?;
        } else if csid >= 64 {
            writer.write_u8(fmt << 6)?;
            writer.write_u8((csid - 64) as u8)?;
        } else {
            writer.write_u8((fmt << 6) | csid as u8)?;
        }

        Ok(())
    }

    #[inline]
    fn write_message_header(
        writer: &mut impl io::Write,
        message_header: &ChunkMessageHeader,
    ) -> Result<(), ChunkEncodeError> {
        let timestamp = if message_header.timestamp >= 0xFFFFFF {
            0xFFFFFF
        } else {
            message_header.timestamp
        };

        writer.write_u24::<BigEndian>(timestamp)?;
        writer.write_u24::<BigEndian>(message_header.msg_length)?;
        writer.write_u8(message_header.msg_type_id)?;
        writer.write_u32::<LittleEndian>(message_header.msg_stream_id)?;

        if message_header.is_extended_timestamp() {
            Self::write_extended_timestamp(writer, message_header.timestamp)?;
        }

        Ok(())
    }

    #[inline]
    fn write_extended_timestamp(writer: &mut impl io::Write, timestamp: u32) -> Result<(), ChunkEncodeError> {
        writer.write_u32::<BigEndian>(timestamp)?;
        Ok(())
    }

    /// Writes `chunk_info` as a Type0 chunk followed by as many Type3
    /// continuation chunks as its payload requires.
    pub fn write_chunk(&self, writer: &mut impl io::Write, mut chunk_info: Chunk) -> Result<(), ChunkEncodeError> {
        Self::write_basic_header(writer, ChunkType::Type0, chunk_info.basic_header.chunk_stream_id)?;
        Self::write_message_header(writer, &chunk_info.message_header)?;

        loop {
            let cur_payload_size = chunk_info.payload.len().min(self.chunk_size);
            let payload_bytes = chunk_info.payload.split_to(cur_payload_size);
            writer.write_all(&payload_bytes[..])?;

            if chunk_info.payload.is_empty() {
                break;
            }

            Self::write_basic_header(writer, ChunkType::Type3, chunk_info.basic_header.chunk_stream_id)?;
            if chunk_info.message_header.is_extended_timestamp() {
                Self::write_extended_timestamp(writer, chunk_info.message_header.timestamp)?;
            }
        }

        Ok(())
    }
}
