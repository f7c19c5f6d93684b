//! Writing protocol control messages.

use std::io;

use byteorder::{BigEndian, WriteBytesExt};
use bytes::Bytes;

use super::errors::ProtocolControlMessageError;
use super::{
    ProtocolControlMessageAcknowledgement, ProtocolControlMessageSetChunkSize, ProtocolControlMessageSetPeerBandwidth,
    ProtocolControlMessageWindowAcknowledgementSize,
};
use crate::chunk::{Chunk, ChunkEncoder, CONTROL_CHUNK_STREAM_ID};

const MSG_TYPE_SET_CHUNK_SIZE: u8 = 1;
const MSG_TYPE_ACKNOWLEDGEMENT: u8 = 3;
const MSG_TYPE_WINDOW_ACKNOWLEDGEMENT_SIZE: u8 = 5;
const MSG_TYPE_SET_PEER_BANDWIDTH: u8 = 6;

impl ProtocolControlMessageSetChunkSize {
    /// Writes the [`ProtocolControlMessageSetChunkSize`] to the given writer.
    pub fn write(&self, io: &mut impl io::Write, encoder: &ChunkEncoder) -> Result<(), ProtocolControlMessageError> {
        // According to spec the first bit must be 0.
        let chunk_size = self.chunk_size & 0x7FFFFFFF;

        encoder.write_chunk(
            io,
            Chunk::new(
                CONTROL_CHUNK_STREAM_ID,
                0,
                MSG_TYPE_SET_CHUNK_SIZE,
                0,
                Bytes::from(chunk_size.to_be_bytes().to_vec()),
            ),
        )?;

        Ok(())
    }
}

impl ProtocolControlMessageAcknowledgement {
    /// Writes the [`ProtocolControlMessageAcknowledgement`] to the given writer.
    pub fn write(&self, io: &mut impl io::Write, encoder: &ChunkEncoder) -> Result<(), ProtocolControlMessageError> {
        encoder.write_chunk(
            io,
            Chunk::new(
                CONTROL_CHUNK_STREAM_ID,
                0,
                MSG_TYPE_ACKNOWLEDGEMENT,
                0,
                Bytes::from(self.sequence_number.to_be_bytes().to_vec()),
            ),
        )?;

        Ok(())
    }
}

impl ProtocolControlMessageWindowAcknowledgementSize {
    /// Writes the [`ProtocolControlMessageWindowAcknowledgementSize`] to the given writer.
    pub fn write(&self, io: &mut impl io::Write, encoder: &ChunkEncoder) -> Result<(), ProtocolControlMessageError> {
        encoder.write_chunk(
            io,
            Chunk::new(
                CONTROL_CHUNK_STREAM_ID,
                0,
                MSG_TYPE_WINDOW_ACKNOWLEDGEMENT_SIZE,
                0,
                Bytes::from(self.acknowledgement_window_size.to_be_bytes().to_vec()),
            ),
        )?;

        Ok(())
    }
}

impl ProtocolControlMessageSetPeerBandwidth {
    /// Writes the [`ProtocolControlMessageSetPeerBandwidth`] to the given writer.
    pub fn write(&self, io: &mut impl io::Write, encoder: &ChunkEncoder) -> Result<(), ProtocolControlMessageError> {
        let mut data = Vec::new();
        data.write_u32::<BigEndian>(self.acknowledgement_window_size)?;
        data.write_u8(self.limit_type as u8)?;

        encoder.write_chunk(
            io,
            Chunk::new(CONTROL_CHUNK_STREAM_ID, 0, MSG_TYPE_SET_PEER_BANDWIDTH, 0, Bytes::from(data)),
        )?;

        Ok(())
    }
}
