//! Writing [`UserControlEvent`].

use std::io;

use byteorder::{BigEndian, WriteBytesExt};

use super::define::{EventType, UserControlEvent};
use super::errors::UserControlMessageError;
use crate::chunk::{Chunk, ChunkEncoder, CONTROL_CHUNK_STREAM_ID};

/// Message type id for user control events (messages::MessageType::UserControlEvent).
const MSG_TYPE_USER_CONTROL_EVENT: u8 = 4;

impl UserControlEvent {
    /// Writes this event as a user control message to the given writer.
    pub fn write(&self, io: &mut impl io::Write, encoder: &ChunkEncoder) -> Result<(), UserControlMessageError> {
        let mut data = Vec::new();

        match self {
            Self::StreamBegin { stream_id } => {
                data.write_u16::<BigEndian>(EventType::StreamBegin as u16)?;
                data.write_u32::<BigEndian>(*stream_id)?;
            }
            Self::StreamEof { stream_id } => {
                data.write_u16::<BigEndian>(EventType::StreamEof as u16)?;
                data.write_u32::<BigEndian>(*stream_id)?;
            }
            Self::StreamDry { stream_id } => {
                data.write_u16::<BigEndian>(EventType::StreamDry as u16)?;
                data.write_u32::<BigEndian>(*stream_id)?;
            }
            Self::SetBufferLength { stream_id, buffer_length_ms } => {
                data.write_u16::<BigEndian>(EventType::SetBufferLength as u16)?;
                data.write_u32::<BigEndian>(*stream_id)?;
                data.write_u32::<BigEndian>(*buffer_length_ms)?;
            }
            Self::StreamIsRecorded { stream_id } => {
                data.write_u16::<BigEndian>(EventType::StreamIsRecorded as u16)?;
                data.write_u32::<BigEndian>(*stream_id)?;
            }
            Self::PingRequest { timestamp } => {
                data.write_u16::<BigEndian>(EventType::PingRequest as u16)?;
                data.write_u32::<BigEndian>(*timestamp)?;
            }
            Self::PingResponse { timestamp } => {
                data.write_u16::<BigEndian>(EventType::PingResponse as u16)?;
                data.write_u32::<BigEndian>(*timestamp)?;
            }
            Self::Other { event_type, data: body } => {
                data.write_u16::<BigEndian>(*event_type)?;
                data.extend_from_slice(body);
            }
        }

        encoder.write_chunk(
            io,
            Chunk::new(CONTROL_CHUNK_STREAM_ID, 0, MSG_TYPE_USER_CONTROL_EVENT, 0, data.into()),
        )?;

        Ok(())
    }
}
