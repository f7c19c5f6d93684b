//! Writing [`Command`].

use std::fmt::Display;
use std::io;

use bytes::{BufMut, Bytes, BytesMut};

use super::error::CommandError;
use super::{Command, CommandResultLevel, CommandType};
use crate::chunk::{Chunk, ChunkEncoder, COMMAND_CHUNK_STREAM_ID};

/// Message type id for AMF0 command messages (messages::MessageType::CommandAmf0).
const MSG_TYPE_COMMAND_AMF0: u8 = 20;

impl AsRef<str> for CommandResultLevel {
    fn as_ref(&self) -> &str {
        match self {
            CommandResultLevel::Warning => "warning",
            CommandResultLevel::Status => "status",
            CommandResultLevel::Error => "error",
            CommandResultLevel::Unknown(s) => s,
        }
    }
}

impl Display for CommandResultLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_ref())
    }
}

impl Command {
    fn write_amf0_chunk(io: &mut impl io::Write, encoder: &ChunkEncoder, payload: Bytes) -> Result<(), CommandError> {
        encoder
            .write_chunk(io, Chunk::new(COMMAND_CHUNK_STREAM_ID, 0, MSG_TYPE_COMMAND_AMF0, 0, payload))
            .map_err(CommandError::from)
    }

    /// Writes a [`Command`] to the given writer.
    ///
    /// Skips unknown commands; the server never echoes vendor extensions back.
    pub fn write(self, io: &mut impl io::Write, encoder: &ChunkEncoder) -> Result<(), CommandError> {
        let mut buf = BytesMut::new();
        let mut buf_writer = (&mut buf).writer();

        match self.command_type {
            CommandType::NetConnection(command) => {
                command.write(&mut buf_writer, self.transaction_id)?;
            }
            CommandType::NetStream(command) => {
                command.write(&mut buf_writer, self.transaction_id)?;
            }
            CommandType::OnStatus(command) => {
                command.write(&mut buf_writer, self.transaction_id)?;
            }
            CommandType::Unknown { .. } => return Ok(()),
        }

        Self::write_amf0_chunk(io, encoder, buf.freeze())
    }
}

#[cfg(test)]
#[cfg_attr(all(test, coverage_nightly), coverage(off))]
mod tests {
    use super::*;
    use crate::command_messages::netstream::NetStreamCommand;

    #[test]
    fn command_result_level_to_str() {
        assert_eq!(CommandResultLevel::Warning.as_ref(), "warning");
        assert_eq!(CommandResultLevel::Status.as_ref(), "status");
        assert_eq!(CommandResultLevel::Error.as_ref(), "error");
        assert_eq!(CommandResultLevel::Unknown("custom".to_owned()).as_ref(), "custom");
    }

    #[test]
    fn command_result_level_into_string() {
        assert_eq!(CommandResultLevel::Warning.to_string(), "warning");
        assert_eq!(CommandResultLevel::Unknown("custom".to_owned()).to_string(), "custom");
    }

    #[test]
    fn netstream_command_write_fails() {
        let mut buf = Vec::new();
        let encoder = ChunkEncoder::default();

        let err = Command {
            command_type: CommandType::NetStream(NetStreamCommand::CloseStream),
            transaction_id: 1.0,
        }
        .write(&mut buf, &encoder)
        .unwrap_err();

        assert!(matches!(err, CommandError::NotServerWritable(_)));
    }
}
