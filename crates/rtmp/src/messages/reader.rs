//! Reading [`MessageData`].

use num_traits::FromPrimitive;

use super::{MessageData, MessageType};
use crate::chunk::Chunk;
use crate::command_messages::Command;
use crate::protocol_control_messages::errors::ProtocolControlMessageError;
use crate::protocol_control_messages::{
    ProtocolControlMessageSetChunkSize, ProtocolControlMessageSetPeerBandwidth,
    ProtocolControlMessageWindowAcknowledgementSize,
};

impl MessageData {
    /// Reads [`MessageData`] from the given chunk, dispatching on its raw message type id.
    pub fn read(chunk: &Chunk) -> Result<Self, super::MessageError> {
        let msg_type_id = chunk.message_header.msg_type_id;

        match MessageType::from_u8(msg_type_id) {
            Some(MessageType::SetChunkSize) => {
                let data = ProtocolControlMessageSetChunkSize::read(&chunk.payload).map_err(ProtocolControlMessageError::Io)?;
                Ok(Self::SetChunkSize(data))
            }
            Some(MessageType::WindowAcknowledgementSize) => {
                let data = ProtocolControlMessageWindowAcknowledgementSize::read(&chunk.payload).map_err(ProtocolControlMessageError::Io)?;
                Ok(Self::SetAcknowledgementWindowSize(data))
            }
            Some(MessageType::SetPeerBandwidth) => {
                let data = ProtocolControlMessageSetPeerBandwidth::read(&chunk.payload).map_err(ProtocolControlMessageError::Io)?;
                Ok(Self::SetPeerBandwidth(data))
            }
            Some(MessageType::Audio) => Ok(Self::AudioData {
                data: chunk.payload.clone(),
            }),
            Some(MessageType::Video) => Ok(Self::VideoData {
                data: chunk.payload.clone(),
            }),
            Some(MessageType::DataAmf0) => Ok(Self::DataAmf0 {
                data: chunk.payload.clone(),
            }),
            Some(MessageType::CommandAmf0) => Ok(Self::Amf0Command(Command::read(chunk.payload.clone())?)),
            // Abort, Acknowledgement, UserControlEvent are handled by the connection's
            // read loop directly (it needs to act on them, not just observe them), so
            // they fall through to Other here rather than being parsed twice.
            _ => Ok(Self::Other {
                msg_type_id,
                data: chunk.payload.clone(),
            }),
        }
    }
}

#[cfg(test)]
#[cfg_attr(all(test, coverage_nightly), coverage(off))]
mod tests {
    use bytes::Bytes;
    use rtmprelay_amf0::{Amf0Encoder, Amf0Object, Amf0Value};

    use super::*;
    use crate::command_messages::CommandType;
    use crate::command_messages::netconnection::NetConnectionCommand;

    #[test]
    fn test_parse_command() {
        let mut buf = Vec::new();
        let mut encoder = Amf0Encoder::new(&mut buf);

        encoder.encode_string("connect").unwrap();
        encoder.encode_number(1.0).unwrap();
        let object: Amf0Object = [("app".to_owned(), Amf0Value::String("testapp".to_owned()))].into_iter().collect();
        encoder.encode_object(&object).unwrap();

        let amf_data = Bytes::from(buf);

        let chunk = Chunk::new(0, 0, MessageType::CommandAmf0 as u8, 0, amf_data);

        let message = MessageData::read(&chunk).expect("no errors");
        match message {
            MessageData::Amf0Command(command) => {
                let Command {
                    transaction_id,
                    command_type,
                } = command;
                assert_eq!(transaction_id, 1.0);

                let CommandType::NetConnection(NetConnectionCommand::Connect(connect)) = command_type else {
                    panic!("wrong command");
                };

                assert_eq!(connect.app, "testapp");
            }
            _ => unreachable!("wrong message type"),
        }
    }

    #[test]
    fn test_parse_audio_packet() {
        let chunk = Chunk::new(0, 0, MessageType::Audio as u8, 0, vec![0x00, 0x00, 0x00, 0x00].into());

        let message = MessageData::read(&chunk).expect("no errors");
        match message {
            MessageData::AudioData { data } => {
                assert_eq!(data, vec![0x00, 0x00, 0x00, 0x00]);
            }
            _ => unreachable!("wrong message type"),
        }
    }

    #[test]
    fn test_parse_set_chunk_size() {
        let chunk = Chunk::new(0, 0, MessageType::SetChunkSize as u8, 0, vec![0x00, 0xFF, 0xFF, 0xFF].into());

        let message = MessageData::read(&chunk).expect("no errors");
        match message {
            MessageData::SetChunkSize(ProtocolControlMessageSetChunkSize { chunk_size }) => {
                assert_eq!(chunk_size, 0x00FFFFFF);
            }
            _ => unreachable!("wrong message type"),
        }
    }

    #[test]
    fn test_parse_metadata() {
        let mut buf = Vec::new();

        let mut encoder = Amf0Encoder::new(&mut buf);
        encoder.encode_string("onMetaData").unwrap();
        let object: Amf0Object = [("duration".to_owned(), Amf0Value::Number(0.0))].into_iter().collect();
        encoder.encode_object(&object).unwrap();

        let amf_data = Bytes::from(buf);
        let chunk = Chunk::new(0, 0, MessageType::DataAmf0 as u8, 0, amf_data.clone());

        let message = MessageData::read(&chunk).expect("no errors");
        match message {
            MessageData::DataAmf0 { data } => {
                assert_eq!(data, amf_data);
            }
            _ => unreachable!("wrong message type"),
        }
    }

    #[test]
    fn test_unsupported_message_type() {
        let chunk = Chunk::new(0, 0, 42, 0, vec![0x00, 0x00, 0x00, 0x00].into());

        assert!(matches!(
            MessageData::read(&chunk).expect("no errors"),
            MessageData::Other { msg_type_id: 42, .. }
        ));
    }
}
