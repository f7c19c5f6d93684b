use crate::chunk::ChunkDecodeError;
use crate::command_messages::CommandError;
use crate::handshake::HandshakeError;
use crate::messages::MessageError;
use crate::protocol_control_messages::errors::ProtocolControlMessageError;
use crate::registry::RegistryError;
use crate::user_control_messages::UserControlMessageError;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("handshake: {0}")]
    Handshake(#[from] HandshakeError),
    #[error("chunk decode: {0}")]
    ChunkDecode(#[from] ChunkDecodeError),
    #[error("message: {0}")]
    Message(#[from] MessageError),
    #[error("command: {0}")]
    Command(#[from] CommandError),
    #[error("protocol control message: {0}")]
    ProtocolControlMessage(#[from] ProtocolControlMessageError),
    #[error("user control message: {0}")]
    UserControlMessage(#[from] UserControlMessageError),
    #[error("registry: {0}")]
    Registry(#[from] RegistryError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("timed out waiting for peer")]
    Timeout(#[from] tokio::time::error::Elapsed),
}
