use crate::command_messages::CommandError;
use crate::protocol_control_messages::errors::ProtocolControlMessageError;
use crate::user_control_messages::UserControlMessageError;

#[derive(Debug, thiserror::Error)]
pub enum MessageError {
    #[error("protocol control message: {0}")]
    ProtocolControlMessage(#[from] ProtocolControlMessageError),
    #[error("user control message: {0}")]
    UserControlMessage(#[from] UserControlMessageError),
    #[error("command message: {0}")]
    CommandMessage(#[from] CommandError),
}
