//! Errors raised while decoding or encoding AMF0 command messages.

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("amf0: {0}")]
    Amf0(#[from] rtmprelay_amf0::Amf0Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("chunk encode: {0}")]
    ChunkEncode(#[from] crate::chunk::ChunkEncodeError),
    #[error("missing required field `{0}` in command object")]
    MissingField(&'static str),
    #[error("invalid publish command publishing type: {0}")]
    InvalidPublishingType(String),
    #[error("the server never sends this command: {0}")]
    NotServerWritable(&'static str),
}
